#![cfg_attr(not(test), no_std)]

mod battery;
mod board;
mod config;
mod datapoint;
mod fault;
mod payload;

#[cfg(test)]
mod mock;

pub use battery::adc_to_volts;
pub use board::{launch, Board, Resources};
pub use config::TelemetryConfig;
pub use datapoint::{crc8, Datapoint, DecodeError, CRC_COVERED_LEN, DATAPOINT_LEN};
pub use fault::{FaultBlinker, FaultCode};
pub use payload::{Payload, TelemetryError};
