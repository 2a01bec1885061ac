//! Device drivers for the telemetry payload.
//!
//! All drivers are async and generic over the embedded-hal SPI device and
//! delay traits, so the same code runs on the board and against the
//! simulated devices used on the host.
#![cfg_attr(not(test), no_std)]

pub mod baro;
pub mod bus;
pub mod flash;
pub mod radio;

#[cfg(test)]
mod mock;
