//! Telemetry datagram carried in each radio packet.
//!
//! Little endian, 32 bytes:
//!
//! | offset | size | field              |
//! |--------|------|--------------------|
//! | 0      | 8    | temperature, °C    |
//! | 8      | 8    | pressure, Pa       |
//! | 16     | 4    | battery voltage, V |
//! | 20     | 4    | packet number      |
//! | 24     | 4    | flight number      |
//! | 28     | 1    | device id          |
//! | 29     | 1    | format version     |
//! | 30     | 1    | CRC-8 of 0..30     |
//! | 31     | 1    | padding            |

use crc::{Crc, CRC_8_SMBUS};
use thiserror::Error;

pub const DATAPOINT_LEN: usize = 32;

/// Bytes covered by the checksum
pub const CRC_COVERED_LEN: usize = 30;

// poly 0x07, init 0, no reflection, no xor-out
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

pub fn crc8(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram is {0} bytes, expected 32")]
    Length(usize),

    #[error("checksum {actual:#04x} does not match computed {expected:#04x}")]
    Crc { expected: u8, actual: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Datapoint {
    pub temperature: f64,
    pub pressure: f64,
    pub battery_voltage: f32,
    pub packet_number: u32,
    pub flight_number: u32,
    pub device_id: u8,
    pub version: u8,
}

impl Datapoint {
    pub fn encode(&self) -> [u8; DATAPOINT_LEN] {
        let mut buf = [0u8; DATAPOINT_LEN];
        buf[0..8].copy_from_slice(&self.temperature.to_le_bytes());
        buf[8..16].copy_from_slice(&self.pressure.to_le_bytes());
        buf[16..20].copy_from_slice(&self.battery_voltage.to_le_bytes());
        buf[20..24].copy_from_slice(&self.packet_number.to_le_bytes());
        buf[24..28].copy_from_slice(&self.flight_number.to_le_bytes());
        buf[28] = self.device_id;
        buf[29] = self.version;
        buf[30] = crc8(&buf[..CRC_COVERED_LEN]);
        buf
    }

    /// Parse a received datagram, checking its length and checksum
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let buf: &[u8; DATAPOINT_LEN] = bytes
            .try_into()
            .map_err(|_| DecodeError::Length(bytes.len()))?;

        let expected = crc8(&buf[..CRC_COVERED_LEN]);
        if buf[30] != expected {
            return Err(DecodeError::Crc {
                expected,
                actual: buf[30],
            });
        }

        Ok(Self {
            temperature: f64::from_le_bytes(field(buf, 0)),
            pressure: f64::from_le_bytes(field(buf, 8)),
            battery_voltage: f32::from_le_bytes(field(buf, 16)),
            packet_number: u32::from_le_bytes(field(buf, 20)),
            flight_number: u32::from_le_bytes(field(buf, 24)),
            device_id: buf[28],
            version: buf[29],
        })
    }
}

fn field<const N: usize>(buf: &[u8; DATAPOINT_LEN], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}
