// Barometer drivers
//
// Each driver owns its bus handle and its calibration state, and exposes the
// hal::Barometer interface so the telemetry loop does not depend on the chip.

pub mod bmp388;
mod calibration;

pub use self::bmp388::{Bmp388, Bmp388Config, Bmp388Error, PowerMode};
pub use self::calibration::{raw_sample, CalibrationCoefficients, CALIBRATION_LEN};
