//! Barometer sensor interface

/// One compensated barometer sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaroReading {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Pressure in Pascals
    pub pressure: f64,
}

/// Barometer sensor interface
pub trait Barometer {
    type Error: core::fmt::Debug;

    /// Reset the sensor, verify its identity and load calibration
    async fn init(&mut self) -> Result<(), Self::Error>;

    /// Trigger a measurement and return the compensated result
    ///
    /// Every call performs a fresh conversion; nothing is cached.
    async fn get_reading(&mut self) -> Result<BaroReading, Self::Error>;
}
