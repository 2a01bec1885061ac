/// Battery supervision interface
pub trait BatteryMonitor {
    type Error: core::fmt::Debug;

    /// Read the battery voltage in Volts
    async fn read_voltage(&mut self) -> Result<f32, Self::Error>;
}
