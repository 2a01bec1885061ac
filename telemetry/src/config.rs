use embassy_time::Duration;

/// Identity and pacing of the telemetry stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Wait before each sample
    pub sample_interval: Duration,

    pub device_id: u8,

    /// Datapoint format version
    pub version: u8,

    pub flight_number: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(5),
            device_id: 1,
            version: 1,
            flight_number: 42,
        }
    }
}

/// Whole milliseconds of `duration`, saturating at `u32::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
