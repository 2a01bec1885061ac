use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use hal::{Barometer, BatteryMonitor, FlashMemory, PacketRadio};
use thiserror::Error;

use crate::config::{saturating_millis, TelemetryConfig};
use crate::datapoint::Datapoint;
use crate::fault::FaultCode;

/// Failure of a single sample-and-send cycle
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("barometer read failed")]
    Barometer,

    #[error("battery read failed")]
    Battery,

    #[error("radio send failed")]
    Radio,
}

/// The sample-and-transmit loop
pub struct Payload<R, B, V, L, D> {
    radio: R,
    baro: B,
    battery: V,
    activity_led: L,
    delay: D,
    config: TelemetryConfig,
    packet_number: u32,
}

impl<R, B, V, L, D> Payload<R, B, V, L, D>
where
    R: PacketRadio,
    B: Barometer,
    V: BatteryMonitor,
    L: StatefulOutputPin,
    D: DelayNs,
{
    pub fn new(radio: R, baro: B, battery: V, activity_led: L, delay: D, config: TelemetryConfig) -> Self {
        Self {
            radio,
            baro,
            battery,
            activity_led,
            delay,
            config,
            packet_number: 0,
        }
    }

    /// Bring up the radio, the barometer and the flash, in that order
    pub async fn init<F: FlashMemory>(&mut self, flash: &mut F) -> Result<(), FaultCode> {
        self.radio.init().await.map_err(|e| {
            log::error!("Radio init failed: {:?}", e);
            FaultCode::RadioInit
        })?;

        self.baro.init().await.map_err(|e| {
            log::error!("Barometer init failed: {:?}", e);
            FaultCode::BaroInit
        })?;

        flash.init().await.map_err(|e| {
            log::error!("Flash init failed: {:?}", e);
            FaultCode::FlashInit
        })?;

        log::info!(
            "Payload {} ready, flight {}",
            self.config.device_id,
            self.config.flight_number
        );
        Ok(())
    }

    /// Number the next datapoint will carry
    pub fn packet_number(&self) -> u32 {
        self.packet_number
    }

    /// Sample every sensor and send one datapoint
    ///
    /// The packet number only advances once the radio accepted the packet.
    pub async fn transmit(&mut self) -> Result<Datapoint, TelemetryError> {
        let reading = self.baro.get_reading().await.map_err(|e| {
            log::debug!("Barometer: {:?}", e);
            TelemetryError::Barometer
        })?;

        let battery_voltage = self.battery.read_voltage().await.map_err(|e| {
            log::debug!("Battery: {:?}", e);
            TelemetryError::Battery
        })?;

        let datapoint = Datapoint {
            temperature: reading.temperature,
            pressure: reading.pressure,
            battery_voltage,
            packet_number: self.packet_number,
            flight_number: self.config.flight_number,
            device_id: self.config.device_id,
            version: self.config.version,
        };

        self.radio.send(&datapoint.encode()).await.map_err(|e| {
            log::debug!("Radio: {:?}", e);
            TelemetryError::Radio
        })?;

        self.packet_number = self.packet_number.wrapping_add(1);
        Ok(datapoint)
    }

    /// Wait one sample interval, blink the activity LED and transmit
    pub async fn step(&mut self) {
        self.delay
            .delay_ms(saturating_millis(self.config.sample_interval))
            .await;

        if let Err(e) = self.activity_led.toggle() {
            log::warn!("Activity LED: {:?}", e);
        }

        match self.transmit().await {
            Ok(datapoint) => log::debug!(
                "Packet {}: {:.2} C, {:.1} Pa, {:.2} V",
                datapoint.packet_number,
                datapoint.temperature,
                datapoint.pressure,
                datapoint.battery_voltage
            ),
            Err(e) => log::warn!("Skipping packet {}: {}", self.packet_number, e),
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }

    pub fn release(self) -> (R, B, V, L, D) {
        (self.radio, self.baro, self.battery, self.activity_led, self.delay)
    }
}
