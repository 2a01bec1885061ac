use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use hal::{Barometer, BatteryMonitor, FlashMemory, PacketRadio};

use crate::config::TelemetryConfig;
use crate::fault::FaultBlinker;
use crate::payload::Payload;

/// Hardware a payload runs on
pub trait Board
where
    Self: Sized,
{
    type Radio: PacketRadio;
    type Baro: Barometer;
    type Flash: FlashMemory;
    type Battery: BatteryMonitor;
    type Led: StatefulOutputPin;
    type Delay: DelayNs;

    fn name(&self) -> &str;

    fn split_resources(self) -> Resources<Self>;
}

/// Devices handed over by a board
pub struct Resources<B: Board> {
    pub radio: B::Radio,
    pub baro: B::Baro,
    pub flash: B::Flash,
    pub battery: B::Battery,
    /// Toggled once per sample
    pub activity_led: B::Led,
    /// Blinks when startup fails
    pub status_led: B::Led,
    pub delay: B::Delay,
}

/// Initialize the payload and transmit forever
///
/// A startup fault parks the firmware blinking the status LED.
pub async fn launch<B: Board>(board: B, config: TelemetryConfig) -> ! {
    log::info!("Board: {}", board.name());

    let Resources {
        radio,
        baro,
        mut flash,
        battery,
        activity_led,
        status_led,
        delay,
    } = board.split_resources();

    let mut payload = Payload::new(radio, baro, battery, activity_led, delay, config);
    if let Err(fault) = payload.init(&mut flash).await {
        let (.., delay) = payload.release();
        FaultBlinker::new(status_led, delay).halt(fault).await
    }

    payload.run().await
}
