use embassy_time::Duration;
use embedded_hal::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use thiserror::Error;

use crate::config::saturating_millis;

const BLINK_PERIOD: Duration = Duration::from_millis(100);

/// Unrecoverable startup failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    #[error("radio initialization failed")]
    RadioInit,

    #[error("barometer initialization failed")]
    BaroInit,

    #[error("flash identification failed")]
    FlashInit,
}

/// Signals a fault by blinking the status LED
pub struct FaultBlinker<L, D> {
    led: L,
    delay: D,
}

impl<L: StatefulOutputPin, D: DelayNs> FaultBlinker<L, D> {
    pub fn new(led: L, delay: D) -> Self {
        Self { led, delay }
    }

    /// Toggle the LED and wait one blink period
    pub async fn blink(&mut self) {
        // nothing left to report a pin error to
        self.led.toggle().ok();
        self.delay.delay_ms(saturating_millis(BLINK_PERIOD)).await;
    }

    /// Blink forever
    pub async fn halt(mut self, fault: FaultCode) -> ! {
        log::error!("Halted: {}", fault);
        loop {
            self.blink().await;
        }
    }
}
