#![no_std]
#![no_main]

#[cfg(feature = "payload_f405")]
mod payload_f405;
#[cfg(feature = "payload_f405")]
pub use payload_f405::*;

#[cfg(not(feature = "payload_f405"))]
compile_error!("No board feature selected");

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use telemetry::TelemetryConfig;
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    defmt::info!("Peripherals initialized");

    let (spi, pins) = split(p);
    let spi_bus = Mutex::<NoopRawMutex, _>::new(spi);
    let board = PayloadBoard::new(&spi_bus, pins);
    defmt::info!("Starting telemetry");

    telemetry::launch(board, TelemetryConfig::default()).await
}
