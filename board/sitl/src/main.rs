use anyhow::Context;
use embassy_futures::block_on;
use embassy_time::Duration;
use telemetry::{Board, Payload, Resources, TelemetryConfig};

use board::SitlBoard;

mod board;
mod sim;

/// Run `cycles` sample-and-send cycles, then report
async fn run_cycles(board: SitlBoard, config: TelemetryConfig, cycles: u32) -> anyhow::Result<()> {
    log::info!("Board: {}", board.name());

    let Resources {
        radio,
        baro,
        mut flash,
        battery,
        activity_led,
        delay,
        ..
    } = board.split_resources();

    let mut payload = Payload::new(radio, baro, battery, activity_led, delay, config);
    payload.init(&mut flash).await.context("payload failed to start")?;

    for _ in 0..cycles {
        payload.step().await;
    }

    log::info!("Sent {} packets", payload.packet_number());
    Ok(())
}

// Usage: sitl [cycles] [interval_ms]
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let cycles = args
        .next()
        .map(|arg| arg.parse::<u32>())
        .transpose()
        .context("cycles must be a number")?;
    let interval_ms = args
        .next()
        .map(|arg| arg.parse::<u64>())
        .transpose()
        .context("interval_ms must be a number")?;

    let mut config = TelemetryConfig::default();
    if let Some(interval_ms) = interval_ms {
        config.sample_interval = Duration::from_millis(interval_ms);
    }

    let board = SitlBoard::new();
    match cycles {
        Some(cycles) => block_on(run_cycles(board, config, cycles)),
        // runs until interrupted
        None => block_on(telemetry::launch(board, config)),
    }
}
