use embedded_hal_async::spi::SpiDevice;
use hal::FlashMemory;
use thiserror::Error;

use crate::bus::command;

// Commands
pub const W25Q_CMD_RELEASE_POWER_DOWN: u8 = 0xAB;
pub const W25Q_CMD_MANUFACTURER_DEVICE_ID: u8 = 0x90;
pub const W25Q_CMD_JEDEC_ID: u8 = 0x9F;

// Winbond W25Q128JV
pub const W25Q_DEVICE_ID: u8 = 0x16;
pub const W25Q_MANUFACTURER_ID: u8 = 0xEF;
// memory type and capacity following the manufacturer byte
pub const W25Q_JEDEC_TYPE: u8 = 0x70;
pub const W25Q_JEDEC_CAPACITY: u8 = 0x17;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum W25qError<E> {
    #[error("SPI bus error: {0:?}")]
    Bus(E),

    #[error("unexpected response to command {command:#04x}: {actual:02x?}, expected {expected:02x?}")]
    Identity {
        command: u8,
        expected: [u8; 3],
        actual: [u8; 3],
    },
}

/// Winbond W25Q serial flash
///
/// Only wake-up and identification are implemented.
pub struct W25q<S> {
    spi: S,
}

impl<S: SpiDevice> W25q<S> {
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// Issue `cmd` and compare the response with `expected`
    async fn check(&mut self, cmd: &[u8], expected: &[u8]) -> Result<(), W25qError<S::Error>> {
        let mut response = [0u8; 3];
        let response = &mut response[..expected.len()];
        command(&mut self.spi, cmd, response).await.map_err(W25qError::Bus)?;

        if response == expected {
            return Ok(());
        }

        log::error!(
            "W25Q: command {:#04x} returned {:02x?}, expected {:02x?}",
            cmd[0],
            response,
            expected
        );
        Err(W25qError::Identity {
            command: cmd[0],
            expected: padded(expected),
            actual: padded(response),
        })
    }

    /// Wake the chip and verify its three identifiers
    pub async fn init(&mut self) -> Result<(), W25qError<S::Error>> {
        // device id follows three dummy bytes
        self.check(&[W25Q_CMD_RELEASE_POWER_DOWN, 0, 0, 0], &[W25Q_DEVICE_ID])
            .await?;
        self.check(
            &[W25Q_CMD_MANUFACTURER_DEVICE_ID, 0, 0],
            &[0x00, W25Q_DEVICE_ID, W25Q_MANUFACTURER_ID],
        )
        .await?;
        self.check(
            &[W25Q_CMD_JEDEC_ID],
            &[W25Q_MANUFACTURER_ID, W25Q_JEDEC_TYPE, W25Q_JEDEC_CAPACITY],
        )
        .await?;

        log::info!("W25Q flash identified");
        Ok(())
    }

    pub fn release(self) -> S {
        self.spi
    }
}

fn padded(bytes: &[u8]) -> [u8; 3] {
    let mut out = [0u8; 3];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

impl<S: SpiDevice> FlashMemory for W25q<S> {
    type Error = W25qError<S::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        W25q::init(self).await
    }
}
