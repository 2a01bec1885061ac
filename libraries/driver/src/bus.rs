//! Register access over a chip-select gated SPI device.
//!
//! Both the barometer and the radio address registers with a single byte
//! whose bit 7 selects read or write, but they disagree on the polarity.

use embedded_hal_async::spi::{Operation, SpiDevice};

const RW_BIT: u8 = 0x80;

/// Polarity of the read/write flag in bit 7 of the address byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// Bit 7 set for reads, cleared for writes
    ReadHigh,
    /// Bit 7 set for writes, cleared for reads
    WriteHigh,
}

impl AddressMode {
    /// Address byte used to read `reg`
    pub const fn read_address(self, reg: u8) -> u8 {
        match self {
            AddressMode::ReadHigh => reg | RW_BIT,
            AddressMode::WriteHigh => reg & !RW_BIT,
        }
    }

    /// Address byte used to write `reg`
    pub const fn write_address(self, reg: u8) -> u8 {
        match self {
            AddressMode::ReadHigh => reg & !RW_BIT,
            AddressMode::WriteHigh => reg | RW_BIT,
        }
    }
}

/// Register-oriented view of an SPI device
///
/// Every call is exactly one SPI transaction, so chip-select is asserted for
/// the address phase and the data phase together.
pub struct RegisterBus<S> {
    spi: S,
    mode: AddressMode,
    /// Clock one dummy byte after the address on reads
    dummy_byte: bool,
}

impl<S: SpiDevice> RegisterBus<S> {
    pub fn new(spi: S, mode: AddressMode, dummy_byte: bool) -> Self {
        Self {
            spi,
            mode,
            dummy_byte,
        }
    }

    /// Read a single register
    pub async fn read_register(&mut self, reg: u8) -> Result<u8, S::Error> {
        let mut value = [0u8; 1];
        self.read_registers(reg, &mut value).await?;
        Ok(value[0])
    }

    /// Read consecutive registers starting at `reg`
    pub async fn read_registers(&mut self, reg: u8, data: &mut [u8]) -> Result<(), S::Error> {
        let header = [self.mode.read_address(reg), 0x00];
        let header = if self.dummy_byte {
            &header[..]
        } else {
            &header[..1]
        };
        self.spi
            .transaction(&mut [Operation::Write(header), Operation::Read(data)])
            .await
    }

    /// Write a single register
    pub async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), S::Error> {
        self.spi.write(&[self.mode.write_address(reg), value]).await
    }

    /// Give back the underlying SPI device
    pub fn release(self) -> S {
        self.spi
    }
}

/// Clock out a raw command and read the response in one transaction
pub async fn command<S: SpiDevice>(
    spi: &mut S,
    cmd: &[u8],
    response: &mut [u8],
) -> Result<(), S::Error> {
    spi.transaction(&mut [Operation::Write(cmd), Operation::Read(response)])
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSpi, Op};
    use embassy_futures::block_on;

    #[test]
    fn test_address_polarity() {
        assert_eq!(AddressMode::ReadHigh.read_address(0x03), 0x83);
        assert_eq!(AddressMode::ReadHigh.write_address(0x83), 0x03);
        assert_eq!(AddressMode::WriteHigh.read_address(0x81), 0x01);
        assert_eq!(AddressMode::WriteHigh.write_address(0x01), 0x81);
    }

    #[test]
    fn test_dummy_byte_only_when_requested() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x11]).respond(&[0x22]);

        block_on(async {
            let mut with_dummy = RegisterBus::new(&mut spi, AddressMode::ReadHigh, true);
            assert_eq!(with_dummy.read_register(0x00).await, Ok(0x11));
            let mut without = RegisterBus::new(with_dummy.release(), AddressMode::WriteHigh, false);
            assert_eq!(without.read_register(0x42).await, Ok(0x22));
        });

        assert_eq!(
            spi.transactions,
            vec![
                vec![Op::Write(vec![0x80, 0x00]), Op::Read(1)],
                vec![Op::Write(vec![0x42]), Op::Read(1)],
            ]
        );
    }
}
