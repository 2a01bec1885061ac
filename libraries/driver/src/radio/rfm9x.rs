use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiDevice;
use hal::PacketRadio;
use num_traits::Float;
use thiserror::Error;

use crate::bus::{AddressMode, RegisterBus};
use crate::radio::frame::{PacketFrame, PacketHeader};

// Register addresses
pub const RFM9X_REG_FIFO: u8 = 0x00;
pub const RFM9X_REG_OP_MODE: u8 = 0x01;
pub const RFM9X_REG_FRF_MSB: u8 = 0x06;
pub const RFM9X_REG_FRF_MID: u8 = 0x07;
pub const RFM9X_REG_FRF_LSB: u8 = 0x08;
pub const RFM9X_REG_PA_CONFIG: u8 = 0x09;
pub const RFM9X_REG_FIFO_ADDR_PTR: u8 = 0x0D;
pub const RFM9X_REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;
pub const RFM9X_REG_MODEM_CONFIG1: u8 = 0x1D;
pub const RFM9X_REG_MODEM_CONFIG2: u8 = 0x1E;
pub const RFM9X_REG_PREAMBLE_MSB: u8 = 0x20;
pub const RFM9X_REG_PREAMBLE_LSB: u8 = 0x21;
pub const RFM9X_REG_PAYLOAD_LENGTH: u8 = 0x22;
pub const RFM9X_REG_MODEM_CONFIG3: u8 = 0x26;
pub const RFM9X_REG_PA_DAC: u8 = 0x4D;

// OP_MODE values
pub const RFM9X_MODE_LONG_RANGE: u8 = 0x80;

// 125 kHz bandwidth, coding rate 4/5, explicit header
const MODEM_CONFIG1: u8 = 0x72;
// spreading factor 7, payload CRC on
const MODEM_CONFIG2: u8 = 0x74;
// AGC auto on
const MODEM_CONFIG3: u8 = 0x04;

const PREAMBLE_LEN: u16 = 8;

// PA_BOOST output
const PA_SELECT: u8 = 0x80;
pub const RFM9X_MIN_POWER: u8 = 5;
pub const RFM9X_MAX_POWER: u8 = 20;

// Synthesizer: 32 MHz crystal over 2^19
const FXOSC_HZ: f64 = 32_000_000.0;
const FSTEP_HZ: f64 = FXOSC_HZ / 524_288.0;

// FRF is three registers wide
const FRF_MAX: u32 = 0x00FF_FFFF;

/// Operating modes written to OP_MODE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Sleep,
    Standby,
    Transmit,
}

impl RadioMode {
    pub const fn bits(self) -> u8 {
        match self {
            RadioMode::Sleep => 0x00,
            RadioMode::Standby => 0x01,
            RadioMode::Transmit => 0x03,
        }
    }
}

/// Frequency word for a carrier in MHz
pub fn frequency_word(frequency_mhz: f64) -> u32 {
    Float::round(frequency_mhz * 1_000_000.0 / FSTEP_HZ) as u32
}

/// Configuration for the RFM9x radio
#[derive(Debug, Clone, Copy)]
pub struct Rfm9xConfig {
    /// Carrier frequency in MHz
    pub frequency_mhz: f64,

    /// Output power level, 5..=20
    pub tx_power: u8,

    /// Header put in front of every payload
    pub header: PacketHeader,

    /// Length of each phase of the reset pulse
    pub reset_pulse: Duration,
}

impl Default for Rfm9xConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: 915.0,
            tx_power: 13,
            header: PacketHeader::default(),
            reset_pulse: Duration::from_millis(10),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rfm9xError<E, P> {
    #[error("SPI bus error: {0:?}")]
    Bus(E),

    #[error("reset pin error: {0:?}")]
    Pin(P),

    #[error("radio reported mode {actual:#04x} after {expected:#04x} was written")]
    ModeMismatch { expected: u8, actual: u8 },

    #[error("frequency word {0:#x} does not fit in 24 bits")]
    InvalidFrequency(u32),

    #[error("power level {0} outside 5..=20")]
    InvalidPowerLevel(u8),

    #[error("payload of {0} bytes does not fit in one packet")]
    PayloadTooLarge(usize),
}

/// RFM95/96/97/98 LoRa transceiver
pub struct Rfm9x<S, P, D> {
    bus: RegisterBus<S>,
    reset: P,
    delay: D,
    config: Rfm9xConfig,
}

impl<S: SpiDevice, P: OutputPin, D: DelayNs> Rfm9x<S, P, D> {
    /// Create a new RFM9x driver with the default configuration
    pub fn new(spi: S, reset: P, delay: D) -> Self {
        Self::new_with_config(spi, reset, delay, Rfm9xConfig::default())
    }

    /// Create a new RFM9x driver with custom configuration
    pub fn new_with_config(spi: S, reset: P, delay: D, config: Rfm9xConfig) -> Self {
        Self {
            bus: RegisterBus::new(spi, AddressMode::WriteHigh, false),
            reset,
            delay,
            config,
        }
    }

    async fn read_register(&mut self, reg: u8) -> Result<u8, Rfm9xError<S::Error, P::Error>> {
        self.bus.read_register(reg).await.map_err(Rfm9xError::Bus)
    }

    async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        self.bus.write_register(reg, value).await.map_err(Rfm9xError::Bus)
    }

    /// Pulse the hardware reset line
    pub async fn reset(&mut self) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        let pulse = u32::try_from(self.config.reset_pulse.as_micros()).unwrap_or(u32::MAX);

        self.reset.set_low().map_err(Rfm9xError::Pin)?;
        self.delay.delay_us(pulse).await;
        self.reset.set_high().map_err(Rfm9xError::Pin)?;
        self.delay.delay_us(pulse).await;

        Ok(())
    }

    /// Reset the radio and apply the LoRa modem configuration
    pub async fn init(&mut self) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        self.reset().await?;

        // LoRa mode can only be selected while asleep
        let expected = RadioMode::Sleep.bits() | RFM9X_MODE_LONG_RANGE;
        self.write_register(RFM9X_REG_OP_MODE, expected).await?;
        let actual = self.mode().await?;
        if actual != expected {
            log::error!("RFM9x: mode readback {:#04x}, expected {:#04x}", actual, expected);
            return Err(Rfm9xError::ModeMismatch { expected, actual });
        }

        self.write_register(RFM9X_REG_FIFO_TX_BASE_ADDR, 0).await?;
        self.set_mode(RadioMode::Standby).await?;

        self.write_register(RFM9X_REG_MODEM_CONFIG1, MODEM_CONFIG1).await?;
        self.write_register(RFM9X_REG_MODEM_CONFIG2, MODEM_CONFIG2).await?;
        self.write_register(RFM9X_REG_MODEM_CONFIG3, MODEM_CONFIG3).await?;

        self.set_preamble_length(PREAMBLE_LEN).await?;
        self.set_frequency(self.config.frequency_mhz).await?;
        self.set_power(self.config.tx_power).await?;

        log::info!(
            "RFM9x initialized at {} MHz, power {}",
            self.config.frequency_mhz,
            self.config.tx_power
        );
        Ok(())
    }

    /// Current OP_MODE register value
    pub async fn mode(&mut self) -> Result<u8, Rfm9xError<S::Error, P::Error>> {
        self.read_register(RFM9X_REG_OP_MODE).await
    }

    pub async fn set_mode(&mut self, mode: RadioMode) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        log::trace!("RFM9x: mode {:?}", mode);
        self.write_register(RFM9X_REG_OP_MODE, mode.bits()).await
    }

    /// Preamble length in symbols
    pub async fn set_preamble_length(&mut self, symbols: u16) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        let [msb, lsb] = symbols.to_be_bytes();
        self.write_register(RFM9X_REG_PREAMBLE_MSB, msb).await?;
        self.write_register(RFM9X_REG_PREAMBLE_LSB, lsb).await
    }

    /// Tune the carrier to `frequency_mhz`
    pub async fn set_frequency(&mut self, frequency_mhz: f64) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        let frf = frequency_word(frequency_mhz);
        if frf > FRF_MAX {
            return Err(Rfm9xError::InvalidFrequency(frf));
        }

        let [_, msb, mid, lsb] = frf.to_be_bytes();
        self.write_register(RFM9X_REG_FRF_MSB, msb).await?;
        self.write_register(RFM9X_REG_FRF_MID, mid).await?;
        self.write_register(RFM9X_REG_FRF_LSB, lsb).await
    }

    /// Set the PA_BOOST output level, 5..=20
    pub async fn set_power(&mut self, level: u8) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        if !(RFM9X_MIN_POWER..=RFM9X_MAX_POWER).contains(&level) {
            return Err(Rfm9xError::InvalidPowerLevel(level));
        }
        self.write_register(RFM9X_REG_PA_CONFIG, PA_SELECT | (level - 2)).await
    }

    /// Stage `payload` behind the configured header and start transmitting
    ///
    /// Does not wait for TxDone; a send issued before the previous packet
    /// has left the air cuts it short.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), Rfm9xError<S::Error, P::Error>> {
        let frame = PacketFrame::new(self.config.header, payload)
            .ok_or(Rfm9xError::PayloadTooLarge(payload.len()))?;

        self.set_mode(RadioMode::Standby).await?;
        self.write_register(RFM9X_REG_FIFO_ADDR_PTR, 0).await?;

        // one transaction per byte
        for &byte in frame.as_bytes() {
            self.write_register(RFM9X_REG_FIFO, byte).await?;
        }

        self.write_register(RFM9X_REG_PAYLOAD_LENGTH, frame.length()).await?;
        self.set_mode(RadioMode::Transmit).await?;

        log::debug!("RFM9x: sent {} byte frame", frame.length());
        Ok(())
    }

    /// Give back the bus, reset pin and delay
    pub fn release(self) -> (S, P, D) {
        (self.bus.release(), self.reset, self.delay)
    }
}

impl<S: SpiDevice, P: OutputPin, D: DelayNs> PacketRadio for Rfm9x<S, P, D> {
    type Error = Rfm9xError<S::Error, P::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        Rfm9x::init(self).await
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        Rfm9x::send(self, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockPin, MockSpi, Op};
    use embassy_futures::block_on;

    fn radio<'a>(
        spi: &'a mut MockSpi,
        pin: &'a mut MockPin,
        delay: &'a mut MockDelay,
    ) -> Rfm9x<&'a mut MockSpi, &'a mut MockPin, &'a mut MockDelay> {
        Rfm9x::new(spi, pin, delay)
    }

    #[test]
    fn test_frequency_word() {
        assert_eq!(frequency_word(915.0), 0xE4C000);
        assert_eq!(frequency_word(915.1), 0xE4C666);
        assert_eq!(frequency_word(868.0), 0xD90000);
        assert_eq!(frequency_word(433.0), 0x6C4000);
        assert_eq!(frequency_word(433.92), 0x6C7AE1);
        assert_eq!(frequency_word(902.3), 0xE19333);
    }

    #[test]
    fn test_init_sequence() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x80]);
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        block_on(radio(&mut spi, &mut pin, &mut delay).init()).expect("init should succeed");

        assert_eq!(pin.levels, vec![false, true]);
        assert_eq!(delay.elapsed_ms(), 20);
        assert_eq!(spi.read_addresses(), vec![0x01]);
        assert_eq!(spi.transactions[1], vec![Op::Write(vec![0x01]), Op::Read(1)]);
        assert_eq!(
            spi.register_writes(),
            vec![
                vec![0x81, 0x80],
                vec![0x8E, 0x00],
                vec![0x81, 0x01],
                vec![0x9D, 0x72],
                vec![0x9E, 0x74],
                vec![0xA6, 0x04],
                vec![0xA0, 0x00],
                vec![0xA1, 0x08],
                vec![0x86, 0xE4],
                vec![0x87, 0xC0],
                vec![0x88, 0x00],
                vec![0x89, 0x8B],
            ]
        );
    }

    #[test]
    fn test_init_fails_on_mode_mismatch() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x00]);
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        let result = block_on(radio(&mut spi, &mut pin, &mut delay).init());
        assert_eq!(
            result,
            Err(Rfm9xError::ModeMismatch {
                expected: 0x80,
                actual: 0x00
            })
        );
        // nothing configured after the failed readback
        assert_eq!(spi.register_writes(), vec![vec![0x81, 0x80]]);
    }

    #[test]
    fn test_init_rejects_power_level() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x80]);
        let config = Rfm9xConfig {
            tx_power: 21,
            ..Default::default()
        };

        let mut rfm = Rfm9x::new_with_config(&mut spi, MockPin::default(), MockDelay::default(), config);
        assert_eq!(block_on(rfm.init()), Err(Rfm9xError::InvalidPowerLevel(21)));
        drop(rfm);

        assert!(spi.register_writes().iter().all(|w| w[0] != 0x89));
    }

    #[test]
    fn test_set_power() {
        let mut spi = MockSpi::new();
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();
        let mut rfm = radio(&mut spi, &mut pin, &mut delay);

        block_on(async {
            assert_eq!(rfm.set_power(20).await, Ok(()));
            assert_eq!(rfm.set_power(5).await, Ok(()));
            assert_eq!(rfm.set_power(4).await, Err(Rfm9xError::InvalidPowerLevel(4)));
            assert_eq!(rfm.set_power(21).await, Err(Rfm9xError::InvalidPowerLevel(21)));
        });
        drop(rfm);

        assert_eq!(spi.register_writes(), vec![vec![0x89, 0x92], vec![0x89, 0x83]]);
    }

    #[test]
    fn test_set_frequency() {
        let mut spi = MockSpi::new();
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        block_on(radio(&mut spi, &mut pin, &mut delay).set_frequency(433.92)).unwrap();

        assert_eq!(
            spi.register_writes(),
            vec![vec![0x86, 0x6C], vec![0x87, 0x7A], vec![0x88, 0xE1]]
        );
    }

    #[test]
    fn test_set_frequency_rejects_words_above_24_bits() {
        let mut spi = MockSpi::new();
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();
        let mut rfm = radio(&mut spi, &mut pin, &mut delay);

        block_on(async {
            // 1023.99 MHz is the last carrier the synthesizer can reach
            assert_eq!(rfm.set_frequency(1023.99).await, Ok(()));
            assert_eq!(
                rfm.set_frequency(1100.0).await,
                Err(Rfm9xError::InvalidFrequency(frequency_word(1100.0)))
            );
        });
        drop(rfm);

        assert_eq!(spi.register_writes().len(), 3);
    }

    #[test]
    fn test_init_rejects_frequency() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x80]);
        let config = Rfm9xConfig {
            frequency_mhz: 2400.0,
            ..Default::default()
        };

        let mut rfm = Rfm9x::new_with_config(&mut spi, MockPin::default(), MockDelay::default(), config);
        assert!(matches!(block_on(rfm.init()), Err(Rfm9xError::InvalidFrequency(_))));
        drop(rfm);

        assert!(spi.register_writes().iter().all(|w| w[0] != 0x86));
    }

    #[test]
    fn test_send() {
        let mut spi = MockSpi::new();
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        block_on(radio(&mut spi, &mut pin, &mut delay).send(&[0xAA, 0xBB])).unwrap();

        assert!(spi.read_addresses().is_empty());
        assert_eq!(
            spi.register_writes(),
            vec![
                vec![0x81, 0x01],
                vec![0x8D, 0x00],
                vec![0x80, 0xFF],
                vec![0x80, 0xFF],
                vec![0x80, 0x00],
                vec![0x80, 0x00],
                vec![0x80, 0xAA],
                vec![0x80, 0xBB],
                vec![0xA2, 0x06],
                vec![0x81, 0x03],
            ]
        );
    }

    #[test]
    fn test_send_custom_header() {
        let mut spi = MockSpi::new();
        let config = Rfm9xConfig {
            header: PacketHeader {
                to: 0x02,
                from: 0x01,
                id: 0x07,
                flags: 0x00,
            },
            ..Default::default()
        };

        let mut rfm = Rfm9x::new_with_config(&mut spi, MockPin::default(), MockDelay::default(), config);
        block_on(rfm.send(&[])).unwrap();
        drop(rfm);

        let fifo: Vec<u8> = spi
            .register_writes()
            .iter()
            .filter(|w| w[0] == 0x80)
            .map(|w| w[1])
            .collect();
        assert_eq!(fifo, vec![0x02, 0x01, 0x07, 0x00]);
        assert!(spi.register_writes().contains(&vec![0xA2, 0x04]));
    }

    #[test]
    fn test_send_rejects_oversized_payload() {
        let mut spi = MockSpi::new();
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        let result = block_on(radio(&mut spi, &mut pin, &mut delay).send(&[0u8; 252]));
        assert_eq!(result, Err(Rfm9xError::PayloadTooLarge(252)));
        assert!(spi.transactions.is_empty());
    }

    #[test]
    fn test_write_bit_polarity() {
        let mut spi = MockSpi::new();
        spi.respond(&[0x80]);
        let mut pin = MockPin::default();
        let mut delay = MockDelay::default();

        block_on(async {
            let mut rfm = radio(&mut spi, &mut pin, &mut delay);
            rfm.init().await?;
            rfm.send(&[1, 2, 3]).await
        })
        .unwrap();

        assert!(spi.register_writes().iter().all(|w| w[0] & 0x80 != 0));
        assert!(spi.read_addresses().iter().all(|addr| addr & 0x80 == 0));
    }
}
