use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiDevice;
use hal::{BaroReading, Barometer};
use thiserror::Error;

use crate::baro::calibration::{raw_sample, CalibrationCoefficients, CALIBRATION_LEN};
use crate::bus::{AddressMode, RegisterBus};

// Register addresses
pub const BMP388_REG_CHIP_ID: u8 = 0x00;
pub const BMP388_REG_STATUS: u8 = 0x03;
pub const BMP388_REG_DATA: u8 = 0x04;
pub const BMP388_REG_PWR_CTRL: u8 = 0x1B;
pub const BMP388_REG_CALIB_START: u8 = 0x31;
pub const BMP388_REG_CMD: u8 = 0x7E;

// Chip ID for verification
pub const BMP388_CHIP_ID: u8 = 0x50;

// Soft reset command
pub const BMP388_RESET_CMD: u8 = 0xB6;

// Pressure (bit 5) and temperature (bit 6) data ready
pub const BMP388_STATUS_DRDY: u8 = 0x60;

// PWR_CTRL fields
const PWR_PRESS_EN: u8 = 1 << 0;
const PWR_TEMP_EN: u8 = 1 << 1;
const PWR_MODE_SHIFT: u8 = 4;
const PWR_MODE_MASK: u8 = 0b11 << PWR_MODE_SHIFT;

// Pressure XLSB..MSB followed by temperature XLSB..MSB
const DATA_LEN: usize = 6;

/// Sensor power mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    Sleep,
    /// Single conversion, then back to sleep
    Forced,
    Normal,
}

impl PowerMode {
    const fn bits(self) -> u8 {
        match self {
            PowerMode::Sleep => 0b00,
            PowerMode::Forced => 0b01,
            PowerMode::Normal => 0b11,
        }
    }
}

/// Configuration for the BMP388 sensor
#[derive(Debug, Clone, Copy)]
pub struct Bmp388Config {
    /// Time spent in sleep mode before each forced conversion
    pub settle_delay: Duration,

    /// Upper bound on the data-ready wait
    ///
    /// `None` polls until the sensor answers, however long that takes.
    pub data_ready_timeout: Option<Duration>,

    /// Delay between two status register polls
    pub poll_interval: Duration,
}

impl Default for Bmp388Config {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(5),
            data_ready_timeout: Some(Duration::from_millis(100)),
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bmp388Error<E> {
    #[error("SPI bus error: {0:?}")]
    Bus(E),

    #[error("unexpected chip id {0:#04x}")]
    ChipId(u8),

    #[error("sensor did not report data ready in time")]
    NotResponding,

    #[error("calibration has not been loaded")]
    NotInitialized,
}

/// BMP388 barometer on a 4-wire SPI bus
pub struct Bmp388<S, D> {
    bus: RegisterBus<S>,
    delay: D,
    config: Bmp388Config,
    /// Loaded by `init`, `None` until then
    cal: Option<CalibrationCoefficients>,
}

impl<S: SpiDevice, D: DelayNs> Bmp388<S, D> {
    /// Create a new BMP388 driver with the default configuration
    pub fn new(spi: S, delay: D) -> Self {
        Self::new_with_config(spi, delay, Bmp388Config::default())
    }

    /// Create a new BMP388 driver with custom configuration
    pub fn new_with_config(spi: S, delay: D, config: Bmp388Config) -> Self {
        Self {
            // reads need a dummy byte between address and data on SPI
            bus: RegisterBus::new(spi, AddressMode::ReadHigh, true),
            delay,
            config,
            cal: None,
        }
    }

    async fn read_register(&mut self, reg: u8) -> Result<u8, Bmp388Error<S::Error>> {
        self.bus.read_register(reg).await.map_err(Bmp388Error::Bus)
    }

    async fn read_registers(&mut self, reg: u8, data: &mut [u8]) -> Result<(), Bmp388Error<S::Error>> {
        self.bus.read_registers(reg, data).await.map_err(Bmp388Error::Bus)
    }

    async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Bmp388Error<S::Error>> {
        self.bus.write_register(reg, value).await.map_err(Bmp388Error::Bus)
    }

    /// Read the chip ID
    pub async fn chip_id(&mut self) -> Result<u8, Bmp388Error<S::Error>> {
        self.read_register(BMP388_REG_CHIP_ID).await
    }

    /// Issue a soft reset
    pub async fn reset(&mut self) -> Result<(), Bmp388Error<S::Error>> {
        self.write_register(BMP388_REG_CMD, BMP388_RESET_CMD).await
    }

    /// Reset the sensor, check its identity and load calibration
    pub async fn init(&mut self) -> Result<(), Bmp388Error<S::Error>> {
        self.reset().await?;

        let chip_id = self.chip_id().await?;
        if chip_id != BMP388_CHIP_ID {
            log::error!("BMP388: unexpected chip id {:#04x}", chip_id);
            return Err(Bmp388Error::ChipId(chip_id));
        }

        self.load_calibration().await?;
        log::info!("BMP388 initialized");
        Ok(())
    }

    /// Read the calibration block and derive the compensation coefficients
    pub async fn load_calibration(&mut self) -> Result<CalibrationCoefficients, Bmp388Error<S::Error>> {
        let mut raw = [0u8; CALIBRATION_LEN];
        self.read_registers(BMP388_REG_CALIB_START, &mut raw).await?;

        let cal = CalibrationCoefficients::from_registers(&raw);
        log::debug!("BMP388 calibration: {:?}", cal);
        self.cal = Some(cal);

        Ok(cal)
    }

    /// Coefficients in use, if `init` has run
    pub fn calibration(&self) -> Option<&CalibrationCoefficients> {
        self.cal.as_ref()
    }

    /// Enable the pressure and temperature channels and select a power mode
    ///
    /// Channels passed as `false` are switched off.
    pub async fn enable_and_set_mode(
        &mut self,
        pressure: bool,
        temperature: bool,
        mode: PowerMode,
    ) -> Result<(), Bmp388Error<S::Error>> {
        let mut value = self.read_register(BMP388_REG_PWR_CTRL).await?;
        value &= !(PWR_PRESS_EN | PWR_TEMP_EN | PWR_MODE_MASK);

        if pressure {
            value |= PWR_PRESS_EN;
        }
        if temperature {
            value |= PWR_TEMP_EN;
        }
        value |= mode.bits() << PWR_MODE_SHIFT;

        self.write_register(BMP388_REG_PWR_CTRL, value).await
    }

    /// Poll the status register until both data-ready flags are set
    async fn wait_for_data(&mut self) -> Result<(), Bmp388Error<S::Error>> {
        let poll_us = self.config.poll_interval.as_micros();
        let mut waited_us: u64 = 0;

        loop {
            let status = self.read_register(BMP388_REG_STATUS).await?;
            if status & BMP388_STATUS_DRDY == BMP388_STATUS_DRDY {
                return Ok(());
            }

            if let Some(timeout) = self.config.data_ready_timeout {
                if waited_us >= timeout.as_micros() {
                    log::warn!("BMP388: no data after {} us", waited_us);
                    return Err(Bmp388Error::NotResponding);
                }
            }

            self.delay.delay_us(micros(self.config.poll_interval)).await;
            waited_us += poll_us.max(1);
        }
    }

    /// Take one forced-mode measurement
    pub async fn get_reading(&mut self) -> Result<BaroReading, Bmp388Error<S::Error>> {
        if self.cal.is_none() {
            return Err(Bmp388Error::NotInitialized);
        }

        self.enable_and_set_mode(false, false, PowerMode::Sleep).await?;
        self.delay.delay_us(micros(self.config.settle_delay)).await;
        self.enable_and_set_mode(true, true, PowerMode::Forced).await?;
        self.wait_for_data().await?;

        let mut data = [0u8; DATA_LEN];
        self.read_registers(BMP388_REG_DATA, &mut data).await?;
        let raw_pressure = raw_sample([data[0], data[1], data[2]]);
        let raw_temperature = raw_sample([data[3], data[4], data[5]]);

        let cal = self.cal.as_mut().ok_or(Bmp388Error::NotInitialized)?;
        // t_lin from this temperature feeds the pressure polynomial
        let temperature = cal.compensate_temperature(raw_temperature);
        let pressure = cal.compensate_pressure(raw_pressure);

        Ok(BaroReading {
            temperature,
            pressure,
        })
    }

    /// Give back the bus and delay
    pub fn release(self) -> (S, D) {
        (self.bus.release(), self.delay)
    }
}

fn micros(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}

impl<S: SpiDevice, D: DelayNs> Barometer for Bmp388<S, D> {
    type Error = Bmp388Error<S::Error>;

    async fn init(&mut self) -> Result<(), Self::Error> {
        Bmp388::init(self).await
    }

    async fn get_reading(&mut self) -> Result<BaroReading, Self::Error> {
        Bmp388::get_reading(self).await
    }
}
