//! Register-level simulations of the payload peripherals.
//!
//! The real drivers run unchanged against these, so a host run exercises
//! the same bus traffic the board sees.

use std::convert::Infallible;

use driver::baro::bmp388::{
    BMP388_CHIP_ID, BMP388_REG_CALIB_START, BMP388_REG_CHIP_ID, BMP388_REG_CMD, BMP388_REG_DATA,
    BMP388_REG_PWR_CTRL, BMP388_REG_STATUS, BMP388_RESET_CMD, BMP388_STATUS_DRDY,
};
use driver::flash::w25q::{
    W25Q_CMD_JEDEC_ID, W25Q_CMD_MANUFACTURER_DEVICE_ID, W25Q_CMD_RELEASE_POWER_DOWN,
    W25Q_DEVICE_ID, W25Q_JEDEC_CAPACITY, W25Q_JEDEC_TYPE, W25Q_MANUFACTURER_ID,
};
use driver::radio::rfm9x::{
    RadioMode, RFM9X_REG_FIFO, RFM9X_REG_FIFO_ADDR_PTR, RFM9X_REG_OP_MODE,
    RFM9X_REG_PAYLOAD_LENGTH,
};
use driver::radio::HEADER_LEN;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{self, Operation, SpiDevice};
use hal::BatteryMonitor;
use telemetry::{adc_to_volts, Datapoint};

const RW_BIT: u8 = 0x80;

// Calibration block of a sensor on the bench
const BMP388_CALIBRATION: [u8; 21] = [
    0x6E, 0x6B, 0x1A, 0x4A, 0xF9, 0x52, 0x07, 0xAA, 0x0A, 0x23, 0x01, 0x18, 0x60, 0xA4, 0x74,
    0x03, 0xFA, 0xCC, 0x3E, 0x17, 0xC4,
];

// Ground level samples, about 23 C and 1017 hPa
const BMP388_RAW_PRESSURE: u32 = 7_520_000;
const BMP388_RAW_TEMPERATURE: u32 = 8_342_000;

// Per-sample change while climbing
const CLIMB_PRESSURE_STEP: u32 = 1_200;
const CLIMB_TEMPERATURE_STEP: u32 = 150;

// Samples per flight, after which the profile starts again from the ground
const CLIMB_PROFILE_LEN: u32 = 5_000;

// Forced mode, both channels
const PWR_MODE_MASK: u8 = 0x30;
const PWR_MODE_FORCED: u8 = 0x10;

fn first_write<'a>(operations: &'a [Operation<'_, u8>]) -> &'a [u8] {
    match operations.first() {
        Some(Operation::Write(bytes)) => *bytes,
        _ => &[],
    }
}

fn fill_reads(operations: &mut [Operation<'_, u8>], mut source: impl FnMut(usize) -> u8) {
    let mut offset = 0;
    for op in operations.iter_mut() {
        if let Operation::Read(buf) = op {
            for byte in buf.iter_mut() {
                *byte = source(offset);
                offset += 1;
            }
        }
    }
}

/// BMP388 that climbs a little with every forced conversion
pub struct SimBmp388 {
    registers: [u8; 128],
    samples: u32,
}

impl SimBmp388 {
    pub fn new() -> Self {
        let mut registers = [0u8; 128];
        registers[BMP388_REG_CHIP_ID as usize] = BMP388_CHIP_ID;
        let calib = BMP388_REG_CALIB_START as usize;
        registers[calib..calib + BMP388_CALIBRATION.len()].copy_from_slice(&BMP388_CALIBRATION);

        Self {
            registers,
            samples: 0,
        }
    }

    fn convert(&mut self) {
        let step = self.samples % CLIMB_PROFILE_LEN;
        let pressure = BMP388_RAW_PRESSURE - step * CLIMB_PRESSURE_STEP;
        let temperature = BMP388_RAW_TEMPERATURE - step * CLIMB_TEMPERATURE_STEP;
        self.samples = self.samples.wrapping_add(1);

        let data = BMP388_REG_DATA as usize;
        self.registers[data..data + 3].copy_from_slice(&pressure.to_le_bytes()[..3]);
        self.registers[data + 3..data + 6].copy_from_slice(&temperature.to_le_bytes()[..3]);
        self.registers[BMP388_REG_STATUS as usize] = BMP388_STATUS_DRDY | 0x10;
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            BMP388_REG_CMD if value == BMP388_RESET_CMD => {
                self.registers[BMP388_REG_PWR_CTRL as usize] = 0;
                self.registers[BMP388_REG_STATUS as usize] = 0x10;
            }
            BMP388_REG_PWR_CTRL => {
                self.registers[reg as usize] = value;
                if value & PWR_MODE_MASK == PWR_MODE_FORCED {
                    self.convert();
                } else {
                    self.registers[BMP388_REG_STATUS as usize] = 0x10;
                }
            }
            _ => self.registers[(reg & 0x7F) as usize] = value,
        }
    }
}

impl spi::ErrorType for SimBmp388 {
    type Error = Infallible;
}

impl SpiDevice for SimBmp388 {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let header = first_write(operations).to_vec();
        let Some(&address) = header.first() else {
            return Ok(());
        };

        if address & RW_BIT != 0 {
            // address and dummy byte, then auto-incrementing data
            let reg = (address & !RW_BIT) as usize;
            let registers = self.registers;
            fill_reads(operations, |offset| registers[(reg + offset) % registers.len()]);
        } else if let Some(&value) = header.get(1) {
            self.write(address, value);
        }
        Ok(())
    }
}

/// RFM9x that decodes every transmitted frame instead of putting it on air
pub struct SimRfm9x {
    registers: [u8; 128],
    fifo: [u8; 256],
    fifo_ptr: u8,
    pub received: Vec<Datapoint>,
}

impl SimRfm9x {
    pub fn new() -> Self {
        Self {
            registers: [0u8; 128],
            fifo: [0u8; 256],
            fifo_ptr: 0,
            received: Vec::new(),
        }
    }

    fn transmit(&mut self) {
        let len = usize::from(self.registers[RFM9X_REG_PAYLOAD_LENGTH as usize]);
        let frame = &self.fifo[..len];
        if len < HEADER_LEN {
            log::warn!("Radio: {} byte frame has no header", len);
            return;
        }

        match Datapoint::decode(&frame[HEADER_LEN..]) {
            Ok(datapoint) => {
                log::info!(
                    "Radio: packet {} from device {}: {:.2} C, {:.1} Pa, {:.2} V",
                    datapoint.packet_number,
                    datapoint.device_id,
                    datapoint.temperature,
                    datapoint.pressure,
                    datapoint.battery_voltage
                );
                self.received.push(datapoint);
            }
            Err(e) => log::warn!("Radio: undecodable frame: {}", e),
        }

        // back to standby once the packet is out
        self.registers[RFM9X_REG_OP_MODE as usize] = RadioMode::Standby.bits();
    }

    fn write(&mut self, reg: u8, value: u8) {
        match reg {
            RFM9X_REG_FIFO => {
                self.fifo[usize::from(self.fifo_ptr)] = value;
                self.fifo_ptr = self.fifo_ptr.wrapping_add(1);
            }
            RFM9X_REG_FIFO_ADDR_PTR => self.fifo_ptr = value,
            RFM9X_REG_OP_MODE => {
                self.registers[reg as usize] = value;
                if value & 0x07 == RadioMode::Transmit.bits() {
                    self.transmit();
                }
            }
            _ => self.registers[reg as usize] = value,
        }
    }
}

impl spi::ErrorType for SimRfm9x {
    type Error = Infallible;
}

impl SpiDevice for SimRfm9x {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let header = first_write(operations).to_vec();
        let Some(&address) = header.first() else {
            return Ok(());
        };

        let reg = address & !RW_BIT;
        if address & RW_BIT != 0 {
            if let Some(&value) = header.get(1) {
                self.write(reg, value);
            }
        } else {
            let value = self.registers[reg as usize];
            fill_reads(operations, |_| value);
        }
        Ok(())
    }
}

/// W25Q128 answering the identification commands
pub struct SimW25q;

impl spi::ErrorType for SimW25q {
    type Error = Infallible;
}

impl SpiDevice for SimW25q {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        let response: &[u8] = match first_write(operations).first().copied() {
            Some(W25Q_CMD_RELEASE_POWER_DOWN) => &[W25Q_DEVICE_ID],
            Some(W25Q_CMD_MANUFACTURER_DEVICE_ID) => &[0x00, W25Q_DEVICE_ID, W25Q_MANUFACTURER_ID],
            Some(W25Q_CMD_JEDEC_ID) => &[W25Q_MANUFACTURER_ID, W25Q_JEDEC_TYPE, W25Q_JEDEC_CAPACITY],
            _ => &[],
        };
        fill_reads(operations, |offset| response.get(offset).copied().unwrap_or(0xFF));
        Ok(())
    }
}

/// Battery holding a constant ADC count
pub struct SimBattery {
    pub raw: u16,
}

impl BatteryMonitor for SimBattery {
    type Error = Infallible;

    async fn read_voltage(&mut self) -> Result<f32, Infallible> {
        Ok(adc_to_volts(self.raw))
    }
}

/// GPIO line that only remembers its level
#[derive(Default)]
pub struct SimPin {
    high: bool,
    name: &'static str,
}

impl SimPin {
    pub fn new(name: &'static str) -> Self {
        Self { high: false, name }
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        log::trace!("{}: low", self.name);
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        log::trace!("{}: high", self.name);
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high)
    }
}

/// Blocking delay on the host clock
#[derive(Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }
}
