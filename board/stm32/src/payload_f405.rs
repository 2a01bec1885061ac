use core::convert::Infallible;

use driver::baro::Bmp388;
use driver::flash::W25q;
use driver::radio::Rfm9x;
use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_stm32::adc::{Adc, AdcChannel, AnyAdcChannel};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::mode::Async;
use embassy_stm32::peripherals::ADC1;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::Peripherals;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use hal::BatteryMonitor;
use telemetry::{adc_to_volts, Board, Resources};

// SPI1 is shared by the barometer, the radio and the flash
pub type SpiBus = Mutex<NoopRawMutex, Spi<'static, Async>>;
pub type BusDevice<'a> = SpiDevice<'a, NoopRawMutex, Spi<'static, Async>, Output<'static>>;

/// Everything except the SPI bus itself
pub struct Pins {
    baro_cs: Output<'static>,
    radio_cs: Output<'static>,
    flash_cs: Output<'static>,
    radio_reset: Output<'static>,
    led1: Output<'static>,
    led2: Output<'static>,
    battery: AdcBattery,
}

/// Claim the peripherals used by the payload
pub fn split(p: Peripherals) -> (Spi<'static, Async>, Pins) {
    let mut config = spi::Config::default();
    config.frequency = Hertz(1_000_000);

    let spi = Spi::new(p.SPI1, p.PA5, p.PA7, p.PA6, p.DMA2_CH3, p.DMA2_CH0, config);

    let pins = Pins {
        // chip selects idle high
        baro_cs: Output::new(p.PA4, Level::High, Speed::VeryHigh),
        radio_cs: Output::new(p.PB0, Level::High, Speed::VeryHigh),
        flash_cs: Output::new(p.PB1, Level::High, Speed::VeryHigh),
        radio_reset: Output::new(p.PB2, Level::High, Speed::Low),
        led1: Output::new(p.PC13, Level::Low, Speed::Low),
        led2: Output::new(p.PC14, Level::Low, Speed::Low),
        battery: AdcBattery {
            adc: Adc::new(p.ADC1),
            channel: p.PC0.degrade_adc(),
        },
    };

    (spi, pins)
}

/// Battery sense divider on ADC1
pub struct AdcBattery {
    adc: Adc<'static, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl BatteryMonitor for AdcBattery {
    type Error = Infallible;

    async fn read_voltage(&mut self) -> Result<f32, Infallible> {
        // the first conversion after switching channel reads low
        self.adc.blocking_read(&mut self.channel);
        let raw = self.adc.blocking_read(&mut self.channel);
        Ok(adc_to_volts(raw))
    }
}

pub struct PayloadBoard<'a> {
    spi_bus: &'a SpiBus,
    pins: Pins,
}

impl<'a> PayloadBoard<'a> {
    pub fn new(spi_bus: &'a SpiBus, pins: Pins) -> Self {
        PayloadBoard { spi_bus, pins }
    }
}

impl<'a> Board for PayloadBoard<'a> {
    type Radio = Rfm9x<BusDevice<'a>, Output<'static>, Delay>;
    type Baro = Bmp388<BusDevice<'a>, Delay>;
    type Flash = W25q<BusDevice<'a>>;
    type Battery = AdcBattery;
    type Led = Output<'static>;
    type Delay = Delay;

    fn name(&self) -> &str {
        "Payload-F405"
    }

    fn split_resources(self) -> Resources<Self> {
        let pins = self.pins;
        defmt::info!("SPI1 shared by baro, radio and flash");

        Resources {
            radio: Rfm9x::new(
                SpiDevice::new(self.spi_bus, pins.radio_cs),
                pins.radio_reset,
                Delay,
            ),
            baro: Bmp388::new(SpiDevice::new(self.spi_bus, pins.baro_cs), Delay),
            flash: W25q::new(SpiDevice::new(self.spi_bus, pins.flash_cs)),
            battery: pins.battery,
            activity_led: pins.led2,
            status_led: pins.led1,
            delay: Delay,
        }
    }
}
