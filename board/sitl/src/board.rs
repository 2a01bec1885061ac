use driver::baro::Bmp388;
use driver::flash::W25q;
use driver::radio::{Rfm9x, Rfm9xConfig};
use telemetry::{Board, Resources};

use crate::sim::{SimBattery, SimBmp388, SimPin, SimRfm9x, SimW25q, StdDelay};

// Roughly 4.2 V through the divider
const BATTERY_RAW: u16 = 2606;

pub struct SitlBoard {
    radio_config: Rfm9xConfig,
}

impl SitlBoard {
    pub fn new() -> Self {
        SitlBoard {
            radio_config: Rfm9xConfig::default(),
        }
    }
}

impl Board for SitlBoard {
    type Radio = Rfm9x<SimRfm9x, SimPin, StdDelay>;
    type Baro = Bmp388<SimBmp388, StdDelay>;
    type Flash = W25q<SimW25q>;
    type Battery = SimBattery;
    type Led = SimPin;
    type Delay = StdDelay;

    fn name(&self) -> &str {
        "SITL"
    }

    fn split_resources(self) -> Resources<Self> {
        Resources {
            radio: Rfm9x::new_with_config(
                SimRfm9x::new(),
                SimPin::new("radio reset"),
                StdDelay,
                self.radio_config,
            ),
            baro: Bmp388::new(SimBmp388::new(), StdDelay),
            flash: W25q::new(SimW25q),
            battery: SimBattery { raw: BATTERY_RAW },
            activity_led: SimPin::new("LED2"),
            status_led: SimPin::new("LED1"),
            delay: StdDelay,
        }
    }
}
