use num_traits::Float;

/// Size of the factory calibration block
pub const CALIBRATION_LEN: usize = 21;

/// BMP388 compensation coefficients
///
/// Derived once from the factory calibration registers, see section 9.1 of
/// the BMP388 datasheet for the scale of every field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationCoefficients {
    // Temperature compensation
    pub par_t1: f64,
    pub par_t2: f64,
    pub par_t3: f64,

    // Pressure compensation
    pub par_p1: f64,
    pub par_p2: f64,
    pub par_p3: f64,
    pub par_p4: f64,
    pub par_p5: f64,
    pub par_p6: f64,
    pub par_p7: f64,
    pub par_p8: f64,
    pub par_p9: f64,
    pub par_p10: f64,
    pub par_p11: f64,

    /// Linearised temperature written by the last temperature compensation
    pub t_lin: f64,
}

impl CalibrationCoefficients {
    /// Decode the calibration block read from register 0x31
    pub fn from_registers(raw: &[u8; CALIBRATION_LEN]) -> Self {
        let nvm_par_t1 = u16::from_le_bytes([raw[0], raw[1]]);
        let nvm_par_t2 = u16::from_le_bytes([raw[2], raw[3]]);
        let nvm_par_t3 = raw[4] as i8;
        let nvm_par_p1 = i16::from_le_bytes([raw[5], raw[6]]);
        let nvm_par_p2 = i16::from_le_bytes([raw[7], raw[8]]);
        let nvm_par_p3 = raw[9] as i8;
        let nvm_par_p4 = raw[10] as i8;
        let nvm_par_p5 = u16::from_le_bytes([raw[11], raw[12]]);
        let nvm_par_p6 = u16::from_le_bytes([raw[13], raw[14]]);
        let nvm_par_p7 = raw[15] as i8;
        let nvm_par_p8 = raw[16] as i8;
        let nvm_par_p9 = i16::from_le_bytes([raw[17], raw[18]]);
        let nvm_par_p10 = raw[19] as i8;
        let nvm_par_p11 = raw[20] as i8;

        Self {
            par_t1: f64::from(nvm_par_t1) / 0.00390625, // 2^-8
            par_t2: f64::from(nvm_par_t2) / 1073741824.0, // 2^30
            par_t3: f64::from(nvm_par_t3) / 281474976710656.0, // 2^48

            par_p1: f64::from(i32::from(nvm_par_p1) - 16384) / 1048576.0, // (p1 - 2^14) / 2^20
            par_p2: f64::from(i32::from(nvm_par_p2) - 16384) / 536870912.0, // (p2 - 2^14) / 2^29
            par_p3: f64::from(nvm_par_p3) / 4294967296.0, // 2^32
            par_p4: f64::from(nvm_par_p4) / 137438953472.0, // 2^37
            par_p5: f64::from(nvm_par_p5) / 0.125, // 2^-3
            par_p6: f64::from(nvm_par_p6) / 64.0, // 2^6
            par_p7: f64::from(nvm_par_p7) / 256.0, // 2^8
            par_p8: f64::from(nvm_par_p8) / 32768.0, // 2^15
            par_p9: f64::from(nvm_par_p9) / 281474976710656.0, // 2^48
            par_p10: f64::from(nvm_par_p10) / 281474976710656.0, // 2^48
            par_p11: f64::from(nvm_par_p11) / 36893488147419103232.0, // 2^65

            t_lin: 0.0,
        }
    }

    /// Compensated temperature in Celsius
    ///
    /// Also stores the result as `t_lin` for the pressure compensation.
    pub fn compensate_temperature(&mut self, raw_temperature: u32) -> f64 {
        let partial_data1 = f64::from(raw_temperature) - self.par_t1;
        let partial_data2 = partial_data1 * self.par_t2;

        let temperature = partial_data2 + (partial_data1 * partial_data1) * self.par_t3;
        self.t_lin = temperature;

        temperature
    }

    /// Compensated pressure in Pascals
    ///
    /// Must follow `compensate_temperature` for the same sample.
    pub fn compensate_pressure(&self, raw_pressure: u32) -> f64 {
        let t_lin = self.t_lin;
        let raw = f64::from(raw_pressure);

        let partial_out1 = self.par_p5
            + self.par_p6 * t_lin
            + self.par_p7 * Float::powi(t_lin, 2)
            + self.par_p8 * Float::powi(t_lin, 3);

        let partial_out2 = raw
            * (self.par_p1
                + self.par_p2 * t_lin
                + self.par_p3 * Float::powi(t_lin, 2)
                + self.par_p4 * Float::powi(t_lin, 3));

        let partial_data3 = Float::powi(raw, 2) * (self.par_p9 + self.par_p10 * t_lin);
        let partial_out3 = partial_data3 + Float::powi(raw, 3) * self.par_p11;

        partial_out1 + partial_out2 + partial_out3
    }
}

/// Assemble a 24-bit sample from its XLSB, LSB and MSB register bytes
pub fn raw_sample(bytes: [u8; 3]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0])
}
