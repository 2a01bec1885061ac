// 12-bit ADC referenced to 3.3 V, behind a 1:2 divider
const ADC_FULL_SCALE: f32 = 4096.0;
const ADC_REFERENCE_VOLTS: f32 = 3.3;
const DIVIDER_RATIO: f32 = 2.0;

/// Battery voltage for a raw ADC count
pub fn adc_to_volts(raw: u16) -> f32 {
    f32::from(raw) * DIVIDER_RATIO * ADC_REFERENCE_VOLTS / ADC_FULL_SCALE
}
