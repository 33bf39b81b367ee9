//! Simulated DIO and ADC banks.

use std::sync::Mutex;

use flm_common::consts::ADC_MAX_VALUE;
use flm_common::hal::{AnalogInput, DigitalOutput, PortError};
use tracing::trace;

/// Number of digital output channels in the simulated bank.
pub const SIM_DIO_CHANNELS: usize = 4;

/// Number of analog input channels in the simulated bank.
pub const SIM_ADC_CHANNELS: usize = 4;

/// Simulated digital output bank.
///
/// Writes latch the commanded level; tests read them back through
/// [`DigitalOutput::read_back`] or [`SimDio::snapshot`].
#[derive(Debug, Default)]
pub struct SimDio {
    levels: Mutex<[bool; SIM_DIO_CHANNELS]>,
}

impl SimDio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all channel levels, for assertions.
    pub fn snapshot(&self) -> [bool; SIM_DIO_CHANNELS] {
        *self.levels.lock().expect("dio lock poisoned")
    }
}

impl DigitalOutput for SimDio {
    fn write(&self, channel: u8, level: bool) -> Result<(), PortError> {
        let mut levels = self.levels.lock().expect("dio lock poisoned");
        let slot = levels
            .get_mut(channel as usize)
            .ok_or(PortError::ChannelOutOfRange(channel))?;
        if *slot != level {
            trace!(channel, level, "dio transition");
        }
        *slot = level;
        Ok(())
    }

    fn read_back(&self, channel: u8) -> Result<bool, PortError> {
        let levels = self.levels.lock().expect("dio lock poisoned");
        levels
            .get(channel as usize)
            .copied()
            .ok_or(PortError::ChannelOutOfRange(channel))
    }
}

/// Simulated 12-bit ADC with injectable channel values.
///
/// Conversions are instantaneous: `read` returns whatever was last injected,
/// clamped to the 12-bit range.
#[derive(Debug, Default)]
pub struct SimAdc {
    values: Mutex<[u16; SIM_ADC_CHANNELS]>,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw value on `channel`. Values above 4095 saturate.
    pub fn set_value(&self, channel: u8, value: u16) {
        let mut values = self.values.lock().expect("adc lock poisoned");
        if let Some(slot) = values.get_mut(channel as usize) {
            *slot = value.min(ADC_MAX_VALUE);
        }
    }
}

impl AnalogInput for SimAdc {
    fn read(&self, channel: u8) -> Result<u16, PortError> {
        let values = self.values.lock().expect("adc lock poisoned");
        values
            .get(channel as usize)
            .copied()
            .ok_or(PortError::ChannelOutOfRange(channel))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dio_write_and_read_back() {
        let dio = SimDio::new();
        assert_eq!(dio.read_back(0), Ok(false));

        dio.write(0, true).unwrap();
        dio.write(1, true).unwrap();
        assert_eq!(dio.read_back(0), Ok(true));
        assert_eq!(dio.read_back(1), Ok(true));

        dio.write(0, false).unwrap();
        assert_eq!(dio.snapshot(), [false, true, false, false]);
    }

    #[test]
    fn dio_rejects_out_of_range_channel() {
        let dio = SimDio::new();
        assert_eq!(
            dio.write(SIM_DIO_CHANNELS as u8, true),
            Err(PortError::ChannelOutOfRange(SIM_DIO_CHANNELS as u8))
        );
        assert_eq!(
            dio.read_back(99),
            Err(PortError::ChannelOutOfRange(99))
        );
    }

    #[test]
    fn adc_injection_and_read() {
        let adc = SimAdc::new();
        assert_eq!(adc.read(0), Ok(0));

        adc.set_value(0, 2000);
        adc.set_value(1, 555);
        assert_eq!(adc.read(0), Ok(2000));
        assert_eq!(adc.read(1), Ok(555));
    }

    #[test]
    fn adc_saturates_at_12_bit() {
        let adc = SimAdc::new();
        adc.set_value(0, 60_000);
        assert_eq!(adc.read(0), Ok(ADC_MAX_VALUE));
    }

    #[test]
    fn adc_rejects_out_of_range_channel() {
        let adc = SimAdc::new();
        assert_eq!(
            adc.read(SIM_ADC_CHANNELS as u8),
            Err(PortError::ChannelOutOfRange(SIM_ADC_CHANNELS as u8))
        );
    }
}
