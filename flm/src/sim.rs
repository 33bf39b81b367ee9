//! Simulation input injector.
//!
//! Plays the role of the outside world: publishes protected light-switch
//! frames on the bus latch, sweeps the ambient light level, and feeds back
//! a load current that follows the relay state. Everything is keyed off the
//! dispatcher tick so a run is fully reproducible.

use std::sync::Arc;

use flm_common::consts::{
    ADC_CHANNEL_AMBIENT, ADC_CHANNEL_CURRENT, E2E_COUNTER_OFFSET_BITS, E2E_CRC_OFFSET_BITS,
    E2E_MAX_DELTA_COUNTER, E2E_MAX_NO_NEW_DATA, HEADLIGHT_CURRENT_FACTOR, LIGHTSWITCH_CMD_BYTE,
    LIGHTSWITCH_DATA_ID, LIGHTSWITCH_FRAME_LEN,
};
use flm_control_unit::e2e::{E2eConfig, ProtectState};
use flm_hal::{FrameLatch, SimAdc};

/// Bus frame spacing [ms].
const FRAME_PERIOD_MS: u32 = 20;

/// Switch command dwell time before cycling to the next mode [ms].
const MODE_DWELL_MS: u32 = 5_000;

/// Ambient sweep step interval [ms].
const AMBIENT_STEP_MS: u32 = 100;

/// Ambient sweep step size [ADC counts], kept well under the rate limit.
const AMBIENT_STEP: u16 = 100;

/// Dark target of the ambient sweep.
const AMBIENT_DARK: u16 = 500;

/// Simulated load current when the lights are on [mA].
const LOAD_CURRENT_MA: u16 = 5_000;

/// Deterministic stimulus generator.
pub struct InputInjector {
    latch: Arc<FrameLatch>,
    adc: Arc<SimAdc>,
    e2e_config: E2eConfig,
    protect: ProtectState,
    ambient_level: u16,
    ambient_bright: u16,
    sweeping_dark: bool,
}

impl InputInjector {
    pub fn new(latch: Arc<FrameLatch>, adc: Arc<SimAdc>, ambient_adc: u16) -> Self {
        let e2e_config = E2eConfig::new(
            LIGHTSWITCH_DATA_ID,
            LIGHTSWITCH_FRAME_LEN,
            E2E_CRC_OFFSET_BITS,
            E2E_COUNTER_OFFSET_BITS,
            E2E_MAX_DELTA_COUNTER,
            E2E_MAX_NO_NEW_DATA,
        )
        .expect("light switch frame layout is validated at compile time");
        adc.set_value(ADC_CHANNEL_AMBIENT, ambient_adc);
        Self {
            latch,
            adc,
            e2e_config,
            protect: ProtectState::new(),
            ambient_level: ambient_adc,
            ambient_bright: ambient_adc,
            sweeping_dark: false,
        }
    }

    /// Inject stimuli for tick `now`. `lights_on` mirrors the relay state
    /// so the current feedback tracks the actual outputs.
    pub fn step(&mut self, now: u32, lights_on: bool) {
        if now % FRAME_PERIOD_MS == 0 {
            self.send_switch_frame(now);
        }
        if now % AMBIENT_STEP_MS == 0 {
            self.sweep_ambient(now);
        }
        let current = if lights_on { LOAD_CURRENT_MA } else { 0 };
        self.adc
            .set_value(ADC_CHANNEL_CURRENT, current / HEADLIGHT_CURRENT_FACTOR);
    }

    /// Cycle OFF → LOW → HIGH → AUTO, one mode per dwell interval.
    fn send_switch_frame(&mut self, now: u32) {
        let mode = ((now / MODE_DWELL_MS) % 4) as u8;
        let mut frame = [0u8; LIGHTSWITCH_FRAME_LEN];
        frame[LIGHTSWITCH_CMD_BYTE] = mode;
        self.protect.protect(&self.e2e_config, &mut frame);
        self.latch.publish(&frame);
    }

    /// Walk the ambient level between the configured bright level and the
    /// dark target, flipping direction every dwell interval. The step size
    /// stays inside the plausibility rate limit.
    fn sweep_ambient(&mut self, now: u32) {
        if now != 0 && now % MODE_DWELL_MS == 0 {
            self.sweeping_dark = !self.sweeping_dark;
        }
        let target = if self.sweeping_dark {
            AMBIENT_DARK
        } else {
            self.ambient_bright
        };
        self.ambient_level = if self.ambient_level > target {
            self.ambient_level.saturating_sub(AMBIENT_STEP).max(target)
        } else {
            (self.ambient_level + AMBIENT_STEP).min(target)
        };
        self.adc.set_value(ADC_CHANNEL_AMBIENT, self.ambient_level);
    }
}
