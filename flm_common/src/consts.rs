//! System-wide configuration constants.
//!
//! Single source of truth for all timing thresholds, sensor limits and
//! protection parameters. Every relation the safety concept relies on is
//! pinned with a compile-time assertion at the bottom of this file.

use static_assertions::const_assert;

// ─── Task Scheduling ────────────────────────────────────────────────

/// Scheduler tick period [ms].
pub const TICK_MS: u32 = 1;

/// Main period of the switch / decision / actuator tasks [ms].
pub const MAIN_PERIOD_MS: u32 = 10;

/// Ambient light sensor task period [ms].
pub const AMBIENT_PERIOD_MS: u32 = 20;

/// Safety monitor task period [ms].
pub const SAFETY_PERIOD_MS: u32 = 5;

// ─── Timing Thresholds ──────────────────────────────────────────────

/// Bus message timeout [ms].
pub const CAN_TIMEOUT_MS: u32 = 50;

/// E2E protection timeout [ms].
pub const E2E_TIMEOUT_MS: u32 = 100;

/// Fault Tolerant Time Interval [ms].
pub const FTTI_MS: u32 = 200;

/// Safe state transition time [ms].
pub const SAFE_STATE_TRANSITION_MS: u32 = 100;

// ─── Ambient Light Sensor ───────────────────────────────────────────

/// ADC threshold below which the lights turn ON in AUTO mode.
pub const AMBIENT_THRESHOLD_ON: u16 = 800;

/// ADC threshold above which the lights turn OFF in AUTO mode (hysteresis).
pub const AMBIENT_THRESHOLD_OFF: u16 = 1000;

/// Maximum filtered ADC change per 100 ms before a plausibility error.
pub const AMBIENT_RATE_LIMIT: u16 = 500;

/// Filtered ADC below this value indicates an open circuit.
pub const AMBIENT_OPEN_CIRCUIT: u16 = 100;

/// Filtered ADC above this value indicates a short circuit.
pub const AMBIENT_SHORT_CIRCUIT: u16 = 3995;

/// Number of samples in the averaging window.
pub const ADC_SAMPLES: usize = 4;

/// ADC resolution [bits].
pub const ADC_RESOLUTION: u32 = 12;

/// Maximum raw ADC value.
pub const ADC_MAX_VALUE: u16 = ((1u32 << ADC_RESOLUTION) - 1) as u16;

/// Ambient ADC above this value counts as daylight.
pub const DAY_THRESHOLD: u16 = 1500;

// ─── Headlight Output Stage ─────────────────────────────────────────

/// Settling time after a command change before fault detection [ms].
pub const HEADLIGHT_FAULT_DETECT_MS: u32 = 20;

/// Minimum feedback current for ON detection [mA].
pub const HEADLIGHT_MIN_CURRENT_MA: u16 = 100;

/// Over-current threshold [mA].
pub const HEADLIGHT_MAX_CURRENT_MA: u16 = 15_000;

/// Open-load current threshold [mA].
pub const HEADLIGHT_OPEN_LOAD_MA: u16 = 50;

/// Current-sense conversion factor [mA per ADC count].
pub const HEADLIGHT_CURRENT_FACTOR: u16 = 10;

/// Consecutive detection cycles before an actuator fault is confirmed.
pub const HEADLIGHT_FAULT_CONFIRM_CYCLES: u8 = 2;

// ─── E2E Protection (light switch frame) ────────────────────────────

/// Frame length of the light switch message [bytes].
pub const LIGHTSWITCH_FRAME_LEN: usize = 4;

/// Data ID of the light switch frame class.
pub const LIGHTSWITCH_DATA_ID: u16 = 0x0100;

/// Byte carrying the switch command within the frame.
pub const LIGHTSWITCH_CMD_BYTE: usize = 2;

/// Maximum tolerated counter jump.
pub const E2E_MAX_DELTA_COUNTER: u8 = 2;

/// Maximum check cycles without new data before NO_NEW_DATA.
pub const E2E_MAX_NO_NEW_DATA: u16 = 5;

/// Counter position within the frame [bits].
pub const E2E_COUNTER_OFFSET_BITS: u16 = 8;

/// CRC position within the frame [bits].
pub const E2E_CRC_OFFSET_BITS: u16 = 0;

/// E2E health: minimum OK-ish verdicts for INIT → VALID.
pub const E2E_MIN_OK_INIT: u8 = 2;

/// E2E health: maximum error verdicts for INIT → INVALID.
pub const E2E_MAX_ERR_INIT: u8 = 2;

/// E2E health: maximum error verdicts for VALID → INVALID.
pub const E2E_MAX_ERR_VALID: u8 = 2;

/// E2E health: minimum OK-ish verdicts for INVALID → VALID.
pub const E2E_MIN_OK_INVALID: u8 = 3;

/// Consecutive E2E errors on fresh frames before the failure flag latches.
pub const E2E_MAX_CONSECUTIVE_ERRORS: u8 = 5;

// ─── Error Handling ─────────────────────────────────────────────────

/// Consecutive invalid-input cycles before NORMAL degrades.
pub const MAX_CONSECUTIVE_ERRORS: u8 = 3;

/// Simultaneous component faults that force the safe state.
pub const SAFETY_MAX_FAULTS: u8 = 3;

// ─── I/O Channels ───────────────────────────────────────────────────

/// Digital output channel of the low beam relay.
pub const DIO_CHANNEL_LOW_BEAM: u8 = 0;

/// Digital output channel of the high beam relay.
pub const DIO_CHANNEL_HIGH_BEAM: u8 = 1;

/// Analog input channel of the ambient light sensor.
pub const ADC_CHANNEL_AMBIENT: u8 = 0;

/// Analog input channel of the headlight current sense.
pub const ADC_CHANNEL_CURRENT: u8 = 1;

// ─── Program-Flow Supervision ───────────────────────────────────────

/// Alive supervision reference cycle [ms].
pub const SUPERVISION_CYCLE_MS: u32 = 100;

/// Tolerated deviation of alive indications per reference cycle.
pub const SUPERVISION_ALIVE_MARGIN: u16 = 2;

/// Failed reference cycles before a supervised entity expires.
pub const SUPERVISION_FAILED_REF_CYCLES: u8 = 3;

// ─── Compile-Time Checks ────────────────────────────────────────────

// Timing constraints of the safety concept.
const_assert!(SAFE_STATE_TRANSITION_MS <= FTTI_MS);
const_assert!(E2E_TIMEOUT_MS < FTTI_MS);
const_assert!(CAN_TIMEOUT_MS < E2E_TIMEOUT_MS);

// Hysteresis must open upward.
const_assert!(AMBIENT_THRESHOLD_ON < AMBIENT_THRESHOLD_OFF);

// Sensor diagnosis window must be ordered and inside the ADC range.
const_assert!(AMBIENT_OPEN_CIRCUIT < AMBIENT_SHORT_CIRCUIT);
const_assert!((AMBIENT_SHORT_CIRCUIT as u32) < (1u32 << ADC_RESOLUTION));

// All task periods must be multiples of the tick.
const_assert!(MAIN_PERIOD_MS % TICK_MS == 0);
const_assert!(AMBIENT_PERIOD_MS % TICK_MS == 0);
const_assert!(SAFETY_PERIOD_MS % TICK_MS == 0);

// Byte-aligned E2E layout only.
const_assert!(E2E_COUNTER_OFFSET_BITS % 8 == 0);
const_assert!(E2E_CRC_OFFSET_BITS % 8 == 0);
const_assert!((E2E_CRC_OFFSET_BITS as usize) / 8 < LIGHTSWITCH_FRAME_LEN);
const_assert!((E2E_COUNTER_OFFSET_BITS as usize) / 8 < LIGHTSWITCH_FRAME_LEN);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_cycle_counts_are_exact() {
        // The timeout thresholds are counted in task cycles; the divisions
        // must be exact or the debounce windows silently shift.
        assert_eq!(CAN_TIMEOUT_MS % MAIN_PERIOD_MS, 0);
        assert_eq!(E2E_TIMEOUT_MS % MAIN_PERIOD_MS, 0);
        assert_eq!(SUPERVISION_CYCLE_MS % SAFETY_PERIOD_MS, 0);
    }

    #[test]
    fn adc_range_is_12_bit() {
        assert_eq!(ADC_MAX_VALUE, 4095);
        assert!(AMBIENT_SHORT_CIRCUIT < ADC_MAX_VALUE);
    }

    #[test]
    fn degraded_window_is_positive() {
        assert!(FTTI_MS > SAFE_STATE_TRANSITION_MS);
        assert_eq!(FTTI_MS - SAFE_STATE_TRANSITION_MS, 100);
    }
}
