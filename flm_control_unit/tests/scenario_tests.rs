//! End-to-end scenarios through the dispatcher.
//!
//! Each test drives the full pipeline — bus latch, E2E protection, input
//! conditioning, decision, actuation, safety monitoring — in whole
//! milliseconds with deterministic stimuli, and observes the system through
//! the same snapshots the host binary uses.

use std::sync::Arc;

use flm_common::consts::{
    ADC_CHANNEL_AMBIENT, ADC_CHANNEL_CURRENT, DIO_CHANNEL_HIGH_BEAM, DIO_CHANNEL_LOW_BEAM,
    E2E_COUNTER_OFFSET_BITS, E2E_CRC_OFFSET_BITS, E2E_MAX_DELTA_COUNTER, E2E_MAX_NO_NEW_DATA,
    HEADLIGHT_CURRENT_FACTOR, LIGHTSWITCH_CMD_BYTE, LIGHTSWITCH_DATA_ID, LIGHTSWITCH_FRAME_LEN,
};
use flm_common::hal::{AnalogInput, DigitalOutput};
use flm_common::types::{ControlState, HeadlightCommand, SafeStateReason, SafetyStatus};
use flm_control_unit::e2e::{E2eConfig, ProtectState};
use flm_control_unit::sched::Dispatcher;
use flm_hal::{FrameLatch, SimAdc, SimDio};

/// Bus frame spacing used by all scenarios [ms].
const FRAME_PERIOD_MS: u32 = 20;

/// Simulated healthy load current [mA].
const LOAD_CURRENT_MA: u32 = 5_000;

struct TestBench {
    dispatcher: Dispatcher,
    latch: Arc<FrameLatch>,
    adc: Arc<SimAdc>,
    dio: Arc<SimDio>,
    protect: ProtectState,
    e2e_config: E2eConfig,
    /// Command byte sent in periodic frames; `None` silences the bus.
    sending: Option<u8>,
    /// Corrupt a payload byte of every sent frame after protection.
    corrupt: bool,
    /// Feedback current override [mA]; `None` follows the relay state.
    feedback_override: Option<u32>,
}

impl TestBench {
    fn new(ambient_adc: u16) -> Self {
        let latch = Arc::new(FrameLatch::new());
        let adc = Arc::new(SimAdc::new());
        let dio = Arc::new(SimDio::new());
        adc.set_value(ADC_CHANNEL_AMBIENT, ambient_adc);

        let dispatcher = Dispatcher::new(
            Arc::clone(&latch),
            Arc::clone(&adc) as Arc<dyn AnalogInput>,
            Arc::clone(&dio) as Arc<dyn DigitalOutput>,
        );
        let e2e_config = E2eConfig::new(
            LIGHTSWITCH_DATA_ID,
            LIGHTSWITCH_FRAME_LEN,
            E2E_CRC_OFFSET_BITS,
            E2E_COUNTER_OFFSET_BITS,
            E2E_MAX_DELTA_COUNTER,
            E2E_MAX_NO_NEW_DATA,
        )
        .unwrap();

        Self {
            dispatcher,
            latch,
            adc,
            dio,
            protect: ProtectState::new(),
            e2e_config,
            sending: None,
            corrupt: false,
            feedback_override: None,
        }
    }

    fn set_ambient(&mut self, adc: u16) {
        self.adc.set_value(ADC_CHANNEL_AMBIENT, adc);
    }

    fn relays(&self) -> (bool, bool) {
        (
            self.dio.read_back(DIO_CHANNEL_LOW_BEAM).unwrap(),
            self.dio.read_back(DIO_CHANNEL_HIGH_BEAM).unwrap(),
        )
    }

    /// Advance `ms` milliseconds, injecting frames and current feedback the
    /// way the real environment would.
    fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            let now = self.dispatcher.now();
            if let Some(command) = self.sending {
                if now % FRAME_PERIOD_MS == 0 {
                    let mut frame = [0u8; LIGHTSWITCH_FRAME_LEN];
                    frame[LIGHTSWITCH_CMD_BYTE] = command;
                    self.protect.protect(&self.e2e_config, &mut frame);
                    if self.corrupt {
                        frame[3] ^= 0xFF;
                    }
                    self.latch.publish(&frame);
                }
            }

            let (low, high) = self.relays();
            let current = self
                .feedback_override
                .unwrap_or(if low || high { LOAD_CURRENT_MA } else { 0 });
            self.adc.set_value(
                ADC_CHANNEL_CURRENT,
                (current / u32::from(HEADLIGHT_CURRENT_FACTOR)) as u16,
            );

            self.dispatcher.tick();
        }
    }

    /// Cold start to NORMAL: valid frames and bright ambient for 100 ms.
    fn start_to_normal(&mut self, command: u8) {
        self.sending = Some(command);
        self.run_ms(100);
        assert_eq!(self.dispatcher.decision_state(), ControlState::Normal);
    }
}

// ─── S1: cold start to normal ───────────────────────────────────────

#[test]
fn cold_start_reaches_normal_within_100ms() {
    let mut bench = TestBench::new(2000);
    bench.sending = Some(1); // LOW_BEAM

    bench.run_ms(100);

    assert_eq!(bench.dispatcher.decision_state(), ControlState::Normal);
    assert_eq!(
        bench.dispatcher.headlight_command(),
        HeadlightCommand::LowBeam
    );
    assert_eq!(bench.relays(), (true, false));
    assert_eq!(bench.dispatcher.safety_status(), SafetyStatus::Ok);
    assert!(!bench.dispatcher.in_safe_state());
}

#[test]
fn high_beam_drives_both_relays() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(2); // HIGH_BEAM
    assert_eq!(bench.relays(), (true, true));
}

// ─── S2: AUTO activation with hysteresis ────────────────────────────

#[test]
fn auto_mode_activation_and_hysteresis() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(3); // AUTO
    assert_eq!(bench.relays(), (false, false));

    // Night falls: lights on.
    bench.set_ambient(500);
    bench.run_ms(100);
    assert_eq!(bench.relays(), (true, false));

    // Inside the hysteresis band: lights stay on.
    bench.set_ambient(900);
    bench.run_ms(100);
    assert_eq!(bench.relays(), (true, false));

    // Bright above the OFF threshold: lights out.
    bench.set_ambient(1200);
    bench.run_ms(100);
    assert_eq!(bench.relays(), (false, false));

    // Back into the band from the bright side: lights stay out.
    bench.set_ambient(900);
    bench.run_ms(100);
    assert_eq!(bench.relays(), (false, false));
}

// ─── S3: E2E corruption forces SAFE ─────────────────────────────────

#[test]
fn e2e_corruption_reaches_safe_within_budget() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);

    // Every further frame carries a flipped payload byte.
    bench.corrupt = true;
    bench.run_ms(150);
    assert_eq!(bench.dispatcher.decision_state(), ControlState::Safe);

    bench.run_ms(100);
    assert!(bench.dispatcher.in_safe_state());
    assert_eq!(
        bench.dispatcher.safe_state_reason(),
        SafeStateReason::E2eFailure
    );
    assert_eq!(bench.dispatcher.safety_status(), SafetyStatus::SafeState);
}

// ─── S4: bus silence ────────────────────────────────────────────────

#[test]
fn bus_silence_times_out_then_reaches_safe() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);

    bench.sending = None;
    bench.run_ms(60);
    assert!(bench.dispatcher.components().switch.timeout_active());
    assert!(!bench.dispatcher.switch_status().is_valid);

    // The fault persists; the safe state arrives well inside the FTTI
    // budget. With the bus gone the E2E failure clock expires first, so
    // that is the recorded reason.
    bench.run_ms(140);
    assert!(bench.dispatcher.in_safe_state());
    assert_eq!(
        bench.dispatcher.safe_state_reason(),
        SafeStateReason::E2eFailure
    );
    assert_eq!(bench.dispatcher.decision_state(), ControlState::Safe);
}

#[test]
fn ftti_expiry_on_persistent_sensor_fault() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);

    // Kill only the ambient sensor: one fault, healthy comms, so the FTTI
    // clock is the only path to SAFE.
    bench.set_ambient(4095);
    bench.run_ms(100);
    assert!(!bench.dispatcher.ambient_output().is_valid);
    assert!(!bench.dispatcher.in_safe_state());
    assert_eq!(bench.dispatcher.safety_status(), SafetyStatus::Warning);

    bench.run_ms(200);
    assert!(bench.dispatcher.in_safe_state());
    assert_eq!(bench.dispatcher.safe_state_reason(), SafeStateReason::Timeout);
}

// ─── S5: safe-state command selection ───────────────────────────────

#[test]
fn safe_command_follows_last_known_ambient() {
    let mut bench = TestBench::new(3000);
    bench.start_to_normal(1);

    // Corrupt the bus until SAFE; ambient stays bright and valid.
    bench.corrupt = true;
    bench.run_ms(250);
    assert_eq!(bench.dispatcher.decision_state(), ControlState::Safe);
    assert_eq!(bench.dispatcher.headlight_command(), HeadlightCommand::Off);
    assert_eq!(bench.relays(), (false, false));

    // Night falls in SAFE: visibility wins.
    bench.set_ambient(500);
    bench.run_ms(200);
    assert_eq!(
        bench.dispatcher.headlight_command(),
        HeadlightCommand::LowBeam
    );
    assert_eq!(bench.relays(), (true, false));

    // Ambient sensor dies too: low beam is the fail-safe choice.
    bench.set_ambient(4095);
    bench.run_ms(200);
    assert!(!bench.dispatcher.ambient_output().is_valid);
    assert_eq!(
        bench.dispatcher.headlight_command(),
        HeadlightCommand::LowBeam
    );
}

// ─── S6: actuator short circuit ─────────────────────────────────────

#[test]
fn actuator_short_forces_outputs_off_and_raises_safety() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);
    assert_eq!(bench.relays(), (true, false));

    bench.feedback_override = Some(20_000);
    bench.run_ms(30);

    let components = bench.dispatcher.components();
    assert_eq!(
        components.actuator.fault(),
        flm_common::types::ActuatorFault::ShortCircuit
    );
    assert_eq!(bench.relays(), (false, false));
    assert_ne!(bench.dispatcher.safety_status(), SafetyStatus::Ok);

    // The short is sticky: the fault persists past the FTTI and the system
    // lands in SAFE.
    bench.run_ms(250);
    assert!(bench.dispatcher.in_safe_state());
    assert_eq!(bench.relays(), (false, false));
}

// ─── Degraded-mode excursion ────────────────────────────────────────

#[test]
fn short_bus_dropout_recovers_through_degraded() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);

    // Drop the bus just long enough for the timeout, then recover before
    // any safe-state clock expires.
    bench.sending = None;
    bench.run_ms(90);
    assert!(bench.dispatcher.components().switch.timeout_active());
    let state = bench.dispatcher.decision_state();
    assert!(
        state == ControlState::Degraded || state == ControlState::Normal,
        "unexpected state {state:?}"
    );
    assert!(!bench.dispatcher.in_safe_state());

    bench.sending = Some(1);
    bench.run_ms(100);
    assert_eq!(bench.dispatcher.decision_state(), ControlState::Normal);
    assert!(bench.dispatcher.switch_status().is_valid);
    assert_eq!(bench.relays(), (true, false));
    assert!(!bench.dispatcher.in_safe_state());
}

// ─── Diagnostic trail ───────────────────────────────────────────────

#[test]
fn diagnostic_recorder_tracks_the_failure_trail() {
    let mut bench = TestBench::new(2000);
    bench.start_to_normal(1);

    bench.sending = None;
    bench.run_ms(250);
    assert!(bench.dispatcher.in_safe_state());

    let recorder = bench.dispatcher.components().recorder;
    assert!(recorder.is_failed(flm_common::diag::DiagEvent::CanTimeout));
    assert!(recorder.is_failed(flm_common::diag::DiagEvent::E2eLightSwitchFailed));
    assert!(recorder.is_failed(flm_common::diag::DiagEvent::SafeStateEntered));
    assert!(!recorder.is_failed(flm_common::diag::DiagEvent::HeadlightShortCircuit));
}
