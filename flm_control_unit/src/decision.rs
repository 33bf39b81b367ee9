//! Headlight decision state machine.
//!
//! Runs every 10 ms on snapshots of the switch and ambient inputs. Four
//! states: INIT (outputs off until both inputs qualify), NORMAL (full
//! function), DEGRADED (bounded grace period on degraded inputs) and SAFE
//! (terminal). AUTO mode applies a two-threshold hysteresis on the ambient
//! reading so the lights never oscillate around a single threshold.

use tracing::warn;

use flm_common::consts::{
    AMBIENT_THRESHOLD_OFF, AMBIENT_THRESHOLD_ON, FTTI_MS, MAX_CONSECUTIVE_ERRORS,
    SAFE_STATE_TRANSITION_MS,
};
use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};
use flm_common::supervision::{Checkpoint, CheckpointSink, SupervisedEntity};
use flm_common::types::{
    AmbientLight, ControlState, HeadlightCommand, LightSwitchCommand, LightSwitchStatus,
    SafeStateReason,
};

/// Grace period in DEGRADED before the controller gives up [ms].
const DEGRADED_TIMEOUT_MS: u32 = FTTI_MS - SAFE_STATE_TRANSITION_MS;

/// Four-state headlight controller.
pub struct DecisionStateMachine {
    state: ControlState,
    previous_state: ControlState,
    state_entry_tick: u32,
    degraded_entry_tick: u32,
    consecutive_errors: u8,
    lights_currently_on: bool,
    command: HeadlightCommand,
    external_safe_request: bool,
    safe_reason: SafeStateReason,
    // Input snapshots of the current cycle.
    switch: LightSwitchStatus,
    ambient: AmbientLight,
    e2e_failure: bool,
}

impl Default for DecisionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionStateMachine {
    pub fn new() -> Self {
        Self {
            state: ControlState::Init,
            previous_state: ControlState::Init,
            state_entry_tick: 0,
            degraded_entry_tick: 0,
            consecutive_errors: 0,
            lights_currently_on: false,
            command: HeadlightCommand::Off,
            external_safe_request: false,
            safe_reason: SafeStateReason::None,
            switch: LightSwitchStatus::default(),
            ambient: AmbientLight::default(),
            e2e_failure: false,
        }
    }

    /// Current controller state.
    #[inline]
    pub fn state(&self) -> ControlState {
        self.state
    }

    /// State before the most recent cycle.
    #[inline]
    pub fn previous_state(&self) -> ControlState {
        self.previous_state
    }

    /// Actuation command decided this cycle.
    #[inline]
    pub fn command(&self) -> HeadlightCommand {
        self.command
    }

    /// Reason recorded with the safe-state request, if any.
    #[inline]
    pub fn safe_reason(&self) -> SafeStateReason {
        self.safe_reason
    }

    /// Hysteresis latch: lights considered on in AUTO mode.
    #[inline]
    pub fn lights_currently_on(&self) -> bool {
        self.lights_currently_on
    }

    /// Request the safe state from outside (safety monitor path).
    ///
    /// The first reason wins; later requests are idempotent.
    pub fn trigger_safe(&mut self, reason: SafeStateReason) {
        if !self.external_safe_request {
            warn!(?reason, "external safe state request");
            self.external_safe_request = true;
            self.safe_reason = reason;
        }
    }

    /// Full re-initialization. The only way out of SAFE.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One 10 ms cycle over fresh input snapshots.
    pub fn main_function(
        &mut self,
        now: u32,
        switch: LightSwitchStatus,
        ambient: AmbientLight,
        e2e_failure: bool,
        diag: &mut dyn DiagnosticSink,
        flow: &mut dyn CheckpointSink,
    ) {
        flow.checkpoint_reached(SupervisedEntity::Decision, Checkpoint::MainEntry);

        self.switch = switch;
        self.ambient = ambient;
        self.e2e_failure = e2e_failure;

        self.previous_state = self.state;
        match self.state {
            ControlState::Init => self.state_init(),
            ControlState::Normal => self.state_normal(now),
            ControlState::Degraded => self.state_degraded(now),
            ControlState::Safe => self.state_safe(),
        }
        if self.state != self.previous_state {
            self.state_entry_tick = now;
        }
        flow.checkpoint_reached(SupervisedEntity::Decision, Checkpoint::StateMachine);

        self.derive_command();

        diag.report(
            DiagEvent::SafeStateEntered,
            if self.state == ControlState::Safe {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
    }

    // ── State handlers ──

    fn state_init(&mut self) {
        if self.external_safe_request {
            self.state = ControlState::Safe;
            return;
        }
        if self.all_inputs_valid() {
            self.state = ControlState::Normal;
            self.consecutive_errors = 0;
        }
    }

    fn state_normal(&mut self, now: u32) {
        if self.critical_fault() {
            self.state = ControlState::Safe;
            return;
        }
        if self.any_input_invalid() {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
            if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                self.state = ControlState::Degraded;
                self.degraded_entry_tick = now;
            }
        } else {
            self.consecutive_errors = 0;
        }
    }

    fn state_degraded(&mut self, now: u32) {
        if self.critical_fault() {
            self.state = ControlState::Safe;
            return;
        }
        if self.all_inputs_valid() {
            // Recovery keeps the hysteresis latch: a light that was on in
            // AUTO stays on across the excursion.
            self.state = ControlState::Normal;
            self.consecutive_errors = 0;
            return;
        }
        if now.wrapping_sub(self.degraded_entry_tick) > DEGRADED_TIMEOUT_MS {
            self.state = ControlState::Safe;
        }
    }

    fn state_safe(&mut self) {
        // Terminal. Command selection happens in derive_command.
    }

    // ── Command derivation ──

    fn derive_command(&mut self) {
        match self.state {
            ControlState::Init => {
                self.command = HeadlightCommand::Off;
            }
            ControlState::Safe => {
                self.command = self.safe_command();
            }
            ControlState::Normal | ControlState::Degraded => {
                match self.switch.command {
                    LightSwitchCommand::Off => {
                        self.command = HeadlightCommand::Off;
                        self.lights_currently_on = false;
                    }
                    LightSwitchCommand::LowBeam => {
                        self.command = HeadlightCommand::LowBeam;
                        self.lights_currently_on = true;
                    }
                    LightSwitchCommand::HighBeam => {
                        self.command = HeadlightCommand::HighBeam;
                        self.lights_currently_on = true;
                    }
                    LightSwitchCommand::Auto => self.apply_auto_mode(),
                }
                // A degraded switch falls back to ambient control so the
                // vehicle keeps sensible lighting until SAFE or recovery.
                if self.state == ControlState::Degraded && !self.switch.is_valid {
                    self.apply_auto_mode();
                }
            }
        }
    }

    fn apply_auto_mode(&mut self) {
        if !self.ambient.is_valid {
            // Sensor gone: hold the previous command and latch.
            return;
        }
        if self.lights_currently_on {
            if self.ambient.adc > AMBIENT_THRESHOLD_OFF {
                self.command = HeadlightCommand::Off;
                self.lights_currently_on = false;
            } else {
                self.command = HeadlightCommand::LowBeam;
            }
        } else if self.ambient.adc < AMBIENT_THRESHOLD_ON {
            self.command = HeadlightCommand::LowBeam;
            self.lights_currently_on = true;
        } else {
            self.command = HeadlightCommand::Off;
        }
    }

    /// Fail-safe command once SAFE: visibility wins on any doubt. Only the
    /// ON threshold applies; hysteresis is meaningless in a terminal state.
    fn safe_command(&self) -> HeadlightCommand {
        if !self.ambient.is_valid {
            return HeadlightCommand::LowBeam;
        }
        if self.ambient.adc < AMBIENT_THRESHOLD_ON {
            HeadlightCommand::LowBeam
        } else {
            HeadlightCommand::Off
        }
    }

    // ── Guards ──

    fn all_inputs_valid(&self) -> bool {
        self.switch.is_valid && self.ambient.is_valid
    }

    fn any_input_invalid(&self) -> bool {
        !self.all_inputs_valid()
    }

    fn critical_fault(&self) -> bool {
        self.external_safe_request || self.e2e_failure
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
