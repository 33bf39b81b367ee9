//! Cooperative millisecond dispatcher.
//!
//! Owns every component instance and a wrapping millisecond tick. Each tick
//! runs the due tasks in a fixed order chosen so that every consumer sees
//! the values produced in the same tick:
//!
//! 1. safety monitor + alive supervisor (5 ms)
//! 2. switch input (10 ms)
//! 3. ambient sensor (20 ms)
//! 4. decision state machine (10 ms)
//! 5. headlight driver (10 ms)
//!
//! The safety monitor runs first so a pending safe-state request is visible
//! to the decision task of the same tick; both input tasks run before the
//! decision; the actuator consumes the decision of this tick.

use std::sync::Arc;

use flm_common::consts::{AMBIENT_PERIOD_MS, MAIN_PERIOD_MS, SAFETY_PERIOD_MS, TICK_MS};
use flm_common::hal::{AnalogInput, DigitalOutput};
use flm_common::types::{
    AmbientLight, ControlState, HeadlightCommand, LightSwitchStatus, SafeStateReason,
    SafetyStatus,
};
use flm_hal::FrameLatch;

use crate::actuator::HeadlightDriver;
use crate::ambient::AmbientSensor;
use crate::decision::DecisionStateMachine;
use crate::diag::DiagnosticRecorder;
use crate::safety::{SafetyInputs, SafetyMonitor};
use crate::supervision::AliveSupervisor;
use crate::switch::SwitchInput;

/// Per-rate-group execution counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    /// Ticks executed since start.
    pub ticks: u64,
    /// 5 ms group executions.
    pub safety_runs: u64,
    /// 10 ms group executions.
    pub main_runs: u64,
    /// 20 ms group executions.
    pub ambient_runs: u64,
}

/// Component owner and time-triggered dispatcher.
pub struct Dispatcher {
    tick_ms: u32,
    stats: DispatchStats,
    switch: SwitchInput,
    ambient: AmbientSensor,
    decision: DecisionStateMachine,
    actuator: HeadlightDriver,
    safety: SafetyMonitor,
    supervisor: AliveSupervisor,
    recorder: DiagnosticRecorder,
}

impl Dispatcher {
    /// Wire the pipeline onto its ports.
    pub fn new(
        latch: Arc<FrameLatch>,
        adc: Arc<dyn AnalogInput>,
        dio: Arc<dyn DigitalOutput>,
    ) -> Self {
        Self {
            tick_ms: 0,
            stats: DispatchStats::default(),
            switch: SwitchInput::new(latch),
            ambient: AmbientSensor::new(Arc::clone(&adc)),
            decision: DecisionStateMachine::new(),
            actuator: HeadlightDriver::new(dio, adc),
            safety: SafetyMonitor::new(),
            supervisor: AliveSupervisor::new(),
            recorder: DiagnosticRecorder::new(),
        }
    }

    /// Current monotonic millisecond tick.
    #[inline]
    pub fn now(&self) -> u32 {
        self.tick_ms
    }

    /// Execution counters.
    #[inline]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Advance the system by one millisecond tick.
    pub fn tick(&mut self) {
        let now = self.tick_ms;

        if now % SAFETY_PERIOD_MS == 0 {
            self.run_safety_group(now);
            self.stats.safety_runs += 1;
        }

        let main_due = now % MAIN_PERIOD_MS == 0;
        if main_due {
            self.switch
                .main_function(&mut self.recorder, &mut self.supervisor);
        }
        if now % AMBIENT_PERIOD_MS == 0 {
            self.ambient
                .main_function(&mut self.recorder, &mut self.supervisor);
            self.stats.ambient_runs += 1;
        }
        if main_due {
            self.decision.main_function(
                now,
                self.switch.status(),
                self.ambient.output(),
                self.switch.e2e_failure_active(),
                &mut self.recorder,
                &mut self.supervisor,
            );
            self.actuator.main_function(
                now,
                self.decision.command(),
                &mut self.recorder,
                &mut self.supervisor,
            );
            self.stats.main_runs += 1;
        }

        self.stats.ticks += 1;
        self.tick_ms = self.tick_ms.wrapping_add(TICK_MS);
    }

    /// Advance the system by `ms` milliseconds.
    pub fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms / TICK_MS {
            self.tick();
        }
    }

    fn run_safety_group(&mut self, now: u32) {
        let inputs = SafetyInputs {
            switch_valid: self.switch.status().is_valid,
            e2e_health: self.switch.health(),
            ambient: self.ambient.output(),
            actuator_fault: self.actuator.fault(),
            watchdog: self.supervisor.global_status(),
        };
        // The safe-state request is a one-way callback into the decision
        // state machine; disjoint field borrows keep it allocation-free.
        let decision = &mut self.decision;
        self.safety.main_function(
            now,
            inputs,
            &mut |reason: SafeStateReason| decision.trigger_safe(reason),
            &mut self.recorder,
            &mut self.supervisor,
        );
        // The supervisor evaluates after the tasks it watches reported.
        self.supervisor.main_function();
    }

    // ── Observability ──

    /// Validated switch request snapshot.
    pub fn switch_status(&self) -> LightSwitchStatus {
        self.switch.status()
    }

    /// Conditioned ambient snapshot.
    pub fn ambient_output(&self) -> AmbientLight {
        self.ambient.output()
    }

    /// Decision state machine state.
    pub fn decision_state(&self) -> ControlState {
        self.decision.state()
    }

    /// Commanded headlight output.
    pub fn headlight_command(&self) -> HeadlightCommand {
        self.decision.command()
    }

    /// Relay levels as driven (low beam, high beam).
    pub fn relay_outputs(&self) -> (bool, bool) {
        self.actuator.outputs()
    }

    /// Aggregated safety status.
    pub fn safety_status(&self) -> SafetyStatus {
        self.safety.global_status()
    }

    /// Recorded safe-state reason.
    pub fn safe_state_reason(&self) -> SafeStateReason {
        self.safety.reason()
    }

    /// Safe state requested by the safety monitor.
    pub fn in_safe_state(&self) -> bool {
        self.safety.in_safe_state()
    }

    /// Borrow the individual components for detailed inspection.
    pub fn components(&self) -> ComponentView<'_> {
        ComponentView {
            switch: &self.switch,
            ambient: &self.ambient,
            decision: &self.decision,
            actuator: &self.actuator,
            safety: &self.safety,
            supervisor: &self.supervisor,
            recorder: &self.recorder,
        }
    }
}

/// Read-only view over the dispatcher's components.
pub struct ComponentView<'a> {
    pub switch: &'a SwitchInput,
    pub ambient: &'a AmbientSensor,
    pub decision: &'a DecisionStateMachine,
    pub actuator: &'a HeadlightDriver,
    pub safety: &'a SafetyMonitor,
    pub supervisor: &'a AliveSupervisor,
    pub recorder: &'a DiagnosticRecorder,
}

// ─── Tests ──────────────────────────────────────────────────────────
