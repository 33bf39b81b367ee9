//! Safety monitor.
//!
//! Runs every 5 ms, twice as fast as the producers it watches. Aggregates
//! per-component fault flags, tracks the fault tolerant time interval,
//! supervises the E2E health and the program-flow watchdog, and — exactly
//! once — requests the safe state from the decision state machine through
//! an injected one-way callback. Also keeps the day/night latch that picks
//! the safe-state command: off in daylight, low beam at night.

use tracing::{info, warn};

use flm_common::consts::{DAY_THRESHOLD, E2E_TIMEOUT_MS, FTTI_MS, SAFETY_MAX_FAULTS};
use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};
use flm_common::supervision::{Checkpoint, CheckpointSink, SupervisedEntity, SupervisionStatus};
use flm_common::types::{
    ActuatorFault, AmbientLight, E2eHealth, HeadlightCommand, SafeStateReason, SafetyStatus,
};

/// Snapshot of everything the safety monitor watches, gathered by the
/// dispatcher at the start of each 5 ms cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyInputs {
    /// Switch request currently valid.
    pub switch_valid: bool,
    /// Aggregated E2E communication health.
    pub e2e_health: E2eHealth,
    /// Conditioned ambient light snapshot.
    pub ambient: AmbientLight,
    /// Output stage fault classification.
    pub actuator_fault: ActuatorFault,
    /// Program-flow supervision global status.
    pub watchdog: SupervisionStatus,
}

/// Cross-component fault aggregation and FTTI tracking.
pub struct SafetyMonitor {
    in_safe: bool,
    reason: SafeStateReason,
    safe_entry_tick: u32,
    fault_count: u8,
    first_fault_tick: u32,
    ftti_active: bool,
    e2e_timeout_active: bool,
    e2e_failure_start_tick: u32,
    is_daytime: bool,
    safe_command: HeadlightCommand,
    global_status: SafetyStatus,
    // Per-component fault flags of the current cycle.
    switch_fault: bool,
    ambient_fault: bool,
    actuator_fault: bool,
    watchdog_fault: bool,
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self {
            in_safe: false,
            reason: SafeStateReason::None,
            safe_entry_tick: 0,
            fault_count: 0,
            first_fault_tick: 0,
            ftti_active: false,
            e2e_timeout_active: false,
            e2e_failure_start_tick: 0,
            // Daylight until the sensor proves otherwise: a dark default
            // would switch the lights on during every daytime start.
            is_daytime: true,
            safe_command: HeadlightCommand::Off,
            global_status: SafetyStatus::Ok,
            switch_fault: false,
            ambient_fault: false,
            actuator_fault: false,
            watchdog_fault: false,
        }
    }

    /// Safe state currently requested.
    #[inline]
    pub fn in_safe_state(&self) -> bool {
        self.in_safe
    }

    /// First recorded safe-state reason.
    #[inline]
    pub fn reason(&self) -> SafeStateReason {
        self.reason
    }

    /// Aggregated system status.
    #[inline]
    pub fn global_status(&self) -> SafetyStatus {
        self.global_status
    }

    /// Number of simultaneously faulted components this cycle.
    #[inline]
    pub fn fault_count(&self) -> u8 {
        self.fault_count
    }

    /// FTTI tracking currently armed.
    #[inline]
    pub fn ftti_active(&self) -> bool {
        self.ftti_active
    }

    /// Day/night latch.
    #[inline]
    pub fn is_daytime(&self) -> bool {
        self.is_daytime
    }

    /// Headlight command appropriate for the safe state.
    #[inline]
    pub fn safe_command(&self) -> HeadlightCommand {
        self.safe_command
    }

    /// One 5 ms cycle.
    ///
    /// `trigger` is the one-way path into the decision state machine; it is
    /// invoked at most once over the life of the monitor.
    pub fn main_function(
        &mut self,
        now: u32,
        inputs: SafetyInputs,
        trigger: &mut dyn FnMut(SafeStateReason),
        diag: &mut dyn DiagnosticSink,
        flow: &mut dyn CheckpointSink,
    ) {
        flow.checkpoint_reached(SupervisedEntity::SafetyMonitor, Checkpoint::MainEntry);

        self.aggregate_faults(now, &inputs);
        flow.checkpoint_reached(SupervisedEntity::SafetyMonitor, Checkpoint::Aggregation);

        self.update_day_night(&inputs.ambient);
        self.check_e2e_timeout(now, inputs.e2e_health, trigger);
        self.check_watchdog(now, inputs.watchdog, trigger);
        self.check_multi_fault(now, trigger);
        self.check_ftti(now, trigger);
        self.update_global_status();
        if self.in_safe {
            self.safe_command = if self.is_daytime {
                HeadlightCommand::Off
            } else {
                HeadlightCommand::LowBeam
            };
        }

        self.report_events(diag);
    }

    fn aggregate_faults(&mut self, now: u32, inputs: &SafetyInputs) {
        self.switch_fault = !inputs.switch_valid;
        self.ambient_fault = !inputs.ambient.is_valid;
        self.actuator_fault = inputs.actuator_fault != ActuatorFault::None;
        self.watchdog_fault = inputs.watchdog.is_fault();

        let count = [
            self.switch_fault,
            self.ambient_fault,
            self.actuator_fault,
            self.watchdog_fault,
        ]
        .iter()
        .filter(|&&fault| fault)
        .count() as u8;

        // Arm the FTTI clock on the first fault of a fault-free system.
        if count > 0 && self.fault_count == 0 {
            self.first_fault_tick = now;
            self.ftti_active = true;
            info!(count, "fault monitoring armed");
        }
        if count == 0 {
            self.ftti_active = false;
        }
        self.fault_count = count;
    }

    fn update_day_night(&mut self, ambient: &AmbientLight) {
        // An invalid sensor leaves the latch at its last trusted value.
        if ambient.is_valid {
            self.is_daytime = ambient.adc > DAY_THRESHOLD;
        }
    }

    fn check_e2e_timeout(
        &mut self,
        now: u32,
        health: E2eHealth,
        trigger: &mut dyn FnMut(SafeStateReason),
    ) {
        if health != E2eHealth::Valid {
            if !self.e2e_timeout_active {
                self.e2e_timeout_active = true;
                self.e2e_failure_start_tick = now;
            } else if now.wrapping_sub(self.e2e_failure_start_tick) >= E2E_TIMEOUT_MS {
                self.trigger_safe(now, SafeStateReason::E2eFailure, trigger);
            }
        } else {
            self.e2e_timeout_active = false;
        }
    }

    fn check_watchdog(
        &mut self,
        now: u32,
        status: SupervisionStatus,
        trigger: &mut dyn FnMut(SafeStateReason),
    ) {
        // Program flow is no longer trustworthy; the FTTI grace period does
        // not apply.
        if status.is_fault() {
            self.trigger_safe(now, SafeStateReason::WatchdogFailure, trigger);
        }
    }

    fn check_multi_fault(&mut self, now: u32, trigger: &mut dyn FnMut(SafeStateReason)) {
        if self.fault_count >= SAFETY_MAX_FAULTS {
            self.trigger_safe(now, SafeStateReason::MultiFault, trigger);
        }
    }

    fn check_ftti(&mut self, now: u32, trigger: &mut dyn FnMut(SafeStateReason)) {
        if self.ftti_active && now.wrapping_sub(self.first_fault_tick) >= FTTI_MS {
            self.trigger_safe(now, SafeStateReason::Timeout, trigger);
        }
    }

    fn update_global_status(&mut self) {
        self.global_status = if self.in_safe {
            SafetyStatus::SafeState
        } else if self.fault_count >= 2 {
            SafetyStatus::Degraded
        } else if self.fault_count == 1 {
            SafetyStatus::Warning
        } else {
            SafetyStatus::Ok
        };
    }

    fn trigger_safe(
        &mut self,
        now: u32,
        reason: SafeStateReason,
        trigger: &mut dyn FnMut(SafeStateReason),
    ) {
        if self.in_safe {
            return;
        }
        warn!(?reason, "entering safe state");
        self.in_safe = true;
        self.reason = reason;
        self.safe_entry_tick = now;
        self.global_status = SafetyStatus::SafeState;
        trigger(reason);
    }

    fn report_events(&self, diag: &mut dyn DiagnosticSink) {
        diag.report(
            DiagEvent::WatchdogSupervisionFailed,
            if self.watchdog_fault {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
        if self.in_safe {
            diag.report(DiagEvent::SafeStateEntered, EventReport::Failed);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
