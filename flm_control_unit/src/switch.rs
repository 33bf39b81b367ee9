//! Light switch input task.
//!
//! Runs every 10 ms. Drains the bus frame latch, runs the E2E check and the
//! health state machine, validates the command range, and publishes a
//! [`LightSwitchStatus`] snapshot. Tracks two failure modes on top of the
//! per-frame verdicts: bus silence (message timeout) and persistent E2E
//! errors (failure latch).

use std::sync::Arc;

use flm_common::consts::{
    CAN_TIMEOUT_MS, E2E_COUNTER_OFFSET_BITS, E2E_CRC_OFFSET_BITS, E2E_MAX_CONSECUTIVE_ERRORS,
    E2E_MAX_DELTA_COUNTER, E2E_MAX_NO_NEW_DATA, E2E_TIMEOUT_MS, LIGHTSWITCH_CMD_BYTE,
    LIGHTSWITCH_DATA_ID, LIGHTSWITCH_FRAME_LEN, MAIN_PERIOD_MS,
};
use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};
use flm_common::supervision::{Checkpoint, CheckpointSink, SupervisedEntity};
use flm_common::types::{E2eHealth, E2eVerdict, LightSwitchCommand, LightSwitchStatus};
use flm_hal::FrameLatch;

use crate::e2e::{CheckState, E2eConfig, HealthMonitor};

/// Bus-silent cycles before the message timeout latches.
const TIMEOUT_CYCLES: u16 = (CAN_TIMEOUT_MS / MAIN_PERIOD_MS) as u16;

/// Cycles with unhealthy E2E before the failure flag latches.
const E2E_TIMEOUT_CYCLES: u16 = (E2E_TIMEOUT_MS / MAIN_PERIOD_MS) as u16;

/// Validated light switch input.
pub struct SwitchInput {
    latch: Arc<FrameLatch>,
    e2e_config: E2eConfig,
    check: CheckState,
    health: HealthMonitor,
    status: LightSwitchStatus,
    timeout_count: u16,
    timeout_active: bool,
    e2e_timeout_count: u16,
    consecutive_e2e_errors: u8,
    e2e_failure_active: bool,
}

impl SwitchInput {
    /// Build the input task around a shared bus latch.
    pub fn new(latch: Arc<FrameLatch>) -> Self {
        let e2e_config = E2eConfig::new(
            LIGHTSWITCH_DATA_ID,
            LIGHTSWITCH_FRAME_LEN,
            E2E_CRC_OFFSET_BITS,
            E2E_COUNTER_OFFSET_BITS,
            E2E_MAX_DELTA_COUNTER,
            E2E_MAX_NO_NEW_DATA,
        )
        .expect("light switch frame layout is validated at compile time");
        Self {
            latch,
            e2e_config,
            check: CheckState::new(),
            health: HealthMonitor::default(),
            status: LightSwitchStatus::default(),
            timeout_count: 0,
            timeout_active: false,
            e2e_timeout_count: 0,
            consecutive_e2e_errors: 0,
            e2e_failure_active: false,
        }
    }

    /// Snapshot of the validated switch request.
    #[inline]
    pub fn status(&self) -> LightSwitchStatus {
        self.status
    }

    /// Verdict of the most recent protection check.
    #[inline]
    pub fn verdict(&self) -> E2eVerdict {
        self.check.verdict()
    }

    /// Aggregated communication health.
    #[inline]
    pub fn health(&self) -> E2eHealth {
        self.health.state()
    }

    /// Message timeout latched.
    #[inline]
    pub fn timeout_active(&self) -> bool {
        self.timeout_active
    }

    /// Persistent E2E failure latched.
    #[inline]
    pub fn e2e_failure_active(&self) -> bool {
        self.e2e_failure_active
    }

    /// One 10 ms cycle.
    pub fn main_function(
        &mut self,
        diag: &mut dyn DiagnosticSink,
        flow: &mut dyn CheckpointSink,
    ) {
        flow.checkpoint_reached(SupervisedEntity::SwitchInput, Checkpoint::MainEntry);

        match self.latch.take() {
            // A frame of the wrong length never carries a checkable
            // protection block; the cycle counts as bus-silent.
            Some(frame) if frame.bytes().len() == LIGHTSWITCH_FRAME_LEN => {
                self.process_frame(frame.bytes())
            }
            _ => self.process_silence(),
        }

        // Health-based failure latch: health away from VALID for the full
        // E2E timeout raises the failure flag even without fresh errors.
        if self.health.state() != E2eHealth::Valid {
            self.e2e_timeout_count = self.e2e_timeout_count.saturating_add(1);
            if self.e2e_timeout_count >= E2E_TIMEOUT_CYCLES {
                self.e2e_failure_active = true;
            }
        } else {
            self.e2e_timeout_count = 0;
        }

        self.status.is_valid = self.health.state() == E2eHealth::Valid && !self.timeout_active;
        self.status.e2e_verdict = self.check.verdict();

        self.report_events(diag);
    }

    fn process_frame(&mut self, bytes: &[u8]) {
        let verdict = self.check.check(&self.e2e_config, Some(bytes));
        self.health.step(verdict);

        if verdict.is_ok() {
            self.extract_command(bytes);
            self.consecutive_e2e_errors = 0;
            self.e2e_failure_active = false;
            self.timeout_count = 0;
            self.timeout_active = false;
        } else {
            self.consecutive_e2e_errors = self.consecutive_e2e_errors.saturating_add(1);
            if self.consecutive_e2e_errors >= E2E_MAX_CONSECUTIVE_ERRORS {
                self.e2e_failure_active = true;
            }
        }
    }

    fn process_silence(&mut self) {
        let verdict = self.check.check(&self.e2e_config, None);
        self.health.step(verdict);

        self.timeout_count = self.timeout_count.saturating_add(1);
        self.timeout_active = self.timeout_count >= TIMEOUT_CYCLES;
    }

    fn extract_command(&mut self, bytes: &[u8]) {
        // An out-of-range command byte rejects the update; the last
        // accepted command stands. Overall validity is governed by health
        // and timeout alone.
        if let Some(command) = bytes
            .get(LIGHTSWITCH_CMD_BYTE)
            .and_then(|&raw| LightSwitchCommand::from_u8(raw))
        {
            self.status.command = command;
        }
    }

    fn report_events(&self, diag: &mut dyn DiagnosticSink) {
        diag.report(
            DiagEvent::E2eLightSwitchFailed,
            if self.e2e_failure_active {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
        diag.report(
            DiagEvent::CanTimeout,
            if self.timeout_active {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
