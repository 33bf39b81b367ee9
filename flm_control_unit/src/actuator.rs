//! Headlight output stage.
//!
//! Runs every 10 ms. Translates the decided [`HeadlightCommand`] into the
//! two relay channels (high beam energizes both), samples the current-sense
//! feedback, and diagnoses the load: open load once the output has settled,
//! over-current at any time. A confirmed short forces and latches both
//! outputs low; confirmed faults are sticky until re-initialization.

use std::sync::Arc;

use tracing::error;

use flm_common::consts::{
    ADC_CHANNEL_CURRENT, DIO_CHANNEL_HIGH_BEAM, DIO_CHANNEL_LOW_BEAM, HEADLIGHT_CURRENT_FACTOR,
    HEADLIGHT_FAULT_CONFIRM_CYCLES, HEADLIGHT_FAULT_DETECT_MS, HEADLIGHT_MAX_CURRENT_MA,
    HEADLIGHT_MIN_CURRENT_MA, HEADLIGHT_OPEN_LOAD_MA,
};
use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};
use flm_common::hal::{AnalogInput, DigitalOutput};
use flm_common::supervision::{Checkpoint, CheckpointSink, SupervisedEntity};
use flm_common::types::{ActuatorFault, HeadlightCommand};

/// Relay driver with load diagnosis.
pub struct HeadlightDriver {
    dio: Arc<dyn DigitalOutput>,
    adc: Arc<dyn AnalogInput>,
    current_command: HeadlightCommand,
    low_on: bool,
    high_on: bool,
    feedback_ma: u32,
    feedback_on: bool,
    command_change_tick: u32,
    open_load_count: u8,
    short_count: u8,
    fault: ActuatorFault,
    fault_confirmed: bool,
    outputs_latched_off: bool,
}

impl HeadlightDriver {
    pub fn new(dio: Arc<dyn DigitalOutput>, adc: Arc<dyn AnalogInput>) -> Self {
        let driver = Self {
            dio,
            adc,
            current_command: HeadlightCommand::Off,
            low_on: false,
            high_on: false,
            feedback_ma: 0,
            feedback_on: false,
            command_change_tick: 0,
            open_load_count: 0,
            short_count: 0,
            fault: ActuatorFault::None,
            fault_confirmed: false,
            outputs_latched_off: false,
        };
        driver.write_outputs(false, false);
        driver
    }

    /// Confirmed or pending fault classification.
    #[inline]
    pub fn fault(&self) -> ActuatorFault {
        self.fault
    }

    /// Command currently applied to the outputs.
    #[inline]
    pub fn current_command(&self) -> HeadlightCommand {
        self.current_command
    }

    /// Relay levels as last commanded (low beam, high beam).
    #[inline]
    pub fn outputs(&self) -> (bool, bool) {
        (self.low_on, self.high_on)
    }

    /// Load current measured this cycle [mA].
    #[inline]
    pub fn feedback_ma(&self) -> u32 {
        self.feedback_ma
    }

    /// Load current indicates the lights are actually on.
    #[inline]
    pub fn feedback_on(&self) -> bool {
        self.feedback_on
    }

    /// Clear faults and the output latch, as part of a full re-init.
    pub fn reset(&mut self) {
        self.open_load_count = 0;
        self.short_count = 0;
        self.fault = ActuatorFault::None;
        self.fault_confirmed = false;
        self.outputs_latched_off = false;
        self.current_command = HeadlightCommand::Off;
        self.write_outputs(false, false);
    }

    /// One 10 ms cycle applying `command`.
    pub fn main_function(
        &mut self,
        now: u32,
        command: HeadlightCommand,
        diag: &mut dyn DiagnosticSink,
        flow: &mut dyn CheckpointSink,
    ) {
        flow.checkpoint_reached(SupervisedEntity::HeadlightDriver, Checkpoint::MainEntry);

        if command != self.current_command {
            self.command_change_tick = now;
        }

        self.set_outputs(command);
        self.read_feedback();
        self.check_open_load(now, command);
        self.check_short_circuit();
        self.update_fault_status();
        self.current_command = command;

        self.report_events(diag);
    }

    fn set_outputs(&mut self, command: HeadlightCommand) {
        let (low, high) = if self.outputs_latched_off {
            (false, false)
        } else {
            match command {
                HeadlightCommand::Off => (false, false),
                HeadlightCommand::LowBeam => (true, false),
                HeadlightCommand::HighBeam => (true, true),
            }
        };
        self.low_on = low;
        self.high_on = high;
        self.write_outputs(low, high);
    }

    fn write_outputs(&self, low: bool, high: bool) {
        // The simulated bank cannot fail on the configured channels; on a
        // real target a write failure is invisible here and caught by the
        // feedback diagnosis instead.
        let _ = self.dio.write(DIO_CHANNEL_LOW_BEAM, low);
        let _ = self.dio.write(DIO_CHANNEL_HIGH_BEAM, high);
    }

    fn read_feedback(&mut self) {
        if let Ok(raw) = self.adc.read(ADC_CHANNEL_CURRENT) {
            self.feedback_ma = u32::from(raw) * u32::from(HEADLIGHT_CURRENT_FACTOR);
        }
        self.feedback_on = self.feedback_ma >= u32::from(HEADLIGHT_MIN_CURRENT_MA);
    }

    fn check_open_load(&mut self, now: u32, command: HeadlightCommand) {
        if command == HeadlightCommand::Off {
            self.open_load_count = 0;
            return;
        }
        // Let the load settle after a command change before judging it.
        if now.wrapping_sub(self.command_change_tick) < HEADLIGHT_FAULT_DETECT_MS {
            return;
        }
        if self.feedback_ma < u32::from(HEADLIGHT_OPEN_LOAD_MA) {
            self.open_load_count = self.open_load_count.saturating_add(1);
            if self.open_load_count >= HEADLIGHT_FAULT_CONFIRM_CYCLES {
                if !self.fault_confirmed {
                    error!("headlight open load confirmed");
                }
                self.fault = ActuatorFault::OpenLoad;
                self.fault_confirmed = true;
            }
        } else {
            self.open_load_count = 0;
        }
    }

    fn check_short_circuit(&mut self) {
        if self.feedback_ma > u32::from(HEADLIGHT_MAX_CURRENT_MA) {
            self.short_count = self.short_count.saturating_add(1);
            if self.short_count >= HEADLIGHT_FAULT_CONFIRM_CYCLES {
                if !self.outputs_latched_off {
                    error!(
                        feedback_ma = self.feedback_ma,
                        "over-current confirmed, forcing outputs off"
                    );
                }
                self.fault = ActuatorFault::ShortCircuit;
                self.fault_confirmed = true;
                self.outputs_latched_off = true;
                self.low_on = false;
                self.high_on = false;
                self.write_outputs(false, false);
            }
        } else {
            self.short_count = 0;
        }
    }

    fn update_fault_status(&mut self) {
        if self.open_load_count == 0 && self.short_count == 0 && !self.fault_confirmed {
            self.fault = ActuatorFault::None;
        }
    }

    fn report_events(&self, diag: &mut dyn DiagnosticSink) {
        diag.report(
            DiagEvent::HeadlightOpenLoad,
            if self.fault == ActuatorFault::OpenLoad {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
        diag.report(
            DiagEvent::HeadlightShortCircuit,
            if self.fault == ActuatorFault::ShortCircuit {
                EventReport::Failed
            } else {
                EventReport::Passed
            },
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
