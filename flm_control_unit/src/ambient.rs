//! Ambient light sensor task.
//!
//! Runs every 20 ms. Samples the ambient ADC channel, filters over a
//! 4-sample ring buffer, diagnoses the electrical path (open / short) and
//! the signal dynamics (rate-of-change plausibility), and publishes an
//! [`AmbientLight`] snapshot. The reading only qualifies once the window is
//! full and no fault is active.

use std::sync::Arc;

use flm_common::consts::{
    ADC_CHANNEL_AMBIENT, ADC_SAMPLES, AMBIENT_OPEN_CIRCUIT, AMBIENT_RATE_LIMIT,
    AMBIENT_SHORT_CIRCUIT,
};
use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};
use flm_common::hal::AnalogInput;
use flm_common::supervision::{Checkpoint, CheckpointSink, SupervisedEntity};
use flm_common::types::{AmbientLight, SignalStatus};

/// Rate-of-change check interval: every 5 cycles ≈ 100 ms.
const RATE_CHECK_CYCLES: u8 = 5;

/// Rate violations needed to confirm a plausibility fault.
const PLAUSIBILITY_DEBOUNCE: u8 = 3;

/// Conditioned ambient light input.
pub struct AmbientSensor {
    adc: Arc<dyn AnalogInput>,
    buffer: [u16; ADC_SAMPLES],
    write_index: usize,
    sample_count: usize,
    raw: u16,
    filtered: u16,
    previous_filtered: u16,
    rate_check_counter: u8,
    rate_of_change: u16,
    plausibility_error_count: u8,
    plausibility_fault: bool,
    signal_status: SignalStatus,
    output: AmbientLight,
}

impl AmbientSensor {
    pub fn new(adc: Arc<dyn AnalogInput>) -> Self {
        Self {
            adc,
            buffer: [0; ADC_SAMPLES],
            write_index: 0,
            sample_count: 0,
            raw: 0,
            filtered: 0,
            previous_filtered: 0,
            rate_check_counter: 0,
            rate_of_change: 0,
            plausibility_error_count: 0,
            plausibility_fault: false,
            signal_status: SignalStatus::Invalid,
            output: AmbientLight::default(),
        }
    }

    /// Snapshot of the conditioned reading.
    #[inline]
    pub fn output(&self) -> AmbientLight {
        self.output
    }

    /// Diagnosis status of the sensor path.
    #[inline]
    pub fn signal_status(&self) -> SignalStatus {
        self.signal_status
    }

    /// Filtered ADC value.
    #[inline]
    pub fn filtered(&self) -> u16 {
        self.filtered
    }

    /// Most recent rate-of-change sample [ADC counts per 100 ms].
    #[inline]
    pub fn rate_of_change(&self) -> u16 {
        self.rate_of_change
    }

    /// Plausibility fault currently confirmed.
    #[inline]
    pub fn plausibility_fault(&self) -> bool {
        self.plausibility_fault
    }

    /// One 20 ms cycle.
    pub fn main_function(
        &mut self,
        diag: &mut dyn DiagnosticSink,
        flow: &mut dyn CheckpointSink,
    ) {
        flow.checkpoint_reached(SupervisedEntity::AmbientSensor, Checkpoint::MainEntry);

        self.sample();
        self.apply_filter();
        self.check_circuit();
        self.check_plausibility();
        self.update_output();
        self.report_events(diag);
    }

    fn sample(&mut self) {
        // A failed conversion keeps the previous raw value; the filter and
        // the plausibility check then see a frozen signal, which is the
        // conservative interpretation.
        if let Ok(value) = self.adc.read(ADC_CHANNEL_AMBIENT) {
            self.raw = value;
        }
    }

    fn apply_filter(&mut self) {
        self.buffer[self.write_index] = self.raw;
        self.write_index = (self.write_index + 1) % ADC_SAMPLES;
        if self.sample_count < ADC_SAMPLES {
            self.sample_count += 1;
        }

        let sum: u32 = self.buffer[..self.sample_count]
            .iter()
            .map(|&sample| u32::from(sample))
            .sum();
        self.filtered = (sum / self.sample_count as u32) as u16;
    }

    fn check_circuit(&mut self) {
        if self.filtered < AMBIENT_OPEN_CIRCUIT {
            self.signal_status = SignalStatus::OpenCircuit;
            self.output.is_valid = false;
        } else if self.filtered > AMBIENT_SHORT_CIRCUIT {
            self.signal_status = SignalStatus::ShortCircuit;
            self.output.is_valid = false;
        }
    }

    fn check_plausibility(&mut self) {
        self.rate_check_counter += 1;
        if self.rate_check_counter < RATE_CHECK_CYCLES {
            return;
        }
        self.rate_check_counter = 0;

        self.rate_of_change = self.filtered.abs_diff(self.previous_filtered);

        if self.rate_of_change > AMBIENT_RATE_LIMIT {
            if self.plausibility_error_count < PLAUSIBILITY_DEBOUNCE {
                self.plausibility_error_count += 1;
            }
            if self.plausibility_error_count >= PLAUSIBILITY_DEBOUNCE {
                self.plausibility_fault = true;
                self.signal_status = SignalStatus::Plausibility;
                self.output.is_valid = false;
            }
        } else {
            // Debounce resets completely on any plausible interval; a
            // confirmed fault clears as soon as the signal settles.
            self.plausibility_error_count = 0;
            self.plausibility_fault = false;
        }

        self.previous_filtered = self.filtered;
    }

    fn update_output(&mut self) {
        // Re-evaluate the fault conditions on the current cycle so a fault
        // clears as soon as its condition does; the status enum alone would
        // latch the first fault forever.
        let fault_active = self.filtered < AMBIENT_OPEN_CIRCUIT
            || self.filtered > AMBIENT_SHORT_CIRCUIT
            || self.plausibility_fault;

        if !fault_active {
            if self.sample_count >= ADC_SAMPLES {
                self.signal_status = SignalStatus::Valid;
                self.output.is_valid = true;
            } else {
                self.signal_status = SignalStatus::Invalid;
                self.output.is_valid = false;
            }
        }

        self.output.adc = self.filtered;
        self.output.lux = self.filtered / 4;
    }

    fn report_events(&self, diag: &mut dyn DiagnosticSink) {
        diag.report(
            DiagEvent::AmbientOpenCircuit,
            report_for(self.signal_status == SignalStatus::OpenCircuit),
        );
        diag.report(
            DiagEvent::AmbientShortCircuit,
            report_for(self.signal_status == SignalStatus::ShortCircuit),
        );
        diag.report(
            DiagEvent::AmbientPlausibility,
            report_for(self.plausibility_fault),
        );
    }
}

#[inline]
fn report_for(failed: bool) -> EventReport {
    if failed {
        EventReport::Failed
    } else {
        EventReport::Passed
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
