//! In-memory diagnostic event recorder.
//!
//! Implements [`DiagnosticSink`] with counter-based debouncing and a UDS
//! status byte per event. PASSED/FAILED reports jump the counter straight
//! to the qualification thresholds; PREPASSED/PREFAILED step it by one.
//! Qualified results update the status byte and the occurrence counter.
//! Everything lives in RAM: no persistence, no aging, no healing.

use flm_common::diag::{DiagEvent, DiagnosticSink, EventReport};

/// Debounce counter level at which a failure qualifies.
const FAIL_THRESHOLD: i16 = 3;

/// Debounce counter level at which a pass qualifies.
const PASS_THRESHOLD: i16 = -3;

/// Capacity of the event memory (confirmed events).
const EVENT_MEMORY_SIZE: usize = 8;

// UDS status byte bits (ISO 14229 DTC status).
/// Test failed.
pub const UDS_TF: u8 = 0x01;
/// Test failed this operation cycle.
pub const UDS_TFTOC: u8 = 0x02;
/// Pending DTC.
pub const UDS_PDTC: u8 = 0x04;
/// Confirmed DTC.
pub const UDS_CDTC: u8 = 0x08;
/// Test not completed since last clear.
pub const UDS_TNCSLC: u8 = 0x10;
/// Test failed since last clear.
pub const UDS_TFSLC: u8 = 0x20;
/// Test not completed this operation cycle.
pub const UDS_TNCTOC: u8 = 0x40;

/// Per-event runtime record.
#[derive(Debug, Clone, Copy)]
struct EventRecord {
    uds_status: u8,
    debounce: i16,
    occurrences: u16,
    stored: bool,
}

impl Default for EventRecord {
    fn default() -> Self {
        Self {
            // Never tested: not-completed bits set, everything else clear.
            uds_status: UDS_TNCSLC | UDS_TNCTOC,
            debounce: 0,
            occurrences: 0,
            stored: false,
        }
    }
}

/// RAM-backed diagnostic event recorder.
#[derive(Debug)]
pub struct DiagnosticRecorder {
    records: [EventRecord; DiagEvent::ALL.len()],
    stored_count: usize,
}

impl Default for DiagnosticRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRecorder {
    pub fn new() -> Self {
        Self {
            records: [EventRecord::default(); DiagEvent::ALL.len()],
            stored_count: 0,
        }
    }

    /// UDS status byte of `event`.
    pub fn uds_status(&self, event: DiagEvent) -> u8 {
        self.records[event.index()].uds_status
    }

    /// Event currently qualified failed.
    pub fn is_failed(&self, event: DiagEvent) -> bool {
        self.records[event.index()].uds_status & UDS_TF != 0
    }

    /// How often the event qualified failed.
    pub fn occurrence_count(&self, event: DiagEvent) -> u16 {
        self.records[event.index()].occurrences
    }

    /// Number of events held in the confirmed-event memory.
    pub fn stored_event_count(&self) -> usize {
        self.stored_count
    }

    /// Events currently qualified failed, in id order.
    pub fn failed_events(&self) -> Vec<DiagEvent> {
        DiagEvent::ALL
            .iter()
            .copied()
            .filter(|event| self.is_failed(*event))
            .collect()
    }

    /// Drop all records, as after a diagnostic clear.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    fn qualify(&mut self, event: DiagEvent, failed: bool) {
        let stored_count = &mut self.stored_count;
        let record = &mut self.records[event.index()];

        record.uds_status &= !UDS_TNCTOC;
        if failed {
            record.uds_status |= UDS_TF | UDS_TFTOC | UDS_TFSLC | UDS_PDTC;
            record.uds_status &= !UDS_TNCSLC;
            record.occurrences = record.occurrences.saturating_add(1);
            if !record.stored && *stored_count < EVENT_MEMORY_SIZE {
                record.stored = true;
                record.uds_status |= UDS_CDTC;
                *stored_count += 1;
            }
        } else {
            record.uds_status &= !(UDS_TF | UDS_TFTOC);
            record.uds_status &= !UDS_TNCSLC;
        }
    }
}

impl DiagnosticSink for DiagnosticRecorder {
    fn report(&mut self, event: DiagEvent, status: EventReport) {
        let debounce = {
            let record = &mut self.records[event.index()];
            match status {
                EventReport::Failed => record.debounce = FAIL_THRESHOLD,
                EventReport::Passed => record.debounce = PASS_THRESHOLD,
                EventReport::Prefailed => {
                    record.debounce = (record.debounce + 1).min(FAIL_THRESHOLD);
                }
                EventReport::Prepassed => {
                    record.debounce = (record.debounce - 1).max(PASS_THRESHOLD);
                }
            }
            record.debounce
        };

        if debounce >= FAIL_THRESHOLD {
            self.qualify(event, true);
        } else if debounce <= PASS_THRESHOLD {
            self.qualify(event, false);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untested_event_reports_not_completed() {
        let recorder = DiagnosticRecorder::new();
        assert_eq!(
            recorder.uds_status(DiagEvent::CanTimeout),
            UDS_TNCSLC | UDS_TNCTOC
        );
        assert!(!recorder.is_failed(DiagEvent::CanTimeout));
    }

    #[test]
    fn failed_report_qualifies_immediately() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);

        assert!(recorder.is_failed(DiagEvent::CanTimeout));
        let status = recorder.uds_status(DiagEvent::CanTimeout);
        assert_ne!(status & UDS_TF, 0);
        assert_ne!(status & UDS_TFTOC, 0);
        assert_ne!(status & UDS_TFSLC, 0);
        assert_ne!(status & UDS_PDTC, 0);
        assert_ne!(status & UDS_CDTC, 0);
        assert_eq!(status & (UDS_TNCSLC | UDS_TNCTOC), 0);
        assert_eq!(recorder.occurrence_count(DiagEvent::CanTimeout), 1);
    }

    #[test]
    fn passed_report_clears_current_failure_bits() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
        recorder.report(DiagEvent::CanTimeout, EventReport::Passed);

        let status = recorder.uds_status(DiagEvent::CanTimeout);
        assert_eq!(status & (UDS_TF | UDS_TFTOC), 0);
        // History survives the pass.
        assert_ne!(status & UDS_TFSLC, 0);
        assert_ne!(status & UDS_CDTC, 0);
    }

    #[test]
    fn prefailed_debounces_to_failure() {
        let mut recorder = DiagnosticRecorder::new();
        for _ in 0..FAIL_THRESHOLD - 1 {
            recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prefailed);
            assert!(!recorder.is_failed(DiagEvent::HeadlightOpenLoad));
        }
        recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prefailed);
        assert!(recorder.is_failed(DiagEvent::HeadlightOpenLoad));
    }

    #[test]
    fn prepassed_walks_the_counter_back() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prefailed);
        recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prefailed);
        for _ in 0..6 {
            recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prepassed);
        }
        assert!(!recorder.is_failed(DiagEvent::HeadlightOpenLoad));
        // Counter saturates at the pass threshold.
        recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Prepassed);
        assert!(!recorder.is_failed(DiagEvent::HeadlightOpenLoad));
    }

    #[test]
    fn occurrences_count_each_qualified_failure() {
        let mut recorder = DiagnosticRecorder::new();
        for _ in 0..3 {
            recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
            recorder.report(DiagEvent::CanTimeout, EventReport::Passed);
        }
        assert_eq!(recorder.occurrence_count(DiagEvent::CanTimeout), 3);
    }

    #[test]
    fn failed_events_lists_active_failures() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
        recorder.report(DiagEvent::AmbientOpenCircuit, EventReport::Failed);
        recorder.report(DiagEvent::HeadlightOpenLoad, EventReport::Passed);

        assert_eq!(
            recorder.failed_events(),
            vec![DiagEvent::AmbientOpenCircuit, DiagEvent::CanTimeout]
        );
    }

    #[test]
    fn event_memory_counts_distinct_confirmed_events() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
        recorder.report(DiagEvent::AmbientShortCircuit, EventReport::Failed);
        assert_eq!(recorder.stored_event_count(), 2);
    }

    #[test]
    fn clear_resets_everything() {
        let mut recorder = DiagnosticRecorder::new();
        recorder.report(DiagEvent::CanTimeout, EventReport::Failed);
        recorder.clear();
        assert_eq!(
            recorder.uds_status(DiagEvent::CanTimeout),
            UDS_TNCSLC | UDS_TNCTOC
        );
        assert_eq!(recorder.stored_event_count(), 0);
    }
}
