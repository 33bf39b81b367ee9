//! Diagnostic event model.
//!
//! Components report qualification results (PASSED/FAILED per event) to a
//! [`DiagnosticSink`] every task cycle — fire and forget, no backpressure.
//! The sink decides debouncing and storage; components never block on it.

use serde::{Deserialize, Serialize};

/// Stable identifiers of the diagnostic events raised by the FLM system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum DiagEvent {
    /// Light switch frame failed end-to-end protection.
    E2eLightSwitchFailed = 0x01,
    /// Ambient light sensor open circuit.
    AmbientOpenCircuit = 0x02,
    /// Ambient light sensor short circuit.
    AmbientShortCircuit = 0x03,
    /// Ambient light rate-of-change plausibility error.
    AmbientPlausibility = 0x04,
    /// Headlight open load.
    HeadlightOpenLoad = 0x05,
    /// Headlight short circuit.
    HeadlightShortCircuit = 0x06,
    /// Bus message timeout.
    CanTimeout = 0x07,
    /// Program-flow supervision failed.
    WatchdogSupervisionFailed = 0x08,
    /// Safe state entered.
    SafeStateEntered = 0x09,
}

impl DiagEvent {
    /// All events, in id order. Used by recorders to size their tables.
    pub const ALL: [DiagEvent; 9] = [
        DiagEvent::E2eLightSwitchFailed,
        DiagEvent::AmbientOpenCircuit,
        DiagEvent::AmbientShortCircuit,
        DiagEvent::AmbientPlausibility,
        DiagEvent::HeadlightOpenLoad,
        DiagEvent::HeadlightShortCircuit,
        DiagEvent::CanTimeout,
        DiagEvent::WatchdogSupervisionFailed,
        DiagEvent::SafeStateEntered,
    ];

    /// Zero-based table index for recorder storage.
    #[inline]
    pub const fn index(&self) -> usize {
        (*self as u16 as usize) - 1
    }
}

/// Qualification result reported by a monitor for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventReport {
    /// Test ran and passed — jump straight to the qualified-passed level.
    Passed = 0,
    /// Test ran and failed — jump straight to the qualified-failed level.
    Failed = 1,
    /// Weak pass indication, steps the debounce counter down.
    Prepassed = 2,
    /// Weak fail indication, steps the debounce counter up.
    Prefailed = 3,
}

/// Receiver of diagnostic event reports.
///
/// Implementations must not block; a report is a cheap state update.
pub trait DiagnosticSink {
    /// Record one qualification result for `event`.
    fn report(&mut self, event: DiagEvent, status: EventReport);
}

/// Sink that discards every report. Useful for benches and isolated tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn report(&mut self, _event: DiagEvent, _status: EventReport) {}
}
