//! State enums and snapshot structs shared across the FLM workspace.
//!
//! All enums use `#[repr(u8)]` with a distinguished default so that a
//! zero-initialized structure is in a well-defined state. Cross-component
//! reads are by-value snapshots of the structs defined here.

use serde::{Deserialize, Serialize};

// ─── Light Switch ───────────────────────────────────────────────────

/// Driver request received over the vehicle bus (frame byte 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LightSwitchCommand {
    /// Lights off.
    Off = 0,
    /// Low beam requested.
    LowBeam = 1,
    /// High beam requested.
    HighBeam = 2,
    /// Automatic mode — ambient light decides.
    Auto = 3,
}

impl LightSwitchCommand {
    /// Convert from the raw frame byte. Returns `None` for values > 3.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::LowBeam),
            2 => Some(Self::HighBeam),
            3 => Some(Self::Auto),
            _ => None,
        }
    }
}

impl Default for LightSwitchCommand {
    fn default() -> Self {
        Self::Off
    }
}

/// Validated light switch request published by the switch input task.
///
/// When `is_valid` is false the last accepted command is retained — the
/// consumer decides what an invalid request means, not the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LightSwitchStatus {
    /// Last accepted command.
    pub command: LightSwitchCommand,
    /// Communication path is healthy and not timed out.
    pub is_valid: bool,
    /// Verdict of the most recent protection check.
    pub e2e_verdict: E2eVerdict,
}

// ─── Headlight ──────────────────────────────────────────────────────

/// Actuation command towards the headlight output stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HeadlightCommand {
    /// Both relays off.
    Off = 0,
    /// Low beam relay on.
    LowBeam = 1,
    /// Low and high beam relays on.
    HighBeam = 2,
}

impl HeadlightCommand {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::LowBeam),
            2 => Some(Self::HighBeam),
            _ => None,
        }
    }
}

impl Default for HeadlightCommand {
    fn default() -> Self {
        Self::Off
    }
}

/// Output stage fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActuatorFault {
    /// No fault detected.
    None = 0,
    /// Commanded on but no load current.
    OpenLoad = 1,
    /// Over-current — outputs forced low.
    ShortCircuit = 2,
}

impl Default for ActuatorFault {
    fn default() -> Self {
        Self::None
    }
}

// ─── Ambient Light ──────────────────────────────────────────────────

/// Diagnosis status of an input signal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignalStatus {
    /// Not yet qualified (startup, insufficient samples).
    Invalid = 0,
    /// Signal qualified and plausible.
    Valid = 1,
    /// Reading below the open-circuit floor.
    OpenCircuit = 2,
    /// Reading above the short-circuit ceiling.
    ShortCircuit = 3,
    /// Rate-of-change plausibility violated.
    Plausibility = 4,
    /// Source stopped updating.
    Timeout = 5,
}

impl Default for SignalStatus {
    fn default() -> Self {
        Self::Invalid
    }
}

/// Conditioned ambient light reading published by the sensor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AmbientLight {
    /// Filtered 12-bit ADC value (0..=4095).
    pub adc: u16,
    /// Approximate illuminance [lux].
    pub lux: u16,
    /// Averaging window filled and no active sensor fault.
    pub is_valid: bool,
}

// ─── E2E Protection ─────────────────────────────────────────────────

/// Per-message verdict of the end-to-end protection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum E2eVerdict {
    /// First frame after (re)initialization; counter adopted.
    Initial = 0,
    /// CRC and counter in sequence.
    Ok = 1,
    /// Counter jumped within tolerance; some frames lost.
    OkSomeLost = 2,
    /// CRC mismatch.
    WrongCrc = 3,
    /// Counter jumped beyond tolerance or went backwards.
    WrongSequence = 4,
    /// Same counter as the previous frame.
    Repeated = 5,
    /// No fresh frame for too many check cycles.
    NoNewData = 6,
}

impl E2eVerdict {
    /// OK-ish verdicts advance communication health; the rest degrade it.
    #[inline]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok | Self::OkSomeLost | Self::Initial)
    }
}

impl Default for E2eVerdict {
    fn default() -> Self {
        Self::Initial
    }
}

/// Aggregated communication health derived from the verdict stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum E2eHealth {
    /// Not yet stepped.
    Deinit = 0,
    /// Stepped, but no frame ever seen.
    NoData = 1,
    /// Frames seen, qualification in progress.
    Init = 2,
    /// Communication qualified.
    Valid = 3,
    /// Communication disqualified.
    Invalid = 4,
}

impl Default for E2eHealth {
    fn default() -> Self {
        Self::Deinit
    }
}

// ─── Control & Safety States ────────────────────────────────────────

/// State of the headlight decision state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlState {
    /// Waiting for all inputs to qualify.
    Init = 0,
    /// All inputs valid, full function.
    Normal = 1,
    /// Inputs degraded, bounded time before SAFE.
    Degraded = 2,
    /// Terminal safe state.
    Safe = 3,
}

impl ControlState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Init),
            1 => Some(Self::Normal),
            2 => Some(Self::Degraded),
            3 => Some(Self::Safe),
            _ => None,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::Init
    }
}

/// Why the safe state was requested. `None` is the quiescent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafeStateReason {
    /// No safe state requested.
    None = 0,
    /// E2E health left VALID for longer than the E2E timeout.
    E2eFailure = 1,
    /// Bus silence beyond the message timeout.
    CanTimeout = 2,
    /// Ambient sensor failure.
    SensorFailure = 3,
    /// Headlight output stage failure.
    ActuatorFailure = 4,
    /// Program-flow supervision failed or expired.
    WatchdogFailure = 5,
    /// Too many simultaneous component faults.
    MultiFault = 6,
    /// A fault persisted beyond the fault tolerant time interval.
    Timeout = 7,
}

impl Default for SafeStateReason {
    fn default() -> Self {
        Self::None
    }
}

/// Aggregated system safety status published by the safety monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SafetyStatus {
    /// No component faults.
    Ok = 0,
    /// Exactly one component fault.
    Warning = 1,
    /// Two or more component faults.
    Degraded = 2,
    /// Safe state entered.
    SafeState = 3,
}

impl Default for SafetyStatus {
    fn default() -> Self {
        Self::Ok
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
