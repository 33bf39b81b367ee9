//! # FLM Control Unit
//!
//! Cyclically scheduled, safety-oriented control pipeline for a front light
//! management ECU. A deterministic millisecond dispatcher drives five
//! periodic tasks that ingest a protected light-switch request from the
//! vehicle bus and an ambient-light reading, decide a headlight actuation
//! command, drive the output stage, and supervise the whole path within a
//! bounded fault tolerant time interval.
//!
//! ## Pipeline
//!
//! 1. **E2E protection** — CRC-8/counter check per frame plus a
//!    communication-health state machine ([`e2e`]).
//! 2. **Input conditioning** — validated switch request ([`switch`]) and
//!    filtered, plausibility-checked ambient light ([`ambient`]).
//! 3. **Decision** — four-state controller with AUTO-mode hysteresis
//!    ([`decision`]).
//! 4. **Actuation** — relay outputs with open-load/over-current diagnosis
//!    ([`actuator`]).
//! 5. **Supervision** — cross-component fault aggregation and FTTI tracking
//!    ([`safety`]), alive supervision ([`supervision`]), diagnostic event
//!    recording ([`diag`]).
//!
//! All tasks run single-threaded inside the [`sched::Dispatcher`]; the only
//! asynchronous boundary is the bus frame latch.

pub mod actuator;
pub mod ambient;
pub mod config;
pub mod decision;
pub mod diag;
pub mod e2e;
pub mod safety;
pub mod sched;
pub mod supervision;
pub mod switch;
