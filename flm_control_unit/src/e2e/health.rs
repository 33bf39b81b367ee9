//! Communication health state machine.
//!
//! Consumes the per-frame verdict stream and produces the aggregated
//! [`E2eHealth`]. OK-ish verdicts (OK, OKSOMELOST, INITIAL) build up
//! confidence, errors tear it down; REPEATED counts as an error but does
//! not destroy accumulated confidence. Both counters saturate at 255.

use flm_common::consts::{
    E2E_MAX_ERR_INIT, E2E_MAX_ERR_VALID, E2E_MIN_OK_INIT, E2E_MIN_OK_INVALID,
};
use flm_common::types::{E2eHealth, E2eVerdict};

/// Qualification thresholds for the health state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// OK-ish verdicts required for INIT → VALID.
    pub min_ok_init: u8,
    /// Errors tolerated in INIT before → INVALID.
    pub max_err_init: u8,
    /// Errors tolerated in VALID before → INVALID.
    pub max_err_valid: u8,
    /// OK-ish verdicts required for INVALID → VALID.
    pub min_ok_invalid: u8,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_ok_init: E2E_MIN_OK_INIT,
            max_err_init: E2E_MAX_ERR_INIT,
            max_err_valid: E2E_MAX_ERR_VALID,
            min_ok_invalid: E2E_MIN_OK_INVALID,
        }
    }
}

/// Verdict-stream classifier.
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitor {
    config: HealthConfig,
    state: E2eHealth,
    ok_count: u8,
    err_count: u8,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl HealthMonitor {
    pub const fn new(config: HealthConfig) -> Self {
        Self {
            config,
            state: E2eHealth::Deinit,
            ok_count: 0,
            err_count: 0,
        }
    }

    /// Current aggregated health.
    #[inline]
    pub const fn state(&self) -> E2eHealth {
        self.state
    }

    /// Rolling OK-ish verdict count since the last transition.
    #[inline]
    pub const fn ok_count(&self) -> u8 {
        self.ok_count
    }

    /// Rolling error verdict count since the last transition.
    #[inline]
    pub const fn err_count(&self) -> u8 {
        self.err_count
    }

    /// Feed one verdict and advance the state machine.
    pub fn step(&mut self, verdict: E2eVerdict) -> E2eHealth {
        if verdict.is_ok() {
            self.ok_count = self.ok_count.saturating_add(1);
            self.err_count = 0;
        } else {
            self.err_count = self.err_count.saturating_add(1);
            // A repeated frame proves the sender is alive; it stalls
            // qualification but does not erase it.
            if verdict != E2eVerdict::Repeated {
                self.ok_count = 0;
            }
        }

        self.state = match self.state {
            E2eHealth::Deinit => E2eHealth::NoData,
            E2eHealth::NoData => {
                if verdict != E2eVerdict::NoNewData {
                    E2eHealth::Init
                } else {
                    E2eHealth::NoData
                }
            }
            E2eHealth::Init => {
                if self.ok_count >= self.config.min_ok_init {
                    self.reset_counts();
                    E2eHealth::Valid
                } else if self.err_count >= self.config.max_err_init {
                    self.reset_counts();
                    E2eHealth::Invalid
                } else {
                    E2eHealth::Init
                }
            }
            E2eHealth::Valid => {
                if self.err_count >= self.config.max_err_valid {
                    self.reset_counts();
                    E2eHealth::Invalid
                } else {
                    E2eHealth::Valid
                }
            }
            E2eHealth::Invalid => {
                if self.ok_count >= self.config.min_ok_invalid {
                    self.reset_counts();
                    E2eHealth::Valid
                } else {
                    E2eHealth::Invalid
                }
            }
        };
        self.state
    }

    fn reset_counts(&mut self) {
        self.ok_count = 0;
        self.err_count = 0;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
