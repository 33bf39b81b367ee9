//! Host run configuration.
//!
//! The control parameters of the pipeline are compile-time constants; what
//! the TOML file configures is the *run harness*: how long to run, whether
//! to pace real time, the initial simulated ambient level, and how often to
//! emit the status line. Missing file means defaults; a malformed or
//! implausible file is a fatal initialization error.

use std::path::Path;

use serde::Deserialize;

use flm_common::consts::ADC_MAX_VALUE;

// ─── Error Type ─────────────────────────────────────────────────────

/// Run-configuration loading/validation error.
#[derive(Debug)]
pub enum ConfigError {
    /// File I/O error.
    IoError(String),
    /// TOML parse error.
    ParseError(String),
    /// Value outside its plausible range.
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "config I/O error: {e}"),
            Self::ParseError(e) => write!(f, "config parse error: {e}"),
            Self::ValidationError(e) => write!(f, "config validation: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ─── Run Config ─────────────────────────────────────────────────────

/// Harness parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    /// Stop after this many ticks; 0 runs until the stop signal.
    pub tick_limit: u64,
    /// Sleep one tick period per tick to approximate wall-clock pacing.
    pub real_time: bool,
    /// Ambient ADC level injected at startup.
    pub ambient_adc: u16,
    /// Status line interval [ms]; 0 disables the status line.
    pub status_interval_ms: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_limit: 0,
            real_time: true,
            ambient_adc: 2000,
            status_interval_ms: 100,
        }
    }
}

impl RunConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ambient_adc > ADC_MAX_VALUE {
            return Err(ConfigError::ValidationError(format!(
                "ambient_adc {} exceeds 12-bit range ({})",
                self.ambient_adc, ADC_MAX_VALUE
            )));
        }
        if self.status_interval_ms != 0 && self.status_interval_ms < 10 {
            return Err(ConfigError::ValidationError(format!(
                "status_interval_ms {} below 10 ms floods the log",
                self.status_interval_ms
            )));
        }
        Ok(())
    }
}

/// Parse and validate a run configuration from a TOML string.
pub fn run_config_from_str(toml_str: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load a run configuration; a missing file yields the defaults.
pub fn load_run_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let toml_str = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(RunConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::IoError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    run_config_from_str(&toml_str)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ambient_adc, 2000);
        assert!(config.real_time);
    }

    #[test]
    fn parses_full_config() {
        let config = run_config_from_str(
            r#"
            tick_limit = 5000
            real_time = false
            ambient_adc = 1200
            status_interval_ms = 200
            "#,
        )
        .unwrap();
        assert_eq!(config.tick_limit, 5000);
        assert!(!config.real_time);
        assert_eq!(config.ambient_adc, 1200);
        assert_eq!(config.status_interval_ms, 200);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config = run_config_from_str("tick_limit = 100\n").unwrap();
        assert_eq!(config.tick_limit, 100);
        assert_eq!(config.ambient_adc, RunConfig::default().ambient_adc);
    }

    #[test]
    fn rejects_out_of_range_ambient() {
        let err = run_config_from_str("ambient_adc = 5000\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn rejects_flooding_status_interval() {
        let err = run_config_from_str("status_interval_ms = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        // Zero means disabled and is fine.
        assert!(run_config_from_str("status_interval_ms = 0\n").is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = run_config_from_str("cycle_time_us = 1000\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_run_config(Path::new("/nonexistent/flm_run.toml")).unwrap();
        assert_eq!(config, RunConfig::default());
    }
}
