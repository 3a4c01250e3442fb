//! Analysis configuration validation.
//!
//! Every check runs and every failure is reported, so a user fixing a
//! config file sees all problems at once.
//!
//! # Example
//!
//! ```rust
//! use retrosg_config::{AnalysisConfig, validate_config};
//!
//! let mut config = AnalysisConfig::default();
//! config.taper.high_cut_hz = 30000.0;
//! assert!(validate_config(&config, 48000.0).is_err());
//! ```

use crate::analysis::AnalysisConfig;
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A value is invalid on its own or relative to another value.
    #[error("invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted path of the offending setting, e.g. `taper.low_cut_hz`.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate `config` for signals sampled at `sample_rate`.
pub fn validate_config(config: &AnalysisConfig, sample_rate: f64) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let nyquist = sample_rate / 2.0;

    if let Some(relative) = config.deconvolution.floor_relative
        && !(relative.is_finite() && relative > 0.0 && relative < 1.0)
    {
        errors.push(ValidationError::invalid(
            "deconvolution.floor_relative",
            format!("{relative} is outside (0, 1)"),
        ));
    }

    let windows = &config.windows;
    if !(windows.pre_delay_s.is_finite() && windows.pre_delay_s >= 0.0) {
        errors.push(ValidationError::invalid(
            "windows.pre_delay_s",
            format!("{} s must be non-negative", windows.pre_delay_s),
        ));
    }
    if !(windows.window_duration_s.is_finite() && windows.window_duration_s > 0.0) {
        errors.push(ValidationError::invalid(
            "windows.window_duration_s",
            format!("{} s must be positive", windows.window_duration_s),
        ));
    }
    if windows.reference_channel > 1 {
        errors.push(ValidationError::invalid(
            "windows.reference_channel",
            format!("channel {} does not exist in a mono or stereo signal", windows.reference_channel),
        ));
    }

    let taper = &config.taper;
    if !(taper.low_cut_hz.is_finite() && taper.low_cut_hz > 0.0) {
        errors.push(ValidationError::invalid(
            "taper.low_cut_hz",
            format!("{} Hz must be positive", taper.low_cut_hz),
        ));
    }
    if !(taper.high_cut_hz.is_finite() && taper.high_cut_hz < nyquist) {
        errors.push(ValidationError::invalid(
            "taper.high_cut_hz",
            format!("{} Hz must be below Nyquist ({nyquist} Hz)", taper.high_cut_hz),
        ));
    }
    if taper.low_cut_hz >= taper.high_cut_hz {
        errors.push(ValidationError::invalid(
            "taper",
            format!(
                "low cut {} Hz must be below high cut {} Hz",
                taper.low_cut_hz, taper.high_cut_hz
            ),
        ));
    }

    let limit = config.safeguard.high_freq_limit_hz;
    if !(limit.is_finite() && limit > 0.0) {
        errors.push(ValidationError::invalid(
            "safeguard.high_freq_limit_hz",
            format!("{limit} Hz must be positive"),
        ));
    }

    let optimizer = &config.optimizer;
    if !(optimizer.threshold_start_db.is_finite() && optimizer.threshold_stop_db.is_finite()) {
        errors.push(ValidationError::invalid(
            "optimizer",
            "threshold bounds must be finite",
        ));
    } else if optimizer.threshold_start_db > optimizer.threshold_stop_db {
        errors.push(ValidationError::invalid(
            "optimizer",
            format!(
                "start {} dB is above stop {} dB",
                optimizer.threshold_start_db, optimizer.threshold_stop_db
            ),
        ));
    }
    if !(optimizer.threshold_step_db.is_finite() && optimizer.threshold_step_db > 0.0) {
        errors.push(ValidationError::invalid(
            "optimizer.threshold_step_db",
            format!("{} dB must be positive", optimizer.threshold_step_db),
        ));
    }

    let smoothing = &config.smoothing;
    for (field, value) in [
        ("smoothing.bandwidth_octaves", smoothing.bandwidth_octaves),
        ("smoothing.step_octaves", smoothing.step_octaves),
    ] {
        if !(value.is_finite() && value > 0.0) {
            errors.push(ValidationError::invalid(field, format!("{value} octaves must be positive")));
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_at_48k() {
        assert!(validate_config(&AnalysisConfig::default(), 48000.0).is_ok());
    }

    #[test]
    fn default_high_cut_is_invalid_at_32k() {
        // 18 kHz is above the 16 kHz Nyquist of a 32 kHz recording.
        let err = validate_config(&AnalysisConfig::default(), 32000.0).unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { ref field, .. } if field == "taper.high_cut_hz"));
    }

    #[test]
    fn collects_every_problem() {
        let mut config = AnalysisConfig::default();
        config.windows.pre_delay_s = -1.0;
        config.optimizer.threshold_step_db = 0.0;
        config.smoothing.step_octaves = -0.5;

        match validate_config(&config, 48000.0).unwrap_err() {
            ValidationError::Multiple(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other}"),
        }
    }

    #[test]
    fn crossed_cutoffs_are_reported() {
        let mut config = AnalysisConfig::default();
        config.taper.low_cut_hz = 5000.0;
        config.taper.high_cut_hz = 1000.0;
        let err = validate_config(&config, 48000.0).unwrap_err();
        assert!(err.to_string().contains("must be below high cut"));
    }

    #[test]
    fn floor_outside_unit_interval_is_reported() {
        let mut config = AnalysisConfig::default();
        config.deconvolution.floor_relative = Some(2.0);
        assert!(validate_config(&config, 48000.0).is_err());
    }
}
