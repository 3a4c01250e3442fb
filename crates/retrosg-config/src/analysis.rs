//! The `AnalysisConfig` TOML document.

use crate::error::ConfigError;
use crate::validation::{ValidationError, validate_config};
use retrosg_analysis::{
    AnalysisWindow, DeconvolveParams, OptimizeParams, RefineParams, SingularityPolicy, TaperBand,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Every tunable of a measurement session.
///
/// Each section defaults independently, so a file only needs the settings
/// it changes:
///
/// ```toml
/// [taper]
/// low_cut_hz = 80.0
///
/// [optimizer]
/// threshold_step_db = 2.5
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deconvolution settings.
    pub deconvolution: DeconvolutionSection,
    /// Analysis window settings.
    pub windows: WindowSection,
    /// Taper cutoffs.
    pub taper: TaperSection,
    /// Safeguard settings.
    pub safeguard: SafeguardSection,
    /// Threshold sweep settings.
    pub optimizer: OptimizerSection,
    /// Fractional-octave smoothing settings.
    pub smoothing: SmoothingSection,
}

/// `[deconvolution]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeconvolutionSection {
    /// Raise near-zero played bins to this fraction of the peak. Unset means
    /// divide as-is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_relative: Option<f64>,
}

/// `[windows]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    /// Seconds kept before the main peak.
    pub pre_delay_s: f64,
    /// Length of the LTI and noise windows, in seconds.
    pub window_duration_s: f64,
    /// Channel whose peak anchors the windows.
    pub reference_channel: usize,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            pre_delay_s: 0.05,
            window_duration_s: 0.5,
            reference_channel: 0,
        }
    }
}

/// `[taper]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaperSection {
    /// Low cutoff in Hz.
    pub low_cut_hz: f64,
    /// High cutoff in Hz.
    pub high_cut_hz: f64,
}

impl Default for TaperSection {
    fn default() -> Self {
        Self {
            low_cut_hz: 100.0,
            high_cut_hz: 18000.0,
        }
    }
}

/// `[safeguard]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeguardSection {
    /// Bins above this frequency are left alone by the safeguard.
    pub high_freq_limit_hz: f64,
}

impl Default for SafeguardSection {
    fn default() -> Self {
        Self {
            high_freq_limit_hz: 20000.0,
        }
    }
}

/// `[optimizer]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSection {
    /// First threshold of the sweep, in dB.
    pub threshold_start_db: f64,
    /// Last threshold of the sweep (inclusive), in dB.
    pub threshold_stop_db: f64,
    /// Sweep increment, in dB.
    pub threshold_step_db: f64,
}

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            threshold_start_db: -80.0,
            threshold_stop_db: -20.0,
            threshold_step_db: 5.0,
        }
    }
}

impl OptimizerSection {
    /// The sweep as a [`ThresholdRange`].
    pub fn range(&self) -> ThresholdRange {
        ThresholdRange {
            start_db: self.threshold_start_db,
            stop_db: self.threshold_stop_db,
            step_db: self.threshold_step_db,
        }
    }

    /// Replace the sweep bounds.
    pub fn set_range(&mut self, range: ThresholdRange) {
        self.threshold_start_db = range.start_db;
        self.threshold_stop_db = range.stop_db;
        self.threshold_step_db = range.step_db;
    }
}

/// `[smoothing]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSection {
    /// Channel bandwidth in octaves.
    pub bandwidth_octaves: f64,
    /// Channel spacing in octaves.
    pub step_octaves: f64,
}

impl Default for SmoothingSection {
    fn default() -> Self {
        Self {
            bandwidth_octaves: 1.0 / 3.0,
            step_octaves: 1.0 / 6.0,
        }
    }
}

/// An inclusive `start:stop:step` threshold sweep in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRange {
    /// First threshold.
    pub start_db: f64,
    /// Last threshold, inclusive when the step lands on it.
    pub stop_db: f64,
    /// Increment.
    pub step_db: f64,
}

impl ThresholdRange {
    /// Thresholds in sweep order, generated by index.
    pub fn thresholds(&self) -> Vec<f64> {
        if !(self.step_db.is_finite() && self.step_db > 0.0) || self.stop_db < self.start_db {
            return Vec::new();
        }
        let count = ((self.stop_db - self.start_db) / self.step_db + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|i| self.start_db + i as f64 * self.step_db)
            .collect()
    }
}

impl FromStr for ThresholdRange {
    type Err = ValidationError;

    /// Parse `start:stop:step`, e.g. `-80:-20:5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ValidationError::Invalid {
            field: "thresholds".to_string(),
            reason,
        };
        let parts: Vec<&str> = s.split(':').collect();
        let [start, stop, step] = parts.as_slice() else {
            return Err(invalid(format!("expected start:stop:step, got '{s}'")));
        };
        let parse = |text: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|e| invalid(format!("'{text}' is not a number: {e}")))
        };
        let range = ThresholdRange {
            start_db: parse(start)?,
            stop_db: parse(stop)?,
            step_db: parse(step)?,
        };
        if !(range.step_db.is_finite() && range.step_db > 0.0) {
            return Err(invalid(format!("step must be positive, got {}", range.step_db)));
        }
        if range.start_db > range.stop_db {
            return Err(invalid(format!(
                "start {} dB is above stop {} dB",
                range.start_db, range.stop_db
            )));
        }
        Ok(range)
    }
}

impl AnalysisConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config: AnalysisConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every setting for signals sampled at `sample_rate`.
    pub fn validate(&self, sample_rate: f64) -> Result<(), ConfigError> {
        Ok(validate_config(self, sample_rate)?)
    }

    /// Taper cutoffs as a band.
    pub fn band(&self) -> TaperBand {
        TaperBand::new(self.taper.low_cut_hz, self.taper.high_cut_hz)
    }

    /// Deconvolution parameters.
    pub fn deconvolve_params(&self) -> DeconvolveParams {
        DeconvolveParams {
            singularity: self.singularity(),
        }
    }

    /// Refinement parameters.
    pub fn refine_params(&self) -> RefineParams {
        RefineParams {
            reference_channel: self.windows.reference_channel,
            pre_delay_s: self.windows.pre_delay_s,
            window_duration_s: self.windows.window_duration_s,
            band: self.band(),
        }
    }

    /// Sweep parameters for a reference whose LTI window is `lti_window`.
    pub fn optimize_params(&self, lti_window: AnalysisWindow) -> OptimizeParams {
        OptimizeParams {
            thresholds_db: self.optimizer.range().thresholds(),
            high_freq_limit_hz: self.safeguard.high_freq_limit_hz,
            band: self.band(),
            lti_window,
            pre_delay_s: self.windows.pre_delay_s,
            singularity: self.singularity(),
        }
    }

    fn singularity(&self) -> SingularityPolicy {
        match self.deconvolution.floor_relative {
            Some(relative) => SingularityPolicy::Floor { relative },
            None => SingularityPolicy::Propagate,
        }
    }
}
