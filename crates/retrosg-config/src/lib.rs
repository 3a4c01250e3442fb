//! Analysis configuration for retrosg measurements.
//!
//! A measurement session is described by one TOML document,
//! [`AnalysisConfig`], with a section per pipeline stage. Every setting has
//! a default, so an empty file is a valid configuration. The config is
//! converted into the explicit parameter structs of `retrosg-analysis`
//! rather than read from global state.
//!
//! # Example
//!
//! ```rust,no_run
//! use retrosg_config::AnalysisConfig;
//!
//! // Load and check a config for a 48 kHz session
//! let config = AnalysisConfig::load("session.toml").unwrap();
//! config.validate(48000.0).unwrap();
//!
//! // Hand the settings to the pipeline
//! let refine = config.refine_params();
//! println!("taper {}..{} Hz", refine.band.low_cut_hz, refine.band.high_cut_hz);
//!
//! // Write the defaults out as a starting point
//! AnalysisConfig::default().save("defaults.toml").unwrap();
//! ```

mod analysis;
mod error;

/// Configuration validation.
pub mod validation;

pub use analysis::{
    AnalysisConfig, DeconvolutionSection, OptimizerSection, SafeguardSection, SmoothingSection,
    TaperSection, ThresholdRange, WindowSection,
};
pub use error::ConfigError;
pub use validation::{ValidationError, ValidationResult, validate_config};
