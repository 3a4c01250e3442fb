//! Error types for the analysis pipeline.

use thiserror::Error;

/// Errors raised by the analysis pipeline.
///
/// Configuration and bounds errors abort the current call. Numerical
/// singularities in the deconvolution are *not* errors; they are reported
/// through [`Deconvolution::singular_bins`](crate::Deconvolution::singular_bins).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Invalid parameters: cutoff ordering, bandwidth/step, frequency axis,
    /// mismatched signals, channel selection.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A sample range computed from the analysis parameters lies outside the
    /// signal.
    #[error("{what} [{start}, {end}) is outside the valid range [0, {len})")]
    Bounds {
        /// Which range was being built (e.g. "LTI window").
        what: &'static str,
        /// Requested start index (may be negative).
        start: i64,
        /// Requested end index (exclusive).
        end: i64,
        /// Number of samples actually available.
        len: usize,
    },

    /// The safeguard transform rejected its input.
    #[error("safeguard failed: {0}")]
    Safeguard(String),

    /// Every threshold candidate was excluded from the sweep.
    #[error("no threshold candidate produced a finite error level")]
    NoViableCandidate,

    /// The threshold sweep was cancelled before completion.
    #[error("threshold sweep cancelled after {evaluated} candidate(s)")]
    Cancelled {
        /// Number of candidates evaluated before the cancellation was seen.
        evaluated: usize,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}

/// Convenience result type for the analysis pipeline.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_message_names_range() {
        let err = Error::Bounds {
            what: "LTI window",
            start: -12,
            end: 100,
            len: 4800,
        };
        assert_eq!(
            err.to_string(),
            "LTI window [-12, 100) is outside the valid range [0, 4800)"
        );
    }

    #[test]
    fn config_factory_produces_configuration_variant() {
        let err = Error::config("low cut must be below high cut");
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("low cut")));
    }
}
