//! File persistence for retrosg measurements.
//!
//! This crate provides:
//!
//! - **WAV file I/O**: [`read_signal`] and [`write_signal`] for one- and
//!   two-channel recordings, stimuli and impulse responses
//! - **Provenance sidecars**: [`write_provenance`] records where a refined
//!   response came from next to the WAV file
//! - **JSON records**: [`save_record`] and [`load_record`] for optimization
//!   results and other serde types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retrosg_analysis::{deconvolve, DeconvolveParams};
//! use retrosg_io::{read_signal, write_signal};
//!
//! let (recorded, spec) = read_signal("recorded.wav")?;
//! let (played, _) = read_signal("played.wav")?;
//!
//! let raw = deconvolve(&recorded, &played, &DeconvolveParams::default())?;
//! write_signal("ir.wav", &raw.impulse_response, spec)?;
//! ```

mod record;
mod wav;

pub use record::{Provenance, load_record, provenance_path, read_provenance, save_record, write_provenance};
pub use wav::{WavFormat, WavInfo, WavSpec, read_signal, read_wav_info, write_signal};

/// Error types for file I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The file has a channel layout the pipeline cannot use.
    #[error("Unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Samples could not be turned into a signal.
    #[error("Invalid signal: {0}")]
    Signal(#[from] retrosg_analysis::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for file I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
