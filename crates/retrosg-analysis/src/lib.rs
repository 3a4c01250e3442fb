//! Retrosg Analysis - acoustic transfer-function estimation
//!
//! This crate turns a played/recorded stimulus pair into a refined impulse
//! response, and searches for the safeguarding threshold that best explains a
//! recording after the fact:
//!
//! - [`deconvolve`] - frequency-domain deconvolution with singular-bin diagnostics
//! - [`window`] - peak location and LTI/noise analysis windows
//! - [`taper`] - raised-cosine band limiting on the bilateral frequency axis
//! - [`refine`] - one pass of window + taper over a raw impulse response
//! - [`safeguard`] - the safeguard seam and a spectral-floor implementation
//! - [`optimize`] - retrospective threshold sweep
//! - [`constant_q`] - Gaussian fractional-octave filter bank
//! - [`fft`] - FFT wrapper and full-cycle spectra
//! - [`signal`] - one- or two-channel sample buffers
//!
//! ## Example Workflow
//!
//! ```rust,ignore
//! use retrosg_analysis::{deconvolve, refine, DeconvolveParams, RefineParams, Signal};
//!
//! // 1. Play and record the stimulus (external)
//!
//! // 2. Raw impulse response
//! let raw = deconvolve(&recorded, &played, &DeconvolveParams::default())?;
//!
//! // 3. Window and taper, repeat with new cutoffs until satisfied
//! let refined = refine(&raw.impulse_response, &RefineParams::default())?;
//! println!("peak at sample {}", refined.peak_index);
//! ```
//!
//! ## Threshold Search
//!
//! ```rust,ignore
//! use retrosg_analysis::{SpectralFloorSafeguard, ThresholdOptimizer};
//!
//! let result = ThresholdOptimizer::new(&SpectralFloorSafeguard, params)
//!     .run(&reference, &recorded, &template, 48000.0)?;
//! println!("best threshold: {} dB", result.best_threshold_db);
//! ```

pub mod constant_q;
pub mod deconvolve;
pub mod error;
pub mod fft;
pub mod optimize;
pub mod refine;
pub mod safeguard;
pub mod signal;
pub mod taper;
pub mod window;

// Re-export main types
pub use constant_q::{BASE_SIGMA, FilterBank, START_FREQUENCY_HZ, smoothed_level_db};
pub use deconvolve::{
    Deconvolution, DeconvolveParams, SINGULARITY_EPSILON, SingularityPolicy, deconvolve,
};
pub use error::{Error, Result};
pub use fft::{Fft, Spectrum, magnitude_db};
pub use optimize::{
    CancellationToken, OptimizationResult, OptimizeParams, ThresholdCandidate, ThresholdOptimizer,
};
pub use refine::{RefineParams, RefinedResult, TransferFunctionEstimate, refine};
pub use safeguard::{Safeguard, SafeguardOutput, SafeguardParams, SpectralFloorSafeguard};
pub use signal::Signal;
pub use taper::{TaperBand, TaperedSpectrum, taper, taper_signal};
pub use window::{AnalysisWindow, WindowPair, build_windows, locate_peak};
