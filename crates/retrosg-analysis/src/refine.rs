//! Windowed refinement of a raw impulse response.
//!
//! [`refine`] is one pass of the accept/reject loop: locate the main peak on
//! the reference channel, cut the LTI and noise windows out of every
//! channel, taper each window's spectrum to the requested band and invert
//! back to a real response. The function is pure; a driver that wants
//! different cutoffs calls it again and drops the previous result.

use crate::error::{Error, Result};
use crate::signal::Signal;
use crate::taper::{TaperBand, TaperedSpectrum, taper_signal};
use crate::window::{AnalysisWindow, WindowPair, build_windows, locate_peak};

/// Parameters of one refinement pass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RefineParams {
    /// Channel whose peak anchors the LTI window (the close channel).
    pub reference_channel: usize,
    /// Seconds kept before the peak.
    pub pre_delay_s: f64,
    /// Length of both analysis windows, in seconds.
    pub window_duration_s: f64,
    /// Taper cutoffs.
    pub band: TaperBand,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            reference_channel: 0,
            pre_delay_s: 0.05,
            window_duration_s: 0.5,
            band: TaperBand::new(100.0, 18000.0),
        }
    }
}

/// Tapered spectrum of one window of one channel.
#[derive(Debug, Clone)]
pub struct TransferFunctionEstimate {
    /// Sample range the spectrum was computed over.
    pub window: AnalysisWindow,
    /// Tapered and original spectra plus the cutoffs used.
    pub spectrum: TaperedSpectrum,
}

impl TransferFunctionEstimate {
    /// Cut `window` out of `samples` and taper its spectrum to `band`.
    ///
    /// Returns the estimate, the real refined response and the imaginary
    /// residual discarded by the inverse transform.
    pub fn from_window(
        samples: &[f64],
        window: AnalysisWindow,
        sample_rate: f64,
        band: TaperBand,
    ) -> Result<(Self, Vec<f64>, f64)> {
        let segment = window.extract(samples)?;
        let (spectrum, response, residual) = taper_signal(segment, sample_rate, band)?;
        Ok((Self { window, spectrum }, response, residual))
    }

    /// Low and high cutoffs, in Hz.
    pub fn cutoffs(&self) -> (f64, f64) {
        (self.spectrum.band.low_cut_hz, self.spectrum.band.high_cut_hz)
    }
}

/// Output of [`refine`].
#[derive(Debug, Clone)]
pub struct RefinedResult {
    /// Peak index on the reference channel of the raw response.
    pub peak_index: usize,
    /// LTI and noise windows.
    pub windows: WindowPair,
    /// Per-channel LTI-window estimates.
    pub lti: Vec<TransferFunctionEstimate>,
    /// Per-channel noise-window estimates.
    pub noise: Vec<TransferFunctionEstimate>,
    /// Refined impulse response from the LTI window.
    pub impulse_response: Signal,
    /// Refined response of the noise window.
    pub noise_response: Signal,
    /// Largest imaginary residual discarded across all inverse transforms.
    pub imaginary_residual: f64,
}

/// Refine a raw impulse response.
pub fn refine(ir: &Signal, params: &RefineParams) -> Result<RefinedResult> {
    let fs = ir.sample_rate();
    params.band.validate(fs)?;
    if params.reference_channel >= ir.num_channels() {
        return Err(Error::config(format!(
            "reference channel {} out of range for a {}-channel response",
            params.reference_channel,
            ir.num_channels()
        )));
    }

    let peak_index = locate_peak(ir, params.reference_channel)?;
    let windows = build_windows(
        peak_index,
        params.pre_delay_s,
        params.window_duration_s,
        fs,
        ir.len(),
    )?;

    let mut lti = Vec::with_capacity(ir.num_channels());
    let mut noise = Vec::with_capacity(ir.num_channels());
    let mut lti_channels = Vec::with_capacity(ir.num_channels());
    let mut noise_channels = Vec::with_capacity(ir.num_channels());
    let mut imaginary_residual: f64 = 0.0;

    for samples in ir.channels() {
        let (estimate, response, residual) =
            TransferFunctionEstimate::from_window(samples, windows.lti, fs, params.band)?;
        imaginary_residual = imaginary_residual.max(residual);
        lti.push(estimate);
        lti_channels.push(response);

        let (estimate, response, residual) =
            TransferFunctionEstimate::from_window(samples, windows.noise, fs, params.band)?;
        imaginary_residual = imaginary_residual.max(residual);
        noise.push(estimate);
        noise_channels.push(response);
    }

    tracing::debug!(
        peak_index,
        lti_start = windows.lti.start,
        noise_start = windows.noise.start,
        length = windows.lti.length,
        imaginary_residual,
        "refined impulse response"
    );

    Ok(RefinedResult {
        peak_index,
        windows,
        lti,
        noise,
        impulse_response: Signal::new(lti_channels, fs)?,
        noise_response: Signal::new(noise_channels, fs)?,
        imaginary_residual,
    })
}
