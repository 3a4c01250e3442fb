//! Stimulus safeguarding.
//!
//! A safeguarded stimulus has no spectral bin so weak that dividing by it
//! during deconvolution would blow up noise. The [`Safeguard`] trait is the
//! seam through which the threshold optimizer asks for a stimulus
//! safeguarded at a given threshold; production setups plug in their own
//! transform (with resampling and long-FFT machinery), while
//! [`SpectralFloorSafeguard`] is a self-contained implementation working at
//! the input sample rate.

use crate::error::{Error, Result};
use crate::fft::Fft;
use rustfft::num_complex::Complex64;

/// Band the safeguard transform reports back.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SafeguardParams {
    /// Lowest frequency (Hz) whose level already met the threshold.
    pub f_low: f64,
    /// Highest frequency (Hz) whose level already met the threshold.
    pub f_high: f64,
}

/// A safeguarded stimulus and its reported band.
#[derive(Debug, Clone)]
pub struct SafeguardOutput {
    /// Safeguarded samples at the output sample rate.
    pub signal: Vec<f64>,
    /// Band reported by the transform.
    pub params: SafeguardParams,
}

/// Rewrites a stimulus so that it is level- and frequency-safe for
/// measurement.
pub trait Safeguard: Sync {
    /// Safeguard `signal` sampled at `fs_in` and return it at `fs_out`.
    ///
    /// `threshold_db` is the lowest permitted spectral level relative to
    /// the peak (typically negative). Bins above `high_freq_limit_hz` are
    /// not constrained.
    fn safeguard(
        &self,
        signal: &[f64],
        fs_in: f64,
        fs_out: f64,
        threshold_db: f64,
        high_freq_limit_hz: f64,
    ) -> Result<SafeguardOutput>;
}

impl<F> Safeguard for F
where
    F: Fn(&[f64], f64, f64, f64, f64) -> Result<SafeguardOutput> + Sync,
{
    fn safeguard(
        &self,
        signal: &[f64],
        fs_in: f64,
        fs_out: f64,
        threshold_db: f64,
        high_freq_limit_hz: f64,
    ) -> Result<SafeguardOutput> {
        self(signal, fs_in, fs_out, threshold_db, high_freq_limit_hz)
    }
}

/// Raises every in-band spectral bin to at least `peak * 10^(threshold/20)`.
///
/// In-band means `0 < f <= high_freq_limit_hz` (and its negative mirror).
/// Phases are kept; an exactly-zero bin is raised along the real axis. The
/// transform does not resample, so `fs_in` must equal `fs_out`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralFloorSafeguard;

impl Safeguard for SpectralFloorSafeguard {
    fn safeguard(
        &self,
        signal: &[f64],
        fs_in: f64,
        fs_out: f64,
        threshold_db: f64,
        high_freq_limit_hz: f64,
    ) -> Result<SafeguardOutput> {
        if fs_in != fs_out {
            return Err(Error::config(format!(
                "sample-rate conversion is not supported ({fs_in} Hz -> {fs_out} Hz)"
            )));
        }
        if !threshold_db.is_finite() {
            return Err(Error::config(format!("threshold must be finite, got {threshold_db}")));
        }
        if !(high_freq_limit_hz.is_finite() && high_freq_limit_hz > 0.0) {
            return Err(Error::config(format!(
                "high frequency limit must be positive, got {high_freq_limit_hz} Hz"
            )));
        }
        let n = signal.len();
        if n < 2 {
            return Err(Error::Safeguard(format!("signal of {n} sample(s) is too short")));
        }

        let fft = Fft::new(n);
        let mut bins = fft.forward(signal);
        let df = fs_in / n as f64;
        let last = (((high_freq_limit_hz / df).floor() as usize).min(n / 2)).max(1);

        let peak = bins[1..=last].iter().map(|c| c.norm()).fold(0.0, f64::max);
        if peak == 0.0 {
            return Err(Error::Safeguard("stimulus has no energy below the frequency limit".into()));
        }
        let floor = peak * 10f64.powf(threshold_db / 20.0);

        let mut f_low = None;
        let mut f_high = None;
        for k in 1..=last {
            let magnitude = bins[k].norm();
            if magnitude >= floor {
                f_low.get_or_insert(k as f64 * df);
                f_high = Some(k as f64 * df);
                continue;
            }
            let raised = if magnitude > 0.0 {
                bins[k] * (floor / magnitude)
            } else {
                Complex64::new(floor, 0.0)
            };
            if 2 * k == n {
                // Nyquist of an even-length cycle is its own mirror and stays real.
                bins[k] = Complex64::new(floor.copysign(bins[k].re), 0.0);
            } else {
                bins[k] = raised;
                bins[n - k] = raised.conj();
            }
        }

        let (samples, _) = fft.inverse_real(&bins);
        let params = SafeguardParams {
            f_low: f_low.unwrap_or(0.0),
            f_high: f_high.unwrap_or(0.0),
        };
        tracing::debug!(threshold_db, ?params, "safeguarded stimulus");

        Ok(SafeguardOutput {
            signal: samples,
            params,
        })
    }
}
