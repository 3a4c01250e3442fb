//! Band-limiting of full-cycle spectra with raised-cosine roll-offs.
//!
//! The taper works on the bilateral frequency axis so that the positive and
//! negative halves of a spectrum are treated identically. Below the low
//! cutoff and above the high cutoff each bin is replaced by a raised-cosine
//! weight times the value of the *anchor* bin (the bin nearest the cutoff),
//! not by a weighted copy of its own value. The result rolls off smoothly
//! from the cutoff magnitude to zero at DC and at Nyquist, independent of
//! whatever the response contained out of band.
//!
//! Anchors on the negative side are the mirrors (`N - k`) of the positive
//! anchors, which keeps a conjugate-symmetric input conjugate-symmetric and
//! lets [`TaperedSpectrum::to_impulse_response`] return a real signal.

use crate::error::{Error, Result};
use crate::fft::Spectrum;
use std::f64::consts::PI;

/// Low/high cutoff pair, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TaperBand {
    /// Low cutoff in Hz.
    pub low_cut_hz: f64,
    /// High cutoff in Hz.
    pub high_cut_hz: f64,
}

impl TaperBand {
    /// Create a band. Not validated until used; see [`TaperBand::validate`].
    pub fn new(low_cut_hz: f64, high_cut_hz: f64) -> Self {
        Self {
            low_cut_hz,
            high_cut_hz,
        }
    }

    /// Require `0 < low < high < fs/2`.
    pub fn validate(&self, sample_rate: f64) -> Result<()> {
        let nyquist = sample_rate / 2.0;
        let Self {
            low_cut_hz: low,
            high_cut_hz: high,
        } = *self;
        if !(low.is_finite() && high.is_finite() && low > 0.0 && low < high && high < nyquist) {
            return Err(Error::config(format!(
                "taper cutoffs must satisfy 0 < low < high < fs/2, got low={low} Hz, high={high} Hz, fs/2={nyquist} Hz"
            )));
        }
        Ok(())
    }
}

/// A spectrum before and after tapering.
#[derive(Debug, Clone)]
pub struct TaperedSpectrum {
    /// Band-limited spectrum.
    pub tapered: Spectrum,
    /// Input spectrum, unchanged.
    pub original: Spectrum,
    /// Cutoffs the taper was built with.
    pub band: TaperBand,
}

impl TaperedSpectrum {
    /// Real-forcing inverse of the tapered spectrum.
    ///
    /// Returns the impulse response and the discarded imaginary residual.
    pub fn to_impulse_response(&self) -> (Vec<f64>, f64) {
        self.tapered.to_real()
    }
}

/// Taper `spectrum` to `band`.
pub fn taper(spectrum: &Spectrum, band: TaperBand) -> Result<TaperedSpectrum> {
    let fs = spectrum.sample_rate;
    band.validate(fs)?;
    let n = spectrum.len();
    if n < 2 {
        return Err(Error::config(format!(
            "cannot taper a spectrum of {n} bin(s)"
        )));
    }

    let nyquist = fs / 2.0;
    let low = band.low_cut_hz;
    let high = band.high_cut_hz;
    let freqs = spectrum.bilateral_frequencies();
    let original = &spectrum.bins;

    let low_anchor = nearest_bin(&freqs, low);
    let high_anchor = nearest_bin(&freqs, high);

    let mut bins = original.clone();
    for (&f, bin) in freqs.iter().zip(bins.iter_mut()) {
        let magnitude = f.abs();
        let (anchor, weight) = if magnitude < low {
            (low_anchor, raised_cosine(magnitude / low))
        } else if magnitude > high {
            (high_anchor, raised_cosine((nyquist - magnitude) / (nyquist - high)))
        } else {
            continue;
        };
        let anchor = if f < 0.0 { mirror(anchor, n) } else { anchor };
        *bin = original[anchor] * weight;
    }

    tracing::debug!(bins = n, low, high, low_anchor, high_anchor, "tapered spectrum");

    Ok(TaperedSpectrum {
        tapered: Spectrum {
            bins,
            sample_rate: fs,
        },
        original: spectrum.clone(),
        band,
    })
}

/// Taper a real time-domain segment and return the real refined response
/// together with the spectra and the imaginary residual.
pub fn taper_signal(samples: &[f64], sample_rate: f64, band: TaperBand) -> Result<(TaperedSpectrum, Vec<f64>, f64)> {
    let tapered = taper(&Spectrum::from_real(samples, sample_rate), band)?;
    let (response, residual) = tapered.to_impulse_response();
    Ok((tapered, response, residual))
}

/// `(1 - cos(pi * x)) / 2`
fn raised_cosine(x: f64) -> f64 {
    (1.0 - (PI * x).cos()) / 2.0
}

/// Index of the non-negative bin whose frequency is nearest `target`.
fn nearest_bin(freqs: &[f64], target: f64) -> usize {
    let mut best = 0;
    for (k, &f) in freqs.iter().enumerate() {
        if f < 0.0 {
            continue;
        }
        if (f - target).abs() < (freqs[best] - target).abs() {
            best = k;
        }
    }
    best
}

/// Mirror of bin `k` on an `n`-bin cycle.
fn mirror(k: usize, n: usize) -> usize {
    (n - k) % n
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::num_complex::Complex64;

    fn constant_spectrum(value: Complex64, n: usize, sample_rate: f64) -> Spectrum {
        Spectrum {
            bins: vec![value; n],
            sample_rate,
        }
    }

    fn test_signal(len: usize) -> Vec<f64> {
        let mut state = 0x9e37_79b9u32;
        (0..len)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as i32 as f64) / (i32::MAX as f64) * (-(i as f64) / 200.0).exp()
            })
            .collect()
    }

    #[test]
    fn passband_is_unchanged() {
        let fs = 8000.0;
        let spectrum = Spectrum::from_real(&test_signal(1000), fs);
        let band = TaperBand::new(200.0, 3000.0);
        let result = taper(&spectrum, band).unwrap();

        for (k, &f) in spectrum.bilateral_frequencies().iter().enumerate() {
            if f.abs() > 200.0 && f.abs() < 3000.0 {
                assert_eq!(result.tapered.bins[k], spectrum.bins[k], "bin {k} ({f} Hz)");
            }
        }
        assert_eq!(result.original, spectrum);
    }

    #[test]
    fn dc_and_nyquist_go_to_zero() {
        let fs = 8000.0;
        let spectrum = Spectrum::from_real(&test_signal(1000), fs);
        let result = taper(&spectrum, TaperBand::new(200.0, 3000.0)).unwrap();

        assert_eq!(result.tapered.bins[0].norm(), 0.0);
        assert!(result.tapered.bins[500].norm() < 1e-12);
    }

    #[test]
    fn stopband_bins_follow_anchor_value() {
        // Anchor-value semantics: every low-band bin is a real multiple of the
        // anchor bin, regardless of its own content.
        let fs = 1000.0;
        let n = 100; // 10 Hz bins
        let mut spectrum = constant_spectrum(Complex64::new(0.0, 0.0), n, fs);
        spectrum.bins[5] = Complex64::new(2.0, 1.0); // 50 Hz anchor
        spectrum.bins[95] = Complex64::new(2.0, -1.0);
        spectrum.bins[2] = Complex64::new(100.0, 0.0); // out-of-band spike

        let result = taper(&spectrum, TaperBand::new(50.0, 400.0)).unwrap();
        let weight = (1.0 - (PI * 20.0 / 50.0).cos()) / 2.0;
        let expected = Complex64::new(2.0, 1.0) * weight;
        assert!((result.tapered.bins[2] - expected).norm() < 1e-12);
        assert!((result.tapered.bins[98] - expected.conj()).norm() < 1e-12);
    }

    #[test]
    fn real_input_gives_real_output() {
        let fs = 48000.0;
        let spectrum = Spectrum::from_real(&test_signal(4801), fs);
        let result = taper(&spectrum, TaperBand::new(100.0, 18000.0)).unwrap();

        assert!(result.tapered.symmetry_error() < 1e-9);
        let (ir, residual) = result.to_impulse_response();
        assert_eq!(ir.len(), 4801);
        assert!(residual < 1e-9, "imaginary residual {residual}");
    }

    #[test]
    fn rejects_bad_cutoffs() {
        let spectrum = Spectrum::from_real(&test_signal(64), 8000.0);
        for (low, high) in [(0.0, 1000.0), (2000.0, 1000.0), (100.0, 4000.0), (100.0, 5000.0)] {
            let err = taper(&spectrum, TaperBand::new(low, high)).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "({low}, {high})");
        }
    }

    #[test]
    fn mirror_wraps_dc() {
        assert_eq!(mirror(0, 8), 0);
        assert_eq!(mirror(3, 8), 5);
    }
}
