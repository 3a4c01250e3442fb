//! FFT wrapper and full-cycle spectra

use rustfft::num_complex::Complex64;
use rustfft::{Fft as FftPlan, FftPlanner};
use std::sync::Arc;

/// FFT processor with cached forward and inverse plans.
///
/// Unlike a positive-frequency-only analyzer, every transform here keeps the
/// full cycle of `size` bins so that spectra can be divided, tapered on a
/// bilateral axis and inverted without reconstructing the negative half.
pub struct Fft {
    fft: Arc<dyn FftPlan<f64>>,
    ifft: Arc<dyn FftPlan<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of a real signal.
    ///
    /// The input is zero-padded or truncated to the FFT size. Returns all
    /// `size` bins.
    pub fn forward(&self, input: &[f64]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex64::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));

        self.fft.process(&mut buffer);
        buffer
    }

    /// Inverse transform of a complex spectrum (in-place, normalized by 1/N).
    pub fn inverse_complex(&self, buffer: &mut [Complex64]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }

    /// Real-forcing inverse transform.
    ///
    /// Returns the real part of the inverse and the largest absolute
    /// imaginary component that was discarded. For a conjugate-symmetric
    /// input the residual is rounding noise.
    pub fn inverse_real(&self, spectrum: &[Complex64]) -> (Vec<f64>, f64) {
        let mut buffer = spectrum.to_vec();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.inverse_complex(&mut buffer);

        let residual = buffer.iter().map(|c| c.im.abs()).fold(0.0, f64::max);
        (buffer.iter().map(|c| c.re).collect(), residual)
    }
}

/// Complex spectrum covering one full DFT cycle.
///
/// Bin `k` sits at `k * fs / N` Hz. On the bilateral axis every bin above
/// Nyquist is read as the negative frequency `k * fs / N - fs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Complex bin values, `N` of them.
    pub bins: Vec<Complex64>,
    /// Sample rate of the time-domain signal, in Hz.
    pub sample_rate: f64,
}

impl Spectrum {
    /// Transform a real signal into its full-cycle spectrum.
    pub fn from_real(samples: &[f64], sample_rate: f64) -> Self {
        let fft = Fft::new(samples.len());
        Self {
            bins: fft.forward(samples),
            sample_rate,
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the spectrum is empty.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin spacing in Hz.
    pub fn resolution(&self) -> f64 {
        self.sample_rate / self.bins.len() as f64
    }

    /// Unilateral frequency of every bin, `0..fs`.
    pub fn frequencies(&self) -> Vec<f64> {
        let df = self.resolution();
        (0..self.bins.len()).map(|k| k as f64 * df).collect()
    }

    /// Bilateral frequency of every bin: `f - fs` wherever `f > fs/2`.
    ///
    /// Folded bins are computed from their mirror index so that bins `k` and
    /// `N - k` carry exactly opposite frequencies.
    pub fn bilateral_frequencies(&self) -> Vec<f64> {
        let n = self.bins.len();
        let df = self.resolution();
        (0..n)
            .map(|k| {
                if 2 * k > n {
                    -((n - k) as f64 * df)
                } else {
                    k as f64 * df
                }
            })
            .collect()
    }

    /// Real-forcing inverse; see [`Fft::inverse_real`].
    pub fn to_real(&self) -> (Vec<f64>, f64) {
        Fft::new(self.bins.len()).inverse_real(&self.bins)
    }

    /// Largest deviation from conjugate symmetry, `max |X[k] - conj(X[N-k])|`.
    pub fn symmetry_error(&self) -> f64 {
        let n = self.bins.len();
        (1..n)
            .map(|k| (self.bins[k] - self.bins[n - k].conj()).norm())
            .chain(self.bins.first().map(|dc| dc.im.abs()))
            .fold(0.0, f64::max)
    }

    /// Magnitude in dB of the non-negative half (`0..=N/2`).
    pub fn magnitude_db(&self) -> Vec<f64> {
        magnitude_db(&self.bins[..self.bins.len() / 2 + 1])
    }
}

/// Compute magnitude spectrum in dB
pub fn magnitude_db(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum
        .iter()
        .map(|c| 20.0 * c.norm().max(1e-300).log10())
        .collect()
}
