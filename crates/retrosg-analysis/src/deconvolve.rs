//! Frequency-domain deconvolution of a recorded/played signal pair.
//!
//! `h = IFFT(FFT(recorded) / FFT(played))`, per channel, over one full DFT
//! cycle. The division is circular: the recording and the stimulus are
//! expected to cover the same periodic excitation.

use crate::error::{Error, Result};
use crate::fft::Fft;
use crate::signal::Signal;
use rustfft::num_complex::Complex64;

/// Denominator magnitude, relative to the spectrum's peak, below which a bin
/// is reported as singular.
pub const SINGULARITY_EPSILON: f64 = 1e-12;

/// What to do with near-zero bins of the played spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SingularityPolicy {
    /// Divide as-is. Exactly-zero bins produce `Inf`/`NaN`, which spread to
    /// every output sample after the inverse transform.
    #[default]
    Propagate,
    /// Raise the denominator magnitude to `relative * peak`, keeping its
    /// phase. Zero bins are treated as real.
    Floor {
        /// Floor relative to the peak magnitude of the played spectrum.
        relative: f64,
    },
}

/// Deconvolution parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeconvolveParams {
    /// Near-zero bin handling.
    pub singularity: SingularityPolicy,
}

/// Result of [`deconvolve`].
#[derive(Debug, Clone)]
pub struct Deconvolution {
    /// Raw impulse response, one channel per recorded channel.
    pub impulse_response: Signal,
    /// Bins of the played spectrum found below
    /// [`SINGULARITY_EPSILON`] × peak, per output channel.
    pub singular_bins: Vec<Vec<usize>>,
}

impl Deconvolution {
    /// Whether any channel had a singular denominator bin.
    pub fn has_singularities(&self) -> bool {
        self.singular_bins.iter().any(|bins| !bins.is_empty())
    }
}

/// Deconvolve `recorded` by `played`.
///
/// `played` must share the sample rate and length of `recorded`, and either
/// have a single channel (used for every recorded channel) or the same
/// channel count.
pub fn deconvolve(recorded: &Signal, played: &Signal, params: &DeconvolveParams) -> Result<Deconvolution> {
    if recorded.sample_rate() != played.sample_rate() {
        return Err(Error::config(format!(
            "sample rate mismatch: recorded {} Hz, played {} Hz",
            recorded.sample_rate(),
            played.sample_rate()
        )));
    }
    if recorded.len() != played.len() {
        return Err(Error::config(format!(
            "length mismatch: recorded {} samples, played {} samples",
            recorded.len(),
            played.len()
        )));
    }
    if recorded.is_empty() {
        return Err(Error::config("cannot deconvolve empty signals"));
    }
    if played.num_channels() != 1 && played.num_channels() != recorded.num_channels() {
        return Err(Error::config(format!(
            "played signal has {} channels, recorded has {}",
            played.num_channels(),
            recorded.num_channels()
        )));
    }

    let fft = Fft::new(recorded.len());
    let played_spectra: Vec<Vec<Complex64>> =
        played.channels().iter().map(|c| fft.forward(c)).collect();

    let mut channels = Vec::with_capacity(recorded.num_channels());
    let mut singular_bins = Vec::with_capacity(recorded.num_channels());

    for (index, samples) in recorded.channels().iter().enumerate() {
        let denominator = &played_spectra[index.min(played_spectra.len() - 1)];
        let numerator = fft.forward(samples);
        let (mut ratio, singular) = divide_spectra(&numerator, denominator, params.singularity);

        if !singular.is_empty() {
            tracing::warn!(
                channel = index,
                bins = singular.len(),
                "played spectrum has near-zero bins"
            );
        }

        fft.inverse_complex(&mut ratio);
        channels.push(ratio.iter().map(|c| c.re).collect());
        singular_bins.push(singular);
    }

    tracing::debug!(
        channels = channels.len(),
        samples = recorded.len(),
        "deconvolved impulse response"
    );

    Ok(Deconvolution {
        impulse_response: Signal::new(channels, recorded.sample_rate())?,
        singular_bins,
    })
}

/// Elementwise `numerator / denominator` with singular-bin detection.
pub(crate) fn divide_spectra(
    numerator: &[Complex64],
    denominator: &[Complex64],
    policy: SingularityPolicy,
) -> (Vec<Complex64>, Vec<usize>) {
    let peak = denominator.iter().map(|c| c.norm()).fold(0.0, f64::max);
    let threshold = SINGULARITY_EPSILON * peak;

    let mut singular = Vec::new();
    let ratio = numerator
        .iter()
        .zip(denominator)
        .enumerate()
        .map(|(k, (&num, &den))| {
            let magnitude = den.norm();
            if magnitude <= threshold {
                singular.push(k);
            }
            match policy {
                SingularityPolicy::Propagate => num / den,
                SingularityPolicy::Floor { relative } => {
                    let floor = relative * peak;
                    if magnitude < floor {
                        let unit = if magnitude > 0.0 {
                            den / magnitude
                        } else {
                            Complex64::new(1.0, 0.0)
                        };
                        num / (unit * floor)
                    } else {
                        num / den
                    }
                }
            }
        })
        .collect();

    (ratio, singular)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(len: usize, seed: u32) -> Vec<f64> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as i32 as f64) / (i32::MAX as f64)
            })
            .collect()
    }

    #[test]
    fn self_deconvolution_is_unit_impulse() {
        let x = Signal::mono(noise(1024, 0x1234_5678), 48000.0).unwrap();
        let result = deconvolve(&x, &x, &DeconvolveParams::default()).unwrap();
        let ir = result.impulse_response.channel(0).unwrap();

        assert_eq!(ir.len(), 1024);
        assert!((ir[0] - 1.0).abs() < 1e-9, "ir[0] = {}", ir[0]);
        assert!(ir[1..].iter().all(|s| s.abs() < 1e-9));
        assert!(!result.has_singularities());
    }

    #[test]
    fn circular_delay_is_recovered() {
        let played = noise(512, 42);
        let mut recorded = vec![0.0; 512];
        for (i, &s) in played.iter().enumerate() {
            recorded[(i + 37) % 512] = 0.5 * s;
        }
        let result = deconvolve(
            &Signal::mono(recorded, 8000.0).unwrap(),
            &Signal::mono(played, 8000.0).unwrap(),
            &DeconvolveParams::default(),
        )
        .unwrap();
        let ir = result.impulse_response.channel(0).unwrap();
        assert!((ir[37] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn mono_played_broadcasts_over_stereo_recording() {
        let x = noise(256, 7);
        let doubled: Vec<f64> = x.iter().map(|s| 2.0 * s).collect();
        let recorded = Signal::stereo(x.clone(), doubled, 8000.0).unwrap();
        let played = Signal::mono(x, 8000.0).unwrap();

        let result = deconvolve(&recorded, &played, &DeconvolveParams::default()).unwrap();
        assert_eq!(result.impulse_response.num_channels(), 2);
        assert!((result.impulse_response.channel(1).unwrap()[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn length_mismatch_is_configuration_error() {
        let recorded = Signal::mono(vec![1.0; 16], 8000.0).unwrap();
        let played = Signal::mono(vec![1.0; 8], 8000.0).unwrap();
        let err = deconvolve(&recorded, &played, &DeconvolveParams::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn zero_bins_are_reported() {
        // Constant signal: every bin except DC is zero.
        let played = Signal::mono(vec![1.0; 4], 8000.0).unwrap();
        let recorded = Signal::mono(noise(4, 3), 8000.0).unwrap();
        let result = deconvolve(&recorded, &played, &DeconvolveParams::default()).unwrap();

        assert_eq!(result.singular_bins[0], vec![1, 2, 3]);
        assert!(result.has_singularities());
    }

    #[test]
    fn exact_zero_denominator_propagates_non_finite() {
        let numerator = [Complex64::new(1.0, 0.0), Complex64::new(1.0, 1.0)];
        let denominator = [Complex64::new(2.0, 0.0), Complex64::new(0.0, 0.0)];
        let (ratio, singular) =
            divide_spectra(&numerator, &denominator, SingularityPolicy::Propagate);

        assert_eq!(ratio[0], Complex64::new(0.5, 0.0));
        assert!(!ratio[1].re.is_finite() || !ratio[1].im.is_finite());
        assert_eq!(singular, vec![1]);
    }

    #[test]
    fn floor_policy_keeps_output_finite() {
        let played = Signal::mono(vec![1.0; 4], 8000.0).unwrap();
        let recorded = Signal::mono(noise(4, 3), 8000.0).unwrap();
        let params = DeconvolveParams {
            singularity: SingularityPolicy::Floor { relative: 1e-3 },
        };
        let result = deconvolve(&recorded, &played, &params).unwrap();

        assert!(result.has_singularities());
        assert!(result.impulse_response.is_finite());
    }
}
