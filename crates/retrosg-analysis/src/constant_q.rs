//! Constant-Q-like Gaussian filter bank for fractional-octave smoothing.
//!
//! Each channel is a Gaussian window on the log2-frequency axis, centred on a
//! geometric grid that starts at 1000 × 2⁻⁶ Hz (15.625 Hz) and is spaced
//! `step_octaves` apart. The window width is given as a bandwidth in octaves
//! and converted to a standard deviation through the normal quartile, so a
//! `1/3`-octave bank has channels whose interquartile span is 1/6 octave
//! either side of the centre.

use crate::error::{Error, Result};
use crate::fft::Spectrum;

/// Lowest channel centre, 1000 × 2⁻⁶ Hz.
pub const START_FREQUENCY_HZ: f64 = 15.625;

/// Φ⁻¹(0.75), the upper quartile of the standard normal distribution.
const NORMAL_UPPER_QUARTILE: f64 = 0.674_489_750_196_081_7;

/// Base sigma: the interquartile range of the standard normal distribution,
/// `2 * Φ⁻¹(0.75)`.
pub const BASE_SIGMA: f64 = 2.0 * NORMAL_UPPER_QUARTILE;

/// Gaussian weights of every channel over a frequency axis.
///
/// Rows are channels, columns are the input frequencies.
#[derive(Debug, Clone)]
pub struct FilterBank {
    /// Centre frequency of each channel (Hz), strictly increasing.
    pub center_frequencies: Vec<f64>,
    /// Per-channel weights normalized to sum to 1.
    pub weights: Vec<Vec<f64>>,
    /// Weights before normalization.
    pub raw_weights: Vec<Vec<f64>>,
    /// `sqrt(|raw|)`, for quadrature (amplitude-domain) use.
    pub quadrature_weights: Vec<Vec<f64>>,
    /// Gaussian standard deviation in octaves.
    pub sigma_octaves: f64,
    /// Channel spacing in octaves.
    pub step_octaves: f64,
}

impl FilterBank {
    /// Build a filter bank over `frequency_axis` (Hz).
    ///
    /// # Arguments
    /// * `frequency_axis` - ascending, non-negative frequencies, at least two
    /// * `bandwidth_octaves` - channel bandwidth in octaves (> 0)
    /// * `step_octaves` - channel spacing in octaves (> 0)
    ///
    /// The upper bound of the grid is taken as
    /// `frequency_axis[last] + frequency_axis[1]`, and the last channel sits
    /// at or below half of that bound.
    pub fn new(frequency_axis: &[f64], bandwidth_octaves: f64, step_octaves: f64) -> Result<Self> {
        validate_axis(frequency_axis)?;
        if !(bandwidth_octaves.is_finite() && bandwidth_octaves > 0.0) {
            return Err(Error::config(format!(
                "bandwidth must be positive, got {bandwidth_octaves} octaves"
            )));
        }
        if !(step_octaves.is_finite() && step_octaves > 0.0) {
            return Err(Error::config(format!(
                "step must be positive, got {step_octaves} octaves"
            )));
        }

        let upper_bound = frequency_axis[frequency_axis.len() - 1] + frequency_axis[1];
        let max_octave = max_octave_index(upper_bound);
        let num_channels = channel_count(max_octave, step_octaves);

        let center_frequencies: Vec<f64> = (0..num_channels)
            .map(|i| START_FREQUENCY_HZ * (i as f64 * step_octaves).exp2())
            .collect();

        let sigma = bandwidth_octaves / (2.0 * BASE_SIGMA);
        let log_axis: Vec<f64> = frequency_axis.iter().map(|f| f.log2()).collect();

        let mut raw_weights = Vec::with_capacity(num_channels);
        let mut weights = Vec::with_capacity(num_channels);
        let mut quadrature_weights = Vec::with_capacity(num_channels);

        for &fc in &center_frequencies {
            let log_fc = fc.log2();
            let raw: Vec<f64> = log_axis
                .iter()
                .map(|&lf| {
                    let d = lf - log_fc;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();

            let sum: f64 = raw.iter().sum();
            let normalized = if sum > 0.0 {
                raw.iter().map(|w| w / sum).collect()
            } else {
                tracing::warn!(center_hz = fc, "filter bank channel has no weight on the axis");
                vec![0.0; raw.len()]
            };

            quadrature_weights.push(raw.iter().map(|w| w.abs().sqrt()).collect());
            weights.push(normalized);
            raw_weights.push(raw);
        }

        tracing::debug!(
            channels = num_channels,
            sigma_octaves = sigma,
            "built constant-Q filter bank"
        );

        Ok(Self {
            center_frequencies,
            weights,
            raw_weights,
            quadrature_weights,
            sigma_octaves: sigma,
            step_octaves,
        })
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.center_frequencies.len()
    }

    /// Weighted average of `power` (one value per axis frequency) in every
    /// channel, using the normalized weights.
    pub fn smooth_power(&self, power: &[f64]) -> Result<Vec<f64>> {
        let axis_len = self.weights.first().map_or(0, Vec::len);
        if power.len() != axis_len {
            return Err(Error::config(format!(
                "power spectrum has {} bins, filter bank expects {axis_len}",
                power.len()
            )));
        }
        Ok(self
            .weights
            .iter()
            .map(|row| row.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect())
    }
}

/// Octaves between [`START_FREQUENCY_HZ`] and half of `upper_bound`.
pub fn max_octave_index(upper_bound: f64) -> f64 {
    (upper_bound / 2.0 / START_FREQUENCY_HZ).log2()
}

/// `floor(max_octave / step) + 1`
///
/// A negative `max_octave` means the axis ends below twice
/// [`START_FREQUENCY_HZ`]; the bank then holds the single start channel.
pub fn channel_count(max_octave: f64, step_octaves: f64) -> usize {
    if max_octave < 0.0 {
        return 1;
    }
    (max_octave / step_octaves).floor() as usize + 1
}

fn validate_axis(axis: &[f64]) -> Result<()> {
    if axis.len() < 2 {
        return Err(Error::config(format!(
            "frequency axis needs at least 2 points, got {}",
            axis.len()
        )));
    }
    if axis.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(Error::config("frequency axis must be finite and non-negative"));
    }
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::config("frequency axis must be strictly ascending"));
    }
    Ok(())
}

/// Fractional-octave smoothed level (dB) of the non-negative half of a
/// spectrum.
///
/// Returns the channel centre frequencies and the smoothed power level of
/// each channel in dB.
pub fn smoothed_level_db(
    spectrum: &Spectrum,
    bandwidth_octaves: f64,
    step_octaves: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let half = spectrum.len() / 2 + 1;
    let axis: Vec<f64> = spectrum.frequencies().into_iter().take(half).collect();
    let power: Vec<f64> = spectrum.bins[..half].iter().map(|c| c.norm_sqr()).collect();

    let bank = FilterBank::new(&axis, bandwidth_octaves, step_octaves)?;
    let level = bank
        .smooth_power(&power)?
        .into_iter()
        .map(|p| 10.0 * p.max(1e-300).log10())
        .collect();
    Ok((bank.center_frequencies, level))
}
