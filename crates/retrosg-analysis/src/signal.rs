//! Multi-channel sample buffers.
//!
//! [`Signal`] is the interchange type between every pipeline stage: recorded
//! and played stimuli, raw impulse responses and refined responses. Mono is
//! the one-channel case of the same type, so every routine that works on a
//! stereo measurement works on a mono one unchanged.

use crate::error::{Error, Result};

/// Maximum number of channels a measurement may carry.
pub const MAX_CHANNELS: usize = 2;

/// Real-valued samples for one or two channels at a common sample rate.
///
/// Every channel has the same length.
///
/// # Example
///
/// ```rust
/// use retrosg_analysis::Signal;
///
/// let signal = Signal::stereo(vec![1.0; 1024], vec![0.5; 1024], 48000.0).unwrap();
/// assert_eq!(signal.len(), 1024);
/// assert_eq!(signal.num_channels(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    channels: Vec<Vec<f64>>,
    sample_rate: f64,
}

impl Signal {
    /// Create a signal from per-channel sample vectors.
    ///
    /// Fails when there are no channels, more than [`MAX_CHANNELS`], channels of
    /// unequal length, or a non-positive sample rate.
    pub fn new(channels: Vec<Vec<f64>>, sample_rate: f64) -> Result<Self> {
        if channels.is_empty() || channels.len() > MAX_CHANNELS {
            return Err(Error::config(format!(
                "signal must have 1 or {MAX_CHANNELS} channels, got {}",
                channels.len()
            )));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::config(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(Error::config("all channels must have the same length"));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a mono signal.
    pub fn mono(samples: Vec<f64>, sample_rate: f64) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a two-channel signal.
    pub fn stereo(first: Vec<f64>, second: Vec<f64>, sample_rate: f64) -> Result<Self> {
        Self::new(vec![first, second], sample_rate)
    }

    /// Build a signal from interleaved samples (`c0, c1, c0, c1, ...`).
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(interleaved: &[f64], num_channels: usize, sample_rate: f64) -> Result<Self> {
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(Error::config(format!(
                "signal must have 1 or {MAX_CHANNELS} channels, got {num_channels}"
            )));
        }
        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in interleaved.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Interleave the channels (`c0, c1, c0, c1, ...`).
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len() * self.num_channels());
        for i in 0..self.len() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    /// Number of channels (1 or 2).
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> Result<&[f64]> {
        self.channels.get(index).map(Vec::as_slice).ok_or_else(|| {
            Error::config(format!(
                "channel {index} out of range for a {}-channel signal",
                self.num_channels()
            ))
        })
    }

    /// All channels.
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Consume the signal and return its channel vectors.
    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Whether every sample of every channel is finite.
    pub fn is_finite(&self) -> bool {
        self.channels.iter().flatten().all(|s| s.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_three_channels() {
        let err = Signal::new(vec![vec![0.0; 4]; 3], 48000.0).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn rejects_ragged_channels() {
        assert!(Signal::stereo(vec![0.0; 4], vec![0.0; 5], 48000.0).is_err());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(Signal::mono(vec![0.0; 4], 0.0).is_err());
    }

    #[test]
    fn interleaved_roundtrip() {
        let signal = Signal::stereo(vec![1.0, 3.0], vec![2.0, 4.0], 8000.0).unwrap();
        let interleaved = signal.to_interleaved();
        assert_eq!(interleaved, vec![1.0, 2.0, 3.0, 4.0]);

        let back = Signal::from_interleaved(&interleaved, 2, 8000.0).unwrap();
        assert_eq!(back, signal);
    }

    #[test]
    fn channel_index_out_of_range() {
        let signal = Signal::mono(vec![0.0; 8], 8000.0).unwrap();
        assert!(signal.channel(0).is_ok());
        assert!(signal.channel(1).is_err());
    }

    #[test]
    fn duration_from_rate() {
        let signal = Signal::mono(vec![0.0; 24000], 48000.0).unwrap();
        assert!((signal.duration_secs() - 0.5).abs() < 1e-12);
    }
}
