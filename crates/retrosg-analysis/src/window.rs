//! Peak location and fixed-length analysis windows.
//!
//! An impulse response is split into an "LTI" window that starts a short
//! pre-delay before the main peak, and a "noise" window anchored at the
//! midpoint of the response that captures the background and non-linear
//! residue. Both windows share one length. Windows are never wrapped or
//! truncated: a window that does not fit is a [`Error::Bounds`].

use crate::error::{Error, Result};
use crate::signal::Signal;
use std::ops::Range;

/// A contiguous sample range `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisWindow {
    /// First sample index.
    pub start: usize,
    /// Number of samples.
    pub length: usize,
}

impl AnalysisWindow {
    /// One past the last sample index.
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// The window as an index range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Borrow the window's samples out of `samples`.
    pub fn extract<'a>(&self, samples: &'a [f64]) -> Result<&'a [f64]> {
        samples.get(self.range()).ok_or(Error::Bounds {
            what: "analysis window",
            start: self.start as i64,
            end: self.end() as i64,
            len: samples.len(),
        })
    }
}

/// The two analysis windows of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WindowPair {
    /// Direct-response window, starting `pre_delay` before the peak.
    pub lti: AnalysisWindow,
    /// Background window, starting at the response midpoint.
    pub noise: AnalysisWindow,
}

/// Index of the largest absolute sample on `channel`.
///
/// Ties resolve to the earliest index. Non-finite samples are skipped.
pub fn locate_peak(ir: &Signal, channel: usize) -> Result<usize> {
    let samples = ir.channel(channel)?;
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in samples.iter().enumerate() {
        if !s.is_finite() {
            continue;
        }
        let magnitude = s.abs();
        if best.is_none_or(|(_, m)| magnitude > m) {
            best = Some((i, magnitude));
        }
    }
    best.map(|(i, _)| i).ok_or_else(|| {
        Error::config(format!(
            "channel {channel} has no finite samples to locate a peak in"
        ))
    })
}

/// Seconds to samples, rounding half away from zero.
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    (seconds * sample_rate).round() as usize
}

/// Build the LTI and noise windows of a response of `total_samples`.
///
/// The LTI window starts `round(pre_delay_secs * fs)` samples before
/// `peak_index`; the noise window starts at `round(total_samples / 2)`. Both
/// have length `round(window_secs * fs)`.
pub fn build_windows(
    peak_index: usize,
    pre_delay_secs: f64,
    window_secs: f64,
    sample_rate: f64,
    total_samples: usize,
) -> Result<WindowPair> {
    if !(pre_delay_secs.is_finite() && pre_delay_secs >= 0.0) {
        return Err(Error::config(format!(
            "pre-delay must be non-negative, got {pre_delay_secs} s"
        )));
    }
    if !(window_secs.is_finite() && window_secs > 0.0) {
        return Err(Error::config(format!(
            "window duration must be positive, got {window_secs} s"
        )));
    }
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(Error::config(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }

    let pre_delay = seconds_to_samples(pre_delay_secs, sample_rate);
    let length = seconds_to_samples(window_secs, sample_rate);
    if length == 0 {
        return Err(Error::config(format!(
            "window of {window_secs} s is shorter than one sample at {sample_rate} Hz"
        )));
    }

    let lti_start = peak_index as i64 - pre_delay as i64;
    check_bounds("LTI window", lti_start, length, total_samples)?;

    let noise_start = (total_samples as f64 / 2.0).round() as i64;
    check_bounds("noise window", noise_start, length, total_samples)?;

    let windows = WindowPair {
        lti: AnalysisWindow {
            start: lti_start as usize,
            length,
        },
        noise: AnalysisWindow {
            start: noise_start as usize,
            length,
        },
    };
    tracing::debug!(peak_index, ?windows, "built analysis windows");
    Ok(windows)
}

fn check_bounds(what: &'static str, start: i64, length: usize, len: usize) -> Result<()> {
    let end = start + length as i64;
    if start < 0 || end > len as i64 {
        return Err(Error::Bounds {
            what,
            start,
            end,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_is_largest_absolute_sample() {
        let ir = Signal::mono(vec![0.1, -0.9, 0.5, 0.9], 8000.0).unwrap();
        // -0.9 and 0.9 tie; the earlier index wins.
        assert_eq!(locate_peak(&ir, 0).unwrap(), 1);
    }

    #[test]
    fn peak_uses_requested_channel() {
        let ir = Signal::stereo(vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0], 8000.0).unwrap();
        assert_eq!(locate_peak(&ir, 0).unwrap(), 0);
        assert_eq!(locate_peak(&ir, 1).unwrap(), 2);
        assert!(locate_peak(&ir, 2).is_err());
    }

    #[test]
    fn peak_skips_nan() {
        let ir = Signal::mono(vec![f64::NAN, 0.2, 0.1], 8000.0).unwrap();
        assert_eq!(locate_peak(&ir, 0).unwrap(), 1);
    }

    #[test]
    fn windows_follow_peak_and_midpoint() {
        let windows = build_windows(4800, 0.05, 0.25, 48000.0, 48000).unwrap();
        assert_eq!(
            windows.lti,
            AnalysisWindow {
                start: 2400,
                length: 12000
            }
        );
        assert_eq!(
            windows.noise,
            AnalysisWindow {
                start: 24000,
                length: 12000
            }
        );
    }

    #[test]
    fn peak_before_pre_delay_is_bounds_error() {
        let err = build_windows(100, 0.05, 0.1, 48000.0, 48000).unwrap_err();
        assert!(matches!(
            err,
            Error::Bounds {
                what: "LTI window",
                start: -2300,
                ..
            }
        ));
    }

    #[test]
    fn window_past_end_is_bounds_error() {
        // LTI window fits, noise window from the midpoint does not.
        let err = build_windows(3000, 0.05, 0.6, 48000.0, 48000).unwrap_err();
        assert!(matches!(err, Error::Bounds { what: "noise window", .. }));
    }

    #[test]
    fn zero_length_window_is_configuration_error() {
        let err = build_windows(100, 0.0, 1e-6, 8000.0, 1000).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn extract_checks_bounds() {
        let window = AnalysisWindow {
            start: 2,
            length: 3,
        };
        let samples = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(window.extract(&samples).unwrap(), &[2.0, 3.0, 4.0]);
        assert!(window.extract(&samples[..4]).is_err());
    }
}
