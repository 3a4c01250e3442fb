//! WAV file reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use retrosg_analysis::Signal;
use retrosg_analysis::signal::MAX_CHANNELS;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len()); // total across all channels
    let num_frames = total_samples / u64::from(spec.channels);
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: u32,
    /// Bit depth per sample: 16 or 24 for PCM, 32 for float.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a one- or two-channel WAV file as a [`Signal`].
///
/// Integer PCM is scaled to `[-1, 1)`; float samples pass through. Files
/// with more than two channels are rejected rather than mixed down, since
/// the channel pairing carries meaning (close and far microphone).
///
/// # Example
/// ```ignore
/// let (signal, spec) = read_signal("recorded.wav")?;
/// println!("Loaded {} frames at {} Hz", signal.len(), spec.sample_rate);
/// ```
pub fn read_signal<P: AsRef<Path>>(path: P) -> Result<(Signal, WavSpec)> {
    let reader = WavReader::open(path.as_ref())?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels as usize;
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(Error::UnsupportedChannels(spec.channels));
    }

    let interleaved: Vec<f64> = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !(1..=32).contains(&bits) {
                return Err(Error::UnsupportedFormat(format!("{bits}-bit PCM")));
            }
            let max_val = f64::from(1u32 << (bits - 1));
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let signal = Signal::from_interleaved(&interleaved, channels, f64::from(spec.sample_rate))?;
    tracing::debug!(
        path = %path.as_ref().display(),
        channels,
        frames = signal.len(),
        sample_rate = spec.sample_rate,
        "read WAV file"
    );
    Ok((signal, spec))
}

/// Write a [`Signal`] to a WAV file.
///
/// The channel count and sample rate come from the signal; `spec` supplies
/// the bit depth. 32-bit writes float, 16 and 24 write clamped PCM.
///
/// # Example
/// ```ignore
/// let ir = Signal::mono(vec![0.0; 48000], 48000.0)?;
/// write_signal("ir.wav", &ir, WavSpec::default())?;
/// ```
pub fn write_signal<P: AsRef<Path>>(path: P, signal: &Signal, spec: WavSpec) -> Result<()> {
    let bits = spec.bits_per_sample;
    if !matches!(bits, 16 | 24 | 32) {
        return Err(Error::UnsupportedFormat(format!("{bits}-bit output")));
    }
    let spec = WavSpec {
        channels: signal.num_channels() as u16,
        sample_rate: signal.sample_rate().round() as u32,
        bits_per_sample: bits,
    };

    let mut writer = WavWriter::create(path.as_ref(), hound::WavSpec::from(spec))?;
    let interleaved = signal.to_interleaved();

    if bits == 32 {
        for &sample in &interleaved {
            writer.write_sample(sample as f32)?;
        }
    } else {
        let max_val = f64::from(1u32 << (bits - 1));
        for &sample in &interleaved {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
    }

    writer.finalize()?;
    tracing::debug!(
        path = %path.as_ref().display(),
        channels = spec.channels,
        frames = signal.len(),
        bits,
        "wrote WAV file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip_f32() {
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 / 1000.0).sin()).collect();
        let signal = Signal::mono(samples.clone(), 48000.0).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, WavSpec::default()).unwrap();

        let (loaded, loaded_spec) = read_signal(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 48000);
        assert_eq!(loaded.len(), samples.len());

        for (a, b) in samples.iter().zip(loaded.channel(0).unwrap()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<f64> = (0..1000).map(|i| (i as f64 / 1000.0).sin() * 0.9).collect();
        let signal = Signal::mono(samples.clone(), 44100.0).unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
        };

        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, spec).unwrap();

        let (loaded, loaded_spec) = read_signal(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 44100);
        assert_eq!(loaded_spec.bits_per_sample, 16);

        // 16-bit has less precision
        for (a, b) in samples.iter().zip(loaded.channel(0).unwrap()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_stereo_keeps_channel_order() {
        let left: Vec<f64> = (0..500).map(|i| i as f64 / 1000.0).collect();
        let right: Vec<f64> = (0..500).map(|i| -(i as f64) / 1000.0).collect();
        let signal = Signal::stereo(left.clone(), right.clone(), 48000.0).unwrap();

        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, WavSpec::default()).unwrap();

        let (loaded, spec) = read_signal(file.path()).unwrap();
        assert_eq!(spec.channels, 2);
        for (a, b) in left.iter().zip(loaded.channel(0).unwrap()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in right.iter().zip(loaded.channel(1).unwrap()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pcm_write_clamps() {
        let signal = Signal::mono(vec![2.0, -2.0], 8000.0).unwrap();
        let spec = WavSpec {
            bits_per_sample: 16,
            ..WavSpec::default()
        };

        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, spec).unwrap();

        let (loaded, _) = read_signal(file.path()).unwrap();
        let samples = loaded.channel(0).unwrap();
        assert!((samples[0] - 32767.0 / 32768.0).abs() < 1e-12);
        assert_eq!(samples[1], -1.0);
    }

    #[test]
    fn test_rejects_more_than_two_channels() {
        let file = NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 3,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for _ in 0..30 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let err = read_signal(file.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedChannels(3)));
    }

    #[test]
    fn test_rejects_unsupported_bit_depth() {
        let signal = Signal::mono(vec![0.0; 4], 8000.0).unwrap();
        let spec = WavSpec {
            bits_per_sample: 12,
            ..WavSpec::default()
        };
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            write_signal(file.path(), &signal, spec),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
