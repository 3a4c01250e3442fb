//! JSON records and provenance sidecars.
//!
//! A refined impulse response is written as a WAV file plus a `<file>.json`
//! sidecar describing where it came from: source recording, taper band,
//! safeguard threshold and peak position.

use crate::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Where a refined response came from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    /// Source recording file name.
    pub source: String,
    /// Low taper cutoff in Hz.
    pub low_cut_hz: f64,
    /// High taper cutoff in Hz.
    pub high_cut_hz: f64,
    /// Seconds kept before the peak in the LTI window.
    pub pre_delay_s: f64,
    /// Length of the LTI and noise windows, in seconds.
    pub window_duration_s: f64,
    /// Safeguard threshold of the stimulus, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_db: Option<f64>,
    /// Peak index in the raw impulse response.
    pub peak_index: usize,
    /// Sample rate in Hz.
    pub sample_rate: f64,
}

/// Sidecar path for `wav_path`: the same path with `.json` appended.
///
/// `ir.wav` becomes `ir.wav.json`.
pub fn provenance_path<P: AsRef<Path>>(wav_path: P) -> PathBuf {
    let mut path = wav_path.as_ref().as_os_str().to_owned();
    path.push(".json");
    PathBuf::from(path)
}

/// Write the provenance sidecar next to `wav_path` and return its path.
pub fn write_provenance<P: AsRef<Path>>(wav_path: P, provenance: &Provenance) -> Result<PathBuf> {
    let path = provenance_path(wav_path);
    save_record(&path, provenance)?;
    Ok(path)
}

/// Read the provenance sidecar of `wav_path`.
pub fn read_provenance<P: AsRef<Path>>(wav_path: P) -> Result<Provenance> {
    load_record(provenance_path(wav_path))
}

/// Save any serializable value as pretty-printed JSON.
pub fn save_record<T: Serialize, P: AsRef<Path>>(path: P, record: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path.as_ref(), json)?;
    tracing::debug!(path = %path.as_ref().display(), "saved JSON record");
    Ok(())
}

/// Load a JSON record.
pub fn load_record<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
