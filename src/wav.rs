use std::path::Path;

use anyhow::{Context, Result};
use hound::WavReader;

/// Duration of a WAV file in seconds, read from its header.
///
/// `hound` reports the length in frames (samples per channel), so channel count doesn't
/// matter here.
pub fn wav_duration_seconds(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to read WAV file {}", path.display()))?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}
