//! Demux helpers for Symphonia.
//!
//! Used to measure narration audio (MP3 from the online backend, WAV from espeak) so the
//! video assembler can report how narration and picture durations line up.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

/// Probe an audio file and pick its first decodable track.
///
/// The file extension, when present, is passed as a probe hint.
pub fn probe_file(path: &Path) -> Result<(Box<dyn FormatReader>, Track)> {
    let file =
        File::open(path).with_context(|| format!("failed to open audio {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to probe {}", path.display()))?;

    let format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .cloned()
        .ok_or_else(|| anyhow!("no audio track found in {}", path.display()))?;

    Ok((format, track))
}

/// Duration of an audio file in seconds.
///
/// Uses the container's frame count when it declares one. Otherwise (headerless MP3
/// streams, concatenated MP3 chunks) the packet durations are summed.
pub fn audio_duration_seconds(path: &Path) -> Result<f64> {
    let (mut format, track) = probe_file(path)?;
    let params = &track.codec_params;
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| anyhow!("unknown sample rate in {}", path.display()))?;

    if let Some(frames) = params.n_frames {
        return Ok(frames as f64 / sample_rate as f64);
    }

    let time_base = params.time_base.unwrap_or(TimeBase::new(1, sample_rate));
    let mut ticks: u64 = 0;
    while let Some(packet) = next_packet(&mut format)? {
        if packet.track_id() == track.id {
            ticks += packet.dur;
        }
    }

    let time = time_base.calc_time(ticks);
    Ok(time.seconds as f64 + time.frac)
}

/// Read the next packet, treating IO errors as "end of stream".
pub fn next_packet(format: &mut Box<dyn FormatReader>) -> Result<Option<Packet>> {
    match format.next_packet() {
        Ok(p) => Ok(Some(p)),
        Err(SymphoniaError::IoError(_)) => Ok(None),
        Err(SymphoniaError::ResetRequired) => Ok(None),
        Err(e) => Err(anyhow!(e)).context("failed reading packet"),
    }
}
