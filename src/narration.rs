use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

/// Everything the pipeline learned about one image, keyed by the image's ordinal index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationEntry {
    pub index: usize,
    pub image_url: String,
    pub image_path: PathBuf,
    pub text: String,
    pub caption: String,
    pub narration: String,
    pub audio_path: PathBuf,
}

/// Merge OCR text and a caption into the voiceover sentence for one image.
pub fn compose_narration(text: &str, caption: &str) -> String {
    format!("The image contains the text: '{text}'. Additionally, it appears to be: {caption}.")
}

/// Write `entries` as a pretty-printed JSON array to `path`.
pub fn write_manifest(path: &Path, entries: &[NarrationEntry]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create manifest: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, entries).context("failed to encode manifest")?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
