use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use image::ImageFormat;
use tracing::debug;

use crate::backend::{TextExtractor, normalize_ocr_text};
use crate::fetch::open_image;
use crate::tool;

/// OCR backend that shells out to the `tesseract` CLI.
///
/// Images are converted to greyscale before recognition; the greyscale copy lives in a
/// temporary file that is removed once tesseract returns.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    program: String,
    language: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            program: "tesseract".to_owned(),
            language: "eng".to_owned(),
        }
    }
}

impl TesseractOcr {
    /// Use a tesseract language pack other than `eng` (e.g. `"jpn"`).
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Override the program name or path (defaults to `tesseract` on `PATH`).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn recognize(&self, image_path: &Path) -> Result<String> {
        let img = open_image(image_path)?;
        let gray = img.to_luma8();

        let scratch = tempfile::Builder::new()
            .prefix("mangacast-ocr-")
            .suffix(".png")
            .tempfile()
            .context("failed to create OCR scratch file")?;
        gray.save_with_format(scratch.path(), ImageFormat::Png)
            .context("failed to write greyscale image")?;

        let output = tool::run(
            Command::new(&self.program)
                .arg(scratch.path())
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
        )?;

        let raw = String::from_utf8_lossy(&output.stdout);
        debug!(image = %image_path.display(), chars = raw.len(), "tesseract finished");
        Ok(normalize_ocr_text(&raw))
    }
}

impl TextExtractor for TesseractOcr {
    fn extract_text(&self, image_path: &Path) -> crate::Result<String> {
        Ok(self.recognize(image_path)?)
    }
}
