use std::path::Path;

use crate::Result;

/// Pluggable OCR backend used by [`crate::pipeline::Pipeline`].
///
/// Implementations return the recognized text trimmed of surrounding whitespace, or
/// [`NO_TEXT_SENTINEL`] when nothing was recognized. Unreadable images are errors.
pub trait TextExtractor {
    fn extract_text(&self, image_path: &Path) -> Result<String>;
}

/// Pluggable image-captioning backend.
///
/// Takes `&mut self` because model backends keep per-generation state (KV caches) that is
/// reset between images rather than reallocated.
pub trait Captioner {
    fn caption(&mut self, image_path: &Path) -> Result<String>;
}

/// Pluggable text-to-speech backend.
pub trait Synthesizer {
    /// File extension (without the dot) of the audio this backend writes, e.g. `"mp3"`.
    fn extension(&self) -> &'static str;

    /// Speak `text` in `language` and write the audio to `out_path`.
    fn synthesize(&self, text: &str, language: &str, out_path: &Path) -> Result<()>;
}

/// Returned by OCR backends when the image contains no recognizable text.
pub const NO_TEXT_SENTINEL: &str = "No readable text found.";

/// Trim raw OCR output and substitute [`NO_TEXT_SENTINEL`] when nothing is left.
pub fn normalize_ocr_text(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        NO_TEXT_SENTINEL.to_owned()
    } else {
        text.to_owned()
    }
}
