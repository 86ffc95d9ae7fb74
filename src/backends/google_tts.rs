use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, ensure};
use reqwest::Url;
use reqwest::blocking::Client;
use tracing::debug;

use crate::backend::Synthesizer;

/// Public Google Translate speech endpoint (the one gTTS talks to).
pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects requests whose text is longer than this.
const MAX_CHUNK_CHARS: usize = 100;

/// Online text-to-speech backend producing MP3.
///
/// Long sentences are split into word-aligned chunks; the MP3 responses are appended in
/// order into a single file, which decoders play back as one stream.
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Point the backend at a different endpoint (mirrors, local test servers).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("mangacast")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn speak(&self, text: &str, language: &str, out_path: &Path) -> Result<()> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        ensure!(!chunks.is_empty(), "nothing to synthesize: text is empty");

        let file = File::create(out_path)
            .with_context(|| format!("failed to create {}", out_path.display()))?;
        let mut writer = BufWriter::new(file);

        let total = chunks.len().to_string();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let url = Url::parse_with_params(
                &self.endpoint,
                &[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ],
            )
            .with_context(|| format!("invalid TTS endpoint: {}", self.endpoint))?;

            let bytes = self
                .client
                .get(url)
                .send()
                .context("TTS request failed")?
                .error_for_status()
                .context("TTS request failed (bad status)")?
                .bytes()
                .context("failed to read TTS response body")?;

            debug!(chunk = %idx, bytes = bytes.len(), "received speech chunk");
            writer.write_all(&bytes)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Synthesizer for GoogleTts {
    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn synthesize(&self, text: &str, language: &str, out_path: &Path) -> crate::Result<()> {
        Ok(self.speak(text, language, out_path)?)
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking on whitespace.
///
/// Words longer than `max_chars` are split mid-word.
///
/// # Panics
///
/// Panics if `max_chars` is zero.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    assert!(max_chars > 0, "chunk size must be at least one character");

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunk_text("  hello   world ", 100), vec!["hello world"]);
        assert!(chunk_text("   ", 100).is_empty());
    }

    #[test]
    fn chunks_break_on_word_boundaries() {
        let chunks = chunk_text("aaa bbb ccc ddd", 7);
        assert_eq!(chunks, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn overlong_words_are_split() {
        let chunks = chunk_text("ab abcdefghij cd", 4);
        assert_eq!(chunks, vec!["ab", "abcd", "efgh", "ij", "cd"]);
    }

    #[test]
    #[should_panic(expected = "chunk size must be at least one character")]
    fn zero_chunk_size_is_rejected() {
        chunk_text("hello", 0);
    }

    #[test]
    fn chunk_length_is_counted_in_chars() {
        let chunks = chunk_text("ééé ééé", 7);
        assert_eq!(chunks, vec!["ééé ééé"]);
        for chunk in chunk_text(&"word ".repeat(80), MAX_CHUNK_CHARS) {
            assert!(chunk.chars().count() <= MAX_CHUNK_CHARS);
        }
    }
}
