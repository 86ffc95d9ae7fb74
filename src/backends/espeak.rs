use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, ensure};
use tracing::debug;

use crate::backend::Synthesizer;
use crate::tool;
use crate::wav::wav_duration_seconds;

/// Speech parameters for [`EspeakTts`].
#[derive(Debug, Clone)]
pub struct EspeakOpts {
    /// Speaking rate in words per minute.
    pub rate_wpm: u32,

    /// Volume from `0.0` (silent) to `1.0` (espeak's default amplitude).
    pub volume: f32,

    /// Explicit espeak voice name. When `None`, the language code passed to
    /// [`Synthesizer::synthesize`] selects the voice.
    pub voice: Option<String>,
}

impl Default for EspeakOpts {
    fn default() -> Self {
        Self {
            rate_wpm: 160,
            volume: 0.9,
            voice: None,
        }
    }
}

impl EspeakOpts {
    /// espeak amplitude (`-a`), where 100 is the engine's nominal level.
    pub fn amplitude(&self) -> u32 {
        (self.volume.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Offline text-to-speech backend driving the `espeak-ng` CLI. Writes WAV.
#[derive(Debug, Clone)]
pub struct EspeakTts {
    program: String,
    opts: EspeakOpts,
}

impl EspeakTts {
    pub fn new(opts: EspeakOpts) -> Self {
        Self {
            program: "espeak-ng".to_owned(),
            opts,
        }
    }

    /// Override the program name or path (defaults to `espeak-ng` on `PATH`).
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn speak(&self, text: &str, language: &str, out_path: &Path) -> Result<()> {
        let voice = self.opts.voice.as_deref().unwrap_or(language);

        // Text goes through stdin so input starting with '-' is never read as a flag.
        tool::run_with_stdin(
            Command::new(&self.program)
                .arg("--stdin")
                .arg("-v")
                .arg(voice)
                .arg("-s")
                .arg(self.opts.rate_wpm.to_string())
                .arg("-a")
                .arg(self.opts.amplitude().to_string())
                .arg("-w")
                .arg(out_path),
            text.as_bytes(),
        )?;

        let seconds = wav_duration_seconds(out_path)
            .with_context(|| format!("espeak wrote an unreadable file: {}", out_path.display()))?;
        ensure!(
            seconds > 0.0,
            "espeak produced no audio for {}",
            out_path.display()
        );

        debug!(path = %out_path.display(), seconds, "synthesized speech");
        Ok(())
    }
}

impl Synthesizer for EspeakTts {
    fn extension(&self) -> &'static str {
        "wav"
    }

    fn synthesize(&self, text: &str, language: &str, out_path: &Path) -> crate::Result<()> {
        Ok(self.speak(text, language, out_path)?)
    }
}
