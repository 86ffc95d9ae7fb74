//! `mangacast`: turn manga pages into a narrated video.
//!
//! This crate provides:
//! - Image download with silent skipping of failed fetches
//! - OCR (tesseract) and image captioning (BLIP via candle)
//! - Narration composition and text-to-speech (online Google TTS, offline espeak-ng)
//! - Frame layout and ffmpeg muxing into a final video
//!
//! The pipeline is strictly sequential; the backends sit behind small traits so the
//! orchestration can be driven by other implementations.

// Crate-wide error type.
pub mod error;
pub use error::{Error, Result};

// High-level API (most consumers should start here).
pub mod opts;
pub mod pipeline;

// Backend interfaces and the built-in implementations.
pub mod backend;
pub mod backends;

// Pipeline stages.
pub mod fetch;
pub mod narration;
pub mod sources;
pub mod video;

// Audio inspection and external tool plumbing.
pub mod demux;
pub mod tool;
pub mod wav;

// Logging configuration for the binaries.
#[cfg(feature = "logging")]
pub mod logging;
