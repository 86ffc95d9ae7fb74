use std::error::Error as StdError;
use std::process::ExitStatus;

use thiserror::Error;

/// Mangacast's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Mangacast's crate-wide error type.
///
/// This is intentionally decoupled from `anyhow` so downstream libraries aren't forced to
/// adopt `anyhow` in their own public APIs. Backend traits return this type; orchestration
/// code uses `anyhow` internally and converts at the seam.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// An external program (tesseract, ffmpeg, espeak-ng) exited unsuccessfully.
    #[error("{program} failed ({status}): {stderr}")]
    Tool {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Self::Other(Box::new(err))
    }
}
