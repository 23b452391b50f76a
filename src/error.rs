//! Error types for decoding and analysis

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the analysis entry points
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be turned into an audio signal
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A parameter or value object violates its invariants
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures while turning an input into an `AudioSignal`
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("corrupt audio stream: {0}")]
    Corrupt(String),

    #[error("audio stream produced no samples")]
    Empty,

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("audio capture failed: {0}")]
    Capture(String),
}

/// Failure to parse a `#RRGGBB` color code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color code {0:?}, expected #RRGGBB")]
pub struct ParseColorError(pub String);

pub type Result<T, E = Error> = std::result::Result<T, E>;
