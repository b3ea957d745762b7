//! Error types for the capture and encode pipeline

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between capturing a frame and writing the GIF
#[derive(Error, Debug)]
pub enum Error {
    /// The frame does not match the canvas established by the first frame
    /// of the session. The store is left unchanged.
    #[error("frame is {}x{} but the session canvas is {}x{}", .found.0, .found.1, .expected.0, .expected.1)]
    InvalidFrame {
        expected: (u16, u16),
        found: (u16, u16),
    },

    #[error("malformed raster image: {0}")]
    MalformedRaster(String),

    #[error("no frames to export")]
    EmptySequence,

    /// A captured frame could not be read back at export time
    #[error("failed to decode frame {}: {reason}", .path.display())]
    DecodeFailure { path: PathBuf, reason: String },

    /// An encoded frame disagrees with the canvas it is muxed into
    #[error("frame is {}x{} but the canvas is {}x{}", .found.0, .found.1, .expected.0, .expected.1)]
    DimensionMismatch {
        expected: (u16, u16),
        found: (u16, u16),
    },

    #[error("palette index {index} does not fit a {code_size}-bit code table")]
    IndexOutOfRange { index: u8, code_size: u8 },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stream error: {0}")]
    Stream(#[from] io::Error),

    #[error("export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias using the crate's Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a decode failure for the frame at `path`
    pub fn decode_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an I/O failure carrying the path that was attempted
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
