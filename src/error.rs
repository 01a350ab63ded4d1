use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading samples or decomposing depth.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unrecognized output mode, malformed plane list, or bad config value.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input data the pipeline cannot work with (empty depth buffer,
    /// channel selector out of range, mismatched shapes).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The mask stack is not a partition of the pixels across planes.
    /// This is a logic defect, never a data problem.
    #[error("mask stack partition violated: {assigned} assignments for {expected} pixels")]
    InvariantViolation { assigned: u64, expected: u64 },

    #[error("sample index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Config(#[from] serde_json::Error),
}
