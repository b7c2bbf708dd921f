use std::path::PathBuf;

use frag_store::StoreError;

/// Errors from the chunk-building engine.
#[derive(Debug, thiserror::Error)]
pub enum FragError {
    /// An object has an extension with no registered transform.
    #[error("'{0}' handling is not implemented yet")]
    UnsupportedExtension(String),

    /// The skip-threshold fraction is outside `0.0..=1.0`.
    #[error("threshold fraction must be within 0.0..=1.0, got {0}")]
    InvalidThreshold(f64),

    /// Writing a finalized chunk to the destination backend failed.
    #[error("unable to write chunk to '{dest}': {source}")]
    WriteChunk {
        dest: String,
        #[source]
        source: StoreError,
    },

    /// Removing a chunk's temporary artifact failed.
    #[error("unable to delete tmp chunk '{path}': {source}")]
    DeleteArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deleting a chunk's source objects failed (the chunk itself was
    /// already written).
    #[error("unable to delete source objects from '{bucket}': {source}")]
    DeleteSources {
        bucket: String,
        #[source]
        source: StoreError,
    },

    /// The computed week-of-month fell outside 1..=5.
    #[error("week of month {0} is out of range (expected 1-5)")]
    WeekOutOfRange(u32),

    /// Backend I/O error (listing or reading source objects).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Local I/O error in the transform pipeline or hashing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type FragResult<T> = Result<T, FragError>;
