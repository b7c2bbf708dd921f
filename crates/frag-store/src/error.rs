/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Listing a folder or bucket failed.
    #[error("unable to list objects in '{path}': {reason}")]
    List { path: String, reason: String },

    /// Reading an object failed.
    #[error("unable to read object '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Writing an object failed.
    #[error("unable to write object to '{path}': {reason}")]
    Write { path: String, reason: String },

    /// Deleting one or more objects failed.
    #[error("unable to delete objects from '{path}': {reason}")]
    Delete { path: String, reason: String },

    /// A mandatory configuration value is missing or invalid.
    #[error("environment variable '{0}' is mandatory")]
    MissingConfig(&'static str),

    /// The backend could not be constructed.
    #[error("unable to initialize backend: {0}")]
    Init(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
