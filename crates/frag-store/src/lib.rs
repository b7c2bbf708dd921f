//! Storage backends for frag.
//!
//! A backend is a named collection of folders (directories or buckets) of
//! immutable objects. The chunk-building engine in `frag-core` consumes the
//! [`Backend`] trait and never touches a concrete store directly.
//!
//! # Backends
//!
//! - [`FsBackend`] -- local directories, one file per object
//! - [`S3Backend`] -- S3-compatible object stores (AWS, MinIO, LocalStack)
//! - [`InMemoryBackend`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Listings are deterministic: every backend returns objects in
//!    lexicographic name order so chunking is reproducible.
//! 2. All I/O errors are propagated with the path or bucket that failed.
//! 3. Deletes are best-effort batch operations; failures are reported, never
//!    retried.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod s3;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{RemoteConfig, S3Config};
pub use error::{StoreError, StoreResult};
pub use fs::FsBackend;
pub use memory::InMemoryBackend;
pub use object::ObjectRef;
pub use s3::S3Backend;
pub use traits::Backend;
