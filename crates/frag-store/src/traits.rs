use std::io::Read;
use std::path::Path;

use crate::error::StoreResult;
use crate::object::ObjectRef;

/// A storage backend: a named collection of folders (directories or buckets)
/// holding immutable objects.
///
/// All implementations must satisfy these invariants:
/// - `list_objects` returns a deterministic ordering (lexicographic by name)
///   so repeated runs chunk identically.
/// - Objects are never interpreted -- the backend is a pure byte store.
/// - All I/O errors are propagated with the path or bucket that failed,
///   never silently ignored.
pub trait Backend: Send + Sync {
    /// List all objects under `folder` whose name starts with `prefix`.
    ///
    /// Pass `""` to list everything. The returned order must be stable
    /// across calls for the same folder contents.
    fn list_objects(&self, folder: &str, prefix: &str) -> StoreResult<Vec<ObjectRef>>;

    /// Open a readable stream over the raw content of `folder/name`.
    fn get_object(&self, folder: &str, name: &str) -> StoreResult<Box<dyn Read + Send>>;

    /// Persist the local file at `artifact` as `folder/prefix/name`.
    ///
    /// Intermediate directories or key namespaces are created as needed.
    fn write_object(
        &self,
        artifact: &Path,
        folder: &str,
        name: &str,
        prefix: &str,
    ) -> StoreResult<()>;

    /// Delete all of `objects` from `folder`. Best-effort batch operation:
    /// a failure is reported to the caller, never retried.
    fn delete_objects(&self, folder: &str, objects: &[ObjectRef]) -> StoreResult<()>;

    /// Human-readable backend identity for logging.
    fn info(&self) -> String;
}

/// Join non-empty key segments with `/`, the separator every backend uses.
pub(crate) fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
