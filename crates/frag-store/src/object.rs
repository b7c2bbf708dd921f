use serde::{Deserialize, Serialize};

/// A source object as seen in a backend listing.
///
/// The `name` is a key relative to the folder or bucket it was listed from,
/// with `/`-separated segments. The `size` is the object's stored size in
/// bytes, as reported by the backend. `ObjectRef` is immutable and read-only
/// to the chunking engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Relative key of the object within its folder/bucket.
    pub name: String,
    /// Stored size in bytes.
    pub size: u64,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.size)
    }
}
