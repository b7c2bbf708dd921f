//! Chunk representations and temporary artifact naming.

use std::path::{Path, PathBuf};

use frag_store::ObjectRef;
use serde::{Deserialize, Serialize};

/// A chunk being built.
///
/// Exclusively owned by the boundary scheduler while open; ownership moves
/// to the orchestrator on emission and the accumulator is never mutated
/// again once `complete` is set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAccumulator {
    /// Temporary compressed output file.
    pub artifact_path: PathBuf,
    /// Transformed bytes written so far: the decompressed/normalized byte
    /// count fed to the compressor, not the compressed output size.
    pub size: u64,
    /// False while the chunk is still accepting objects.
    pub complete: bool,
    /// Originating folder/bucket, kept for source deletion.
    pub bucket: String,
    /// Objects folded into this chunk, in aggregation order.
    pub members: Vec<ObjectRef>,
}

impl ChunkAccumulator {
    /// A fresh, empty accumulator writing to `artifact_path`.
    pub fn new(bucket: impl Into<String>, artifact_path: PathBuf) -> Self {
        Self {
            artifact_path,
            size: 0,
            complete: false,
            bucket: bucket.into(),
            members: Vec::new(),
        }
    }

    /// Validate the chunk for emission. After this the accumulator must not
    /// be mutated.
    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }
}

/// The immutable result of writing a chunk to its destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedChunk {
    /// Full destination path, including folder and generated name.
    pub path: String,
    /// Transformed byte count, carried over from the accumulator.
    pub size: u64,
    /// Originating folder/bucket.
    pub bucket: String,
    /// The source objects the chunk was built from.
    pub members: Vec<ObjectRef>,
}

/// Produces unique temporary artifact paths for one run.
///
/// The counter is owned by the namer, one per run. Default namers share the
/// system temp directory, so their file prefix additionally carries the
/// process id and a per-process run tag to keep concurrent runs apart;
/// uniqueness is positional, not cryptographic.
#[derive(Debug)]
pub struct TempNamer {
    dir: PathBuf,
    prefix: String,
    counter: u64,
}

impl TempNamer {
    /// Namer rooted at the system temp directory.
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static RUN: AtomicU64 = AtomicU64::new(0);
        let run = RUN.fetch_add(1, Ordering::Relaxed);
        Self {
            dir: std::env::temp_dir(),
            prefix: format!("frag-{}-{}-chunk", std::process::id(), run),
            counter: 0,
        }
    }

    /// Namer rooted at an explicit directory, with plain artifact names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "frag-chunk".to_string(),
            counter: 0,
        }
    }

    /// Next artifact path: `<prefix>-<n>.<ext>.gz`.
    ///
    /// `ext` is the chunk's primary extension; the trailing `.gz` reflects
    /// the always-compressed output format.
    pub fn next_artifact(&mut self, ext: &str) -> PathBuf {
        let n = self.counter;
        self.counter += 1;
        self.dir.join(format!("{}-{n}.{ext}.gz", self.prefix))
    }

    /// The directory artifacts are placed in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for TempNamer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_accumulator_is_empty_and_open() {
        let acc = ChunkAccumulator::new("bucket", PathBuf::from("/tmp/frag-chunk-0.csv.gz"));
        assert_eq!(acc.size, 0);
        assert!(!acc.complete);
        assert!(acc.members.is_empty());
        assert_eq!(acc.bucket, "bucket");
    }

    #[test]
    fn namer_counts_up_and_embeds_extension() {
        let mut namer = TempNamer::in_dir("/tmp");
        assert_eq!(
            namer.next_artifact("csv"),
            PathBuf::from("/tmp/frag-chunk-0.csv.gz")
        );
        assert_eq!(
            namer.next_artifact("tgz"),
            PathBuf::from("/tmp/frag-chunk-1.tgz.gz")
        );
    }

    #[test]
    fn independent_namers_do_not_share_state() {
        let mut a = TempNamer::in_dir("/tmp");
        let mut b = TempNamer::in_dir("/tmp");
        a.next_artifact("csv");
        assert_eq!(
            b.next_artifact("csv"),
            PathBuf::from("/tmp/frag-chunk-0.csv.gz")
        );
    }

    #[test]
    fn default_namers_never_collide() {
        let mut a = TempNamer::new();
        let mut b = TempNamer::new();
        assert_ne!(a.next_artifact("csv"), b.next_artifact("csv"));
    }
}
