//! Chunk-building engine for frag.
//!
//! Aggregates many small objects from a [`Backend`] folder into a few
//! size-bounded, gzip-compressed chunks, normalizing text line endings at
//! every seam, then writes each chunk to a destination and optionally
//! deletes the originals.
//!
//! # Pipeline
//!
//! ```text
//! listing -> ChunkScheduler -> transform pipeline -> temp artifact
//!                 |                                      |
//!                 emits completed accumulators           |
//!                 v                                      v
//!              frag() ------ write_chunk() ------ delete_chunk()
//! ```
//!
//! The engine is synchronous and single-threaded by design: one object is
//! read, transformed and appended at a time, one chunk is open at a time.
//! Any error aborts the whole run.

pub mod chunk;
pub mod error;
pub mod finalize;
pub mod scheduler;
pub mod transform;
pub mod util;

use frag_store::Backend;
use serde::{Deserialize, Serialize};
use tracing::info;

// Re-export primary types at crate root for ergonomic imports.
pub use chunk::{ChunkAccumulator, FinalizedChunk, TempNamer};
pub use error::{FragError, FragResult};
pub use finalize::{delete_chunk, write_chunk};
pub use scheduler::ChunkScheduler;
pub use util::{close_enough, file_extensions};

/// Tuning knobs for one [`frag`] run.
#[derive(Clone, Debug)]
pub struct Options {
    /// Delete source objects once their chunk is safely written.
    pub delete_src: bool,
    /// Prefix filter applied to the source listing.
    pub src_prefix: String,
    /// Prefix prepended to every destination key.
    pub dst_prefix: String,
    /// Join aggregated text objects with CRLF instead of LF.
    pub crlf: bool,
    /// Number of leading path segments that group objects; objects from
    /// different groups are never aggregated together.
    pub keep_prefixes: usize,
    /// Refuse to finalize chunks smaller than the target size.
    pub strict_size: bool,
    /// Fraction of the target size within which an object is considered
    /// already fine and left untouched (0.05 = within 5%).
    pub threshold: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delete_src: false,
            src_prefix: String::new(),
            dst_prefix: String::new(),
            crlf: false,
            keep_prefixes: 0,
            strict_size: true,
            threshold: 0.05,
        }
    }
}

/// The outcome of a [`frag`] run.
///
/// `incomplete` holds chunks that reached end-of-listing without being
/// validated: they were never written and never cleaned up, and their temp
/// artifacts are left on disk for inspection or recovery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub done: Vec<FinalizedChunk>,
    pub incomplete: Vec<ChunkAccumulator>,
}

/// Run one end-to-end aggregation from `src` to `dst`.
///
/// Drives the boundary scheduler and, for every emitted chunk: finalizes it
/// ([`write_chunk`]), then cleans it up. A complete chunk with exactly one
/// member whose source and destination locations coincide is a no-op: the
/// object already lives at its final location, so only the temp artifact is
/// removed and the source is never deleted.
pub fn frag(
    backend: &dyn Backend,
    src: &str,
    dst: &str,
    max_chunk_size: u64,
    options: Options,
) -> FragResult<RunResult> {
    if !(0.0..=1.0).contains(&options.threshold) {
        return Err(FragError::InvalidThreshold(options.threshold));
    }

    info!(driver = %backend.info(), "starting run");
    info!(
        src,
        dst,
        src_prefix = %options.src_prefix,
        dst_prefix = %options.dst_prefix,
        "locations"
    );
    info!(
        max_chunk_size,
        delete_src = options.delete_src,
        crlf = options.crlf,
        keep_prefixes = options.keep_prefixes,
        strict_size = options.strict_size,
        threshold = options.threshold,
        "parameters"
    );

    let mut namer = TempNamer::new();
    let scheduler = ChunkScheduler::new(
        backend,
        src,
        &options.src_prefix,
        max_chunk_size,
        &options,
        &mut namer,
    )?;

    let mut result = RunResult::default();
    for chunk in scheduler {
        let chunk = chunk?;
        if !chunk.complete {
            result.incomplete.push(chunk);
            continue;
        }

        if chunk.members.len() == 1 && src == dst && options.src_prefix == options.dst_prefix {
            // The object already sits at its final location: drop the temp
            // artifact and keep the source.
            delete_chunk(backend, &chunk, false)?;
            continue;
        }

        let finalized = write_chunk(backend, dst, &options.dst_prefix, &chunk, options.keep_prefixes)?;
        info!(
            chunk = %chunk.artifact_path.display(),
            size = chunk.size,
            dest = %finalized.path,
            "chunk written"
        );
        delete_chunk(backend, &chunk, options.delete_src)?;
        result.done.push(finalized);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::MultiGzDecoder;
    use frag_store::InMemoryBackend;
    use std::io::Read;

    fn csv_of_len(len: usize) -> Vec<u8> {
        let mut data = vec![b'x'; len - 1];
        data.push(b'\n');
        data
    }

    fn options(strict_size: bool) -> Options {
        Options {
            strict_size,
            threshold: 0.0,
            ..Options::default()
        }
    }

    fn decompress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        MultiGzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn not_enough_data_in_strict_mode_produces_nothing() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", csv_of_len(100));

        let result = frag(&backend, "src", "dst", 2_000_000, options(true)).unwrap();
        assert!(result.done.is_empty());
        assert!(result.incomplete.is_empty());
    }

    #[test]
    fn invalid_threshold_fails_before_any_io() {
        let backend = InMemoryBackend::new(); // no folders: listing would fail
        let err = frag(
            &backend,
            "src",
            "dst",
            100,
            Options {
                threshold: 1.5,
                ..Options::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, FragError::InvalidThreshold(_)));
    }

    #[test]
    fn end_to_end_scenario_splits_on_overflow() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", csv_of_len(10_000));
        backend.put("src", "b.csv", csv_of_len(10_000));
        backend.put("src", "c.csv", csv_of_len(5_000));

        let result = frag(&backend, "src", "dst", 15_000, options(false)).unwrap();

        assert_eq!(result.done.len(), 2);
        assert!(result.incomplete.is_empty());
        assert_eq!(result.done[0].size, 10_000);
        assert_eq!(result.done[0].members.len(), 1);
        assert_eq!(result.done[1].size, 15_000);
        assert_eq!(result.done[1].members.len(), 2);

        // Round-trip: the decompressed chunk reproduces the recorded size.
        for chunk in &result.done {
            let key = chunk.path.strip_prefix("dst/").unwrap();
            let stored = backend.get("dst", key).unwrap();
            assert_eq!(decompress(&stored).len() as u64, chunk.size);
        }
    }

    #[test]
    fn seam_between_text_objects_is_exactly_one_newline() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", b"a\n".to_vec());
        backend.put("src", "b.csv", b"b".to_vec());

        let result = frag(&backend, "src", "dst", 1_000, options(false)).unwrap();
        assert_eq!(result.done.len(), 1);
        assert_eq!(result.done[0].size, 4);

        let key = result.done[0].path.strip_prefix("dst/").unwrap();
        let stored = backend.get("dst", key).unwrap();
        assert_eq!(decompress(&stored), b"a\nb\n");
    }

    #[test]
    fn single_member_chunk_at_its_final_location_is_left_alone() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", csv_of_len(10));

        let result = frag(&backend, "src", "src", 1_000, options(false)).unwrap();
        assert!(result.done.is_empty());
        assert!(result.incomplete.is_empty());
        // The source object was neither moved nor deleted.
        assert_eq!(backend.names("src"), vec!["a.csv".to_string()]);
    }

    #[test]
    fn delete_src_removes_sources_after_write() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", csv_of_len(60));
        backend.put("src", "b.csv", csv_of_len(60));

        let result = frag(
            &backend,
            "src",
            "dst",
            100,
            Options {
                delete_src: true,
                ..options(false)
            },
        )
        .unwrap();
        assert_eq!(result.done.len(), 2);
        assert!(backend.names("src").is_empty());
        assert_eq!(backend.names("dst").len(), 2);
    }

    #[test]
    fn strict_mode_leaves_the_undersized_tail_incomplete() {
        let backend = InMemoryBackend::new();
        backend.put("src", "a.csv", csv_of_len(60));
        backend.put("src", "b.csv", csv_of_len(60));

        let result = frag(&backend, "src", "dst", 100, options(true)).unwrap();
        assert_eq!(result.done.len(), 1);
        assert_eq!(result.done[0].size, 60);
        assert_eq!(result.incomplete.len(), 1);

        let tail = &result.incomplete[0];
        assert!(!tail.complete);
        assert_eq!(tail.size, 60);
        // Incomplete artifacts are left on disk for inspection.
        assert!(tail.artifact_path.exists());
        std::fs::remove_file(&tail.artifact_path).unwrap();
    }
}
