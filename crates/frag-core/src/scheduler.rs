//! Chunk boundary scheduling.
//!
//! [`ChunkScheduler`] walks the source listing in order, streams each
//! eligible object into the open accumulator, and emits an accumulator
//! whenever a boundary is crossed. It is a finite, pull-based iterator:
//! artifacts are written to temp storage incrementally, one object at a
//! time, so nothing is buffered beyond the block in flight.

use std::vec::IntoIter;

use frag_store::{Backend, ObjectRef};
use tracing::{debug, info, warn};

use crate::chunk::{ChunkAccumulator, TempNamer};
use crate::error::FragResult;
use crate::transform::append_object;
use crate::util::{close_enough, file_extensions, prefix_segments};
use crate::Options;

/// Lazily builds chunks from one folder's listing.
///
/// Not restartable: each run re-lists and re-streams. Yields accumulators
/// in emission order; an accumulator with `complete == false` reached the
/// end of the listing without being validated (strict-size shortfall).
pub struct ChunkScheduler<'a> {
    backend: &'a dyn Backend,
    folder: String,
    max_chunk_size: u64,
    crlf: bool,
    keep_prefixes: usize,
    strict_size: bool,
    threshold: f64,
    namer: &'a mut TempNamer,
    objects: IntoIter<ObjectRef>,
    total: usize,
    index: usize,
    current: Option<ChunkAccumulator>,
    prev: Option<ObjectRef>,
    finished: bool,
}

impl<'a> ChunkScheduler<'a> {
    /// List `folder` (filtered by `prefix`) and prepare the scheduler.
    ///
    /// In strict-size mode without prefix retention, a listing whose total
    /// size cannot fill a single chunk short-circuits the whole run: the
    /// scheduler yields nothing and no accumulator is ever opened.
    pub fn new(
        backend: &'a dyn Backend,
        folder: &str,
        prefix: &str,
        max_chunk_size: u64,
        options: &Options,
        namer: &'a mut TempNamer,
    ) -> FragResult<Self> {
        let objects = backend.list_objects(folder, prefix)?;
        let total = objects.len();

        let mut finished = false;
        if options.keep_prefixes == 0 {
            info!(folder, prefix, count = total, "objects listed");
            let total_size: u64 = objects.iter().map(|o| o.size).sum();
            if options.strict_size && total_size < max_chunk_size {
                info!(
                    total_size,
                    max_chunk_size,
                    "objects total size is too small; disable strict size to write those chunks"
                );
                finished = true;
            }
        }

        Ok(Self {
            backend,
            folder: folder.to_string(),
            max_chunk_size,
            crlf: options.crlf,
            keep_prefixes: options.keep_prefixes,
            strict_size: options.strict_size,
            threshold: options.threshold,
            namer,
            objects: objects.into_iter(),
            total,
            index: 0,
            current: None,
            prev: None,
            finished,
        })
    }

    fn open_chunk(&mut self, obj: &ObjectRef) {
        let ext = file_extensions(&obj.name).first().copied().unwrap_or("tgz");
        let artifact = self.namer.next_artifact(ext);
        self.current = Some(ChunkAccumulator::new(self.folder.clone(), artifact));
    }

    /// Flush at end of listing: strict-size shortfalls are emitted without
    /// being marked complete.
    fn flush(&mut self) -> Option<ChunkAccumulator> {
        let mut acc = self.current.take()?;
        if acc.size == 0 {
            return None;
        }
        if self.strict_size && acc.size < self.max_chunk_size {
            info!(
                size = acc.size,
                max_chunk_size = self.max_chunk_size,
                "last chunk is undersized; disable strict size to write those chunks"
            );
        } else {
            acc.mark_complete();
        }
        Some(acc)
    }
}

impl Iterator for ChunkScheduler<'_> {
    type Item = FragResult<ChunkAccumulator>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let Some(obj) = self.objects.next() else {
                self.finished = true;
                return self.flush().map(Ok);
            };
            self.index += 1;

            // Already the right size: leave the object exactly where it is.
            if close_enough(obj.size, self.max_chunk_size, self.threshold) {
                info!(
                    object = %obj.name,
                    size = obj.size,
                    "ignoring object, its size is already fine"
                );
                continue;
            }

            // Three reasons to need a fresh accumulator: there is none yet,
            // the object starts a new prefix group, or it would overflow the
            // open chunk. A freshly opened accumulator always accepts its
            // first object, however large.
            let (prefix_break, overflow) = match &self.current {
                None => (false, false),
                Some(curr) => (
                    self.keep_prefixes > 0
                        && !same_prefix(self.prev.as_ref(), &obj, self.keep_prefixes),
                    !curr.members.is_empty()
                        && curr.size + obj.size > self.max_chunk_size,
                ),
            };

            let mut emit = None;
            if self.current.is_none() {
                self.open_chunk(&obj);
            } else if prefix_break {
                let mut curr = self.current.take().expect("open accumulator");
                if self.strict_size && curr.size < self.max_chunk_size {
                    // Strict mode refuses undersized chunks at a prefix
                    // break: drop it, leaving the artifact for inspection.
                    warn!(
                        chunk = %curr.artifact_path.display(),
                        size = curr.size,
                        max_chunk_size = self.max_chunk_size,
                        "discarding undersized chunk at prefix boundary"
                    );
                } else {
                    curr.mark_complete();
                    emit = Some(curr);
                }
                self.open_chunk(&obj);
            } else if overflow {
                let mut curr = self.current.take().expect("open accumulator");
                curr.mark_complete();
                emit = Some(curr);
                self.open_chunk(&obj);
            }

            let curr = self.current.as_mut().expect("open accumulator");
            if let Err(e) = append_object(curr, self.backend, &self.folder, &obj, self.crlf) {
                self.finished = true;
                return Some(Err(e));
            }
            debug!(
                object = %obj.name,
                chunk = %curr.artifact_path.display(),
                size = curr.size,
                index = self.index,
                total = self.total,
                "aggregated"
            );

            self.prev = Some(obj);
            if let Some(done) = emit {
                return Some(Ok(done));
            }
        }
    }
}

/// Whether two consecutive objects share a path prefix at `depth` segments.
///
/// Prefix segments exclude the leading folder/bucket token and the filename.
/// A missing previous object always matches (the first object never starts
/// at a boundary). Segments absent on BOTH sides compare equal, so two
/// objects shallower than `depth` still group together; absent-vs-present
/// is a mismatch.
fn same_prefix(prev: Option<&ObjectRef>, obj: &ObjectRef, depth: usize) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    let a = prefix_segments(&prev.name);
    let b = prefix_segments(&obj.name);
    (0..depth).all(|i| a.get(i) == b.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use frag_store::InMemoryBackend;

    fn options(strict_size: bool, keep_prefixes: usize) -> Options {
        Options {
            strict_size,
            keep_prefixes,
            threshold: 0.0,
            ..Options::default()
        }
    }

    fn csv_of_len(len: usize) -> Vec<u8> {
        // `len` bytes ending with a newline, so the transformed size equals
        // the listed size.
        let mut data = vec![b'x'; len - 1];
        data.push(b'\n');
        data
    }

    fn collect(
        backend: &InMemoryBackend,
        max: u64,
        opts: &Options,
        namer: &mut TempNamer,
    ) -> Vec<ChunkAccumulator> {
        ChunkScheduler::new(backend, "bucket", "", max, opts, namer)
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
    }

    #[test]
    fn overflow_starts_a_new_chunk() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "a.csv", csv_of_len(60));
        backend.put("bucket", "b.csv", csv_of_len(60));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let chunks = collect(&backend, 100, &options(false, 0), &mut namer);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.complete);
            assert_eq!(chunk.members.len(), 1);
            assert_eq!(chunk.size, 60);
        }
        assert_eq!(chunks[0].members[0].name, "a.csv");
        assert_eq!(chunks[1].members[0].name, "b.csv");
    }

    #[test]
    fn strict_mode_short_circuits_small_listings() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "a.csv", csv_of_len(60));
        backend.put("bucket", "b.csv", csv_of_len(60));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let chunks = collect(&backend, 1000, &options(true, 0), &mut namer);
        assert!(chunks.is_empty());
        // Nothing was opened, so no artifact was created either.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn fresh_accumulator_accepts_an_oversized_first_object() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "big.csv", csv_of_len(200));
        backend.put("bucket", "small.csv", csv_of_len(60));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let chunks = collect(&backend, 100, &options(false, 0), &mut namer);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].members[0].name, "big.csv");
        assert_eq!(chunks[0].size, 200);
        assert_eq!(chunks[1].members[0].name, "small.csv");
    }

    #[test]
    fn threshold_skips_objects_that_are_already_fine() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "fine.csv", csv_of_len(95));
        backend.put("bucket", "small.csv", csv_of_len(50));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let mut opts = options(false, 0);
        opts.threshold = 0.1;
        let chunks = collect(&backend, 100, &opts, &mut namer);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].members.len(), 1);
        assert_eq!(chunks[0].members[0].name, "small.csv");
    }

    #[test]
    fn prefix_change_closes_the_open_chunk() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "data/a/x.csv", csv_of_len(10));
        backend.put("bucket", "data/a/y.csv", csv_of_len(10));
        backend.put("bucket", "data/b/z.csv", csv_of_len(10));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let chunks = collect(&backend, 1000, &options(false, 1), &mut namer);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].complete);
        assert_eq!(chunks[0].members.len(), 2);
        assert!(chunks[1].complete);
        assert_eq!(chunks[1].members[0].name, "data/b/z.csv");
    }

    #[test]
    fn strict_mode_discards_undersized_chunk_at_prefix_boundary() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "data/a/x.csv", csv_of_len(10));
        backend.put("bucket", "data/b/z.csv", csv_of_len(10));
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let chunks = collect(&backend, 1000, &options(true, 1), &mut namer);
        // The 'a' group is dropped at the boundary; the 'b' group reaches
        // end-of-listing and is emitted incomplete.
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].complete);
        assert_eq!(chunks[0].members[0].name, "data/b/z.csv");
    }

    #[test]
    fn unknown_extension_aborts_the_run() {
        let backend = InMemoryBackend::new();
        backend.put("bucket", "a.parquet", vec![0u8; 10]);
        let tmp = tempfile::tempdir().unwrap();
        let mut namer = TempNamer::in_dir(tmp.path());

        let opts = options(false, 0);
        let mut scheduler =
            ChunkScheduler::new(&backend, "bucket", "", 1000, &opts, &mut namer).unwrap();
        let err = scheduler.next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "'parquet' handling is not implemented yet");
        assert!(scheduler.next().is_none());
    }

    #[test]
    fn same_prefix_matches_at_requested_depth() {
        let a = ObjectRef::new("data/a/x.csv", 1);
        let b = ObjectRef::new("data/a/y.csv", 1);
        let c = ObjectRef::new("data/b/z.csv", 1);
        assert!(same_prefix(None, &a, 3));
        assert!(same_prefix(Some(&a), &b, 1));
        assert!(!same_prefix(Some(&a), &c, 1));
        // Depth beyond available segments: absent matches absent.
        assert!(same_prefix(Some(&a), &b, 4));
        // Absent vs present is a mismatch.
        let flat = ObjectRef::new("data/x.csv", 1);
        assert!(!same_prefix(Some(&flat), &b, 1));
    }
}
