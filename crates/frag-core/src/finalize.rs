//! Chunk finalization and cleanup.
//!
//! A completed chunk is given a permanent, content-derived name under a
//! date partition and written to the destination backend; afterwards its
//! temporary artifact (and optionally its source objects) are removed.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{Datelike, Local};
use frag_store::Backend;
use tracing::info;

use crate::chunk::{ChunkAccumulator, FinalizedChunk};
use crate::error::{FragError, FragResult};
use crate::util::{file_extensions, join_path, prefix_segments};

/// Write a completed chunk to its destination.
///
/// The destination name is `year=<YYYY>/month=<MM>/week=<WW>/<digest>.<exts>`
/// where the digest is the BLAKE3 hash of the artifact and the extension
/// chain comes from the artifact's name. With `keep_prefixes > 0` the first
/// member's prefix segments are inserted between `prefix` and that name, so
/// chunks stay inside their logical group at the destination.
pub fn write_chunk(
    backend: &dyn Backend,
    folder: &str,
    prefix: &str,
    chunk: &ChunkAccumulator,
    keep_prefixes: usize,
) -> FragResult<FinalizedChunk> {
    let today = Local::now();
    let partition = date_partition(today.year(), today.month(), today.day())?;
    let digest = hash_artifact(&chunk.artifact_path)?;

    let artifact_name = chunk
        .artifact_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extensions = file_extensions(&artifact_name).join(".");
    let generated = format!("{partition}{digest}.{extensions}");

    let name = if keep_prefixes > 0 {
        let first = chunk.members.first().map(|m| m.name.as_str()).unwrap_or("");
        let mut segments = prefix_segments(first);
        segments.truncate(keep_prefixes);
        segments.push(&generated);
        join_path(&segments)
    } else {
        generated
    };

    let dest = join_path(&[folder, prefix, &name]);
    backend
        .write_object(&chunk.artifact_path, folder, &name, prefix)
        .map_err(|source| FragError::WriteChunk {
            dest: dest.clone(),
            source,
        })?;

    Ok(FinalizedChunk {
        path: dest,
        size: chunk.size,
        bucket: chunk.bucket.clone(),
        members: chunk.members.clone(),
    })
}

/// Remove a finalized chunk's temporary artifact and, if asked, its source
/// objects.
///
/// The artifact is removed first; a failure there is fatal to this chunk's
/// cleanup but does not undo the completed write. Source deletion failures
/// are reported separately so callers can tell "written but not cleaned"
/// from "failed to write."
pub fn delete_chunk(
    backend: &dyn Backend,
    chunk: &ChunkAccumulator,
    delete_src: bool,
) -> FragResult<()> {
    fs::remove_file(&chunk.artifact_path).map_err(|source| FragError::DeleteArtifact {
        path: chunk.artifact_path.clone(),
        source,
    })?;

    if delete_src {
        backend
            .delete_objects(&chunk.bucket, &chunk.members)
            .map_err(|source| FragError::DeleteSources {
                bucket: chunk.bucket.clone(),
                source,
            })?;
        info!(
            count = chunk.members.len(),
            bucket = %chunk.bucket,
            "source objects deleted"
        );
    }
    Ok(())
}

fn date_partition(year: i32, month: u32, day: u32) -> FragResult<String> {
    let week = week_of_month(day)?;
    Ok(format!("year={year}/month={month:02}/week={week:02}/"))
}

/// 1-based week of the month: days 1-7 are week 1, 8-14 week 2, and so on.
fn week_of_month(day: u32) -> FragResult<u32> {
    let week = (day.saturating_sub(1)) / 7 + 1;
    if !(1..=5).contains(&week) {
        return Err(FragError::WeekOutOfRange(week));
    }
    Ok(week)
}

fn hash_artifact(path: &Path) -> FragResult<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
