//! Per-object streaming transform pipeline.
//!
//! Each source object is piped through a stack of `Read` adapters selected
//! from its extension chain, then gzip-compressed onto the end of the
//! chunk's artifact file. Every object contributes one complete gzip
//! member, so the artifact is a valid multi-member gzip stream.

use std::fs::OpenOptions;
use std::io::{self, Read};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use frag_store::{Backend, ObjectRef};
use tracing::debug;

use crate::chunk::ChunkAccumulator;
use crate::error::{FragError, FragResult};
use crate::util::file_extensions;

const BLOCK_SIZE: usize = 8 * 1024;

/// Stream one object through its transform pipeline onto `chunk`'s artifact.
///
/// The artifact is opened in append mode; the transformed (pre-compression)
/// byte count is added to the chunk's running size and the object is
/// recorded as a member.
pub(crate) fn append_object(
    chunk: &mut ChunkAccumulator,
    backend: &dyn Backend,
    folder: &str,
    obj: &ObjectRef,
    crlf: bool,
) -> FragResult<()> {
    let source = backend.get_object(folder, &obj.name)?;
    let mut reader = build_reader(source, &file_extensions(&obj.name), crlf)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&chunk.artifact_path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    let transformed = io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    chunk.size += transformed;
    chunk.members.push(obj.clone());
    debug!(
        object = %obj.name,
        bytes = transformed,
        chunk = %chunk.artifact_path.display(),
        "object aggregated"
    );
    Ok(())
}

/// Compose the transform stack for an extension chain.
///
/// Extensions are inspected innermost-last and applied in reverse, so
/// `foo.csv.gz` is first gunzipped, then newline-normalized. An extension
/// with no registered transform aborts the run.
pub(crate) fn build_reader(
    source: Box<dyn Read + Send>,
    extensions: &[&str],
    crlf: bool,
) -> FragResult<Box<dyn Read + Send>> {
    let mut reader = source;
    for ext in extensions.iter().rev() {
        reader = match *ext {
            // Inputs may themselves be aggregated chunks, hence multi-member.
            "gz" | "tgz" => Box::new(MultiGzDecoder::new(reader)),
            "csv" | "txt" | "json" => Box::new(NewlineNormalizer::new(reader, crlf)),
            other => return Err(FragError::UnsupportedExtension(other.to_string())),
        };
    }
    Ok(reader)
}

/// Guarantees a text stream ends with exactly one newline sequence.
///
/// Works by delaying the stream one block: every block is emitted unmodified
/// once its successor arrives, so interior bytes pass straight through. At
/// end-of-stream the held-back block has every trailing `\n` (each optionally
/// preceded by `\r`) stripped, then the configured newline is appended. An
/// empty source emits nothing. This makes the seam between two concatenated
/// text objects exactly one newline wide.
pub(crate) struct NewlineNormalizer<R> {
    inner: R,
    newline: &'static [u8],
    held: Option<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl<R: Read> NewlineNormalizer<R> {
    pub(crate) fn new(inner: R, crlf: bool) -> Self {
        Self {
            inner,
            newline: if crlf { b"\r\n" } else { b"\n" },
            held: None,
            pending: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl<R: Read> Read for NewlineNormalizer<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.pending.len() {
                let n = (self.pending.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }

            let mut block = vec![0u8; BLOCK_SIZE];
            let n = self.inner.read(&mut block)?;
            if n == 0 {
                self.finished = true;
                if let Some(mut last) = self.held.take() {
                    trim_trailing_newlines(&mut last);
                    last.extend_from_slice(self.newline);
                    self.pending = last;
                    self.pos = 0;
                }
                continue;
            }
            block.truncate(n);
            self.pos = 0;
            self.pending = match self.held.replace(block) {
                Some(prev) => prev,
                None => Vec::new(),
            };
        }
    }
}

fn trim_trailing_newlines(buf: &mut Vec<u8>) {
    while buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
