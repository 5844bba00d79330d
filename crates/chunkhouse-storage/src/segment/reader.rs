//! Chunk Reader - Resolving References Against Mapped Segments
//!
//! `ChunkReader` memory-maps every segment file in a directory, validates
//! the headers once at open time, and then serves random chunk lookups by
//! reference. Resolving a reference walks the record framing at the named
//! offset, verifies its checksum, and hands the payload to the decoder
//! pool.
//!
//! ## Thread Safety
//!
//! `chunk` takes `&self` and keeps no mutable state: the checksum is
//! recomputed from scratch on every call and the payload is sliced
//! straight out of the read-only mapping. Share the reader behind an
//! `Arc` and call it from as many threads as the decoder pool tolerates.
//!
//! ## Ownership
//!
//! Open a reader only after the writer for the directory has been closed;
//! the reader owns its mappings until it is dropped. Per-call errors leave
//! the reader usable for other references.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

use chunkhouse_core::{Chunk, ChunkPool, DefaultPool};

use crate::error::{Error, Result};
use crate::meta::ChunkRef;
use crate::segment::{files, record, FORMAT_V1, HEADER_SIZE, MAGIC};

/// Read side of a segment directory.
pub struct ChunkReader {
    /// One read-only mapping per segment, in file-name order.
    segments: Vec<Mmap>,
    /// Total bytes across all mappings.
    size: u64,
    pool: Arc<dyn ChunkPool>,
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("segments", &self.segments)
            .field("size", &self.size)
            .finish()
    }
}

impl ChunkReader {
    /// Map every segment file under `dir` and validate the headers.
    ///
    /// `pool` decodes payloads back into chunks; `None` selects
    /// [`DefaultPool`]. The first invalid segment fails the whole open,
    /// and mappings opened up to that point are released.
    pub fn open(dir: impl AsRef<Path>, pool: Option<Arc<dyn ChunkPool>>) -> Result<Self> {
        let dir = dir.as_ref();
        let pool = pool.unwrap_or_else(|| Arc::new(DefaultPool));

        let mut segments = Vec::new();
        let mut size = 0u64;
        for (index, path) in files::sequence_files(dir)?.iter().enumerate() {
            let file = File::open(path).map_err(|e| Error::io("open", path, e))?;
            // Safety: segments are immutable once the writer finalizes
            // them, and the mapping is read-only.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::io("mmap", path, e))?;

            validate_header(index, &mmap)?;

            size += mmap.len() as u64;
            segments.push(mmap);
        }

        debug!(
            dir = %dir.display(),
            segments = segments.len(),
            size,
            "opened chunk reader"
        );
        Ok(Self {
            segments,
            size,
            pool,
        })
    }

    /// Resolve `reference` to a decoded chunk.
    pub fn chunk(&self, reference: ChunkRef) -> Result<Box<dyn Chunk>> {
        let index = reference.segment();
        let seg = self.segments.get(index).ok_or(Error::OutOfRange {
            index,
            count: self.segments.len(),
        })?;

        let (encoding, payload) = record::decode(seg, reference.offset() as usize)?;
        Ok(self.pool.get(encoding, payload)?)
    }

    /// Total size of the mapped segments in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of mapped segments.
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Release every mapping. Equivalent to dropping the reader; spelled
    /// out so the close is visible at call sites.
    pub fn close(self) {}
}

fn validate_header(index: usize, seg: &[u8]) -> Result<()> {
    if seg.len() < HEADER_SIZE {
        return Err(Error::InvalidSegment {
            index,
            reason: format!("{} byte file is shorter than the segment header", seg.len()),
        });
    }

    let magic = u32::from_be_bytes([seg[0], seg[1], seg[2], seg[3]]);
    if magic != MAGIC {
        return Err(Error::InvalidSegment {
            index,
            reason: format!("invalid magic number {:#010x}", magic),
        });
    }

    if seg[4] != FORMAT_V1 {
        return Err(Error::InvalidSegment {
            index,
            reason: format!("invalid segment format version {}", seg[4]),
        });
    }

    Ok(())
}
