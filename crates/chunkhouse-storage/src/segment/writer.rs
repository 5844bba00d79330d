//! Chunk Writer - Appending Chunks to Segment Files
//!
//! `ChunkWriter` owns an append cursor across a sequence of pre-allocated
//! segment files and packs incoming chunk batches against a per-segment
//! size budget.
//!
//! ## What Does ChunkWriter Do?
//!
//! 1. **Cuts segments**: creates the next sequence-numbered file,
//!    pre-allocates the full budget, stamps the 8-byte header
//! 2. **Packs batches**: walks each batch with a cheap worst-case size
//!    bound and flushes a prefix whenever the budget would be crossed
//! 3. **Assigns references**: stamps each meta with `(segment, offset)`
//!    before its record is streamed out
//! 4. **Finalizes**: flushes, fsyncs, truncates the pre-allocated tail to
//!    its used length, then fsyncs the directory on the next cut and on
//!    close
//!
//! ## Durability
//!
//! A chunk is durable once its segment has been flushed and fsynced *and*
//! the directory entry has been fsynced. The writer fsyncs the segment on
//! every cut and on close, and fsyncs the directory after a cut and on
//! close - so a chunk becomes durable when the segment after it is cut, or
//! when the writer closes.
//!
//! ## Failure Semantics
//!
//! Appends are at-most-once. If `write_chunks` returns an error, the
//! current segment is left truncated at the last successful flush:
//! references handed out during the failed call may point at bytes that
//! never reached disk. Treat an error as terminal for this writer, drop
//! it, and rewrite the batch through a fresh one.
//!
//! ## Thread Safety
//!
//! `ChunkWriter` is single-owner and not safe for concurrent callers; all
//! methods may block on filesystem syscalls. One directory must never be
//! written by two writers at once.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::error::{Error, MultiError, Result};
use crate::meta::{ChunkMeta, ChunkRef};
use crate::segment::{files, record, FORMAT_V1, HEADER_SIZE, MAGIC};

/// Default segment size budget: 512 MiB.
pub const DEFAULT_SEGMENT_SIZE: u64 = 512 * 1024 * 1024;

/// Buffered-writer capacity in front of the segment file.
const WRITE_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Writes chunks into sequence-numbered segment files under one directory.
pub struct ChunkWriter {
    /// Handle on the directory itself, kept for the writer's lifetime so
    /// segment creation can be made durable with a directory fsync.
    dir: File,
    dir_path: PathBuf,

    /// Buffered writer over the current tail segment, if one is open.
    tail: Option<std::io::BufWriter<File>>,
    tail_path: PathBuf,

    /// Segments cut by this writer; the current segment index is
    /// `segments - 1`.
    segments: usize,

    /// Write offset within the current segment.
    n: u64,

    segment_size: u64,

    /// Per-record encode buffer, reused across writes.
    scratch: BytesMut,
}

impl ChunkWriter {
    /// Open a writer against `dir`, creating the directory if needed.
    ///
    /// `segment_size` is the per-file budget; `0` selects
    /// [`DEFAULT_SEGMENT_SIZE`]. The first segment is cut lazily on the
    /// first write.
    pub fn new(dir: impl AsRef<Path>, segment_size: u64) -> Result<Self> {
        let dir_path = dir.as_ref().to_path_buf();
        let segment_size = if segment_size == 0 {
            DEFAULT_SEGMENT_SIZE
        } else {
            segment_size
        };

        fs::create_dir_all(&dir_path).map_err(|e| Error::io("create dir", &dir_path, e))?;
        let dir = File::open(&dir_path).map_err(|e| Error::io("open dir", &dir_path, e))?;

        Ok(Self {
            dir,
            dir_path,
            tail: None,
            tail_path: PathBuf::new(),
            segments: 0,
            n: 0,
            segment_size,
            scratch: BytesMut::new(),
        })
    }

    /// Append every meta to the store. On success each meta has its
    /// `reference` populated.
    ///
    /// Batches are packed against the segment budget using a worst-case
    /// size bound per chunk. When a chunk would overflow the current
    /// segment and it is not alone in its batch, it is pushed to a freshly
    /// cut segment instead; a single chunk bigger than the whole budget is
    /// written anyway.
    ///
    /// On error the writer must be considered dead; see the module
    /// documentation for the exact guarantees.
    pub fn write_chunks(&mut self, chks: &mut [ChunkMeta]) -> Result<()> {
        // First write on a fresh writer starts the first segment.
        if self.tail.is_none() {
            self.cut()?;
        }

        let mut start = 0;
        let mut batch_size = 0u64;
        let mut i = 0;
        while i < chks.len() {
            let payload_len = match &chks[i].chunk {
                Some(chunk) => chunk.bytes().len(),
                None => return Err(Error::NoChunkData),
            };
            batch_size += record::max_len(payload_len);
            i += 1;

            if batch_size + self.n > self.segment_size {
                let mut end = i;
                if end - start > 1 {
                    // Push the overflowing chunk to the next segment. A
                    // batch of one still gets written here: a single chunk
                    // bigger than the budget has nowhere better to go.
                    end -= 1;
                }
                self.write_batch(&mut chks[start..end])?;
                start = end;
                batch_size = 0;
                // Cut only when chunks remain, so a batch that exactly
                // fills a segment does not leave an empty one behind.
                if start < chks.len() {
                    self.cut()?;
                    // Re-accumulate from the first unflushed chunk so its
                    // size counts against the new segment.
                    i = start;
                }
            }
        }

        self.write_batch(&mut chks[start..])
    }

    /// Finalize the tail segment and sync the directory.
    ///
    /// After `close` returns, every written chunk is durable. Further use
    /// is impossible; the writer is consumed.
    pub fn close(mut self) -> Result<()> {
        let mut errs = MultiError::new();
        errs.push_result(self.finalize_tail());
        errs.push_result(
            self.dir
                .sync_all()
                .map_err(|e| Error::io("sync dir", &self.dir_path, e)),
        );
        debug!(dir = %self.dir_path.display(), segments = self.segments, "chunk writer closed");
        errs.into_result()
    }

    /// Stream `chks` into the current segment regardless of the budget,
    /// stamping references as it goes. A segment must already be open.
    fn write_batch(&mut self, chks: &mut [ChunkMeta]) -> Result<()> {
        if chks.is_empty() {
            return Ok(());
        }
        let segment = self.segments - 1;

        for meta in chks.iter_mut() {
            let chunk = meta.chunk.as_deref().ok_or(Error::NoChunkData)?;

            // The reference names the offset of the record's length
            // varint, stamped before the bytes go out.
            meta.reference = ChunkRef::new(segment, self.n as u32);

            self.scratch.clear();
            record::encode(&mut self.scratch, chunk.encoding() as u8, chunk.bytes());

            self.tail
                .as_mut()
                .expect("write_batch requires an open segment")
                .write_all(&self.scratch)
                .map_err(|e| Error::io("write", &self.tail_path, e))?;
            self.n += self.scratch.len() as u64;
        }

        Ok(())
    }

    /// Finalize the current tail segment and open the next one.
    fn cut(&mut self) -> Result<()> {
        self.finalize_tail()?;

        let (path, _) = files::next_sequence_file(&self.dir_path)?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io("open", &path, e))?;

        // Reserve the full budget up front; finalize trims the unused
        // tail back off.
        file.set_len(self.segment_size)
            .map_err(|e| Error::io("preallocate", &path, e))?;
        self.dir
            .sync_all()
            .map_err(|e| Error::io("sync dir", &self.dir_path, e))?;

        let mut header = [0u8; HEADER_SIZE];
        header[..4].copy_from_slice(&MAGIC.to_be_bytes());
        header[4] = FORMAT_V1;
        file.write_all(&header)
            .map_err(|e| Error::io("write header", &path, e))?;

        self.n = HEADER_SIZE as u64;
        self.segments += 1;
        debug!(
            path = %path.display(),
            segment = self.segments - 1,
            budget = self.segment_size,
            "cut new segment"
        );

        self.tail = Some(std::io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, file));
        self.tail_path = path;
        Ok(())
    }

    /// Flush, fsync, truncate to used length, and close the tail segment.
    fn finalize_tail(&mut self) -> Result<()> {
        let Some(mut tail) = self.tail.take() else {
            return Ok(());
        };

        tail.flush()
            .map_err(|e| Error::io("flush", &self.tail_path, e))?;
        let file = tail
            .into_inner()
            .map_err(|e| Error::io("flush", &self.tail_path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| Error::io("sync", &self.tail_path, e))?;
        // The file was pre-allocated; drop the superfluous zero bytes.
        file.set_len(self.n)
            .map_err(|e| Error::io("truncate", &self.tail_path, e))?;

        debug!(path = %self.tail_path.display(), size = self.n, "finalized segment");
        Ok(())
    }
}

impl Drop for ChunkWriter {
    fn drop(&mut self) {
        if self.tail.is_some() {
            if let Err(err) = self.finalize_tail() {
                warn!(error = %err, "failed to finalize tail segment on drop");
            }
        }
    }
}
