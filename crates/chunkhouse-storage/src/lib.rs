//! Segmented on-disk chunk storage.
//!
//! This crate persists immutable, opaquely-encoded chunks of time-ordered
//! samples into a directory of fixed-budget segment files, and resolves
//! any chunk back through a compact 64-bit reference.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐
//! │  Producer   │
//! └──────┬──────┘
//!        │ ChunkMeta (time range + chunk)
//!        ▼
//! ┌─────────────────┐
//! │ ChunkWriter     │
//! │ - Packs         │
//! │ - Checksums     │
//! │ - Assigns refs  │
//! └────────┬────────┘
//!          │ segment files 000001, 000002, ...
//!          ▼
//! ┌─────────────────┐
//! │ ChunkReader     │
//! │ - Maps segments │
//! │ - Validates     │
//! │ - Decodes       │
//! └────────┬────────┘
//!          │ chunk handles
//!          ▼
//! ┌─────────────┐
//! │  Consumer   │
//! └─────────────┘
//! ```
//!
//! ## Main Components
//!
//! ### ChunkWriter
//! Owns an append cursor across pre-allocated segment files. Each batch is
//! packed against the segment budget in a single pass; every written meta
//! comes back with its [`ChunkRef`] populated.
//!
//! ### ChunkReader
//! Memory-maps the finished directory and serves random lookups by
//! reference, verifying framing and CRC32C before handing payloads to an
//! injectable decoder pool.
//!
//! ### Vertical merge
//! [`merge_chunks`] unions two overlapping chunks sample-by-sample;
//! [`merge_overlapping_chunks`] coalesces a sorted list until nothing
//! overlaps. Compaction uses these when blocks with intersecting time
//! ranges meet.
//!
//! ## Usage
//!
//! ```ignore
//! use chunkhouse_storage::{ChunkMeta, ChunkReader, ChunkWriter};
//!
//! // Write a batch of chunks.
//! let mut writer = ChunkWriter::new("./block/chunks", 0)?;
//! writer.write_chunks(&mut metas)?;
//! writer.close()?;
//!
//! // Later, resolve references back to chunks.
//! let reader = ChunkReader::open("./block/chunks", None)?;
//! let chunk = reader.chunk(metas[0].reference)?;
//! for sample in chunk.iter() {
//!     let (t, v) = sample?;
//!     // ...
//! }
//! ```
//!
//! One directory belongs to exactly one writer until that writer is
//! closed; readers map the directory afterwards and never write.

pub mod error;
pub mod merge;
pub mod meta;
pub mod segment;

pub use error::{Error, MultiError, Result};
pub use merge::{merge_chunks, merge_overlapping_chunks};
pub use meta::{ChunkMeta, ChunkRef};
pub use segment::{ChunkReader, ChunkWriter, DEFAULT_SEGMENT_SIZE};
