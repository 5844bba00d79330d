//! On-disk segment format.
//!
//! A segment is one file in a chunk directory, named by a zero-padded
//! six-digit sequence number starting at `000001`:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (8 bytes)                                         │
//! │ - Magic: 0x85BD40DD (4 bytes, big-endian)                │
//! │ - Version: 1 (1 byte)                                    │
//! │ - Padding: 3 zero bytes                                  │
//! ├──────────────────────────────────────────────────────────┤
//! │ Chunk record                                             │
//! │ - Payload length (uvarint)                               │
//! │ - Encoding (1 byte)                                      │
//! │ - Payload                                                │
//! │ - CRC32C over encoding + payload (4 bytes, big-endian)   │
//! ├──────────────────────────────────────────────────────────┤
//! │ Chunk record                                             │
//! ├──────────────────────────────────────────────────────────┤
//! │ ...                                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Records sit back to back with no framing in between; a record is
//! located only through its [`ChunkRef`](crate::meta::ChunkRef), and its
//! total length is recovered from the length varint. Segment files are
//! pre-allocated to the configured budget when cut and truncated back to
//! their used length when finalized.

pub mod files;
pub mod record;

mod reader;
mod writer;

pub use reader::ChunkReader;
pub use writer::{ChunkWriter, DEFAULT_SEGMENT_SIZE};

/// Magic number at the head of every segment file.
pub const MAGIC: u32 = 0x85BD_40DD;

/// Segment format version written and accepted.
pub const FORMAT_V1: u8 = 1;

/// Size of the fixed segment header: magic, version, padding.
pub const HEADER_SIZE: usize = 8;
