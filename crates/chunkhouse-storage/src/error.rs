//! Storage Error Types
//!
//! Everything the chunk storage layer can report, in one enum.
//!
//! ## Error Categories
//!
//! ### Segment validation
//! - `InvalidSegment`: a segment file failed the magic or version check at
//!   open time
//!
//! ### Reference resolution
//! - `OutOfRange`: a reference names a segment that is not mapped
//! - `Truncated`: a reference points at bytes past the end of its segment,
//!   or the record claims more bytes than the segment holds
//! - `BadFraming`: the record's length varint is malformed
//! - `ChecksumMismatch`: the record's CRC32C does not match; the payload is
//!   never handed out
//! - `Decode`: the decoder pool rejected the `(encoding, payload)` pair
//!
//! ### Filesystem
//! - `Io`: an underlying filesystem error, tagged with the operation and
//!   the path it happened on
//!
//! ### Cleanup
//! - `Multi`: several errors collected on a best-effort cleanup path, e.g.
//!   finalizing and directory-syncing on writer close
//!
//! All operations return `Result<T>`, aliased to `Result<T, Error>`, so
//! callers propagate with `?`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid segment {index}: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("segment index {index} out of range: {count} segments mapped")]
    OutOfRange { index: usize, count: usize },

    #[error("segment too short for chunk record: need {need} bytes, have {have}")]
    Truncated { need: u64, have: u64 },

    #[error("malformed chunk length varint")]
    BadFraming,

    #[error("checksum mismatch: computed {computed:#010x}, stored {stored:#010x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    #[error("chunk decode failed: {0}")]
    Decode(#[from] chunkhouse_core::Error),

    #[error("chunk meta carries no in-memory chunk data")]
    NoChunkData,

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Multi(MultiError),
}

impl Error {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Collects errors along best-effort cleanup paths.
///
/// Cleanup keeps going when a step fails so that every resource gets its
/// chance to be released; whatever went wrong is reported together at the
/// end. `into_result` collapses the common cases: no errors is `Ok`, a
/// single error is returned as itself.
#[derive(Debug, Default)]
pub struct MultiError(Vec<Error>);

impl MultiError {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, err: Error) {
        self.0.push(err);
    }

    pub fn push_result(&mut self, res: Result<()>) {
        if let Err(err) = res {
            self.0.push(err);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(mut self) -> Result<()> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(Error::Multi(self)),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors: ", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
