//! Error types for chunk encoding and decoding.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown chunk encoding {0:#04x}")]
    UnknownEncoding(u8),

    #[error("chunk data truncated reading {0}")]
    Truncated(&'static str),
}
