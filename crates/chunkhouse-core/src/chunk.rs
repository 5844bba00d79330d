//! Chunk handles and the decoder pool.
//!
//! A chunk is an opaque run of `(timestamp, value)` samples behind a
//! one-byte [`Encoding`] tag. The storage layer moves chunks around as raw
//! bytes; whoever needs the samples back goes through a [`ChunkPool`],
//! which maps an `(encoding, payload)` pair read off disk to a concrete
//! [`Chunk`] implementation.
//!
//! The pool is an injection point: readers accept any implementation, so a
//! caller that adds its own encodings can supply a pool that understands
//! them. [`DefaultPool`] knows the encodings defined in this crate.

use crate::error::{Error, Result};
use crate::xor::XorChunk;

/// Identifies the sample encoding of a chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Encoding {
    None = 0,
    Xor = 1,
}

impl TryFrom<u8> for Encoding {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Encoding::None),
            1 => Ok(Encoding::Xor),
            _ => Err(Error::UnknownEncoding(value)),
        }
    }
}

/// An immutable handle over one encoded run of samples.
///
/// `bytes` is the exact payload the storage layer persists; decoding it
/// back through a pool must yield an equivalent chunk.
pub trait Chunk: Send + Sync {
    /// The encoding tag written next to this chunk's payload on disk.
    fn encoding(&self) -> Encoding;

    /// The encoded payload.
    fn bytes(&self) -> &[u8];

    /// Number of samples in the chunk.
    fn num_samples(&self) -> usize;

    /// Iterate the samples in timestamp order.
    ///
    /// Corrupt or truncated payloads surface as a final `Err` item, after
    /// which the iterator is exhausted.
    fn iter(&self) -> Box<dyn Iterator<Item = Result<(i64, f64)>> + '_>;
}

/// Append access to a chunk under construction.
///
/// Samples must arrive in strictly increasing timestamp order.
pub trait Appender {
    fn append(&mut self, t: i64, v: f64);
}

/// Turns `(encoding, payload)` pairs read off disk back into chunk handles.
///
/// Implementations must be safe to share across threads; readers call
/// `get` concurrently.
pub trait ChunkPool: Send + Sync {
    /// Decode `data` according to `encoding`. Unknown encodings fail.
    fn get(&self, encoding: u8, data: &[u8]) -> Result<Box<dyn Chunk>>;
}

/// Decoder pool for the encodings defined in this crate.
#[derive(Debug, Default)]
pub struct DefaultPool;

impl ChunkPool for DefaultPool {
    fn get(&self, encoding: u8, data: &[u8]) -> Result<Box<dyn Chunk>> {
        match Encoding::try_from(encoding)? {
            Encoding::Xor => Ok(Box::new(XorChunk::from_bytes(data)?)),
            // The tag space reserves 0 but nothing writes it.
            Encoding::None => Err(Error::UnknownEncoding(encoding)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Encoding tag
    // ---------------------------------------------------------------

    #[test]
    fn test_encoding_repr_values() {
        assert_eq!(Encoding::None as u8, 0);
        assert_eq!(Encoding::Xor as u8, 1);
    }

    #[test]
    fn test_encoding_try_from_valid() {
        assert_eq!(Encoding::try_from(0u8).unwrap(), Encoding::None);
        assert_eq!(Encoding::try_from(1u8).unwrap(), Encoding::Xor);
    }

    #[test]
    fn test_encoding_try_from_invalid() {
        for bad in [2u8, 7, 100, u8::MAX] {
            let err = Encoding::try_from(bad).unwrap_err();
            assert!(matches!(err, Error::UnknownEncoding(v) if v == bad));
        }
    }

    // ---------------------------------------------------------------
    // DefaultPool
    // ---------------------------------------------------------------

    #[test]
    fn test_default_pool_roundtrip() {
        let mut chunk = XorChunk::new();
        {
            let mut app = chunk.appender().unwrap();
            app.append(10, 1.5);
            app.append(20, -2.5);
        }

        let pool = DefaultPool;
        let decoded = pool.get(Encoding::Xor as u8, chunk.bytes()).unwrap();
        assert_eq!(decoded.encoding(), Encoding::Xor);
        assert_eq!(decoded.num_samples(), 2);
        assert_eq!(decoded.bytes(), chunk.bytes());

        let samples: Vec<_> = decoded.iter().collect::<Result<_>>().unwrap();
        assert_eq!(samples, vec![(10, 1.5), (20, -2.5)]);
    }

    #[test]
    fn test_default_pool_rejects_unknown_encoding() {
        let pool = DefaultPool;
        let err = match pool.get(42, &[0, 0]) {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, Error::UnknownEncoding(42)));
    }

    #[test]
    fn test_default_pool_rejects_none_encoding() {
        let pool = DefaultPool;
        assert!(pool.get(0, &[0, 0]).is_err());
    }

    #[test]
    fn test_default_pool_rejects_short_payload() {
        let pool = DefaultPool;
        let err = match pool.get(Encoding::Xor as u8, &[1]) {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        assert!(matches!(err, Error::Truncated(_)));
    }
}
