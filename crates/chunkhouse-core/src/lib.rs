//! Core chunk encoding types for chunkhouse.
//!
//! This crate defines the vocabulary the storage layer is built on:
//!
//! - [`varint`]: unsigned LEB128 and zigzag-signed variable-length integers
//! - [`Encoding`]: the one-byte tag identifying how a chunk's samples are
//!   encoded
//! - [`Chunk`]: the opaque handle over an encoded run of `(timestamp, value)`
//!   samples
//! - [`XorChunk`]: the XOR sample encoding and its [`Appender`]
//! - [`ChunkPool`]: the decoder seam that turns `(encoding, payload)` pairs
//!   read off disk back into chunk handles
//!
//! The storage layer treats chunk payloads as opaque bytes. Everything that
//! knows what those bytes mean lives here.

pub mod chunk;
pub mod error;
pub mod varint;
pub mod xor;

pub use chunk::{Appender, Chunk, ChunkPool, DefaultPool, Encoding};
pub use error::{Error, Result};
pub use xor::XorChunk;
