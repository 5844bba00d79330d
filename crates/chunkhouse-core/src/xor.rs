//! XOR-compressed sample chunks.
//!
//! Samples compress well because consecutive timestamps are near-regular
//! and consecutive values share most of their bit pattern. The payload
//! layout:
//!
//! ```text
//! bytes 0..2    sample count, u16 big-endian
//! sample 0      zigzag-varint t0, then 8 bytes of raw f64 bits (big-endian)
//! sample 1      zigzag-varint (t1 - t0), then uvarint(bits(v1) ^ bits(v0))
//! sample k >= 2 zigzag-varint delta-of-delta, then uvarint of the XOR with
//!               the previous value's bits
//! ```
//!
//! Identical values XOR to zero and cost a single byte; regular scrape
//! intervals make the delta-of-delta zero and cost a single byte as well.
//! Everything is byte-aligned, so decoding is a varint walk with no bit
//! cursor.

use bytes::{BufMut, BytesMut};

use crate::chunk::{Appender, Chunk, Encoding};
use crate::error::{Error, Result};
use crate::varint;

/// Number of bytes reserved for the sample count header.
const COUNT_HEADER_SIZE: usize = 2;

/// A chunk of XOR-compressed samples.
#[derive(Debug, Clone)]
pub struct XorChunk {
    data: BytesMut,
}

impl XorChunk {
    /// An empty chunk holding zero samples.
    pub fn new() -> Self {
        let mut data = BytesMut::with_capacity(64);
        data.put_u16(0);
        Self { data }
    }

    /// Wrap an encoded payload, typically one read back from disk.
    ///
    /// Only the sample-count header is validated here; the sample stream is
    /// checked lazily by the iterator.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < COUNT_HEADER_SIZE {
            return Err(Error::Truncated("sample count header"));
        }
        Ok(Self {
            data: BytesMut::from(data),
        })
    }

    /// An appender positioned after the last sample.
    ///
    /// Existing samples are replayed to recover the delta and XOR state, so
    /// this fails if the chunk data is corrupt.
    pub fn appender(&mut self) -> Result<XorAppender<'_>> {
        let mut prev_t = 0i64;
        let mut t = 0i64;
        let mut v_bits = 0u64;
        let mut read = 0usize;
        for sample in self.iter() {
            let (st, sv) = sample?;
            prev_t = t;
            t = st;
            v_bits = sv.to_bits();
            read += 1;
        }
        let t_delta = if read >= 2 { t - prev_t } else { 0 };
        Ok(XorAppender {
            chunk: self,
            t,
            t_delta,
            v_bits,
        })
    }
}

impl Default for XorChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunk for XorChunk {
    fn encoding(&self) -> Encoding {
        Encoding::Xor
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn num_samples(&self) -> usize {
        u16::from_be_bytes([self.data[0], self.data[1]]) as usize
    }

    fn iter(&self) -> Box<dyn Iterator<Item = Result<(i64, f64)>> + '_> {
        Box::new(XorIter::new(&self.data))
    }
}

/// Appends samples to an [`XorChunk`] in place.
pub struct XorAppender<'a> {
    chunk: &'a mut XorChunk,
    t: i64,
    t_delta: i64,
    v_bits: u64,
}

impl Appender for XorAppender<'_> {
    fn append(&mut self, t: i64, v: f64) {
        let num = self.chunk.num_samples();
        let bits = v.to_bits();

        if num == 0 {
            varint::put_varint(&mut self.chunk.data, t);
            self.chunk.data.put_u64(bits);
        } else {
            let delta = t - self.t;
            if num == 1 {
                varint::put_varint(&mut self.chunk.data, delta);
            } else {
                varint::put_varint(&mut self.chunk.data, delta - self.t_delta);
            }
            varint::put_uvarint(&mut self.chunk.data, bits ^ self.v_bits);
            self.t_delta = delta;
        }

        self.t = t;
        self.v_bits = bits;
        let count = (num + 1) as u16;
        self.chunk.data[..COUNT_HEADER_SIZE].copy_from_slice(&count.to_be_bytes());
    }
}

struct XorIter<'a> {
    data: &'a [u8],
    pos: usize,
    total: usize,
    read: usize,
    failed: bool,
    t: i64,
    t_delta: i64,
    v_bits: u64,
}

impl<'a> XorIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: COUNT_HEADER_SIZE,
            total: u16::from_be_bytes([data[0], data[1]]) as usize,
            read: 0,
            failed: false,
            t: 0,
            t_delta: 0,
            v_bits: 0,
        }
    }

    fn step(&mut self) -> Result<(i64, f64)> {
        if self.read == 0 {
            let (t, n) = varint::varint(&self.data[self.pos..])
                .ok_or(Error::Truncated("first sample timestamp"))?;
            self.pos += n;

            if self.pos + 8 > self.data.len() {
                return Err(Error::Truncated("first sample value"));
            }
            let mut bits = 0u64;
            for &b in &self.data[self.pos..self.pos + 8] {
                bits = bits << 8 | b as u64;
            }
            self.pos += 8;

            self.t = t;
            self.v_bits = bits;
        } else {
            let (dt, n) = varint::varint(&self.data[self.pos..])
                .ok_or(Error::Truncated("sample timestamp delta"))?;
            self.pos += n;
            if self.read == 1 {
                self.t_delta = dt;
            } else {
                self.t_delta += dt;
            }
            self.t += self.t_delta;

            let (xor, n) = varint::uvarint(&self.data[self.pos..])
                .ok_or(Error::Truncated("sample value bits"))?;
            self.pos += n;
            self.v_bits ^= xor;
        }

        self.read += 1;
        Ok((self.t, f64::from_bits(self.v_bits)))
    }
}

impl Iterator for XorIter<'_> {
    type Item = Result<(i64, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.read >= self.total {
            return None;
        }
        match self.step() {
            Ok(sample) => Some(Ok(sample)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
