//! Chunk record framing.
//!
//! One record carries one chunk payload:
//!
//! ```text
//! ┌────────────────┬──────────┬─────────┬────────────────┐
//! │ Payload length │ Encoding │ Payload │ CRC32C         │
//! │ (uvarint)      │ (1 byte) │         │ (4 bytes, BE)  │
//! └────────────────┴──────────┴─────────┴────────────────┘
//! ```
//!
//! The checksum covers the encoding byte and the payload but not the
//! length varint, so a reference that lands on garbage fails the CRC even
//! when the garbage happens to decode as a plausible length.

use bytes::{BufMut, BytesMut};

use chunkhouse_core::varint::{self, MAX_VARINT_LEN32};

use crate::error::{Error, Result};

/// Bytes of CRC32C trailing every record.
pub const CRC_SIZE: usize = 4;

/// Upper bound on the encoded size of a record carrying `payload_len`
/// bytes of chunk data.
///
/// Reserves the maximum varint width instead of encoding the length, so a
/// running total over a batch stays monotone and cheap. Over-reservation
/// is intentional: the writer's packing decision must not depend on
/// re-encoding.
pub fn max_len(payload_len: usize) -> u64 {
    (MAX_VARINT_LEN32 + 1 + payload_len + CRC_SIZE) as u64
}

/// Append one framed record to `buf`.
pub fn encode(buf: &mut BytesMut, encoding: u8, payload: &[u8]) {
    varint::put_uvarint(buf, payload.len() as u64);

    let body = buf.len();
    buf.put_u8(encoding);
    buf.put_slice(payload);

    let crc = crc32c::crc32c(&buf[body..]);
    buf.put_u32(crc);
}

/// Decode the record starting at `offset` within a segment.
///
/// Returns the encoding byte and the payload, borrowed from `seg`. The
/// payload is only returned once the checksum has been verified.
pub fn decode(seg: &[u8], offset: usize) -> Result<(u8, &[u8])> {
    // The length varint may use up to MAX_VARINT_LEN32 bytes; with the
    // minimum record size this never reads past a valid record's end.
    let len_end = offset as u64 + MAX_VARINT_LEN32 as u64;
    if len_end > seg.len() as u64 {
        return Err(Error::Truncated {
            need: len_end,
            have: seg.len() as u64,
        });
    }

    let (data_len, n) =
        varint::uvarint(&seg[offset..offset + MAX_VARINT_LEN32]).ok_or(Error::BadFraming)?;

    let enc_at = offset + n;
    let data_at = enc_at + 1;
    let data_end = data_at as u64 + data_len;
    let crc_end = data_end + CRC_SIZE as u64;
    if crc_end > seg.len() as u64 {
        return Err(Error::Truncated {
            need: crc_end,
            have: seg.len() as u64,
        });
    }
    let data_end = data_end as usize;

    let computed = crc32c::crc32c(&seg[enc_at..data_end]);
    let stored = u32::from_be_bytes([
        seg[data_end],
        seg[data_end + 1],
        seg[data_end + 2],
        seg[data_end + 3],
    ]);
    if computed != stored {
        return Err(Error::ChecksumMismatch { computed, stored });
    }

    Ok((seg[enc_at], &seg[data_at..data_end]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(encoding: u8, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode(&mut buf, encoding, payload);
        buf
    }

    // ---------------------------------------------------------------
    // Round-trips
    // ---------------------------------------------------------------

    #[test]
    fn test_roundtrip_small_payload() {
        let buf = encoded(1, b"hello");
        let (enc, payload) = decode(&buf, 0).unwrap();
        assert_eq!(enc, 1);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let buf = encoded(7, b"");
        assert_eq!(buf.len(), 1 + 1 + CRC_SIZE);
        let (enc, payload) = decode(&buf, 0).unwrap();
        assert_eq!(enc, 7);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_roundtrip_large_payload() {
        let payload: Vec<u8> = (0..200_000).map(|i| (i % 251) as u8).collect();
        let buf = encoded(1, &payload);
        let (_, decoded) = decode(&buf, 0).unwrap();
        assert_eq!(decoded, &payload[..]);
    }

    #[test]
    fn test_roundtrip_at_nonzero_offset() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0xAA; 13]);
        encode(&mut buf, 2, b"offset record");
        let (enc, payload) = decode(&buf, 13).unwrap();
        assert_eq!(enc, 2);
        assert_eq!(payload, b"offset record");
    }

    #[test]
    fn test_exact_layout_100_byte_payload() {
        // 1-byte varint + encoding + payload + CRC.
        let buf = encoded(1, &[0xCD; 100]);
        assert_eq!(buf.len(), 1 + 1 + 100 + CRC_SIZE);
        assert_eq!(buf[0], 100);
        assert_eq!(buf[1], 1);
    }

    #[test]
    fn test_crc_is_big_endian_castagnoli() {
        let buf = encoded(1, b"abc");
        let expected = crc32c::crc32c(&[&[1u8][..], b"abc"].concat());
        let stored = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]);
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_max_len_dominates_actual() {
        for payload_len in [0usize, 1, 100, 1 << 20] {
            let buf = encoded(1, &vec![0u8; payload_len]);
            assert!(buf.len() as u64 <= max_len(payload_len));
        }
    }

    // ---------------------------------------------------------------
    // Corruption
    // ---------------------------------------------------------------

    #[test]
    fn test_flipped_payload_byte_fails_checksum() {
        let mut buf = encoded(1, b"payload bytes");
        buf[5] ^= 0x01;
        assert!(matches!(
            decode(&buf, 0),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_flipped_encoding_byte_fails_checksum() {
        let mut buf = encoded(1, b"payload bytes");
        buf[1] ^= 0x80;
        assert!(matches!(
            decode(&buf, 0),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_flipped_crc_byte_fails_checksum() {
        let mut buf = encoded(1, b"payload bytes");
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        assert!(matches!(
            decode(&buf, 0),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_every_covered_bit_is_detected() {
        let payload = b"bit flip coverage";
        let clean = encoded(1, payload);
        // Flip one bit in every byte from the encoding byte through the CRC.
        for pos in 1..clean.len() {
            let mut corrupt = clean.clone();
            corrupt[pos] ^= 1 << (pos % 8);
            assert!(
                matches!(decode(&corrupt, 0), Err(Error::ChecksumMismatch { .. })),
                "corruption at byte {} went undetected",
                pos
            );
        }
    }

    // ---------------------------------------------------------------
    // Framing failures
    // ---------------------------------------------------------------

    #[test]
    fn test_truncated_before_length_field() {
        // Fewer bytes than the widest possible length varint.
        let buf = [0u8; 3];
        assert!(matches!(decode(&buf, 0), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_truncated_record_body() {
        let buf = encoded(1, b"some payload");
        let cut = &buf[..buf.len() - 3];
        assert!(matches!(decode(cut, 0), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_length_claims_more_than_segment() {
        let mut buf = BytesMut::new();
        varint::put_uvarint(&mut buf, 1_000_000);
        buf.put_u8(1);
        buf.put_slice(&[0u8; 64]);
        assert!(matches!(decode(&buf, 0), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_malformed_varint_is_bad_framing() {
        // Five continuation bytes never terminate a 32-bit length.
        let mut buf = BytesMut::new();
        buf.put_slice(&[0x80; 5]);
        buf.put_slice(&[0u8; 32]);
        assert!(matches!(decode(&buf, 0), Err(Error::BadFraming)));
    }

    #[test]
    fn test_offset_past_end() {
        let buf = encoded(1, b"x");
        assert!(matches!(
            decode(&buf, buf.len() + 10),
            Err(Error::Truncated { .. })
        ));
    }
}
