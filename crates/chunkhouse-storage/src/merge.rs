//! Vertical chunk merging.
//!
//! Compaction can find two chunks covering the same time range, e.g. after
//! restoring overlapping blocks from backups. Merging unions their samples
//! by timestamp into one XOR-encoded chunk; when both sides carry a sample
//! at the same timestamp, the sample from the second chunk wins, so
//! callers express "last appearing wins" through argument order.

use chunkhouse_core::{Appender, Chunk, XorChunk};

use crate::error::{Error, Result};
use crate::meta::ChunkMeta;

/// Merge `a` and `b` into one XOR-encoded chunk holding the union of
/// their samples. On duplicate timestamps the sample from `b` is kept.
pub fn merge_chunks(a: &dyn Chunk, b: &dyn Chunk) -> Result<XorChunk> {
    let mut merged = XorChunk::new();
    let mut app = merged.appender().map_err(Error::Decode)?;

    let mut a_iter = a.iter();
    let mut b_iter = b.iter();
    let mut a_cur = a_iter.next().transpose()?;
    let mut b_cur = b_iter.next().transpose()?;

    while let (Some((at, av)), Some((bt, bv))) = (a_cur, b_cur) {
        if at < bt {
            app.append(at, av);
            a_cur = a_iter.next().transpose()?;
        } else if bt < at {
            app.append(bt, bv);
            b_cur = b_iter.next().transpose()?;
        } else {
            // Same timestamp on both sides: b wins.
            app.append(bt, bv);
            a_cur = a_iter.next().transpose()?;
            b_cur = b_iter.next().transpose()?;
        }
    }
    while let Some((t, v)) = a_cur {
        app.append(t, v);
        a_cur = a_iter.next().transpose()?;
    }
    while let Some((t, v)) = b_cur {
        app.append(t, v);
        b_cur = b_iter.next().transpose()?;
    }

    drop(app);
    Ok(merged)
}

/// Coalesce metas sorted by `min_time` until no two overlap.
///
/// Overlapping neighbors merge vertically, the later chunk winning ties,
/// and the surviving meta's `max_time` extends to cover both. Because the
/// input is sorted by `min_time`, a chunk can only ever overlap the most
/// recently emitted one, so a single lookback suffices.
pub fn merge_overlapping_chunks(chks: Vec<ChunkMeta>) -> Result<Vec<ChunkMeta>> {
    if chks.len() < 2 {
        return Ok(chks);
    }

    let mut merged: Vec<ChunkMeta> = Vec::with_capacity(chks.len());
    for c in chks {
        match merged.last_mut() {
            Some(last) if c.min_time <= last.max_time => {
                if c.max_time > last.max_time {
                    last.max_time = c.max_time;
                }
                let a = last.chunk.as_deref().ok_or(Error::NoChunkData)?;
                let b = c.chunk.as_deref().ok_or(Error::NoChunkData)?;
                let combined = merge_chunks(a, b)?;
                last.chunk = Some(Box::new(combined));
            }
            _ => merged.push(c),
        }
    }

    Ok(merged)
}
