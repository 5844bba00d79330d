//! Sequence file bookkeeping for segment directories.
//!
//! Segment files are named by their sequence number as zero-padded
//! six-digit decimal, starting at `000001`. Anything in the directory
//! whose name does not parse as an unsigned decimal integer is ignored,
//! so tooling can leave lock files or temp files next to the segments.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Canonical file name for sequence number `seq`.
pub fn segment_file_name(seq: u64) -> String {
    format!("{:06}", seq)
}

/// All segment files in `dir`, in ascending numeric order.
pub fn sequence_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io("read dir", dir, e))?;

    let mut found: Vec<(u64, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read dir", dir, e))?;
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(seq) = name.parse::<u64>() {
                found.push((seq, entry.path()));
            }
        }
    }
    // Directory iteration order is filesystem-dependent; the numeric sort
    // is what defines segment indices.
    found.sort_by_key(|(seq, _)| *seq);

    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// Path and sequence number for the next segment file in `dir`: one past
/// the highest existing sequence number, or `000001` in an empty
/// directory.
pub fn next_sequence_file(dir: &Path) -> Result<(PathBuf, u64)> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io("read dir", dir, e))?;

    let mut max = 0u64;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("read dir", dir, e))?;
        if let Some(name) = entry.file_name().to_str() {
            if let Ok(seq) = name.parse::<u64>() {
                max = max.max(seq);
            }
        }
    }

    let seq = max + 1;
    Ok((dir.join(segment_file_name(seq)), seq))
}
