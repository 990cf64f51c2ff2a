//! Block index — the on-disk table of per-block sizes (spec.md §3, §4.2).
//!
//! Layout: `[header_size, block0_size, block1_size, ..., blockN-1_size,
//! last_block_raw_size]`. For `N` blocks this is `N + 2` entries. An
//! artifact with zero blocks has the degenerate index `[header_size,
//! 0]` and an uncompressed size of zero — there is no "last block" to
//! speak of.
//!
//! Everything downstream (the seekable decompressor's range mapping,
//! the derived uncompressed size used to validate reads) is computed
//! from this table alone; no block is ever touched to answer a size
//! query.

use crate::error::EngineError;

/// The parsed block index for one artifact, plus the fixed `block_size`
/// every block but the last was compressed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndex {
    /// `[header_size, block0_size, ..., blockN-1_size, last_block_raw_size]`
    entries: Vec<u32>,
    /// Configured block size at write time; every block but the last
    /// has this many uncompressed bytes.
    block_size: u32,
}

impl BlockIndex {
    /// Build an index from its raw on-disk entries. `entries.len()`
    /// must be at least 2 (`header_size` plus the trailing
    /// `last_block_raw_size`, even when there are zero blocks).
    pub fn from_entries(entries: Vec<u32>, block_size: u32) -> Result<Self, EngineError> {
        if entries.len() < 2 {
            return Err(EngineError::CorruptMeta(format!(
                "block index has {} entries, need at least 2",
                entries.len()
            )));
        }
        if block_size == 0 {
            return Err(EngineError::CorruptMeta("block_size must be nonzero".into()));
        }
        Ok(Self { entries, block_size })
    }

    pub fn header_size(&self) -> u32 {
        self.entries[0]
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of blocks actually written. Zero when the artifact was
    /// created from empty input (degenerate `[header_size, 0]` index).
    pub fn num_blocks(&self) -> usize {
        self.entries.len() - 2
    }

    pub fn last_block_raw_size(&self) -> u32 {
        *self.entries.last().unwrap()
    }

    /// Compressed length of block `i`, `i` in `0..num_blocks()`.
    pub fn block_compressed_len(&self, i: usize) -> u32 {
        self.entries[1 + i]
    }

    /// Uncompressed length of block `i`: `block_size()` for every block
    /// but the last, `last_block_raw_size()` for the last.
    pub fn block_uncompressed_len(&self, i: usize) -> u32 {
        if i + 1 == self.num_blocks() {
            self.last_block_raw_size()
        } else {
            self.block_size
        }
    }

    /// Byte offset of block `i` within the data blob, measured from the
    /// start of the artifact (i.e. including `header_size`).
    pub fn block_start(&self, i: usize) -> u64 {
        let mut offset = self.header_size() as u64;
        for j in 0..i {
            offset += self.entries[1 + j] as u64;
        }
        offset
    }

    /// Prefix-sum starts for every block plus one past-the-end sentinel
    /// (length `num_blocks() + 1`), used by the seekable decompressor to
    /// map a byte range onto the set of spanned blocks without
    /// recomputing the sum per call.
    pub fn block_starts(&self) -> Vec<u64> {
        let n = self.num_blocks();
        let mut starts = Vec::with_capacity(n + 1);
        let mut offset = self.header_size() as u64;
        starts.push(offset);
        for j in 0..n {
            offset += self.entries[1 + j] as u64;
            starts.push(offset);
        }
        starts
    }

    /// Total compressed length of the data blob's block region (header
    /// and footer excluded).
    pub fn compressed_span(&self) -> u64 {
        (0..self.num_blocks())
            .map(|i| self.entries[1 + i] as u64)
            .sum()
    }

    /// Derived uncompressed size of the whole artifact: `(N-1) *
    /// block_size + last_block_raw_size` for `N` blocks, `0` for `N == 0`.
    pub fn uncompressed_size(&self) -> u64 {
        let n = self.num_blocks();
        if n == 0 {
            return 0;
        }
        (n as u64 - 1) * self.block_size as u64 + self.last_block_raw_size() as u64
    }

    /// Raw on-disk entries, e.g. for serializing into the metadata record.
    pub fn as_entries(&self) -> &[u32] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<u32> {
        self.entries
    }

    /// Indices of every block whose uncompressed range `[start, start +
    /// uncompressed_len)` intersects the half-open byte range
    /// `[range_start, range_end)`. Empty if the range is empty or out
    /// of bounds.
    pub fn blocks_spanning(&self, range_start: u64, range_end: u64) -> Vec<usize> {
        if range_start >= range_end {
            return Vec::new();
        }
        let n = self.num_blocks();
        let mut out = Vec::new();
        let mut pos = 0u64;
        for i in 0..n {
            let len = self.block_uncompressed_len(i) as u64;
            let block_end = pos + len;
            if pos < range_end && block_end > range_start {
                out.push(i);
            }
            pos = block_end;
            if pos >= range_end {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_artifact_has_zero_blocks_and_size() {
        let idx = BlockIndex::from_entries(vec![7, 0], 256 * 1024).unwrap();
        assert_eq!(idx.num_blocks(), 0);
        assert_eq!(idx.uncompressed_size(), 0);
        assert_eq!(idx.header_size(), 7);
    }

    #[test]
    fn single_full_block_size_matches_block_size() {
        let block_size = 4u32;
        let idx = BlockIndex::from_entries(vec![0, 3, 4], block_size).unwrap();
        // one block: entries.len() == 3 -> num_blocks == 1
        assert_eq!(idx.num_blocks(), 1);
        assert_eq!(idx.uncompressed_size(), 4);
        assert_eq!(idx.block_uncompressed_len(0), 4);
    }

    #[test]
    fn multi_block_uncompressed_size_uses_last_block_raw_size() {
        // 3 blocks: sizes 10, 10, 10 compressed; block_size=100; last raw=37
        let idx = BlockIndex::from_entries(vec![0, 10, 10, 10, 37], 100).unwrap();
        assert_eq!(idx.num_blocks(), 3);
        assert_eq!(idx.uncompressed_size(), 2 * 100 + 37);
    }

    #[test]
    fn block_starts_are_prefix_sums_offset_by_header() {
        let idx = BlockIndex::from_entries(vec![5, 10, 20, 3], 100).unwrap();
        assert_eq!(idx.block_starts(), vec![5, 15, 35, 38]);
    }

    #[test]
    fn blocks_spanning_finds_intersection() {
        let idx = BlockIndex::from_entries(vec![0, 10, 10, 10, 10], 10).unwrap();
        // 4 blocks of 10 uncompressed bytes each: [0,10) [10,20) [20,30) [30,40)
        assert_eq!(idx.blocks_spanning(5, 15), vec![0, 1]);
        assert_eq!(idx.blocks_spanning(10, 20), vec![1]);
        assert_eq!(idx.blocks_spanning(0, 40), vec![0, 1, 2, 3]);
        assert_eq!(idx.blocks_spanning(39, 40), vec![3]);
        assert!(idx.blocks_spanning(40, 40).is_empty());
    }

    #[test]
    fn rejects_too_short_entries() {
        assert!(BlockIndex::from_entries(vec![7], 100).is_err());
    }
}
