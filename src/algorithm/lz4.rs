//! LZ4 codec — emits a public LZ4-Frame stream (spec.md §4.1).
//!
//! # Frame header (7 bytes)
//! ```text
//! Offset  Size  Field
//!    0      4   magic    = 04 22 4D 18
//!    4      1   FLG      version=01, block-independent=1, block-checksum=1
//!    5      1   BD       block-max-size descriptor
//!    6      1   HC       xxh32(FLG||BD) >> 8 & 0xFF
//! ```
//! Content-size and content-checksum flags are never set: the block
//! index already carries the uncompressed size and each block carries
//! its own checksum, so a content-level checksum would be redundant.
//!
//! # Block framing
//! `u32_le block_length | payload | u32_le xxh32(payload)`. The
//! high bit of `block_length` is set when the block is stored
//! uncompressed (incompressible input) — this mirrors the public LZ4
//! frame format exactly, so concatenating blocks yields a file the
//! reference `lz4` CLI still decodes as a multi-block stream.
//!
//! Block checksums are mandatory in this engine (never optional),
//! per spec.md §4.1.

use super::{Algorithm, CodecId, CompressedBlock};
use crate::error::CodecError;
use xxhash_rust::xxh32::xxh32;

const MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];
const STORED_FLAG: u32 = 0x8000_0000;

pub struct Lz4Algorithm;

impl Lz4Algorithm {
    fn bd_byte(block_size_hint: u32) -> u8 {
        // BD encodes an upper bound on block size; pick the smallest of
        // the four standard slots that still covers our configured
        // block_size (which may itself be e.g. 128 KiB, not a standard
        // LZ4 slot — the real per-block length always comes from the
        // block's own length prefix, so this is advisory only).
        let idx: u8 = if block_size_hint <= 64 * 1024 {
            4
        } else if block_size_hint <= 256 * 1024 {
            5
        } else if block_size_hint <= 1024 * 1024 {
            6
        } else {
            7
        };
        idx << 4
    }
}

impl Algorithm for Lz4Algorithm {
    fn id(&self) -> CodecId {
        CodecId::Lz4
    }

    fn header(&self) -> Vec<u8> {
        // Block-max-size is descriptive only; 4 MiB (the largest slot)
        // is always a safe upper bound regardless of configured
        // block_size, so every header this engine writes uses it.
        let bd = Self::bd_byte(4 * 1024 * 1024);
        let flg: u8 = 0b0111_0000; // version=01, block-independent, block-checksum
        let hc = ((xxh32(&[flg, bd], 0) >> 8) & 0xFF) as u8;
        let mut out = Vec::with_capacity(7);
        out.extend_from_slice(&MAGIC);
        out.push(flg);
        out.push(bd);
        out.push(hc);
        out
    }

    fn footer(&self) -> Vec<u8> {
        // The LZ4 frame "EndMark": a zero-length block.
        vec![0, 0, 0, 0]
    }

    fn compress_block(&self, data: &[u8], _level: i32) -> Result<CompressedBlock, CodecError> {
        let compressed = lz4_flex::block::compress(data);
        let (stored, content): (bool, &[u8]) = if compressed.len() >= data.len() {
            (true, data)
        } else {
            (false, &compressed)
        };

        let checksum = xxh32(content, 0);
        let length_field = if stored {
            STORED_FLAG | content.len() as u32
        } else {
            content.len() as u32
        };

        let mut payload = Vec::with_capacity(4 + content.len() + 4);
        payload.extend_from_slice(&length_field.to_le_bytes());
        payload.extend_from_slice(content);
        payload.extend_from_slice(&checksum.to_le_bytes());

        Ok(CompressedBlock {
            compressed_len: payload.len() as u32,
            uncompressed_len: data.len() as u64,
            payload,
        })
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        expected_uncompressed_len: u32,
    ) -> Result<Vec<u8>, CodecError> {
        if payload.len() < 8 {
            return Err(CodecError::Decompression(
                "LZ4 block shorter than the minimum length+checksum framing".into(),
            ));
        }
        let length_field = u32::from_le_bytes(payload[0..4].try_into().unwrap());
        let stored = length_field & STORED_FLAG != 0;
        let content_len = (length_field & !STORED_FLAG) as usize;

        // A block's on-disk content can never legitimately exceed the
        // uncompressed length the index recorded for it (stored blocks
        // are bounded by it exactly; compressed ones can't expand past
        // it either, or the encoder would have stored instead) — a
        // larger value means a corrupt or hostile length field.
        if content_len as u32 > expected_uncompressed_len {
            return Err(CodecError::BlockTooLarge {
                got: content_len as u32,
                max: expected_uncompressed_len,
            });
        }

        if 4 + content_len + 4 != payload.len() {
            return Err(CodecError::Decompression(format!(
                "LZ4 block declares content length {content_len} inconsistent with on-disk size {}",
                payload.len()
            )));
        }
        let content = &payload[4..4 + content_len];
        let stored_checksum = u32::from_le_bytes(
            payload[4 + content_len..8 + content_len].try_into().unwrap(),
        );
        if xxh32(content, 0) != stored_checksum {
            return Err(CodecError::ChecksumMismatch);
        }

        if stored {
            Ok(content.to_vec())
        } else {
            lz4_flex::block::decompress(content, expected_uncompressed_len as usize)
                .map_err(|e| CodecError::Decompression(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_compressible_block() {
        let algo = Lz4Algorithm;
        let data = vec![b'a'; 10_000];
        let block = algo.compress_block(&data, 0).unwrap();
        assert_eq!(block.uncompressed_len, data.len() as u64);
        let back = algo.decompress_block(&block.payload, data.len() as u32).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn roundtrip_incompressible_block_falls_back_to_stored() {
        let algo = Lz4Algorithm;
        let data: Vec<u8> = (0u32..4096).map(|i| (i * 2654435761) as u8).collect();
        let block = algo.compress_block(&data, 0).unwrap();
        let back = algo.decompress_block(&block.payload, data.len() as u32).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn tampered_checksum_is_rejected() {
        let algo = Lz4Algorithm;
        let data = vec![b'x'; 512];
        let mut block = algo.compress_block(&data, 0).unwrap();
        let last = block.payload.len() - 1;
        block.payload[last] ^= 0xFF;
        assert!(algo.decompress_block(&block.payload, data.len() as u32).is_err());
    }

    #[test]
    fn block_length_exceeding_expected_size_is_rejected() {
        let algo = Lz4Algorithm;
        let data = vec![b'x'; 512];
        let block = algo.compress_block(&data, 0).unwrap();
        // Claim a far smaller expected_uncompressed_len than the block
        // actually carries.
        let err = algo.decompress_block(&block.payload, 0).unwrap_err();
        assert!(matches!(err, CodecError::BlockTooLarge { .. }));
    }

    #[test]
    fn header_has_expected_magic_and_size() {
        let algo = Lz4Algorithm;
        let h = algo.header();
        assert_eq!(h.len(), 7);
        assert_eq!(&h[0..4], &MAGIC);
    }
}
