//! Gzip codec — each block is an independent gzip member (spec.md §4.1).
//!
//! No artifact-level header or footer: a standard 10-byte gzip header
//! and 8-byte trailer (CRC32 + ISIZE) bracket every block's deflate
//! stream, so a block's on-disk bytes are exactly what `gzip -d` would
//! accept on its own.

use super::{Algorithm, CodecId, CompressedBlock};
use crate::error::CodecError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default level matches spec.md §6's per-codec preset (Gzip → level 6).
pub const DEFAULT_LEVEL: u32 = 6;

pub struct GzipAlgorithm {
    default_level: u32,
}

impl Default for GzipAlgorithm {
    fn default() -> Self {
        Self {
            default_level: DEFAULT_LEVEL,
        }
    }
}

impl Algorithm for GzipAlgorithm {
    fn id(&self) -> CodecId {
        CodecId::Gzip
    }

    fn header(&self) -> Vec<u8> {
        Vec::new()
    }

    fn footer(&self) -> Vec<u8> {
        Vec::new()
    }

    fn compress_block(&self, data: &[u8], level: i32) -> Result<CompressedBlock, CodecError> {
        let level = if level < 0 {
            self.default_level
        } else {
            (level as u32).min(9)
        };
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compression(e.to_string()))?;
        let payload = encoder
            .finish()
            .map_err(|e| CodecError::Compression(e.to_string()))?;
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
        let mut out = Vec::with_capacity(expected_uncompressed_len as usize);
        GzDecoder::new(payload)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}
