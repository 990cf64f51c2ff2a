//! XZ codec — each block is an independent xz stream (spec.md §4.1).
//!
//! No artifact-level extras: a block's on-disk bytes are a complete,
//! self-contained `.xz` stream (its own stream header, index, and
//! footer), so the adapter buffers the encoder's output fully before
//! handing it to the block pipeline — the produced length must be
//! known before the block is written.
//!
//! Built on `xz2` (liblzma bindings), which handles both encode and
//! decode for the same container format (see DESIGN.md).

use super::{Algorithm, CodecId, CompressedBlock};
use crate::error::CodecError;
use std::io::{Read, Write};
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

/// Default preset matches spec.md §6's per-codec preset (XZ → 1 MiB
/// blocks; level defaults to liblzma's balanced preset 6).
pub const DEFAULT_PRESET: u32 = 6;

pub struct XzAlgorithm {
    default_preset: u32,
}

impl Default for XzAlgorithm {
    fn default() -> Self {
        Self {
            default_preset: DEFAULT_PRESET,
        }
    }
}

impl Algorithm for XzAlgorithm {
    fn id(&self) -> CodecId {
        CodecId::Xz
    }

    fn header(&self) -> Vec<u8> {
        Vec::new()
    }

    fn footer(&self) -> Vec<u8> {
        Vec::new()
    }

    fn compress_block(&self, data: &[u8], level: i32) -> Result<CompressedBlock, CodecError> {
        let preset = if level < 0 {
            self.default_preset
        } else {
            (level as u32).min(9)
        };
        let mut encoder = XzEncoder::new(Vec::new(), preset);
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
        XzDecoder::new(payload)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;
        Ok(out)
    }
}
