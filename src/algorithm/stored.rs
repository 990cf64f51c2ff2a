//! Identity pass-through adapter for [`CodecId::Stored`].
//!
//! The wrapper (C5) never routes `Stored` artifacts through the block
//! pipeline — it reads and writes the raw bytes directly, so no block
//! index or per-block framing is ever produced for them (spec.md
//! §4.5 point 3). This adapter exists only for callers that want a
//! uniform `Algorithm` handle regardless of codec.

use super::{Algorithm, CodecId, CompressedBlock};
use crate::error::CodecError;

pub struct StoredAlgorithm;

impl Algorithm for StoredAlgorithm {
    fn id(&self) -> CodecId {
        CodecId::Stored
    }

    fn header(&self) -> Vec<u8> {
        Vec::new()
    }

    fn footer(&self) -> Vec<u8> {
        Vec::new()
    }

    fn compress_block(&self, data: &[u8], _level: i32) -> Result<CompressedBlock, CodecError> {
        Ok(CompressedBlock {
            payload: data.to_vec(),
            compressed_len: data.len() as u32,
            uncompressed_len: data.len() as u64,
        })
    }

    fn decompress_block(
        &self,
        payload: &[u8],
        _expected_uncompressed_len: u32,
    ) -> Result<Vec<u8>, CodecError> {
        Ok(payload.to_vec())
    }
}
