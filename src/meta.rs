//! Metadata sidecar (spec.md §4.3): the self-describing record that
//! accompanies every data blob, wrapped in a single gzip member — a
//! container-independent JSON document rather than a bespoke binary
//! layout, so the sidecar stays readable with ordinary tools even when
//! the data blob itself is opaque.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::algorithm::CodecId;
use crate::error::{EngineError, Result};

/// On-disk metadata record, serialized as JSON and gzip-wrapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaRecord {
    pub uncompressed_size: i64,
    pub codec_id: i32,
    /// `[header_size, block0_size, ..., blockN-1_size,
    /// last_block_raw_size]`. Empty iff `codec_id == Stored`.
    pub block_index: Vec<u32>,
    /// MD5 of the uncompressed content.
    pub content_hash: [u8; 16],
    pub mime: String,
}

impl MetaRecord {
    pub fn codec(&self) -> Result<CodecId> {
        CodecId::from_i32(self.codec_id)
            .ok_or_else(|| EngineError::CorruptMeta(format!("unknown codec_id {}", self.codec_id)))
    }

    /// Cross-check the invariant from spec.md §4.3: `block_index` is
    /// populated exactly when the codec is not `Stored`.
    pub fn validate(&self) -> Result<()> {
        let codec = self.codec()?;
        let is_stored = codec == CodecId::Stored;
        if is_stored != self.block_index.is_empty() {
            return Err(EngineError::CorruptMeta(format!(
                "block_index has {} entries but codec_id {:?} {} one",
                self.block_index.len(),
                codec,
                if is_stored { "expects none" } else { "requires" }
            )));
        }
        if self.uncompressed_size < 0 {
            return Err(EngineError::CorruptMeta("negative uncompressed_size".into()));
        }
        Ok(())
    }

    /// Serialize and gzip-wrap this record for storage as a meta blob.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self)
            .map_err(|e| EngineError::CorruptMeta(format!("serializing metadata: {e}")))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(EngineError::from)?;
        encoder.finish().map_err(EngineError::from)
    }

    /// Parse a meta blob previously produced by [`MetaRecord::to_blob`].
    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        let mut json = Vec::new();
        GzDecoder::new(blob)
            .read_to_end(&mut json)
            .map_err(|e| EngineError::CorruptMeta(format!("ungzipping metadata: {e}")))?;
        let record: MetaRecord = serde_json::from_slice(&json)
            .map_err(|e| EngineError::CorruptMeta(format!("parsing metadata JSON: {e}")))?;
        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(codec: CodecId, block_index: Vec<u32>) -> MetaRecord {
        MetaRecord {
            uncompressed_size: 4096,
            codec_id: codec.as_i32(),
            block_index,
            content_hash: [7u8; 16],
            mime: "text/plain".to_string(),
        }
    }

    #[test]
    fn roundtrips_through_blob() {
        let record = sample(CodecId::Lz4, vec![7, 100, 100, 50]);
        let blob = record.to_blob().unwrap();
        let back = MetaRecord::from_blob(&blob).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn stored_requires_empty_block_index() {
        let record = sample(CodecId::Stored, vec![]);
        assert!(record.validate().is_ok());

        let bad = sample(CodecId::Stored, vec![1, 2]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn compressed_codec_requires_nonempty_block_index() {
        let bad = sample(CodecId::Gzip, vec![]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn unknown_codec_id_is_corrupt() {
        let mut record = sample(CodecId::Lz4, vec![0, 5]);
        record.codec_id = 999;
        let blob = record.to_blob().unwrap();
        assert!(MetaRecord::from_blob(&blob).is_err());
    }
}
