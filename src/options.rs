//! Engine configuration: per-codec block size, compression level,
//! worker count, and the compressibility probe's thresholds.
//!
//! There is deliberately no config-file loader here — reading
//! `seekpress.toml` or equivalent and populating an `EngineOptions` is
//! an external collaborator's job (the backing store, directory cache,
//! and CLI all live outside this crate), so this struct is constructed
//! directly by the embedding application.

use crate::algorithm::CodecId;

/// Per-codec defaults, matching spec.md §6's presets.
fn default_block_size(codec: CodecId) -> u32 {
    match codec {
        CodecId::Lz4 => 256 * 1024,
        CodecId::Gzip => 128 * 1024,
        CodecId::Xz => 1024 * 1024,
        CodecId::Stored => 0,
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Codec selected for new artifacts, before the compressibility
    /// probe potentially overrides it with `Stored` (spec.md §4.4).
    pub codec_id: CodecId,
    /// Uncompressed bytes per block. Defaults to the codec's preset
    /// (spec.md §6) when left at `None` via [`EngineOptions::new`].
    pub block_size: u32,
    /// Native per-block compression level, or `-1` for the codec's
    /// own default.
    pub level: i32,
    /// Worker count for the compression pipeline's fan-out. `0` means
    /// "use rayon's global pool default" (spec.md §5).
    pub num_workers: usize,
    /// Bytes peeked from the front of the input for the compressibility
    /// probe (spec.md §4.4).
    pub heuristic_bytes: usize,
    /// Probe threshold: if `compressed_len as f64 / uncompressed_len as
    /// f64` exceeds this, the artifact is stored uncompressed instead.
    pub max_ratio: f64,
}

impl EngineOptions {
    pub fn new(codec_id: CodecId) -> Self {
        Self {
            codec_id,
            block_size: default_block_size(codec_id),
            level: -1,
            num_workers: 0,
            heuristic_bytes: 1024 * 1024,
            max_ratio: 0.9,
        }
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn with_heuristic_bytes(mut self, heuristic_bytes: usize) -> Self {
        self.heuristic_bytes = heuristic_bytes;
        self
    }

    pub fn with_max_ratio(mut self, max_ratio: f64) -> Self {
        self.max_ratio = max_ratio;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new(CodecId::Lz4)
    }
}
