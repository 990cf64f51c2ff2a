//! Codec registry — the `Algorithm` capability (spec.md §4.1).
//!
//! # Identity
//! Every codec is identified by a small frozen `i32` drawn from a closed
//! set: `Stored = -1`, `Lz4 = 2`, `Gzip = 4`, `Xz = 8`. This id is chosen
//! once at artifact creation and frozen for that artifact's lifetime
//! (spec.md §3). There is no runtime registry of third-party codecs to
//! negotiate — the set is closed and every reader either knows the id
//! or rejects the artifact.
//!
//! # The `Algorithm` trait
//! Each adapter implements five operations: a fixed `header`/`footer`
//! written once per artifact, a `file_extension` for the name codec,
//! and `compress_block`/`decompress_block` operating on one block at a
//! time. Blocks are independent by construction — decoding one requires
//! no state from any other (spec.md Data model, "Block").

mod gzip;
mod lz4;
mod stored;
mod xz;

pub use gzip::GzipAlgorithm;
pub use lz4::Lz4Algorithm;
pub use stored::StoredAlgorithm;
pub use xz::XzAlgorithm;

use crate::error::CodecError;

/// Frozen codec identity. Values are part of the on-disk contract via
/// the name codec (spec.md §4.5) and the metadata sidecar (spec.md §4.3)
/// — never renumber an existing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CodecId {
    /// No compression applied; the data blob is the raw bytes verbatim.
    Stored = -1,
    Lz4 = 2,
    Gzip = 4,
    Xz = 8,
}

impl CodecId {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            -1 => Some(CodecId::Stored),
            2 => Some(CodecId::Lz4),
            4 => Some(CodecId::Gzip),
            8 => Some(CodecId::Xz),
            _ => None,
        }
    }

    /// The file extension this codec's data blobs carry, per the name
    /// codec in spec.md §4.5. `Stored` is handled separately by the
    /// name codec (`.bin`) — it has no `Algorithm` extension of its own.
    pub fn file_extension(self) -> &'static str {
        match self {
            CodecId::Stored => "bin",
            CodecId::Lz4 => "lz4",
            CodecId::Gzip => "gz",
            CodecId::Xz => "xz",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "lz4" => Some(CodecId::Lz4),
            "gz" => Some(CodecId::Gzip),
            "xz" => Some(CodecId::Xz),
            _ => None,
        }
    }
}

/// One compressed block as produced by [`Algorithm::compress_block`].
#[derive(Debug)]
pub struct CompressedBlock {
    /// On-disk bytes for this block, in the codec's own per-block framing.
    pub payload: Vec<u8>,
    /// `payload.len()` as a `u32` — the value recorded in the block index.
    pub compressed_len: u32,
    /// Uncompressed length of the block that was just encoded.
    pub uncompressed_len: u64,
}

/// Per-block encode/decode, plus the fixed artifact-level preamble/trailer.
///
/// Implementations MUST be safe to call concurrently from multiple
/// threads on independent buffers — the block pipeline's worker fan-out
/// (spec.md §4.2, §5) relies on this.
pub trait Algorithm: Send + Sync {
    fn id(&self) -> CodecId;

    /// Fixed preamble written once at the start of the data blob. May
    /// be empty. Its length becomes `block_index[0]` (spec.md §3).
    fn header(&self) -> Vec<u8>;

    /// Fixed trailer written once at the end of the data blob. May be
    /// empty.
    fn footer(&self) -> Vec<u8>;

    /// Compress one block. `level` is the codec's native compression
    /// level (already clamped to a sane range by the caller).
    fn compress_block(&self, data: &[u8], level: i32) -> Result<CompressedBlock, CodecError>;

    /// Decompress one block. `expected_uncompressed_len` is the exact
    /// uncompressed length recorded for this block in the block index
    /// (`block_size` for every block but the last, `last_block_raw_size`
    /// for the last) — codecs that need an exact output size (LZ4's raw
    /// block format) rely on this rather than re-deriving it.
    fn decompress_block(
        &self,
        payload: &[u8],
        expected_uncompressed_len: u32,
    ) -> Result<Vec<u8>, CodecError>;
}

/// Resolve a [`CodecId`] to its `Algorithm` adapter. The wrapper never
/// routes `Stored` artifacts through the block pipeline — it reads and
/// writes their raw bytes directly — but `for_id(CodecId::Stored)`
/// still returns a working identity adapter for callers that want a
/// uniform handle regardless of codec (e.g. the compressibility probe).
pub fn for_id(id: CodecId) -> Box<dyn Algorithm> {
    match id {
        CodecId::Stored => Box::new(StoredAlgorithm),
        CodecId::Lz4 => Box::new(Lz4Algorithm),
        CodecId::Gzip => Box::new(GzipAlgorithm::default()),
        CodecId::Xz => Box::new(XzAlgorithm::default()),
    }
}
