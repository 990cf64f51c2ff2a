//! Error taxonomy — one enum per layer. [`CodecError`] covers
//! failures internal to a single codec adapter; [`EngineError`] wraps
//! it alongside every other failure mode a public operation can
//! surface.

use std::io;
use thiserror::Error;

/// Failures internal to a single [`crate::algorithm::Algorithm`] adapter.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compression(String),
    #[error("decompression failed: {0}")]
    Decompression(String),
    #[error("block checksum mismatch")]
    ChecksumMismatch,
    #[error("on-disk block length {got} exceeds configured block size {max}")]
    BlockTooLarge { got: u32, max: u32 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Crate-wide error type returned by every public operation, matching
/// the taxonomy in spec.md §7.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Any failure surfaced by the wrapped backing store. Never retried
    /// by this crate — always surfaced verbatim to the caller.
    #[error("backing store failure: {0}")]
    BackingStore(#[source] io::Error),

    /// A codec rejected input or emitted malformed output. Fatal for
    /// the operation in progress.
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),

    /// A per-block framing or checksum check failed during decode.
    #[error("corrupt block {block_index}: {reason}")]
    CorruptBlock { block_index: usize, reason: String },

    /// The metadata record failed to parse, or failed the
    /// block_index/codec_id cross-check in spec.md §4.3.
    #[error("corrupt metadata: {0}")]
    CorruptMeta(String),

    /// A data-blob name could not be parsed by the name codec. Never
    /// fatal for `list()` — entries that fail this are passed through
    /// unchanged (spec.md §4.5); this variant is only returned from a
    /// direct `decode_name` call.
    #[error("name could not be parsed as a seekpress artifact name")]
    NameParse,

    /// The operation was aborted by a caller-supplied cancellation
    /// signal (spec.md §5).
    #[error("operation cancelled")]
    Cancelled,

    /// The meta blob and data blob of a logical object disagree — one
    /// exists without the other, or the meta blob names a data blob
    /// that isn't there. The caller may delete whichever side exists.
    #[error("pair inconsistent for '{stem}': {detail}")]
    PairInconsistent { stem: String, detail: String },
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::BackingStore(e)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
