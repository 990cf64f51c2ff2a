//! # seekpress — seekable block-compression storage engine
//!
//! Format guarantees:
//! - Every block is compressed independently; decoding one never
//!   requires state from any other block
//! - Block checksums are mandatory for every codec that has a native
//!   per-block checksum (LZ4); a tampered block is rejected on read,
//!   never silently passed through
//! - The block index alone determines an artifact's uncompressed size
//!   and the byte range spanned by any block — no block is ever
//!   touched to answer a size or seek query
//! - Codec identity is a frozen `i32` drawn from a closed set; it is
//!   chosen once per artifact and never renegotiated
//! - A logical object is always `{data blob, meta blob}`; the data
//!   blob's own name encodes its uncompressed size so a directory
//!   listing never needs the meta blob just to report sizes
//! - This crate never performs random writes into an existing
//!   artifact, defines no custom wire protocol of its own (LZ4-Frame,
//!   gzip, and xz are all standard container formats), and never
//!   compresses across block boundaries (no solid blocks, no shared
//!   dictionary)

pub mod algorithm;
pub mod backend;
pub mod block;
pub mod cancel;
pub mod error;
pub mod meta;
pub mod name;
pub mod options;
pub mod pipeline;
pub mod probe;
pub mod wrapper;

pub use algorithm::{Algorithm, CodecId, CompressedBlock};
pub use backend::{BackingStore, ObjectEntry};
pub use block::BlockIndex;
pub use cancel::CancelToken;
pub use error::{CodecError, EngineError, Result};
pub use meta::MetaRecord;
pub use options::EngineOptions;
pub use pipeline::{compress_stream, CompressOutput, SeekableDecompressor};
pub use wrapper::{ListEntry, ReadSeek, WrappedStore};
