//! Block-compression pipeline: worker fan-out on write (spec.md §4.2,
//! §5), seekable ranged decode on read.

pub mod compress;
pub mod decompress;

pub use compress::{compress_stream, CompressOutput};
pub use decompress::SeekableDecompressor;
