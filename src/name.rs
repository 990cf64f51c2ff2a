//! Name codec (spec.md §4.5): encodes the uncompressed size of a data
//! blob into its own name, so a directory listing can report sizes
//! without opening the metadata sidecar.
//!
//! - `Stored` data blobs are named `<stem>.bin`; there is no size
//!   suffix because the backing store's own reported size already is
//!   the uncompressed size. Decoding a `.bin` name yields the sentinel
//!   size `-2`.
//! - Every other codec's data blob is named `<stem><hex16(size)><ext>`,
//!   where `hex16(size)` is the 64-bit uncompressed size's eight
//!   **little-endian** bytes, each rendered as two lowercase hex
//!   digits, spliced directly between the stem and the extension with
//!   no separator (spec.md §3: `foo` at 200 bytes, gzip, is
//!   `fooc800000000000000.gz` — the low byte `0xc8` comes first).
//!
//! A name that doesn't parse under either rule is not an error for
//! `list()` — spec.md §4.5 requires it be passed through unchanged so
//! a directory can hold files this engine didn't write. [`decode`]
//! returns [`EngineError::NameParse`] for exactly this case; callers
//! that enumerate a directory should catch it and keep the raw entry.

use crate::algorithm::CodecId;
use crate::error::EngineError;

const STORED_SENTINEL: i64 = -2;
const HEX_SIZE_LEN: usize = 16;

/// Render `size`'s little-endian bytes as 16 lowercase hex digits.
fn le_hex16(size: u64) -> String {
    size.to_le_bytes().iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse 16 lowercase hex digits as little-endian bytes back into a size.
fn parse_le_hex16(hex: &str) -> Option<u64> {
    if hex.len() != HEX_SIZE_LEN {
        return None;
    }
    let mut bytes = [0u8; 8];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(u64::from_le_bytes(bytes))
}

/// Build the data blob name for a logical object named `stem`.
pub fn encode(stem: &str, uncompressed_size: u64, codec: CodecId) -> String {
    if codec == CodecId::Stored {
        format!("{stem}.bin")
    } else {
        format!("{stem}{}.{}", le_hex16(uncompressed_size), codec.file_extension())
    }
}

/// Parsed result of [`decode`]: the logical stem, the size encoded in
/// the name (or [`STORED_SENTINEL`] for `.bin`), and the codec implied
/// by the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub stem: String,
    pub size_sentinel: i64,
    pub codec: CodecId,
}

/// Parse a data blob name back into its stem, encoded size, and codec.
///
/// Returns [`EngineError::NameParse`] if `name` matches neither the
/// `.bin` rule nor `<stem><16 hex><known ext>`.
pub fn decode(name: &str) -> Result<DecodedName, EngineError> {
    if let Some(stem) = name.strip_suffix(".bin") {
        if stem.is_empty() {
            return Err(EngineError::NameParse);
        }
        return Ok(DecodedName {
            stem: stem.to_string(),
            size_sentinel: STORED_SENTINEL,
            codec: CodecId::Stored,
        });
    }

    let (base, ext) = name.rsplit_once('.').ok_or(EngineError::NameParse)?;
    let codec = CodecId::from_extension(ext).ok_or(EngineError::NameParse)?;

    if base.len() <= HEX_SIZE_LEN {
        return Err(EngineError::NameParse);
    }
    let split_at = base.len() - HEX_SIZE_LEN;
    let (stem, hex) = base.split_at(split_at);
    if stem.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EngineError::NameParse);
    }
    let size = parse_le_hex16(hex).ok_or(EngineError::NameParse)?;

    Ok(DecodedName {
        stem: stem.to_string(),
        size_sentinel: size as i64,
        codec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_roundtrip_uses_bin_extension() {
        let name = encode("report", 12345, CodecId::Stored);
        assert_eq!(name, "report.bin");
        let decoded = decode(&name).unwrap();
        assert_eq!(decoded.stem, "report");
        assert_eq!(decoded.size_sentinel, STORED_SENTINEL);
        assert_eq!(decoded.codec, CodecId::Stored);
    }

    #[test]
    fn compressed_roundtrip_preserves_stem_and_size() {
        for codec in [CodecId::Lz4, CodecId::Gzip, CodecId::Xz] {
            let name = encode("archive.tar", 987654321, codec);
            let decoded = decode(&name).unwrap();
            assert_eq!(decoded.stem, "archive.tar");
            assert_eq!(decoded.size_sentinel, 987654321);
            assert_eq!(decoded.codec, codec);
        }
    }

    #[test]
    fn size_is_encoded_little_endian_not_big_endian() {
        // 200 = 0xC8; the low byte comes first in the name.
        let name = encode("foo", 200, CodecId::Gzip);
        assert_eq!(name, "fooc800000000000000.gz");
    }

    #[test]
    fn zero_size_pads_to_sixteen_hex_digits() {
        let name = encode("empty", 0, CodecId::Gzip);
        assert_eq!(name, "empty0000000000000000.gz");
    }

    #[test]
    fn unrecognized_extension_is_a_parse_failure() {
        assert!(decode("notes.txt").is_err());
        assert!(matches!(decode("notes.txt"), Err(EngineError::NameParse)));
    }

    #[test]
    fn too_short_hex_prefix_is_a_parse_failure() {
        assert!(decode("ab.gz").is_err());
    }

    #[test]
    fn non_hex_prefix_is_a_parse_failure() {
        assert!(decode("zzzzzzzzzzzzzzzz.gz").is_err());
    }

    #[test]
    fn bare_bin_with_no_stem_is_rejected() {
        assert!(decode(".bin").is_err());
    }
}
