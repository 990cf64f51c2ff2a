//! Compressibility probe (spec.md §4.4): decide once, before writing a
//! byte, whether an artifact is worth compressing at all.
//!
//! The probe peeks at most `heuristic_bytes` off the front of the
//! input, compresses that sample with the artifact's chosen codec, and
//! compares the compression ratio against `max_ratio`. Data that
//! doesn't compress well enough is written `Stored` instead — this
//! mirrors the quick up-front heuristic check other compressing
//! filesystem shims run before committing to a codec, except here the
//! "heuristic" is simply running the real codec on a prefix rather
//! than an entropy estimate, since spec.md's codecs are cheap enough
//! to afford that.

use std::io::{self, Read};

use crate::algorithm::Algorithm;
use crate::error::{EngineError, Result};

/// Outcome of probing a prefix of the input.
pub struct ProbeResult {
    /// Whether the artifact should be compressed (`false` ⇒ `Stored`).
    pub compress: bool,
    /// Best-effort MIME type sniffed from the peeked prefix, falling
    /// back to `application/octet-stream` when `infer` has no match.
    pub mime: String,
    /// The bytes that were peeked, so the caller can replay them ahead
    /// of the rest of the stream rather than re-reading from the start.
    pub peeked: Vec<u8>,
}

/// Peek up to `heuristic_bytes` from `input`, probe them with
/// `algorithm`, and decide whether the artifact is worth compressing.
///
/// The peeked bytes are returned in [`ProbeResult::peeked`] so the
/// caller can build a replay reader (peeked bytes followed by the rest
/// of `input`) without having required `input: Seek`.
pub fn probe<R: Read>(
    input: &mut R,
    algorithm: &dyn Algorithm,
    heuristic_bytes: usize,
    max_ratio: f64,
) -> Result<ProbeResult> {
    let mut peeked = vec![0u8; heuristic_bytes];
    let n = read_full(input, &mut peeked)?;
    peeked.truncate(n);

    let mime = infer::get(&peeked)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if peeked.is_empty() {
        // Nothing to measure; an empty artifact is trivially "not
        // worth compressing" but this is purely a cosmetic choice —
        // Stored vs. any codec both produce an empty data blob.
        return Ok(ProbeResult {
            compress: false,
            mime,
            peeked,
        });
    }

    let block = algorithm
        .compress_block(&peeked, -1)
        .map_err(EngineError::from)?;
    let ratio = block.compressed_len as f64 / peeked.len() as f64;
    let compress = ratio <= max_ratio;
    log::debug!(
        "probe sampled {} bytes, ratio {ratio:.3} (max {max_ratio}) -> {}",
        peeked.len(),
        if compress { "compress" } else { "store" }
    );

    Ok(ProbeResult {
        compress,
        mime,
        peeked,
    })
}

/// A reader that replays a peeked prefix before continuing to read
/// from the wrapped source — lets the probe consume bytes off a
/// non-`Seek` stream and hand them back to the compression pass.
pub struct ReplayReader<R> {
    peeked: Vec<u8>,
    pos: usize,
    rest: R,
}

impl<R: Read> ReplayReader<R> {
    pub fn new(peeked: Vec<u8>, rest: R) -> Self {
        Self {
            peeked,
            pos: 0,
            rest,
        }
    }
}

impl<R: Read> Read for ReplayReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.peeked.len() {
            let n = (self.peeked.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.peeked[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        } else {
            self.rest.read(buf)
        }
    }
}

fn read_full<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..]).map_err(EngineError::from)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
