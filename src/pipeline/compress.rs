//! Compression: split the input into `block_size`-sized chunks, fan
//! them out across a worker pool, and write header + blocks + footer
//! to the output in original order (spec.md §4.2 "Compression").
//!
//! Chunks are read sequentially into memory first (arbitrary `Read`
//! sources cannot be split concurrently) and then compressed together
//! with one `rayon` `par_iter` pass over the known slice of chunks —
//! order is preserved by indexing rather than by the order work
//! happens to finish in.

use std::io::{Read, Write};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::algorithm::Algorithm;
use crate::cancel::CancelToken;
use crate::error::{EngineError, Result};
use crate::options::EngineOptions;

pub struct CompressOutput {
    /// `[header_size, block0_size, ..., blockN-1_size, last_block_raw_size]`
    pub block_index: Vec<u32>,
    pub uncompressed_size: u64,
}

/// Read all of `input`, compress it block by block per `opts`, and
/// write the resulting artifact (`header || block* || footer`) to
/// `output`. Returns the block index produced, which the caller
/// persists in the metadata sidecar (spec.md §4.3).
pub fn compress_stream<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    algorithm: &dyn Algorithm,
    opts: &EngineOptions,
    cancel: &CancelToken,
) -> Result<CompressOutput> {
    let header = algorithm.header();
    output.write_all(&header).map_err(EngineError::from)?;

    let chunks = read_chunks(input, opts.block_size.max(1) as usize)?;
    log::debug!("compressing {} block(s) with {} worker(s)", chunks.len(), opts.num_workers);

    let results: Result<Vec<_>> = if chunks.is_empty() {
        Ok(Vec::new())
    } else if opts.num_workers == 1 {
        chunks
            .iter()
            .map(|c| {
                cancel.check()?;
                algorithm.compress_block(c, opts.level).map_err(EngineError::from)
            })
            .collect()
    } else {
        let run = || -> Result<Vec<_>> {
            chunks
                .par_iter()
                .map(|c| {
                    cancel.check()?;
                    algorithm.compress_block(c, opts.level).map_err(EngineError::from)
                })
                .collect()
        };
        if opts.num_workers == 0 {
            run()
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(opts.num_workers)
                .build()
                .map_err(|e| EngineError::CorruptMeta(format!("worker pool init failed: {e}")))?;
            pool.install(run)
        }
    };
    let blocks = results?;

    let mut block_sizes = Vec::with_capacity(blocks.len());
    let mut uncompressed_size: u64 = 0;
    for block in &blocks {
        output.write_all(&block.payload).map_err(EngineError::from)?;
        block_sizes.push(block.compressed_len);
        uncompressed_size += block.uncompressed_len;
    }

    let footer = algorithm.footer();
    output.write_all(&footer).map_err(EngineError::from)?;

    let mut block_index = Vec::with_capacity(block_sizes.len() + 2);
    block_index.push(header.len() as u32);
    block_index.extend_from_slice(&block_sizes);
    let last_block_raw_size = chunks.last().map(|c| c.len() as u32).unwrap_or(0);
    block_index.push(last_block_raw_size);

    Ok(CompressOutput {
        block_index,
        uncompressed_size,
    })
}

/// Split `input` into `block_size`-sized chunks.
///
/// If the input is empty, returns no chunks at all (the degenerate
/// artifact with zero blocks). Otherwise every short final read —
/// including a final read of exactly zero bytes immediately following
/// a run of full-sized blocks, i.e. input whose length is an exact
/// multiple of `block_size` — becomes its own trailing chunk, even if
/// that chunk is empty. This is what lets a reader distinguish "input
/// ended exactly on a block boundary" (trailing empty block present)
/// from "input was empty" (no blocks at all).
fn read_chunks<R: Read>(input: &mut R, block_size: usize) -> Result<Vec<Vec<u8>>> {
    let mut chunks = Vec::new();
    let mut buf = vec![0u8; block_size];
    loop {
        let n = read_full(input, &mut buf)?;
        if n == 0 && chunks.is_empty() {
            break;
        }
        chunks.push(buf[..n].to_vec());
        if n < block_size {
            break;
        }
    }
    Ok(chunks)
}

/// Read until `buf` is full or the source is exhausted, returning the
/// number of bytes actually read (may be less than `buf.len()` only at
/// end of input).
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
