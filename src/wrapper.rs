//! Paired-object wrapper (spec.md §4.5): presents a backing store of
//! raw `{data blob, meta blob}` pairs as a store of logical named
//! objects, each transparently block-compressed and seekable.
//!
//! A logical object `stem` is materialized as two backing-store
//! objects:
//!   - `<stem>.meta` — the gzip-wrapped [`MetaRecord`] JSON document,
//!     fixed name, rewritten on every update.
//!   - the data blob — named by the name codec from `stem`, its
//!     uncompressed size, and its codec, so `list()` can report sizes
//!     straight off a directory listing with no meta fetch at all.
//!
//! Listing only ever inspects data blob names: `.meta` entries are
//! filtered out, and every remaining entry is decoded with
//! [`crate::name`]; undecodable entries are passed through unchanged
//! rather than treated as errors (spec.md §4.5).

use std::io::{self, Cursor, Read};

use md5::{Digest, Md5};

use crate::algorithm::{self, Algorithm, CodecId};
use crate::backend::BackingStore;
use crate::block::BlockIndex;
use crate::cancel::CancelToken;
use crate::error::{EngineError, Result};
use crate::meta::MetaRecord;
use crate::name;
use crate::options::EngineOptions;
use crate::pipeline::{compress_stream, SeekableDecompressor};
use crate::probe::{self, ReplayReader};

const META_SUFFIX: &str = ".meta";

/// One entry returned by [`WrappedStore::list`]: either a decoded
/// logical object, or a raw backing-store entry this wrapper's name
/// codec couldn't make sense of.
#[derive(Debug, Clone)]
pub enum ListEntry {
    Object { stem: String, uncompressed_size: u64, codec: CodecId },
    Opaque { name: String, size: u64 },
}

pub struct WrappedStore<B> {
    backend: B,
}

impl<B: BackingStore> WrappedStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// List logical objects (and any opaque entries) directly under
    /// `prefix`.
    pub fn list(&self, prefix: &str) -> Result<Vec<ListEntry>> {
        let mut out = Vec::new();
        for entry in self.backend.list(prefix)? {
            if entry.name.ends_with(META_SUFFIX) {
                continue;
            }
            match name::decode(&entry.name) {
                Ok(decoded) => out.push(ListEntry::Object {
                    stem: decoded.stem,
                    uncompressed_size: if decoded.codec == CodecId::Stored {
                        entry.size
                    } else {
                        decoded.size_sentinel as u64
                    },
                    codec: decoded.codec,
                }),
                Err(_) => out.push(ListEntry::Opaque {
                    name: entry.name,
                    size: entry.size,
                }),
            }
        }
        Ok(out)
    }

    fn meta_name(stem: &str) -> String {
        format!("{stem}{META_SUFFIX}")
    }

    fn fetch_meta(&self, stem: &str) -> Result<MetaRecord> {
        let mut buf = Vec::new();
        self.backend
            .get(&Self::meta_name(stem), None)?
            .read_to_end(&mut buf)
            .map_err(EngineError::from)?;
        MetaRecord::from_blob(&buf)
    }

    fn data_name(stem: &str, meta: &MetaRecord) -> Result<String> {
        Ok(name::encode(stem, meta.uncompressed_size as u64, meta.codec()?))
    }

    /// Open `stem` for ranged reading. Returns a `Read + Seek` handle
    /// over the uncompressed content regardless of the underlying
    /// codec — `Stored` objects are served directly, compressed ones
    /// through a [`SeekableDecompressor`].
    pub fn open(&self, stem: &str) -> Result<Box<dyn ReadSeek>> {
        let meta = self.fetch_meta(stem)?;
        let codec = meta.codec()?;
        let data_name = Self::data_name(stem, &meta)?;

        let mut full = self.backend.get(&data_name, None).map_err(|e| {
            let not_found = matches!(&e, EngineError::BackingStore(io) if io.kind() == io::ErrorKind::NotFound);
            if not_found {
                EngineError::PairInconsistent {
                    stem: stem.to_string(),
                    detail: format!("meta present but data blob '{data_name}' is missing"),
                }
            } else {
                e
            }
        })?;
        let mut bytes = Vec::new();
        full.read_to_end(&mut bytes).map_err(EngineError::from)?;
        let cursor = Cursor::new(bytes);

        if codec == CodecId::Stored {
            Ok(Box::new(cursor))
        } else {
            let index = BlockIndex::from_entries(meta.block_index.clone(), block_size_hint(&meta))?;
            let algo = algorithm::for_id(codec);
            Ok(Box::new(SeekableDecompressor::new(cursor, algo, index)))
        }
    }

    /// Return the MD5 content hash recorded for `stem` without
    /// fetching its data blob.
    pub fn hash(&self, stem: &str) -> Result<[u8; 16]> {
        Ok(self.fetch_meta(stem)?.content_hash)
    }

    /// Probe, compress, and hash `reader` per `opts`, returning the
    /// resolved codec, the finished [`MetaRecord`], and the bytes ready
    /// to upload as the data blob. Shared by [`Self::put`] and
    /// [`Self::put_stream`], which differ only in how those bytes reach
    /// the backend.
    fn prepare<R: Read>(
        &self,
        mut reader: R,
        opts: &EngineOptions,
        cancel: &CancelToken,
    ) -> Result<(CodecId, MetaRecord, Vec<u8>)> {
        let probed = probe::probe(
            &mut reader,
            algorithm::for_id(opts.codec_id).as_ref(),
            opts.heuristic_bytes,
            opts.max_ratio,
        )?;
        let mut hasher = Md5::new();
        hasher.update(&probed.peeked);
        let replay = ReplayReader::new(probed.peeked, reader);
        let mut hashing = HashingReader { inner: replay, hasher: &mut hasher };

        if probed.compress {
            let algo = algorithm::for_id(opts.codec_id);
            let mut compressed = Vec::new();
            let out = compress_stream(&mut hashing, &mut compressed, algo.as_ref(), opts, cancel)?;
            let content_hash = finalize_hash(&mut hasher);
            log::debug!(
                "compressed {} raw bytes to {} with codec {:?}",
                out.uncompressed_size,
                compressed.len(),
                opts.codec_id
            );
            Ok((
                opts.codec_id,
                MetaRecord {
                    uncompressed_size: out.uncompressed_size as i64,
                    codec_id: opts.codec_id.as_i32(),
                    block_index: out.block_index,
                    content_hash,
                    mime: probed.mime,
                },
                compressed,
            ))
        } else {
            let mut raw = Vec::new();
            hashing.read_to_end(&mut raw).map_err(EngineError::from)?;
            let content_hash = finalize_hash(&mut hasher);
            log::debug!("{} bytes probed incompressible, storing raw", raw.len());
            Ok((
                CodecId::Stored,
                MetaRecord {
                    uncompressed_size: raw.len() as i64,
                    codec_id: CodecId::Stored.as_i32(),
                    block_index: Vec::new(),
                    content_hash,
                    mime: "application/octet-stream".to_string(),
                },
                raw,
            ))
        }
    }

    /// Delete the previous data blob left behind by an update, if its
    /// name changed under the new codec/size.
    fn cleanup_previous(&self, stem: &str, previous: Option<MetaRecord>, new_codec: CodecId, new_meta: &MetaRecord) -> Result<()> {
        if let Some(prev) = previous {
            let prev_codec = prev.codec()?;
            let prev_data_name = Self::data_name(stem, &prev)?;
            let new_data_name = name::encode(stem, new_meta.uncompressed_size as u64, new_codec);
            if prev_data_name != new_data_name || prev_codec != new_codec {
                if let Err(e) = self.backend.delete(&prev_data_name) {
                    log::warn!("failed to clean up orphaned data blob '{prev_data_name}': {e}");
                }
            }
        }
        Ok(())
    }

    /// Write `stem` from `reader`, probing compressibility, compressing
    /// through the pipeline, and publishing the data blob before the
    /// meta blob (so a concurrent reader never observes a meta record
    /// whose data blob doesn't exist yet). If `stem` already existed
    /// with a different codec or size, its old data blob is deleted
    /// once the new pair is safely in place.
    ///
    /// This buffers the full compressed output before uploading, since
    /// the final, size-encoded data-blob name must be known up front.
    /// Use [`Self::put_stream`] when the caller would rather not hold
    /// the whole compressed artifact in memory at once.
    pub fn put<R: Read>(&self, stem: &str, reader: R, opts: &EngineOptions) -> Result<()> {
        self.put_with_cancel(stem, reader, opts, &CancelToken::new())
    }

    pub fn put_with_cancel<R: Read>(
        &self,
        stem: &str,
        reader: R,
        opts: &EngineOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        let previous = self.fetch_meta(stem).ok();
        let (codec, meta, bytes) = self.prepare(reader, opts, cancel)?;
        let data_name = name::encode(stem, meta.uncompressed_size as u64, codec);

        self.backend.put_stream(&data_name, &mut Cursor::new(bytes))?;
        self.backend.put(&Self::meta_name(stem), &meta.to_blob()?)?;
        self.cleanup_previous(stem, previous, codec, &meta)?;
        Ok(())
    }

    /// Streaming-PUT variant of [`Self::put`] (spec.md §4.5 "Streaming
    /// PUT"): uploads the compressed bytes under a temporary staging
    /// name first — appropriate when the caller doesn't want to wait
    /// for the final size-encoded name before the upload can begin —
    /// then renames the staged object to its final name once the
    /// uncompressed size is known, and only then writes the meta blob.
    /// If the rename fails, the staged object is deleted so no orphan
    /// is left behind; if the meta write fails after a successful
    /// rename, the renamed data blob is deleted in turn.
    pub fn put_stream<R: Read>(&self, stem: &str, reader: R, opts: &EngineOptions) -> Result<()> {
        self.put_stream_with_cancel(stem, reader, opts, &CancelToken::new())
    }

    pub fn put_stream_with_cancel<R: Read>(
        &self,
        stem: &str,
        reader: R,
        opts: &EngineOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        let previous = self.fetch_meta(stem).ok();
        let (codec, meta, bytes) = self.prepare(reader, opts, cancel)?;

        let staging_name = format!("{stem}.data.upload");
        self.backend.put_stream(&staging_name, &mut Cursor::new(bytes))?;

        let data_name = name::encode(stem, meta.uncompressed_size as u64, codec);
        if let Err(e) = self.backend.rename(&staging_name, &data_name) {
            log::warn!("streaming PUT rename failed for '{stem}', cleaning up staged upload: {e}");
            let _ = self.backend.delete(&staging_name);
            return Err(e);
        }

        if let Err(e) = self.backend.put(&Self::meta_name(stem), &meta.to_blob()?) {
            log::warn!("meta write failed for '{stem}' after streaming PUT, deleting data blob: {e}");
            let _ = self.backend.delete(&data_name);
            return Err(e);
        }

        self.cleanup_previous(stem, previous, codec, &meta)?;
        Ok(())
    }

    pub fn delete(&self, stem: &str) -> Result<()> {
        let meta = self.fetch_meta(stem)?;
        let data_name = Self::data_name(stem, &meta)?;
        self.backend.delete(&data_name)?;
        self.backend.delete(&Self::meta_name(stem))?;
        Ok(())
    }

    /// Delete an existing `dst_stem` pair (both blobs) ahead of a
    /// copy/rename onto it, so a stale destination never leaves an
    /// orphaned blob behind (spec.md §4.5).
    fn clear_destination(&self, dst_stem: &str) -> Result<()> {
        if let Ok(existing) = self.fetch_meta(dst_stem) {
            if let Ok(existing_data) = Self::data_name(dst_stem, &existing) {
                let _ = self.backend.delete(&existing_data);
            }
            let _ = self.backend.delete(&Self::meta_name(dst_stem));
        }
        Ok(())
    }

    /// Server-side copy of both halves of a logical object. Per
    /// spec.md §4.5, an existing destination is cleared first, and the
    /// meta blob is copied *before* the data blob — if the data-side
    /// copy then fails, the copied meta is rolled back so a reader
    /// never observes a meta blob with no matching data blob.
    pub fn copy(&self, src_stem: &str, dst_stem: &str) -> Result<()> {
        let meta = self.fetch_meta(src_stem)?;
        let src_data = Self::data_name(src_stem, &meta)?;
        let dst_data = name::encode(dst_stem, meta.uncompressed_size as u64, meta.codec()?);

        self.clear_destination(dst_stem)?;

        self.backend.copy(&Self::meta_name(src_stem), &Self::meta_name(dst_stem))?;
        if let Err(e) = self.backend.copy(&src_data, &dst_data) {
            log::warn!("copy '{src_stem}' -> '{dst_stem}' failed on the data side, rolling back copied meta: {e}");
            let _ = self.backend.delete(&Self::meta_name(dst_stem));
            return Err(e);
        }
        Ok(())
    }

    /// Server-side move: same destination-clearing and meta-before-data
    /// ordering as [`Self::copy`], using the store's native rename for
    /// each half. On a data-side failure after the meta side already
    /// moved, best-effort restores the source meta; if that rollback
    /// itself fails, the returned error names both `src_stem` and
    /// `dst_stem` so an operator can reconcile by hand (spec.md §4.5).
    pub fn rename(&self, src_stem: &str, dst_stem: &str) -> Result<()> {
        let meta = self.fetch_meta(src_stem)?;
        let src_data = Self::data_name(src_stem, &meta)?;
        let dst_data = name::encode(dst_stem, meta.uncompressed_size as u64, meta.codec()?);

        self.clear_destination(dst_stem)?;

        self.backend.rename(&Self::meta_name(src_stem), &Self::meta_name(dst_stem))?;
        if let Err(e) = self.backend.rename(&src_data, &dst_data) {
            log::warn!("rename '{src_stem}' -> '{dst_stem}' failed on the data side, attempting rollback: {e}");
            if let Err(rollback_err) = self.backend.rename(&Self::meta_name(dst_stem), &Self::meta_name(src_stem)) {
                log::error!("rollback of '{dst_stem}' -> '{src_stem}' also failed: {rollback_err}");
                return Err(EngineError::PairInconsistent {
                    stem: src_stem.to_string(),
                    detail: format!(
                        "rename to '{dst_stem}' failed on the data side ({e}) and rollback of the meta side also failed ({rollback_err}); both stems may now be inconsistent"
                    ),
                });
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Recover the configured `block_size` from a parsed [`MetaRecord`]
/// for constructing a [`BlockIndex`]. The sidecar doesn't carry
/// `block_size` directly — it's derived the same way
/// [`BlockIndex::uncompressed_size`] derives the total size, just
/// inverted: `block_size = (uncompressed_size - last_block_raw_size) /
/// (num_blocks - 1)`. With fewer than two blocks there's no non-final
/// block for `block_size` to describe, so any positive value works;
/// `uncompressed_size` itself is a safe one.
fn block_size_hint(meta: &MetaRecord) -> u32 {
    let entries = &meta.block_index;
    let num_blocks = entries.len().saturating_sub(2);
    if num_blocks <= 1 {
        return meta.uncompressed_size.max(1) as u32;
    }
    let last_block_raw_size = *entries.last().unwrap() as i64;
    let block_size = (meta.uncompressed_size - last_block_raw_size) / (num_blocks as i64 - 1);
    block_size.max(1) as u32
}

fn finalize_hash(hasher: &mut Md5) -> [u8; 16] {
    let digest = hasher.clone().finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

struct HashingReader<'a, R> {
    inner: R,
    hasher: &'a mut Md5,
}

impl<'a, R: Read> Read for HashingReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Convenience alias for the trait object returned by [`WrappedStore::open`].
pub trait ReadSeek: Read + io::Seek {}
impl<T: Read + io::Seek> ReadSeek for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl BackingStore for MemStore {
        fn list(&self, prefix: &str) -> Result<Vec<crate::backend::ObjectEntry>> {
            let objects = self.objects.lock().unwrap();
            Ok(objects
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| crate::backend::ObjectEntry {
                    name: k.clone(),
                    size: v.len() as u64,
                })
                .collect())
        }

        fn get(&self, name: &str, _range: Option<(u64, u64)>) -> Result<Box<dyn Read + Send>> {
            let objects = self.objects.lock().unwrap();
            match objects.get(name) {
                Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
                None => Err(EngineError::BackingStore(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such object: {name}"),
                ))),
            }
        }

        fn put(&self, name: &str, data: &[u8]) -> Result<()> {
            self.objects.lock().unwrap().insert(name.to_string(), data.to_vec());
            Ok(())
        }

        fn put_stream(&self, name: &str, reader: &mut dyn Read) -> Result<()> {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map_err(EngineError::from)?;
            self.put(name, &buf)
        }

        fn delete(&self, name: &str) -> Result<()> {
            self.objects.lock().unwrap().remove(name);
            Ok(())
        }

        fn copy(&self, src: &str, dst: &str) -> Result<()> {
            let bytes = {
                let objects = self.objects.lock().unwrap();
                objects
                    .get(src)
                    .cloned()
                    .ok_or_else(|| EngineError::BackingStore(io::Error::new(io::ErrorKind::NotFound, src)))?
            };
            self.put(dst, &bytes)
        }
    }

    #[test]
    fn put_then_open_roundtrips_small_stored_artifact() {
        let store = WrappedStore::new(MemStore::default());
        let opts = EngineOptions::new(CodecId::Gzip).with_heuristic_bytes(64).with_max_ratio(0.01);
        let data = b"tiny incompressible-ish payload";
        store.put("greeting", &data[..], &opts).unwrap();

        let mut reader = store.open("greeting").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn put_then_open_roundtrips_compressed_artifact() {
        let store = WrappedStore::new(MemStore::default());
        let opts = EngineOptions::new(CodecId::Gzip).with_block_size(16);
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        store.put("doc", &data[..], &opts).unwrap();

        let mut reader = store.open("doc").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn update_renames_data_blob_when_codec_changes() {
        let store = WrappedStore::new(MemStore::default());
        let stored_opts = EngineOptions::new(CodecId::Gzip).with_heuristic_bytes(4).with_max_ratio(0.0);
        store.put("thing", &b"xy"[..], &stored_opts).unwrap();
        let listed = store.list("").unwrap();
        let first_data_entries: Vec<_> = listed
            .iter()
            .filter(|e| matches!(e, ListEntry::Object { stem, .. } if stem == "thing"))
            .collect();
        assert_eq!(first_data_entries.len(), 1);

        let compressing_opts = EngineOptions::new(CodecId::Gzip).with_block_size(16);
        let big = vec![b'z'; 1000];
        store.put("thing", &big[..], &compressing_opts).unwrap();

        let listed_after = store.list("").unwrap();
        let thing_entries: Vec<_> = listed_after
            .iter()
            .filter(|e| matches!(e, ListEntry::Object { stem, .. } if stem == "thing"))
            .collect();
        assert_eq!(thing_entries.len(), 1, "old data blob must be cleaned up after update");

        let mut reader = store.open("thing").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, big);
    }

    #[test]
    fn delete_removes_both_halves() {
        let store = WrappedStore::new(MemStore::default());
        let opts = EngineOptions::new(CodecId::Gzip).with_block_size(16);
        store.put("gone", &b"some content"[..], &opts).unwrap();
        store.delete("gone").unwrap();
        assert!(store.open("gone").is_err());
    }

    #[test]
    fn copy_duplicates_both_halves_under_a_new_stem() {
        let store = WrappedStore::new(MemStore::default());
        let opts = EngineOptions::new(CodecId::Gzip).with_block_size(16);
        store.put("src", &b"copy me please copy me please"[..], &opts).unwrap();
        store.copy("src", "dst").unwrap();

        let mut reader = store.open("dst").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"copy me please copy me please");
        // Source must remain untouched.
        assert!(store.open("src").is_ok());
    }

    #[test]
    fn hash_is_available_without_opening_data_blob() {
        let store = WrappedStore::new(MemStore::default());
        let opts = EngineOptions::new(CodecId::Gzip).with_block_size(16);
        store.put("h", &b"hash me"[..], &opts).unwrap();
        let h1 = store.hash("h").unwrap();
        let h2 = store.hash("h").unwrap();
        assert_eq!(h1, h2);
    }
}
