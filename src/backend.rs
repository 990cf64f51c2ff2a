//! Backing object store contract (spec.md §6): the external
//! collaborator this engine wraps. Concrete stores (local disk, S3,
//! an in-memory test double) implement this trait; this crate only
//! ever calls through it and never assumes a particular backend.
//!
//! Path parsing, credentials, directory caching, and the process-wide
//! CLI that wires a concrete store together are all out of scope here
//! (spec.md §1) — callers hand a `BackingStore` impl to
//! [`crate::wrapper::WrappedStore`] already fully configured.

use std::io::Read;

use crate::error::Result;

/// One entry returned by [`BackingStore::list`].
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub name: String,
    pub size: u64,
}

/// Minimal object-store capability this engine depends on. All paths
/// are relative to whatever root the concrete implementation was
/// configured with.
pub trait BackingStore: Send + Sync {
    /// List entries directly under `prefix` (non-recursive).
    fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Fetch a byte range of `name`. `None` bounds read to the end of
    /// the object. Returns a boxed reader so callers can stream rather
    /// than buffer the whole object.
    fn get(&self, name: &str, range: Option<(u64, u64)>) -> Result<Box<dyn Read + Send>>;

    /// Upload `data` as `name`, replacing any existing object of that
    /// name atomically from the caller's point of view.
    fn put(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Stream an upload of `name` from `reader` without buffering it
    /// entirely in memory first.
    fn put_stream(&self, name: &str, reader: &mut dyn Read) -> Result<()>;

    fn delete(&self, name: &str) -> Result<()>;

    /// Server-side copy when the backend supports it directly;
    /// implementations without native copy support may fall back to a
    /// get+put pair.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Server-side rename when the backend supports it directly;
    /// implementations without native move support may fall back to
    /// copy+delete.
    fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.copy(src, dst)?;
        self.delete(src)
    }
}
