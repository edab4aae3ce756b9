//! Raw resource access for nalu.
//!
//! A provider owns a [`ResourceTable`] and opens entries as [`AssetStream`]s.
//! The stream is an owned handle: whoever holds it last releases the
//! underlying file when it is dropped.

pub mod fs;
pub mod memory;
pub mod profiles;
pub mod registry;

use nalu_core::error::NaluResult;
use std::fmt;
use std::io::{self, Read};

pub use fs::RawResourceProvider;
pub use memory::MemoryProvider;
pub use registry::{AssetRef, ResourceEntry, ResourceId, ResourceTable};

/// Abstraction for opening bundled raw resources from any source.
pub trait AssetProvider: Send + Sync {
    fn table(&self) -> &ResourceTable;

    /// Opens a read-only stream over one resource.
    fn open_raw(&self, id: ResourceId) -> NaluResult<AssetStream>;

    fn resolve(&self, asset: &AssetRef) -> NaluResult<ResourceEntry> {
        self.table().resolve(asset).cloned()
    }
}

/// Read-only byte stream over one raw resource.
pub struct AssetStream {
    id: ResourceId,
    name: String,
    len: Option<u64>,
    read: u64,
    inner: Box<dyn Read + Send>,
}

impl AssetStream {
    pub fn new(
        id: ResourceId,
        name: impl Into<String>,
        len: Option<u64>,
        inner: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            len,
            read: 0,
            inner,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size reported by the provider, if known.
    pub fn len_hint(&self) -> Option<u64> {
        self.len
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }
}

impl Read for AssetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

impl fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStream")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("len", &self.len)
            .field("read", &self.read)
            .finish_non_exhaustive()
    }
}

impl Drop for AssetStream {
    fn drop(&mut self) {
        tracing::debug!(
            id = %self.id,
            name = %self.name,
            bytes_read = self.read,
            "released raw resource"
        );
    }
}
