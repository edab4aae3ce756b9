//! In-memory raw resource provider, for tests and embedded assets.

use crate::registry::{ResourceId, ResourceTable};
use crate::{AssetProvider, AssetStream};
use nalu_core::error::{NaluError, NaluResult};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves resources from byte buffers keyed by file name.
#[derive(Default)]
pub struct MemoryProvider {
    blobs: BTreeMap<String, Arc<[u8]>>,
    table: ResourceTable,
    opens: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource; the table is regenerated so ids stay sorted by name.
    pub fn with_asset(mut self, file_name: &str, bytes: impl Into<Arc<[u8]>>) -> NaluResult<Self> {
        self.blobs.insert(file_name.to_string(), bytes.into());
        self.table = ResourceTable::from_files(
            self.blobs
                .iter()
                .map(|(name, blob)| (name.clone(), blob.len() as u64)),
        )?;
        Ok(self)
    }

    /// How many streams have been opened so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl AssetProvider for MemoryProvider {
    fn table(&self) -> &ResourceTable {
        &self.table
    }

    fn open_raw(&self, id: ResourceId) -> NaluResult<AssetStream> {
        let entry = self
            .table
            .by_id(id)
            .ok_or_else(|| NaluError::Asset(format!("no raw resource {id}")))?;
        let blob = self
            .blobs
            .get(&entry.file_name)
            .cloned()
            .ok_or_else(|| NaluError::Internal(format!("table out of sync for {}", entry.name)))?;

        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(AssetStream::new(
            id,
            entry.name.clone(),
            Some(entry.size),
            Box::new(Cursor::new(blob)),
        ))
    }
}
