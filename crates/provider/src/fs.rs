//! Filesystem-backed raw resource provider.

use crate::registry::{ResourceId, ResourceTable};
use crate::{AssetProvider, AssetStream};
use nalu_core::error::{NaluError, NaluResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Serves raw resources from a directory of files.
///
/// ```ignore
/// let provider = RawResourceProvider::open("res/raw")?;
/// let stream = provider.open_raw(provider.resolve(&"output".parse()?)?.id)?;
/// ```
pub struct RawResourceProvider {
    root: PathBuf,
    table: ResourceTable,
}

impl RawResourceProvider {
    pub fn open(root: impl AsRef<Path>) -> NaluResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(NaluError::InvalidInput("resource dir must not be empty".into()));
        }

        let table = ResourceTable::scan(root)?;
        tracing::info!(dir = %root.display(), resources = table.len(), "resource table ready");

        Ok(Self {
            root: root.to_path_buf(),
            table,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetProvider for RawResourceProvider {
    fn table(&self) -> &ResourceTable {
        &self.table
    }

    fn open_raw(&self, id: ResourceId) -> NaluResult<AssetStream> {
        let entry = self
            .table
            .by_id(id)
            .ok_or_else(|| NaluError::Asset(format!("no raw resource {id}")))?;
        let path = self.root.join(&entry.file_name);

        let file = File::open(&path)
            .map_err(|e| NaluError::Asset(format!("cannot open {}: {e}", path.display())))?;
        let len = file.metadata().ok().map(|m| m.len());

        tracing::debug!(%id, name = %entry.name, path = %path.display(), "opened raw resource");
        Ok(AssetStream::new(id, entry.name.clone(), len, Box::new(file)))
    }
}
