//! Generated resource table for bundled raw resources.
//!
//! Every regular file in the resource directory is one raw resource named by
//! its file stem. Entries are sorted by name and numbered from
//! [`RAW_TYPE_BASE`], so ids are stable for a given directory listing.

use nalu_core::error::{NaluError, NaluResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// First id of the raw resource type block.
pub const RAW_TYPE_BASE: u32 = 0x7f0f_0000;

/// Generated identifier of a raw resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = NaluError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| NaluError::InvalidInput(format!("resource id must be hex: {s}")))?;
        u32::from_str_radix(digits, 16)
            .map(ResourceId)
            .map_err(|e| NaluError::InvalidInput(format!("bad resource id {s}: {e}")))
    }
}

/// How a caller names the asset it wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Id(ResourceId),
    Name(String),
}

impl FromStr for AssetRef {
    type Err = NaluError;

    /// `0x...` parses as an id, anything else as a resource name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") || s.starts_with("0X") {
            return s.parse().map(AssetRef::Id);
        }
        if s.is_empty() {
            return Err(NaluError::InvalidInput("asset name must not be empty".into()));
        }
        Ok(AssetRef::Name(s.to_string()))
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetRef::Id(id) => write!(f, "{id}"),
            AssetRef::Name(name) => f.write_str(name),
        }
    }
}

/// One row of the resource table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub id: ResourceId,
    pub name: String,
    pub file_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: Vec<ResourceEntry>,
}

impl ResourceTable {
    /// Builds the table from `(file_name, size)` pairs.
    ///
    /// Files whose stem is not a valid resource name are skipped. Two files
    /// with the same stem are rejected.
    pub fn from_files<I>(files: I) -> NaluResult<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut rows: Vec<(String, String, u64)> = Vec::new();
        for (file_name, size) in files {
            let name = match resource_name(&file_name) {
                Some(name) => name,
                None => {
                    tracing::warn!(file_name = %file_name, "skipping file with invalid resource name");
                    continue;
                }
            };
            rows.push((name, file_name, size));
        }

        rows.sort_by(|a, b| a.0.cmp(&b.0));

        if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(NaluError::InvalidInput(format!(
                "duplicate resource '{}': {} and {}",
                pair[0].0, pair[0].1, pair[1].1
            )));
        }

        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(i, (name, file_name, size))| ResourceEntry {
                id: ResourceId(RAW_TYPE_BASE + i as u32),
                name,
                file_name,
                size,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Lists regular, non-hidden files directly under `dir`.
    pub fn scan(dir: &Path) -> NaluResult<Self> {
        let read_dir = std::fs::read_dir(dir).map_err(|e| {
            NaluError::Asset(format!("cannot read resource dir {}: {e}", dir.display()))
        })?;

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                continue;
            }
            files.push((file_name, meta.len()));
        }

        let table = Self::from_files(files)?;
        tracing::debug!(dir = %dir.display(), resources = table.len(), "scanned resource dir");
        Ok(table)
    }

    pub fn by_id(&self, id: ResourceId) -> Option<&ResourceEntry> {
        let index = id.0.checked_sub(RAW_TYPE_BASE)? as usize;
        self.entries.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&ResourceEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn resolve(&self, asset: &AssetRef) -> NaluResult<&ResourceEntry> {
        let found = match asset {
            AssetRef::Id(id) => self.by_id(*id),
            AssetRef::Name(name) => self.by_name(name),
        };
        found.ok_or_else(|| NaluError::Asset(format!("no raw resource {asset}")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File stem if it is a valid resource name (`[a-z0-9_]+`, not starting with a digit).
fn resource_name(file_name: &str) -> Option<String> {
    let stem = match file_name.split_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    let valid = !stem.is_empty()
        && !stem.starts_with(|c: char| c.is_ascii_digit())
        && stem
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ResourceTable {
        ResourceTable::from_files(vec![
            ("output.h264".to_string(), 1024),
            ("intro.264".to_string(), 10),
            ("Bad Name.h264".to_string(), 1),
        ])
        .unwrap()
    }

    #[test]
    fn ids_follow_sorted_names() {
        let t = table();
        assert_eq!(t.len(), 2);
        assert_eq!(t.by_name("intro").unwrap().id, ResourceId(RAW_TYPE_BASE));
        assert_eq!(t.by_name("output").unwrap().id, ResourceId(RAW_TYPE_BASE + 1));
        assert_eq!(t.by_id(ResourceId(RAW_TYPE_BASE + 1)).unwrap().file_name, "output.h264");
    }

    #[test]
    fn unknown_lookups() {
        let t = table();
        assert!(t.by_id(ResourceId(0)).is_none());
        assert!(t.by_id(ResourceId(RAW_TYPE_BASE + 2)).is_none());
        assert!(t.by_name("missing").is_none());
        assert!(matches!(
            t.resolve(&AssetRef::Name("missing".into())),
            Err(NaluError::Asset(_))
        ));
    }

    #[test]
    fn duplicate_stems_rejected() {
        let err = ResourceTable::from_files(vec![
            ("output.h264".to_string(), 1),
            ("output.264".to_string(), 2),
        ])
        .unwrap_err();
        assert!(matches!(err, NaluError::InvalidInput(_)));
    }

    #[test]
    fn resource_name_rules() {
        assert_eq!(resource_name("output.h264").as_deref(), Some("output"));
        assert_eq!(resource_name("clip_2").as_deref(), Some("clip_2"));
        assert_eq!(resource_name("2clip.h264"), None);
        assert_eq!(resource_name("Output.h264"), None);
        assert_eq!(resource_name(".h264"), None);
    }

    #[test]
    fn asset_ref_parsing() {
        assert_eq!(
            "0x7f0f0001".parse::<AssetRef>().unwrap(),
            AssetRef::Id(ResourceId(0x7f0f_0001))
        );
        assert_eq!(
            "output".parse::<AssetRef>().unwrap(),
            AssetRef::Name("output".into())
        );
        assert!("0xzz".parse::<AssetRef>().is_err());
        assert!("".parse::<AssetRef>().is_err());
        assert_eq!(ResourceId(0x7f0f_0001).to_string(), "0x7f0f0001");
    }
}
