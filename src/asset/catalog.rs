//! Asset catalog trait and a JSON manifest implementation.
//!
//! # Manifest Format
//!
//! ```json
//! [
//!   {
//!     "id": 42,
//!     "name": "map.jpg",
//!     "path": "/srv/assets/map.jpg",
//!     "mimeType": "image/jpeg",
//!     "width": 1000,
//!     "height": 1000
//!   },
//!   {
//!     "id": 7,
//!     "name": "report.pdf",
//!     "path": "/srv/assets/report.pdf",
//!     "mimeType": "application/pdf",
//!     "restricted": true
//!   }
//! ]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CatalogError;

use super::{AccessPolicy, AssetId, SourceAsset};

/// Resolves asset ids to source assets.
///
/// This abstraction keeps the tile and page managers independent of where
/// asset records live (database, manifest file, remote service).
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Look up an asset by id.
    ///
    /// Returns [`CatalogError::NotFound`] for unknown ids.
    async fn get_asset(&self, id: AssetId) -> Result<SourceAsset, CatalogError>;
}

/// One record of the JSON manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: AssetId,
    pub name: String,
    pub path: PathBuf,
    pub mime_type: String,
    #[serde(default)]
    pub byte_size: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Restricted assets are refused by the manifest's access policy
    #[serde(default)]
    pub restricted: bool,
}

impl ManifestEntry {
    fn to_asset(&self) -> SourceAsset {
        SourceAsset {
            id: self.id,
            name: self.name.clone(),
            path: self.path.clone(),
            mime_type: self.mime_type.clone(),
            byte_size: self.byte_size,
            width: self.width,
            height: self.height,
        }
    }
}

/// In-memory catalog loaded from a JSON manifest.
///
/// Also acts as an [`AccessPolicy`]: entries flagged `restricted` are denied.
#[derive(Debug, Clone, Default)]
pub struct ManifestCatalog {
    entries: HashMap<AssetId, ManifestEntry>,
}

impl ManifestCatalog {
    /// Build a catalog from already-parsed entries.
    ///
    /// Rejects entries whose path is relative; later entries with a duplicate
    /// id replace earlier ones.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ManifestEntry>,
    ) -> Result<Self, CatalogError> {
        let mut map = HashMap::new();
        for entry in entries {
            if !entry.path.is_absolute() {
                return Err(CatalogError::RelativePath(entry.path));
            }
            map.insert(entry.id, entry);
        }
        Ok(Self { entries: map })
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(json).map_err(|e| CatalogError::Manifest(e.to_string()))?;
        Self::from_entries(entries)
    }

    /// Load a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Register a public asset (mainly for tests and embedding).
    pub fn insert(&mut self, asset: SourceAsset) {
        self.insert_entry(asset, false);
    }

    /// Register an asset that the access policy will refuse.
    pub fn insert_restricted(&mut self, asset: SourceAsset) {
        self.insert_entry(asset, true);
    }

    fn insert_entry(&mut self, asset: SourceAsset, restricted: bool) {
        let entry = ManifestEntry {
            id: asset.id,
            name: asset.name,
            path: asset.path,
            mime_type: asset.mime_type,
            byte_size: asset.byte_size,
            width: asset.width,
            height: asset.height,
            restricted,
        };
        self.entries.insert(entry.id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AssetCatalog for ManifestCatalog {
    async fn get_asset(&self, id: AssetId) -> Result<SourceAsset, CatalogError> {
        self.entries
            .get(&id)
            .map(ManifestEntry::to_asset)
            .ok_or(CatalogError::NotFound(id))
    }
}

#[async_trait]
impl AccessPolicy for ManifestCatalog {
    async fn can_read(&self, asset: &SourceAsset) -> bool {
        self.entries
            .get(&asset.id)
            .map(|entry| !entry.restricted)
            .unwrap_or(false)
    }
}
