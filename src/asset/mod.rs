//! Source assets and the collaborators that own them.
//!
//! Assets are registered and mutated by an external asset-management system.
//! This crate only reads them through two seams:
//!
//! - [`AssetCatalog`]: resolves an [`AssetId`] to a [`SourceAsset`]
//! - [`AccessPolicy`]: allow/deny decision for reading an asset
//!
//! [`ManifestCatalog`] is a JSON-manifest implementation of both, used by the
//! binary and the tests.

mod access;
mod catalog;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use access::{AccessPolicy, AllowAll};
pub use catalog::{AssetCatalog, ManifestCatalog, ManifestEntry};

/// Opaque numeric asset identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(AssetId)
    }
}

/// A registered source file, read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    /// Asset identity
    pub id: AssetId,

    /// Display name (usually the original file name)
    pub name: String,

    /// Absolute storage path
    pub path: PathBuf,

    /// Declared MIME type
    pub mime_type: String,

    /// Byte size as recorded by the owner, if known
    pub byte_size: Option<u64>,

    /// Pixel width, if known
    pub width: Option<u32>,

    /// Pixel height, if known
    pub height: Option<u32>,
}

impl SourceAsset {
    /// Create an asset with no recorded size or dimensions.
    pub fn new(
        id: AssetId,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            path: path.into(),
            mime_type: mime_type.into(),
            byte_size: None,
            width: None,
            height: None,
        }
    }

    /// Attach known pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Known dimensions, when both are recorded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}
