use std::path::PathBuf;

use thiserror::Error;

use crate::asset::AssetId;

/// Errors raised while serving tiles, pages and document info.
///
/// Every variant maps to a distinct HTTP status at the server boundary. The
/// type is `Clone` so that a single in-flight generation result can be handed
/// to every caller waiting on the same cache key.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Asset id is unknown to the catalog
    #[error("Asset not found: {asset_id}")]
    AssetNotFound { asset_id: String },

    /// Access refused by the authorization policy
    #[error("Access to asset {asset_id} denied")]
    PermissionDenied { asset_id: AssetId },

    /// Malformed or out-of-range zoom, column, row or page
    #[error("Invalid coordinate: {reason}")]
    InvalidCoordinate { reason: String },

    /// Requested page is beyond the document's last page
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// Page rasterization requested for an asset that is not paginated
    #[error("Asset {asset_id} is not a paginated document")]
    NotPaginated { asset_id: AssetId },

    /// Tile requested for a document that is not rendered as an image
    #[error("Asset {asset_id} is not tileable")]
    NotTileable { asset_id: AssetId },

    /// Source file is missing or cannot be decoded as declared
    #[error("Unreadable asset {path}: {message}")]
    UnreadableAsset { path: PathBuf, message: String },

    /// Raster engine failed, timed out or produced nothing
    #[error("Conversion failed: {message}")]
    ConversionFailure { message: String },

    /// Output format other than jpg/png
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// Cache directory could not be read or written
    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl TileError {
    pub(crate) fn conversion(message: impl Into<String>) -> Self {
        TileError::ConversionFailure {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        TileError::InvalidCoordinate {
            reason: reason.into(),
        }
    }

    pub(crate) fn cache(err: std::io::Error) -> Self {
        TileError::Cache {
            message: err.to_string(),
        }
    }
}

/// Errors from the asset catalog collaborator.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// No asset registered under this id
    #[error("Asset not found: {0}")]
    NotFound(AssetId),

    /// Manifest file could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// Manifest contents are malformed
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Asset paths must be absolute
    #[error("Asset path must be absolute: {0}")]
    RelativePath(PathBuf),
}

impl From<CatalogError> for TileError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => TileError::AssetNotFound {
                asset_id: id.to_string(),
            },
            other => TileError::Cache {
                message: other.to_string(),
            },
        }
    }
}
