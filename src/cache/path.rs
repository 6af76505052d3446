//! Cache path resolver.
//!
//! Maps a cache key to its location relative to the cache root:
//!
//! ```text
//! tiles:  {asset_id}/{z}/{x}/{y}.{format}
//! pages:  pdf/{asset_id}/page_{n}.jpg
//! ```
//!
//! Tile paths always begin with a numeric directory and page paths with the
//! literal `pdf` directory, so the two key spaces never collide. Resolution is
//! pure: no I/O, no normalization beyond formatting integers.

use std::path::PathBuf;

use crate::page::PageCoordinate;
use crate::tile::TileCoordinate;

/// Directory under the cache root holding rasterized document pages.
pub const PAGE_DIRECTORY: &str = "pdf";

/// A value that owns a deterministic cache location.
pub trait CacheKey {
    /// Path of this key's entry, relative to the cache root.
    fn cache_path(&self) -> PathBuf;
}

/// Relative cache path of a tile.
pub fn tile_path(coord: &TileCoordinate) -> PathBuf {
    PathBuf::from(coord.asset_id.to_string())
        .join(coord.zoom.to_string())
        .join(coord.column.to_string())
        .join(format!("{}.{}", coord.row, coord.format.extension()))
}

/// Relative cache path of a rasterized page.
pub fn page_path(coord: &PageCoordinate) -> PathBuf {
    PathBuf::from(PAGE_DIRECTORY)
        .join(coord.asset_id.to_string())
        .join(format!("page_{}.jpg", coord.page))
}

impl CacheKey for TileCoordinate {
    fn cache_path(&self) -> PathBuf {
        tile_path(self)
    }
}

impl CacheKey for PageCoordinate {
    fn cache_path(&self) -> PathBuf {
        page_path(self)
    }
}
