//! Whole-page rasterization of paginated documents.
//!
//! Same cache-or-generate pattern as tiles, keyed by [`PageCoordinate`] and
//! stored under `pdf/{asset_id}/page_{n}.jpg`. Page counts are probed through
//! the raster engine and memoized by [`PageCounter`].

mod counter;
mod service;

use std::time::Duration;

use bytes::Bytes;

use crate::asset::AssetId;
use crate::error::TileError;

pub use counter::{PageCounter, DEFAULT_PAGE_COUNT_CAPACITY};
pub use service::PageService;

/// Default rasterization density.
pub const DEFAULT_PAGE_DPI: u32 = 150;

/// Default JPEG quality of rasterized pages.
pub const DEFAULT_PAGE_QUALITY: u8 = 90;

/// Default bound on a single conversion.
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity of one rasterized page. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCoordinate {
    pub asset_id: AssetId,
    pub page: u32,
}

impl PageCoordinate {
    pub fn new(asset_id: AssetId, page: u32) -> Self {
        Self { asset_id, page }
    }

    /// Parse a page number path segment; it must be a positive integer.
    pub fn parse(asset_id: AssetId, page: &str) -> Result<Self, TileError> {
        let page = page.parse::<u32>().map_err(|_| {
            TileError::invalid(format!("page must be a positive integer, got {:?}", page))
        })?;
        let coord = Self::new(asset_id, page);
        coord.validate()?;
        Ok(coord)
    }

    /// Zero-based index passed to the raster engine.
    pub fn index(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    pub(crate) fn validate(&self) -> Result<(), TileError> {
        if self.page == 0 {
            return Err(TileError::invalid("page numbers start at 1"));
        }
        Ok(())
    }
}

/// Rasterization parameters for the page manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub dpi: u32,
    pub quality: u8,
    pub conversion_timeout: Duration,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_PAGE_DPI,
            quality: DEFAULT_PAGE_QUALITY,
            conversion_timeout: DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

/// A rasterized page (always JPEG).
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub data: Bytes,
    pub cache_hit: bool,
}
