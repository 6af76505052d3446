//! Raster conversion engines.
//!
//! [`RasterEngine`] is the only place pixel work happens. The tile and page
//! managers call it on a cache miss and own everything else (validation,
//! caching, timeouts). Two implementations ship with the crate:
//!
//! - [`NativeEngine`]: in-process crop/resize with the `image` crate, with
//!   document pages delegated to ImageMagick
//! - [`MagickEngine`]: everything through the ImageMagick command-line tools
//!
//! Engines never write to the cache and never go through a shell: source
//! paths are passed as single process arguments.

mod magick;
mod native;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageReader;

use crate::error::TileError;
use crate::tile::{CropRegion, TileFormat};

pub use magick::{MagickEngine, MagickPrograms};
pub use native::NativeEngine;

/// Which engine the binary constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EngineKind {
    /// `image` crate for tiles, ImageMagick for document pages
    #[default]
    Native,

    /// ImageMagick for everything
    Magick,
}

/// Capability boundary for all pixel work.
#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Crop `region` out of the source and resize it to
    /// `region.output_size × region.output_size`, encoded as `format`.
    async fn crop_resize(
        &self,
        source: &Path,
        region: CropRegion,
        format: TileFormat,
        quality: u8,
    ) -> Result<Bytes, TileError>;

    /// Rasterize one page (zero-based `page_index`) of a paginated document
    /// to JPEG.
    async fn rasterize_page(
        &self,
        source: &Path,
        page_index: u32,
        dpi: u32,
        quality: u8,
    ) -> Result<Bytes, TileError>;

    /// Number of pages in a paginated document.
    ///
    /// May need to touch the whole document; callers should memoize.
    async fn page_count(&self, source: &Path) -> Result<u32, TileError>;
}

/// Bound an engine call by `limit`; expiry is a conversion failure.
///
/// Dropping the timed-out future also drops any child process it owns.
pub(crate) async fn with_timeout<T, F>(limit: Duration, what: &str, call: F) -> Result<T, TileError>
where
    F: Future<Output = Result<T, TileError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(TileError::conversion(format!(
            "{} timed out after {}s",
            what,
            limit.as_secs_f64()
        ))),
    }
}

/// Read image dimensions from the file header without decoding pixels.
///
/// A missing file or an undecodable header yields `UnreadableAsset`.
pub async fn probe_dimensions(source: &Path) -> Result<(u32, u32), TileError> {
    let path = source.to_path_buf();
    tokio::task::spawn_blocking(move || read_header_dimensions(&path))
        .await
        .map_err(|e| TileError::conversion(format!("dimension probe aborted: {}", e)))?
}

fn read_header_dimensions(path: &Path) -> Result<(u32, u32), TileError> {
    let unreadable = |message: String| TileError::UnreadableAsset {
        path: path.to_path_buf(),
        message,
    };

    ImageReader::open(path)
        .map_err(|e| unreadable(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| unreadable(e.to_string()))?
        .into_dimensions()
        .map_err(|e| unreadable(e.to_string()))
}
