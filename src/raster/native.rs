//! In-process raster engine built on the `image` crate.
//!
//! # Design Decisions
//!
//! - **Always decode/encode**: the source is decoded in full, cropped, resized
//!   with an exact (non aspect-preserving) Lanczos3 filter and re-encoded. No
//!   passthrough of source bytes.
//!
//! - **Blocking pool**: decoding and encoding are CPU-bound and run under
//!   `spawn_blocking` so they never stall the async workers.
//!
//! - **Bounded decodes**: a blocking decode cannot be cancelled, so a caller
//!   whose timeout fires leaves it running. Each decode holds a semaphore
//!   permit until it finishes, capping how many run at once.
//!
//! - **Pages are delegated**: the `image` crate has no document renderer, so
//!   page operations go to a wrapped [`MagickEngine`].

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use tokio::sync::Semaphore;

use crate::error::TileError;
use crate::tile::{CropRegion, TileFormat};

use super::{MagickEngine, RasterEngine};

/// Minimum allowed JPEG quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_QUALITY: u8 = 100;

/// Decode limit used when the host's parallelism is unknown.
const FALLBACK_DECODE_LIMIT: usize = 4;

/// `image`-crate tile engine.
#[derive(Debug, Clone)]
pub struct NativeEngine {
    pages: MagickEngine,
    decodes: Arc<Semaphore>,
}

impl NativeEngine {
    /// Create an engine that renders document pages with `pages`.
    ///
    /// At most one decode per available core runs at a time.
    pub fn new(pages: MagickEngine) -> Self {
        let limit = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_DECODE_LIMIT);
        Self {
            pages,
            decodes: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Cap concurrent decodes at `limit` (at least one).
    pub fn with_decode_limit(mut self, limit: usize) -> Self {
        self.decodes = Arc::new(Semaphore::new(limit.max(1)));
        self
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new(MagickEngine::default())
    }
}

/// Decode, crop, resize and encode one tile.
fn render_tile(
    source: &Path,
    region: CropRegion,
    format: TileFormat,
    quality: u8,
) -> Result<Bytes, TileError> {
    let img = ImageReader::open(source)
        .map_err(|e| TileError::conversion(format!("{}: {}", source.display(), e)))?
        .with_guessed_format()
        .map_err(|e| TileError::conversion(format!("{}: {}", source.display(), e)))?
        .decode()
        .map_err(|e| TileError::conversion(format!("{}: {}", source.display(), e)))?;

    if region.x >= img.width() || region.y >= img.height() {
        return Err(TileError::conversion(format!(
            "crop origin {}x{} outside decoded {}x{} image",
            region.x,
            region.y,
            img.width(),
            img.height()
        )));
    }

    let tile = img
        .crop_imm(region.x, region.y, region.width, region.height)
        .resize_exact(region.output_size, region.output_size, FilterType::Lanczos3);

    encode(&tile, format, quality)
}

/// Encode a rendered tile at the requested quality.
fn encode(img: &DynamicImage, format: TileFormat, quality: u8) -> Result<Bytes, TileError> {
    let mut output = Cursor::new(Vec::new());

    let result = match format {
        TileFormat::Jpg => {
            let quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut output, quality))
        }
        TileFormat::Png => img.write_with_encoder(PngEncoder::new(&mut output)),
    };
    result.map_err(|e| TileError::conversion(format!("{} encoding failed: {}", format, e)))?;

    let output = output.into_inner();
    if output.is_empty() {
        return Err(TileError::conversion("encoder produced no output"));
    }
    Ok(Bytes::from(output))
}

#[async_trait]
impl RasterEngine for NativeEngine {
    async fn crop_resize(
        &self,
        source: &Path,
        region: CropRegion,
        format: TileFormat,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let permit = Arc::clone(&self.decodes)
            .acquire_owned()
            .await
            .map_err(|e| TileError::conversion(format!("decode limiter closed: {}", e)))?;

        let source: PathBuf = source.to_path_buf();
        tokio::task::spawn_blocking(move || {
            // Released when the decode ends, even if the caller has gone
            let _permit = permit;
            render_tile(&source, region, format, quality)
        })
        .await
        .map_err(|e| TileError::conversion(format!("tile render aborted: {}", e)))?
    }

    async fn rasterize_page(
        &self,
        source: &Path,
        page_index: u32,
        dpi: u32,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        self.pages
            .rasterize_page(source, page_index, dpi, quality)
            .await
    }

    async fn page_count(&self, source: &Path) -> Result<u32, TileError> {
        self.pages.page_count(source).await
    }
}
