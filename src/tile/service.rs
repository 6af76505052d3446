//! Tile cache manager.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Coordinate validation
//! - Disk cache lookups
//! - Source dimensions (recorded or read from the file header)
//! - Crop mapping and raster conversion
//! - Atomic publishing of the result
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Validate coord    4. Map to crop region             │    │
//! │  │  2. Check disk cache  5. Crop/resize under timeout      │    │
//! │  │  3. Join/lead flight  6. Publish & return               │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌───────────┐      ┌──────────────┐    ┌──────────────────┐  │
//! │    │ DiskCache │      │ SingleFlight │    │   RasterEngine   │  │
//! │    └───────────┘      └──────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::asset::SourceAsset;
use crate::cache::{CacheKey, DiskCache, SingleFlight};
use crate::error::TileError;
use crate::info::DocumentKind;
use crate::raster::{probe_dimensions, with_timeout, RasterEngine};

use super::coord::{TileCoordinate, TileFormat, TileGrid};

/// Default JPEG quality of generated tiles.
pub const DEFAULT_TILE_QUALITY: u8 = 90;

// =============================================================================
// Settings
// =============================================================================

/// Tile generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSettings {
    /// Tile size, zoom limit and mapping
    pub grid: TileGrid,

    /// JPEG quality (ignored for PNG)
    pub quality: u8,

    /// Bound on a single crop/resize
    pub conversion_timeout: Duration,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            grid: TileGrid::default(),
            quality: DEFAULT_TILE_QUALITY,
            conversion_timeout: crate::page::DEFAULT_CONVERSION_TIMEOUT,
        }
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded tile
    pub data: Bytes,

    /// Whether this tile was already on disk
    pub cache_hit: bool,

    /// Encoding of `data`
    pub format: TileFormat,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for generating and caching tiles.
///
/// Concurrent first requests for one coordinate share a single generation;
/// failures are returned to every waiter and leave nothing on disk.
pub struct TileService {
    engine: Arc<dyn RasterEngine>,
    store: DiskCache,
    settings: TileSettings,
    flights: SingleFlight<TileCoordinate, Bytes>,
}

impl TileService {
    pub fn new(engine: Arc<dyn RasterEngine>, store: DiskCache, settings: TileSettings) -> Self {
        Self {
            engine,
            store,
            settings,
            flights: SingleFlight::new(),
        }
    }

    pub fn settings(&self) -> &TileSettings {
        &self.settings
    }

    /// Get a tile, generating and caching it on a miss.
    ///
    /// # Errors
    ///
    /// - `InvalidCoordinate` for a zoom above the maximum or a tile outside
    ///   the source (before any conversion is attempted)
    /// - `NotTileable` for documents and text assets
    /// - `UnreadableAsset` when the source file is missing or undecodable
    /// - `ConversionFailure` when the engine fails, times out or returns nothing
    /// - `Cache` when the cache directory cannot be read or written
    pub async fn get_tile(
        &self,
        asset: &SourceAsset,
        coord: TileCoordinate,
    ) -> Result<TileResponse, TileError> {
        self.settings.grid.validate(&coord)?;

        if !DocumentKind::classify(&asset.mime_type).is_tileable() {
            return Err(TileError::NotTileable { asset_id: asset.id });
        }

        let relative = coord.cache_path();
        if let Some(data) = self.store.read(&relative).await.map_err(TileError::cache)? {
            debug!(
                asset_id = %asset.id,
                z = coord.zoom,
                x = coord.column,
                y = coord.row,
                "Tile cache hit"
            );
            return Ok(TileResponse {
                data,
                cache_hit: true,
                format: coord.format,
            });
        }

        debug!(
            asset_id = %asset.id,
            z = coord.zoom,
            x = coord.column,
            y = coord.row,
            "Tile cache miss"
        );

        let job = TileJob {
            engine: Arc::clone(&self.engine),
            store: self.store.clone(),
            settings: self.settings,
            asset: asset.clone(),
            coord,
        };

        let (result, joined) = self.flights.run(coord, job.run()).await;
        if joined {
            debug!(asset_id = %asset.id, z = coord.zoom, "Joined in-flight tile generation");
        }

        Ok(TileResponse {
            data: result?,
            cache_hit: false,
            format: coord.format,
        })
    }
}

/// One tile generation, owned so it keeps running if the caller goes away.
struct TileJob {
    engine: Arc<dyn RasterEngine>,
    store: DiskCache,
    settings: TileSettings,
    asset: SourceAsset,
    coord: TileCoordinate,
}

impl TileJob {
    async fn run(self) -> Result<Bytes, TileError> {
        let relative = self.coord.cache_path();

        // A flight that finished between our miss and becoming leader
        if let Some(data) = self.store.read(&relative).await.map_err(TileError::cache)? {
            return Ok(data);
        }

        let start = Instant::now();
        let (width, height) = self.source_dimensions().await?;
        let region = self.settings.grid.map(&self.coord, width, height)?;

        let converted = with_timeout(
            self.settings.conversion_timeout,
            "tile conversion",
            self.engine.crop_resize(
                &self.asset.path,
                region,
                self.coord.format,
                self.settings.quality,
            ),
        )
        .await;

        let data = match converted {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => {
                return Err(self.failed(TileError::conversion(
                    "tile conversion produced no output",
                )))
            }
            Err(e) => return Err(self.failed(e)),
        };

        self.store
            .publish(&relative, &data)
            .await
            .map_err(TileError::cache)?;

        info!(
            asset_id = %self.asset.id,
            z = self.coord.zoom,
            x = self.coord.column,
            y = self.coord.row,
            bytes = data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Published tile"
        );

        Ok(data)
    }

    /// Recorded dimensions when the catalog has them, otherwise the file header.
    ///
    /// The source must still exist either way; a deleted file never yields a
    /// tile.
    async fn source_dimensions(&self) -> Result<(u32, u32), TileError> {
        match self.asset.dimensions() {
            Some(dims) => {
                tokio::fs::metadata(&self.asset.path)
                    .await
                    .map_err(|e| TileError::UnreadableAsset {
                        path: self.asset.path.clone(),
                        message: e.to_string(),
                    })?;
                Ok(dims)
            }
            None => probe_dimensions(&self.asset.path).await,
        }
    }

    fn failed(&self, err: TileError) -> TileError {
        warn!(
            asset_id = %self.asset.id,
            z = self.coord.zoom,
            x = self.coord.column,
            y = self.coord.row,
            error = %err,
            "Tile generation failed"
        );
        err
    }
}
