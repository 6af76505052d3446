//! Page cache manager.
//!
//! ```text
//! get_page()
//!   1. Validate page number        5. Check page range (memoized count)
//!   2. Require a paginated asset   6. Rasterize under timeout
//!   3. Disk cache hit → return     7. Atomic publish & return
//!   4. Join or lead the key's flight
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::asset::SourceAsset;
use crate::cache::{CacheKey, DiskCache, SingleFlight};
use crate::error::TileError;
use crate::info::DocumentKind;
use crate::raster::{with_timeout, RasterEngine};

use super::{PageCoordinate, PageCounter, PageResponse, PageSettings};

/// Serves rasterized document pages from the disk cache, generating on miss.
pub struct PageService {
    engine: Arc<dyn RasterEngine>,
    counter: Arc<PageCounter>,
    store: DiskCache,
    settings: PageSettings,
    flights: SingleFlight<PageCoordinate, Bytes>,
}

impl PageService {
    pub fn new(
        engine: Arc<dyn RasterEngine>,
        counter: Arc<PageCounter>,
        store: DiskCache,
        settings: PageSettings,
    ) -> Self {
        Self {
            engine,
            counter,
            store,
            settings,
            flights: SingleFlight::new(),
        }
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Get one page of `asset` as JPEG.
    pub async fn get_page(
        &self,
        asset: &SourceAsset,
        coord: PageCoordinate,
    ) -> Result<PageResponse, TileError> {
        coord.validate()?;

        if !DocumentKind::classify(&asset.mime_type).is_paginated() {
            return Err(TileError::NotPaginated { asset_id: asset.id });
        }

        let relative = coord.cache_path();
        if let Some(data) = self.store.read(&relative).await.map_err(TileError::cache)? {
            debug!(asset_id = %asset.id, page = coord.page, "Page cache hit");
            return Ok(PageResponse {
                data,
                cache_hit: true,
            });
        }

        debug!(asset_id = %asset.id, page = coord.page, "Page cache miss");

        let job = PageJob {
            engine: Arc::clone(&self.engine),
            counter: Arc::clone(&self.counter),
            store: self.store.clone(),
            settings: self.settings,
            asset: asset.clone(),
            coord,
        };

        let (result, joined) = self.flights.run(coord, job.run()).await;
        if joined {
            debug!(asset_id = %asset.id, page = coord.page, "Joined in-flight page render");
        }

        Ok(PageResponse {
            data: result?,
            cache_hit: false,
        })
    }
}

/// Everything one page generation needs, owned so it can outlive the caller.
struct PageJob {
    engine: Arc<dyn RasterEngine>,
    counter: Arc<PageCounter>,
    store: DiskCache,
    settings: PageSettings,
    asset: SourceAsset,
    coord: PageCoordinate,
}

impl PageJob {
    async fn run(self) -> Result<Bytes, TileError> {
        let relative = self.coord.cache_path();

        // A flight that finished between our miss and becoming leader
        if let Some(data) = self.store.read(&relative).await.map_err(TileError::cache)? {
            return Ok(data);
        }

        let start = Instant::now();
        let page_count = self.counter.page_count(&self.asset).await?;
        if self.coord.page > page_count {
            return Err(TileError::PageOutOfRange {
                page: self.coord.page,
                page_count,
            });
        }

        let rendered = with_timeout(
            self.settings.conversion_timeout,
            "page rasterization",
            self.engine.rasterize_page(
                &self.asset.path,
                self.coord.index(),
                self.settings.dpi,
                self.settings.quality,
            ),
        )
        .await;

        let data = match rendered {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => {
                return Err(self.failed(TileError::conversion(
                    "page rasterization produced no output",
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
            page = self.coord.page,
            bytes = data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Published page"
        );

        Ok(data)
    }

    fn failed(&self, err: TileError) -> TileError {
        warn!(
            asset_id = %self.asset.id,
            page = self.coord.page,
            error = %err,
            "Page rasterization failed"
        );
        err
    }
}
