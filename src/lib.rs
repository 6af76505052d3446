//! # zoompan
//!
//! On-demand deep-zoom tiles and document pages with a filesystem cache.
//!
//! A viewer asks for `/tile/{asset}/{z}/{x}/{y}.{format}` or
//! `/page/{asset}/{page}`. The first request for a coordinate crops, resizes
//! or rasterizes the source file and atomically publishes the result under the
//! cache directory; every later request is a plain file read. Concurrent
//! requests for the same missing coordinate share a single conversion.
//!
//! ## Architecture
//!
//! - [`asset`] - Asset identifiers, catalog and access-policy seams
//! - [`tile`] - Coordinate validation, crop mapping and the tile cache manager
//! - [`page`] - Page numbers, page counting and the page cache manager
//! - [`cache`] - Cache paths, atomic disk store and single-flight coordination
//! - [`raster`] - Raster engines (`image` crate and ImageMagick)
//! - [`info`] - Document classification, metadata and viewer configuration
//! - [`server`] - Axum routes, handlers and error mapping
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zoompan::{
//!     AppState, DiskCache, DocumentProber, ManifestCatalog, NativeEngine, PageCounter,
//!     PageService, PageSettings, RasterEngine, RouterConfig, TileService, TileSettings,
//!     create_router,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(ManifestCatalog::load("/etc/zoompan/assets.json").await?);
//!     let engine: Arc<dyn RasterEngine> = Arc::new(NativeEngine::default());
//!     let store = DiskCache::new("/var/cache/zoompan");
//!
//!     let counter = Arc::new(PageCounter::new(engine.clone(), 256, PageSettings::default().conversion_timeout));
//!     let tiles = Arc::new(TileService::new(engine.clone(), store.clone(), TileSettings::default()));
//!     let pages = Arc::new(PageService::new(engine, counter.clone(), store, PageSettings::default()));
//!     let prober = Arc::new(DocumentProber::new(counter));
//!
//!     let state = AppState::new(catalog.clone(), catalog, tiles, pages, prober);
//!     let router = create_router(state, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod cache;
pub mod config;
pub mod error;
pub mod info;
pub mod page;
pub mod raster;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use asset::{AccessPolicy, AllowAll, AssetCatalog, AssetId, ManifestCatalog, SourceAsset};
pub use cache::{page_path, tile_path, CacheKey, DiskCache, SingleFlight};
pub use config::Config;
pub use error::{CatalogError, TileError};
pub use info::{DocumentInfo, DocumentKind, DocumentProber, ViewerConfig};
pub use page::{PageCoordinate, PageCounter, PageResponse, PageService, PageSettings};
pub use raster::{EngineKind, MagickEngine, MagickPrograms, NativeEngine, RasterEngine};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use tile::{
    CropRegion, TileCoordinate, TileFormat, TileGrid, TileMapping, TileResponse, TileService,
    TileSettings,
};
