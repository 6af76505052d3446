//! Tile pyramid generation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileGrid    │  │  DiskCache +    │  │
//! │  │  (z/x/y →    │  │  SingleFlight   │  │
//! │  │   crop)      │  │                 │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             RasterEngine                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCoordinate`]: request identity, also the cache key
//! - [`TileGrid`]: validation and the coordinate → crop mapping
//! - [`TileService`]: serve from cache or generate once and publish
//!
//! # Example
//!
//! ```
//! use zoompan::asset::AssetId;
//! use zoompan::tile::{TileCoordinate, TileFormat, TileGrid};
//!
//! let grid = TileGrid::default();
//! let coord = TileCoordinate::new(AssetId::new(42), 0, 0, 0, TileFormat::Jpg);
//!
//! let region = grid.map(&coord, 1000, 1000).unwrap();
//! assert_eq!((region.width, region.height, region.output_size), (256, 256, 256));
//! ```

mod coord;
mod service;

pub use coord::{
    CropRegion, TileCoordinate, TileFormat, TileGrid, TileMapping, DEFAULT_MAX_ZOOM,
    DEFAULT_TILE_SIZE, ZOOM_LIMIT,
};
pub use service::{TileResponse, TileService, TileSettings, DEFAULT_TILE_QUALITY};
