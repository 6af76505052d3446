//! HTTP server layer for zoompan.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /tile/..  GET /page/..  GET /info/..  GET /viewer/..      │
//! │                                                                 │
//! │  ┌───────────────────────────┐  ┌─────────────────────────────┐ │
//! │  │        handlers           │  │          routes             │ │
//! │  │ (catalog, access, errors) │  │  (router, CORS, tracing)    │ │
//! │  └───────────────────────────┘  └─────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, info_handler, page_handler, tile_handler, viewer_config_handler, AppState,
    ErrorResponse, HealthResponse, PagePathParams, TilePathParams, CACHE_HIT_HEADER,
};
pub use routes::{create_router, RouterConfig};
