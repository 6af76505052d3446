//! Router configuration for zoompan.
//!
//! # Route Structure
//!
//! ```text
//! /health                                    - Health check
//! /tile/{asset_id}/{z}/{x}/{y}.{format}      - Tile endpoint
//! /page/{asset_id}/{page}                    - Document page endpoint
//! /info/{asset_id}                           - Document metadata
//! /viewer/{asset_id}/config                  - Viewer configuration
//! ```
//!
//! Authorization is delegated to the [`AccessPolicy`](crate::asset::AccessPolicy)
//! held in [`AppState`]; the router itself adds only CORS and tracing.
//!
//! # Example
//!
//! ```ignore
//! use zoompan::server::{create_router, AppState, RouterConfig};
//!
//! let state = AppState::new(catalog, access, tiles, pages, prober);
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(state, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, info_handler, page_handler, tile_handler, viewer_config_handler, AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router(state: AppState, config: RouterConfig) -> Router {
    let state = state.with_cache_max_age(config.cache_max_age);
    let cors = build_cors_layer(&config);

    // {filename} captures both "{y}" and "{y}.{format}"
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/tile/{asset_id}/{z}/{x}/{filename}", get(tile_handler))
        .route("/page/{asset_id}/{page}", get(page_handler))
        .route("/info/{asset_id}", get(info_handler))
        .route("/viewer/{asset_id}/config", get(viewer_config_handler))
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}
