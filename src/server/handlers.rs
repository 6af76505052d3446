//! HTTP request handlers for the zoompan API.
//!
//! # Endpoints
//!
//! - `GET /tile/{asset_id}/{z}/{x}/{y}.{format}` - Serve a tile
//! - `GET /page/{asset_id}/{page}` - Serve a rasterized document page
//! - `GET /info/{asset_id}` - Document metadata
//! - `GET /viewer/{asset_id}/config` - Client viewer settings
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::asset::{AccessPolicy, AssetCatalog, AssetId, SourceAsset};
use crate::error::TileError;
use crate::info::{DocumentInfo, DocumentProber, ViewerConfig};
use crate::page::{PageCoordinate, PageService};
use crate::tile::{TileCoordinate, TileService};

/// Response header reporting whether the body came from the disk cache.
pub const CACHE_HIT_HEADER: HeaderName = HeaderName::from_static("x-cache-hit");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Resolves asset ids
    pub catalog: Arc<dyn AssetCatalog>,

    /// Read permission for resolved assets
    pub access: Arc<dyn AccessPolicy>,

    /// Tile cache manager
    pub tiles: Arc<TileService>,

    /// Page cache manager
    pub pages: Arc<PageService>,

    /// Document info prober
    pub prober: Arc<DocumentProber>,

    /// Cache-Control max-age in seconds for tiles and pages
    pub cache_max_age: u32,
}

impl AppState {
    /// Create application state with the default one hour max-age.
    pub fn new(
        catalog: Arc<dyn AssetCatalog>,
        access: Arc<dyn AccessPolicy>,
        tiles: Arc<TileService>,
        pages: Arc<PageService>,
        prober: Arc<DocumentProber>,
    ) -> Self {
        Self {
            catalog,
            access,
            tiles,
            pages,
            prober,
            cache_max_age: 3600,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Look up an asset by its raw path segment and check read access.
    async fn readable_asset(&self, raw_id: &str) -> Result<SourceAsset, TileError> {
        let id: AssetId = raw_id.parse().map_err(|_| TileError::AssetNotFound {
            asset_id: raw_id.to_string(),
        })?;

        let asset = self.catalog.get_asset(id).await?;
        if !self.access.can_read(&asset).await {
            return Err(TileError::PermissionDenied { asset_id: id });
        }
        Ok(asset)
    }

    fn image_response(&self, content_type: &str, cache_hit: bool, data: Bytes) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CACHE_CONTROL,
                    format!("public, max-age={}", self.cache_max_age),
                ),
                (CACHE_HIT_HEADER, cache_hit.to_string()),
            ],
            Body::from(data),
        )
            .into_response()
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tile/{asset_id}/{z}/{x}/{filename}`
/// where filename is `{y}` or `{y}.{format}`
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub asset_id: String,
    pub z: String,
    pub x: String,
    pub filename: String,
}

/// Path parameters for page requests.
#[derive(Debug, Deserialize)]
pub struct PagePathParams {
    pub asset_id: String,
    pub page: String,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_coordinate")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

impl TileError {
    /// HTTP status and machine-readable error code.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            TileError::AssetNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TileError::PageOutOfRange { .. } => (StatusCode::NOT_FOUND, "page_out_of_range"),
            TileError::NotPaginated { .. } => (StatusCode::NOT_FOUND, "not_paginated"),
            TileError::NotTileable { .. } => (StatusCode::NOT_FOUND, "not_tileable"),
            TileError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "forbidden"),
            TileError::InvalidCoordinate { .. } => (StatusCode::BAD_REQUEST, "invalid_coordinate"),
            TileError::UnsupportedFormat { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
            }
            TileError::UnreadableAsset { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unreadable_asset")
            }
            TileError::Cache { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error"),
            TileError::ConversionFailure { .. } => (StatusCode::BAD_GATEWAY, "conversion_failed"),
        }
    }

    /// Message safe to show to clients (no server filesystem paths).
    fn public_message(&self) -> String {
        match self {
            TileError::UnreadableAsset { .. } => "Source asset is missing or unreadable".to_string(),
            TileError::Cache { .. } => "Tile cache is unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convert TileError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404 at DEBUG level (common and expected)
/// - other 4xx at WARN level
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        let error_response = ErrorResponse::with_status(error_type, self.public_message(), status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tile/{asset_id}/{z}/{x}/{y}.{format}` (`format` is `jpg` or `png`;
/// a bare `{y}` means jpg)
///
/// # Response
///
/// `200 OK` with the image body, `Cache-Control` and `X-Cache-Hit` headers.
///
/// # Errors
///
/// - `400 Bad Request`: malformed or out-of-range coordinate
/// - `403 Forbidden`: access policy refused the asset
/// - `404 Not Found`: unknown asset
/// - `415 Unsupported Media Type`: format other than jpg/png
/// - `500`/`502`: unreadable source, cache or conversion failure
pub async fn tile_handler(
    State(state): State<AppState>,
    Path(params): Path<TilePathParams>,
) -> Result<Response, TileError> {
    let asset = state.readable_asset(&params.asset_id).await?;
    let coord = TileCoordinate::parse(asset.id, &params.z, &params.x, &params.filename)?;

    let response = state.tiles.get_tile(&asset, coord).await?;

    Ok(state.image_response(
        response.format.content_type(),
        response.cache_hit,
        response.data,
    ))
}

/// Handle page requests.
///
/// # Endpoint
///
/// `GET /page/{asset_id}/{page}` (1-based page number)
///
/// # Errors
///
/// - `400 Bad Request`: page is not a positive integer
/// - `404 Not Found`: unknown asset, not a paginated document, or page past
///   the end of the document
pub async fn page_handler(
    State(state): State<AppState>,
    Path(params): Path<PagePathParams>,
) -> Result<Response, TileError> {
    let asset = state.readable_asset(&params.asset_id).await?;
    let coord = PageCoordinate::parse(asset.id, &params.page)?;

    let response = state.pages.get_page(&asset, coord).await?;

    Ok(state.image_response("image/jpeg", response.cache_hit, response.data))
}

/// Handle document info requests.
///
/// # Endpoint
///
/// `GET /info/{asset_id}`
///
/// # Response
///
/// ```json
/// {"id": 42, "name": "map.jpg", "mimeType": "image/jpeg", "fileSize": 52133,
///  "width": 1000, "height": 1000, "type": "image"}
/// ```
pub async fn info_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<Json<DocumentInfo>, TileError> {
    let asset = state.readable_asset(&asset_id).await?;
    let info = state.prober.probe(&asset).await?;
    Ok(Json(info))
}

/// Handle viewer configuration requests.
///
/// # Endpoint
///
/// `GET /viewer/{asset_id}/config`
pub async fn viewer_config_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> Result<Json<ViewerConfig>, TileError> {
    let asset = state.readable_asset(&asset_id).await?;
    Ok(Json(ViewerConfig::for_asset(
        &asset,
        &state.tiles.settings().grid,
    )))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
