//! API integration tests for tiles, document info and error handling.
//!
//! Tests verify:
//! - Tile generation and caching through the HTTP surface
//! - Coordinate and format validation before any conversion
//! - Catalog and access-policy errors
//! - Document info and viewer configuration responses

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;

use zoompan::raster::NativeEngine;
use zoompan::tile::{CropRegion, TileGrid, TileMapping, TileSettings};

use super::test_utils::{
    counting_server, counting_server_with, is_valid_jpeg, is_valid_png, CountingEngine,
    TestServer, DOCUMENT_ASSET, DOCUMENT_PAGES, IMAGE_ASSET, MISSING_ASSET, RESTRICTED_ASSET,
};

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_generated_and_cached() {
    let (server, engine) = counting_server();

    let response = server.get("/tile/42/0/0/0.jpg").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert_eq!(response.header("x-cache-hit"), Some("false"));
    assert_eq!(response.header("cache-control"), Some("public, max-age=3600"));

    assert_eq!(
        engine.regions(),
        vec![CropRegion {
            x: 0,
            y: 0,
            width: 256,
            height: 256,
            output_size: 256,
        }]
    );
    assert_eq!(server.cached_files(), vec![PathBuf::from("42/0/0/0.jpg")]);

    let on_disk = std::fs::read(server.cache_root.join("42/0/0/0.jpg")).unwrap();
    assert_eq!(on_disk, response.body.to_vec());
}

#[tokio::test]
async fn test_real_engine_produces_tile_of_tile_size() {
    let server = TestServer::with_engine(Arc::new(NativeEngine::default()));

    let response = server.get("/tile/42/0/0/0.jpg").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(is_valid_jpeg(&response.body));

    let tile = image::load_from_memory(&response.body).unwrap();
    assert_eq!((tile.width(), tile.height()), (256, 256));

    let png = server.get("/tile/42/2/1/1.png").await;
    assert_eq!(png.status, StatusCode::OK);
    assert_eq!(png.header("content-type"), Some("image/png"));
    assert!(is_valid_png(&png.body));

    let tile = image::load_from_memory(&png.body).unwrap();
    assert_eq!((tile.width(), tile.height()), (256, 256));
}

#[tokio::test]
async fn test_tile_without_extension_defaults_to_jpg() {
    let (server, _engine) = counting_server();

    let response = server.get("/tile/42/1/2/3").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert!(server.cache_root.join("42/1/2/3.jpg").is_file());
}

#[tokio::test]
async fn test_unscaled_mapping_crop_rectangle() {
    let (server, engine) = counting_server();

    let response = server.get("/tile/42/2/1/3.jpg").await;
    assert_eq!(response.status, StatusCode::OK);

    // 256 >> 2 = 64 pixel crop at the unscaled origin (256, 768)
    assert_eq!(
        engine.regions(),
        vec![CropRegion {
            x: 256,
            y: 768,
            width: 64,
            height: 64,
            output_size: 256,
        }]
    );
}

#[tokio::test]
async fn test_pyramid_mapping_crop_rectangle() {
    let settings = TileSettings {
        grid: TileGrid {
            mapping: TileMapping::Pyramid,
            ..TileGrid::default()
        },
        ..TileSettings::default()
    };
    let (server, engine) = counting_server_with(CountingEngine::new(), settings);

    let response = server.get("/tile/42/2/1/3.jpg").await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(
        engine.regions(),
        vec![CropRegion {
            x: 64,
            y: 192,
            width: 64,
            height: 64,
            output_size: 256,
        }]
    );
}

#[tokio::test]
async fn test_edge_tile_clamped_to_source() {
    let (server, engine) = counting_server();

    // Origin 768, only 232 source pixels remain
    let response = server.get("/tile/42/0/3/3.jpg").await;
    assert_eq!(response.status, StatusCode::OK);

    let region = engine.regions()[0];
    assert_eq!((region.x, region.y), (768, 768));
    assert_eq!((region.width, region.height), (232, 232));
    assert_eq!(region.output_size, 256);
}

#[tokio::test]
async fn test_repeat_request_is_cache_hit() {
    let (server, engine) = counting_server();

    let first = server.get("/tile/42/0/1/1.png").await;
    let second = server.get("/tile/42/0/1/1.png").await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    assert_eq!(first.header("x-cache-hit"), Some("false"));
    assert_eq!(second.header("x-cache-hit"), Some("true"));
    assert_eq!(engine.crop_calls(), 1);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_unsupported_format_rejected() {
    let (server, engine) = counting_server();

    let response = server.get("/tile/42/0/0/0.gif").await;

    assert_eq!(response.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.error_code(), "unsupported_format");
    assert_eq!(engine.crop_calls(), 0);
    assert!(server.cached_files().is_empty());
}

#[tokio::test]
async fn test_zoom_above_maximum_rejected() {
    let (server, engine) = counting_server();

    let response = server.get("/tile/42/13/0/0.jpg").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "invalid_coordinate");
    assert_eq!(engine.crop_calls(), 0);
}

#[tokio::test]
async fn test_negative_and_malformed_coordinates_rejected() {
    let (server, engine) = counting_server();

    for uri in [
        "/tile/42/0/-1/0.jpg",
        "/tile/42/0/0/-1.jpg",
        "/tile/42/-1/0/0.jpg",
        "/tile/42/zero/0/0.jpg",
        "/tile/42/0/0/1.5.jpg",
    ] {
        let response = server.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response.error_code(), "invalid_coordinate", "{}", uri);
    }

    assert_eq!(engine.crop_calls(), 0);
    assert!(server.cached_files().is_empty());
}

#[tokio::test]
async fn test_tile_outside_source_rejected() {
    let (server, engine) = counting_server();

    // Origin 1024 is past the 1000px source
    let response = server.get("/tile/42/0/4/0.jpg").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "invalid_coordinate");
    assert_eq!(engine.crop_calls(), 0);
}

// =============================================================================
// Catalog and Access Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_asset_not_found() {
    let (server, _engine) = counting_server();

    for uri in ["/tile/1000/0/0/0.jpg", "/tile/abc/0/0/0.jpg", "/info/1000"] {
        let response = server.get(uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(response.error_code(), "not_found", "{}", uri);
    }
}

#[tokio::test]
async fn test_restricted_asset_forbidden() {
    let (server, engine) = counting_server();

    for uri in [
        format!("/tile/{}/0/0/0.jpg", RESTRICTED_ASSET),
        format!("/page/{}/1", RESTRICTED_ASSET),
        format!("/info/{}", RESTRICTED_ASSET),
        format!("/viewer/{}/config", RESTRICTED_ASSET),
    ] {
        let response = server.get(&uri).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(response.error_code(), "forbidden");
    }

    assert_eq!(engine.crop_calls(), 0);
}

#[tokio::test]
async fn test_deleted_source_is_unreadable() {
    let (server, engine) = counting_server();

    let response = server.get(&format!("/tile/{}/0/0/0.jpg", MISSING_ASSET)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "unreadable_asset");
    assert!(!response.json()["message"].as_str().unwrap().contains("gone.png"));
    assert_eq!(engine.crop_calls(), 0);
    assert!(server.cached_files().is_empty());
}

#[tokio::test]
async fn test_document_tile_rejected() {
    let (server, engine) = counting_server();

    let response = server.get(&format!("/tile/{}/0/0/0.jpg", DOCUMENT_ASSET)).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "not_tileable");
    assert_eq!(engine.crop_calls(), 0);
    assert!(server.cached_files().is_empty());
}

#[tokio::test]
async fn test_conversion_failure_maps_to_bad_gateway() {
    let (server, engine) = counting_server();
    engine.set_failing(true);

    let response = server.get("/tile/42/0/0/0.jpg").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.error_code(), "conversion_failed");
    assert_eq!(response.json()["status"], 502);
}

// =============================================================================
// Document Info
// =============================================================================

#[tokio::test]
async fn test_image_info() {
    let (server, _engine) = counting_server();

    let response = server.get(&format!("/info/{}", IMAGE_ASSET)).await;
    assert_eq!(response.status, StatusCode::OK);

    let info = response.json();
    assert_eq!(info["id"], 42);
    assert_eq!(info["name"], "map.jpg");
    assert_eq!(info["mimeType"], "image/jpeg");
    assert_eq!(info["width"], 1000);
    assert_eq!(info["height"], 1000);
    assert_eq!(info["type"], "image");
    assert!(info["fileSize"].as_u64().unwrap() > 0);
    assert!(info.get("pageCount").is_none());
}

#[tokio::test]
async fn test_document_info_has_page_count() {
    let (server, _engine) = counting_server();

    let response = server.get(&format!("/info/{}", DOCUMENT_ASSET)).await;
    assert_eq!(response.status, StatusCode::OK);

    let info = response.json();
    assert_eq!(info["type"], "pdf");
    assert_eq!(info["pageCount"], DOCUMENT_PAGES);
    assert!(info.get("width").is_none());
}

#[tokio::test]
async fn test_info_for_deleted_image_is_unreadable() {
    let (server, _engine) = counting_server();

    let response = server.get(&format!("/info/{}", MISSING_ASSET)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error_code(), "unreadable_asset");
}

// =============================================================================
// Viewer Configuration and Health
// =============================================================================

#[tokio::test]
async fn test_viewer_config() {
    let (server, _engine) = counting_server();

    let image = server.get("/viewer/42/config").await.json();
    assert_eq!(image["assetId"], 42);
    assert_eq!(image["viewerType"], "image");
    assert_eq!(image["tileSize"], 256);
    assert_eq!(image["maxZoom"], 12);
    assert_eq!(image["minZoom"], 0.5);
    assert_eq!(image["showNavigator"], true);

    let document = server.get("/viewer/7/config").await.json();
    assert_eq!(document["viewerType"], "pdf");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _engine) = counting_server();

    let response = server.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
