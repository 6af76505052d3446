//! Test utilities for integration tests.
//!
//! Builds a complete router over a temporary asset directory and cache root.
//! Source images are real files written with the `image` crate; conversions
//! go through [`CountingEngine`] so tests can assert how often the raster
//! engine was invoked.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use zoompan::asset::{AssetId, ManifestCatalog, SourceAsset};
use zoompan::cache::{DiskCache, TEMP_SUFFIX};
use zoompan::error::TileError;
use zoompan::info::DocumentProber;
use zoompan::page::{PageCounter, PageService, PageSettings};
use zoompan::raster::RasterEngine;
use zoompan::server::{create_router, AppState, RouterConfig};
use zoompan::tile::{CropRegion, TileFormat, TileService, TileSettings};

/// 1000×1000 JPEG image.
pub const IMAGE_ASSET: u64 = 42;

/// Five-page PDF document.
pub const DOCUMENT_ASSET: u64 = 7;

/// Registered image whose source file has been deleted.
pub const MISSING_ASSET: u64 = 99;

/// Image the access policy refuses.
pub const RESTRICTED_ASSET: u64 = 13;

/// Page count reported by [`CountingEngine`].
pub const DOCUMENT_PAGES: u32 = 5;

// =============================================================================
// Counting Raster Engine
// =============================================================================

/// Raster engine that records its calls and returns deterministic bytes.
pub struct CountingEngine {
    crops: AtomicUsize,
    renders: AtomicUsize,
    delay: Duration,
    failing: AtomicBool,
    regions: Mutex<Vec<CropRegion>>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every conversion sleeps for `delay` before returning.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            crops: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            delay,
            failing: AtomicBool::new(false),
            regions: Mutex::new(Vec::new()),
        }
    }

    pub fn crop_calls(&self) -> usize {
        self.crops.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Make subsequent conversions fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Crop regions requested so far, in call order.
    pub fn regions(&self) -> Vec<CropRegion> {
        self.regions.lock().unwrap().clone()
    }

    async fn convert(&self) -> Result<(), TileError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TileError::ConversionFailure {
                message: "convert exited with status 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CountingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterEngine for CountingEngine {
    async fn crop_resize(
        &self,
        _source: &Path,
        region: CropRegion,
        format: TileFormat,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        self.crops.fetch_add(1, Ordering::SeqCst);
        self.regions.lock().unwrap().push(region);
        self.convert().await?;

        Ok(Bytes::from(format!(
            "{} {}x{}+{}+{} -> {} q{}",
            format, region.width, region.height, region.x, region.y, region.output_size, quality
        )))
    }

    async fn rasterize_page(
        &self,
        _source: &Path,
        page_index: u32,
        dpi: u32,
        _quality: u8,
    ) -> Result<Bytes, TileError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.convert().await?;

        Ok(Bytes::from(format!("page {} at {} dpi", page_index + 1, dpi)))
    }

    async fn page_count(&self, _source: &Path) -> Result<u32, TileError> {
        Ok(DOCUMENT_PAGES)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Write a solid-colour RGB image; the encoder follows the file extension.
pub fn write_image(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
        .save(path)
        .unwrap();
}

/// Router plus the temporary directories and engine behind it.
pub struct TestServer {
    pub router: Router,
    pub engine: Arc<dyn RasterEngine>,
    pub cache_root: PathBuf,
    _dir: TempDir,
}

impl TestServer {
    /// Default settings over [`CountingEngine`].
    pub fn with_engine(engine: Arc<dyn RasterEngine>) -> Self {
        Self::build(engine, TileSettings::default())
    }

    pub fn build(engine: Arc<dyn RasterEngine>, tile_settings: TileSettings) -> Self {
        Self::build_with_pages(engine, tile_settings, PageSettings::default())
    }

    pub fn build_with_pages(
        engine: Arc<dyn RasterEngine>,
        tile_settings: TileSettings,
        page_settings: PageSettings,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let cache_root = dir.path().join("cache");

        let image_path = dir.path().join("map.jpg");
        write_image(&image_path, 1000, 1000);

        let document_path = dir.path().join("report.pdf");
        std::fs::write(&document_path, b"%PDF-1.4\n%%EOF\n").unwrap();

        let missing_path = dir.path().join("gone.png");
        write_image(&missing_path, 64, 64);
        std::fs::remove_file(&missing_path).unwrap();

        let restricted_path = dir.path().join("private.png");
        write_image(&restricted_path, 64, 64);

        let mut catalog = ManifestCatalog::default();
        catalog.insert(SourceAsset::new(
            AssetId::new(IMAGE_ASSET),
            "map.jpg",
            image_path,
            "image/jpeg",
        ));
        catalog.insert(SourceAsset::new(
            AssetId::new(DOCUMENT_ASSET),
            "report.pdf",
            document_path,
            "application/pdf",
        ));
        catalog.insert(SourceAsset::new(
            AssetId::new(MISSING_ASSET),
            "gone.png",
            missing_path,
            "image/png",
        ));
        catalog.insert_restricted(SourceAsset::new(
            AssetId::new(RESTRICTED_ASSET),
            "private.png",
            restricted_path,
            "image/png",
        ));
        let catalog = Arc::new(catalog);

        let store = DiskCache::new(&cache_root);
        let counter = Arc::new(PageCounter::new(
            Arc::clone(&engine),
            16,
            page_settings.conversion_timeout,
        ));

        let tiles = Arc::new(TileService::new(
            Arc::clone(&engine),
            store.clone(),
            tile_settings,
        ));
        let pages = Arc::new(PageService::new(
            Arc::clone(&engine),
            Arc::clone(&counter),
            store,
            page_settings,
        ));
        let prober = Arc::new(DocumentProber::new(counter));

        let state = AppState::new(catalog.clone(), catalog, tiles, pages, prober);
        let router = create_router(state, RouterConfig::new().with_tracing(false));

        Self {
            router,
            engine,
            cache_root,
            _dir: dir,
        }
    }

    /// Issue a GET and collect the whole response.
    pub async fn get(&self, uri: &str) -> TestResponse {
        send(self.router.clone(), uri).await
    }

    /// Every file currently under the cache root, relative to it.
    pub fn cached_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.cache_root, &self.cache_root, &mut files);
        files.sort();
        files
    }
}

/// Router over a fresh [`CountingEngine`], returned alongside it.
pub fn counting_server() -> (TestServer, Arc<CountingEngine>) {
    counting_server_with(CountingEngine::new(), TileSettings::default())
}

pub fn counting_server_with(
    engine: CountingEngine,
    settings: TileSettings,
) -> (TestServer, Arc<CountingEngine>) {
    let engine = Arc::new(engine);
    let server = TestServer::build(engine.clone(), settings);
    (server, engine)
}

/// Like [`counting_server_with`], but with custom page settings.
pub fn counting_server_with_pages(
    engine: CountingEngine,
    page_settings: PageSettings,
) -> (TestServer, Arc<CountingEngine>) {
    let engine = Arc::new(engine);
    let server = TestServer::build_with_pages(engine.clone(), TileSettings::default(), page_settings);
    (server, engine)
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else {
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
        }
    }
}

/// True if a path looks like an unpublished temporary file.
pub fn is_temp_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TEMP_SUFFIX)
}

// =============================================================================
// HTTP Helpers
// =============================================================================

/// Collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// The `error` code of a JSON error body.
    pub fn error_code(&self) -> String {
        self.json()["error"].as_str().unwrap_or_default().to_string()
    }
}

pub async fn send(router: Router, uri: &str) -> TestResponse {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Check if data looks like a valid JPEG (SOI at start, EOI at end).
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}

/// Check if data starts with the PNG signature.
pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'])
}
