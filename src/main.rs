//! zoompan - deep-zoom tile and document page server.
//!
//! This binary wires the configured components together and starts the HTTP server.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zoompan::{
    asset::ManifestCatalog,
    cache::DiskCache,
    config::Config,
    info::DocumentProber,
    page::{PageCounter, PageService},
    raster::{EngineKind, MagickEngine, NativeEngine, RasterEngine},
    server::{create_router, AppState, RouterConfig},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), String> {
    let catalog = ManifestCatalog::load(&config.assets)
        .await
        .map_err(|e| format!("Failed to load asset manifest: {}", e))?;
    if catalog.is_empty() {
        warn!("Asset manifest {} lists no assets", config.assets.display());
    }
    let catalog = Arc::new(catalog);

    tokio::fs::create_dir_all(&config.cache_dir)
        .await
        .map_err(|e| {
            format!(
                "Failed to create cache directory {}: {}",
                config.cache_dir.display(),
                e
            )
        })?;

    let programs = config.magick_programs();
    let engine: Arc<dyn RasterEngine> = match config.engine {
        EngineKind::Native => Arc::new(NativeEngine::new(MagickEngine::new(programs))),
        EngineKind::Magick => Arc::new(MagickEngine::new(programs)),
    };

    let store = DiskCache::new(&config.cache_dir);
    match store.sweep_temp_files().await {
        Ok(0) => {}
        Ok(removed) => info!(
            "Removed {} unfinished cache writes from {}",
            removed,
            store.root().display()
        ),
        Err(e) => warn!(
            "Failed to sweep unfinished cache writes from {}: {}",
            store.root().display(),
            e
        ),
    }
    let counter = Arc::new(PageCounter::new(
        Arc::clone(&engine),
        config.page_count_cache,
        config.conversion_timeout(),
    ));

    let tiles = Arc::new(TileService::new(
        Arc::clone(&engine),
        store.clone(),
        config.tile_settings(),
    ));
    let pages = Arc::new(PageService::new(
        Arc::clone(&engine),
        Arc::clone(&counter),
        store,
        config.page_settings(),
    ));
    let prober = Arc::new(DocumentProber::new(counter));

    // The manifest's `restricted` flags double as the access policy
    let state = AppState::new(catalog.clone(), catalog.clone(), tiles, pages, prober);

    info!("Configuration:");
    info!("  Assets: {} ({} entries)", config.assets.display(), catalog.len());
    info!("  Cache directory: {}", config.cache_dir.display());
    info!(
        "  Tiles: {}px, max zoom {}, {:?} mapping, quality {}",
        config.tile_size, config.max_zoom, config.tile_mapping, config.tile_quality
    );
    info!(
        "  Pages: {} dpi, quality {}",
        config.page_dpi, config.page_quality
    );
    info!(
        "  Engine: {:?}, conversion timeout {}s",
        config.engine, config.conversion_timeout
    );

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "zoompan=debug,tower_http=debug"
    } else {
        "zoompan=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_router_config(config: &Config) -> RouterConfig {
    let router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    match config.cors_origins {
        Some(ref origins) => router_config.with_cors_origins(origins.clone()),
        None => router_config,
    }
}
