//! Configuration management for zoompan.
//!
//! Settings come from command-line arguments with `ZOOMPAN_` environment
//! fallbacks. Nothing reads this struct at runtime: the binary converts it into
//! the explicit settings each component takes.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use zoompan::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! let tiles = config.tile_settings();
//! ```
//!
//! # Environment Variables
//!
//! - `ZOOMPAN_HOST` - Server bind address (default: 0.0.0.0)
//! - `ZOOMPAN_PORT` - Server port (default: 3000)
//! - `ZOOMPAN_CACHE_DIR` - Root of the generated tile/page cache (required)
//! - `ZOOMPAN_ASSETS` - JSON asset manifest (required)
//! - `ZOOMPAN_TILE_SIZE` - Tile edge in pixels (default: 256)
//! - `ZOOMPAN_MAX_ZOOM` - Highest accepted zoom level (default: 12)
//! - `ZOOMPAN_TILE_MAPPING` - `unscaled` or `pyramid` (default: unscaled)
//! - `ZOOMPAN_ENGINE` - `native` or `magick` (default: native)
//! - `ZOOMPAN_CONVERSION_TIMEOUT` - Seconds per conversion (default: 30)
//! - `ZOOMPAN_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::page::{
    PageSettings, DEFAULT_PAGE_COUNT_CAPACITY, DEFAULT_PAGE_DPI, DEFAULT_PAGE_QUALITY,
};
use crate::raster::{EngineKind, MagickPrograms};
use crate::tile::{
    TileGrid, TileMapping, TileSettings, DEFAULT_MAX_ZOOM, DEFAULT_TILE_QUALITY, DEFAULT_TILE_SIZE,
    ZOOM_LIMIT,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bound on a single conversion, in seconds.
pub const DEFAULT_CONVERSION_TIMEOUT_SECS: u64 = 30;

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Accepted tile sizes.
pub const TILE_SIZE_RANGE: std::ops::RangeInclusive<u32> = 16..=4096;

/// Accepted page densities.
pub const DPI_RANGE: std::ops::RangeInclusive<u32> = 1..=1200;

// =============================================================================
// CLI Arguments
// =============================================================================

/// zoompan - deep-zoom tiles and document pages from local source files.
///
/// Tiles and pages are generated on first request and served from a disk
/// cache afterwards.
#[derive(Parser, Debug, Clone)]
#[command(name = "zoompan")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ZOOMPAN_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ZOOMPAN_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory holding generated tiles and pages.
    #[arg(long, env = "ZOOMPAN_CACHE_DIR")]
    pub cache_dir: PathBuf,

    /// JSON manifest describing the source assets.
    #[arg(long, env = "ZOOMPAN_ASSETS")]
    pub assets: PathBuf,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Edge length of every tile in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "ZOOMPAN_TILE_SIZE")]
    pub tile_size: u32,

    /// Highest zoom level accepted.
    #[arg(long, default_value_t = DEFAULT_MAX_ZOOM, env = "ZOOMPAN_MAX_ZOOM")]
    pub max_zoom: u8,

    /// How tile columns and rows map onto source pixels.
    ///
    /// Changing this invalidates every cached tile; clear the cache directory.
    #[arg(long, value_enum, default_value_t = TileMapping::Unscaled, env = "ZOOMPAN_TILE_MAPPING")]
    pub tile_mapping: TileMapping,

    /// JPEG quality for tiles (1-100).
    #[arg(long, default_value_t = DEFAULT_TILE_QUALITY, env = "ZOOMPAN_TILE_QUALITY")]
    pub tile_quality: u8,

    // =========================================================================
    // Page Configuration
    // =========================================================================
    /// Rasterization density for document pages.
    #[arg(long, default_value_t = DEFAULT_PAGE_DPI, env = "ZOOMPAN_PAGE_DPI")]
    pub page_dpi: u32,

    /// JPEG quality for document pages (1-100).
    #[arg(long, default_value_t = DEFAULT_PAGE_QUALITY, env = "ZOOMPAN_PAGE_QUALITY")]
    pub page_quality: u8,

    /// Number of memoized document page counts.
    #[arg(long, default_value_t = DEFAULT_PAGE_COUNT_CAPACITY, env = "ZOOMPAN_PAGE_COUNT_CACHE")]
    pub page_count_cache: usize,

    // =========================================================================
    // Conversion Configuration
    // =========================================================================
    /// Raster engine used for tiles.
    #[arg(long, value_enum, default_value_t = EngineKind::Native, env = "ZOOMPAN_ENGINE")]
    pub engine: EngineKind,

    /// ImageMagick `convert` executable.
    #[arg(long, default_value = "convert", env = "ZOOMPAN_CONVERT_PROGRAM")]
    pub convert_program: PathBuf,

    /// ImageMagick `identify` executable.
    #[arg(long, default_value = "identify", env = "ZOOMPAN_IDENTIFY_PROGRAM")]
    pub identify_program: PathBuf,

    /// Seconds a single conversion may run before it is killed.
    #[arg(long, default_value_t = DEFAULT_CONVERSION_TIMEOUT_SECS, env = "ZOOMPAN_CONVERSION_TIMEOUT")]
    pub conversion_timeout: u64,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "ZOOMPAN_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ZOOMPAN_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !TILE_SIZE_RANGE.contains(&self.tile_size) {
            return Err(format!(
                "tile_size must be between {} and {}",
                TILE_SIZE_RANGE.start(),
                TILE_SIZE_RANGE.end()
            ));
        }

        if self.max_zoom > ZOOM_LIMIT {
            return Err(format!("max_zoom must be at most {}", ZOOM_LIMIT));
        }

        if !(1..=100).contains(&self.tile_quality) {
            return Err("tile_quality must be between 1 and 100".to_string());
        }
        if !(1..=100).contains(&self.page_quality) {
            return Err("page_quality must be between 1 and 100".to_string());
        }

        if !DPI_RANGE.contains(&self.page_dpi) {
            return Err(format!(
                "page_dpi must be between {} and {}",
                DPI_RANGE.start(),
                DPI_RANGE.end()
            ));
        }

        if self.conversion_timeout == 0 {
            return Err("conversion_timeout must be greater than 0".to_string());
        }
        if self.page_count_cache == 0 {
            return Err("page_count_cache must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout)
    }

    pub fn tile_settings(&self) -> TileSettings {
        TileSettings {
            grid: TileGrid {
                tile_size: self.tile_size,
                max_zoom: self.max_zoom,
                mapping: self.tile_mapping,
            },
            quality: self.tile_quality,
            conversion_timeout: self.conversion_timeout(),
        }
    }

    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            dpi: self.page_dpi,
            quality: self.page_quality,
            conversion_timeout: self.conversion_timeout(),
        }
    }

    pub fn magick_programs(&self) -> MagickPrograms {
        MagickPrograms {
            convert: self.convert_program.clone(),
            identify: self.identify_program.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
