//! Tile coordinates and the coordinate mapper.
//!
//! A tile at `(z, x, y)` is produced by cropping a square region out of the
//! source image and resizing it to `tile_size × tile_size`:
//!
//! ```text
//! scale  = 2^z
//! crop   = max(1, tile_size / scale)          (integer division)
//! origin = (x · tile_size, y · tile_size)     TileMapping::Unscaled
//! origin = (x · tile_size / scale, ...)       TileMapping::Pyramid
//! ```
//!
//! The crop is clamped to the source bounds; a tile whose origin falls
//! outside the source is rejected rather than rendered from an empty crop.

use std::fmt;
use std::str::FromStr;

use crate::asset::AssetId;
use crate::error::TileError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default maximum zoom level.
pub const DEFAULT_MAX_ZOOM: u8 = 12;

/// Highest zoom level any configuration may allow (keeps `2^z` in range).
pub const ZOOM_LIMIT: u8 = 30;

// =============================================================================
// Tile Format
// =============================================================================

/// Output encoding of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Jpg,
    Png,
}

impl TileFormat {
    /// File extension used in URLs and cache paths.
    pub fn extension(self) -> &'static str {
        match self {
            TileFormat::Jpg => "jpg",
            TileFormat::Png => "png",
        }
    }

    /// Registered MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            TileFormat::Jpg => "image/jpeg",
            TileFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TileFormat {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(TileFormat::Jpg),
            "png" => Ok(TileFormat::Png),
            other => Err(TileError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Tile Coordinate
// =============================================================================

/// Identity of one tile; equality and hashing define cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinate {
    pub asset_id: AssetId,
    pub zoom: u8,
    pub column: u32,
    pub row: u32,
    pub format: TileFormat,
}

impl TileCoordinate {
    pub fn new(asset_id: AssetId, zoom: u8, column: u32, row: u32, format: TileFormat) -> Self {
        Self {
            asset_id,
            zoom,
            column,
            row,
            format,
        }
    }

    /// Parse the raw path segments of a tile request.
    ///
    /// `filename` is `{row}.{format}` or a bare `{row}` (format defaults to jpg).
    /// Negative or non-numeric components yield `InvalidCoordinate`; an
    /// extension other than jpg/png yields `UnsupportedFormat`.
    pub fn parse(
        asset_id: AssetId,
        zoom: &str,
        column: &str,
        filename: &str,
    ) -> Result<Self, TileError> {
        let (row, format) = match filename.rsplit_once('.') {
            Some((row, ext)) => (row, ext.parse::<TileFormat>()?),
            None => (filename, TileFormat::Jpg),
        };

        let zoom = parse_component("zoom level", zoom)?;
        let zoom = u8::try_from(zoom)
            .map_err(|_| TileError::invalid(format!("zoom level {} is too large", zoom)))?;

        Ok(Self {
            asset_id,
            zoom,
            column: parse_component("column", column)?,
            row: parse_component("row", row)?,
            format,
        })
    }
}

fn parse_component(name: &str, value: &str) -> Result<u32, TileError> {
    value.parse::<u32>().map_err(|_| {
        TileError::invalid(format!(
            "{} must be a non-negative integer, got {:?}",
            name, value
        ))
    })
}

// =============================================================================
// Mapping
// =============================================================================

/// How a tile's column/row translate into a source-pixel origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TileMapping {
    /// Origin is `x · tile_size` at every zoom level.
    #[default]
    Unscaled,

    /// Origin is `x · tile_size / 2^z`, a seamless power-of-two pyramid.
    Pyramid,
}

/// Source-space crop rectangle plus the fixed output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Output is always `output_size × output_size`
    pub output_size: u32,
}

/// Tile grid parameters shared by validation and mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub tile_size: u32,
    pub max_zoom: u8,
    pub mapping: TileMapping,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: DEFAULT_MAX_ZOOM,
            mapping: TileMapping::default(),
        }
    }
}

impl TileGrid {
    /// Reject zoom levels above the configured maximum.
    pub fn validate(&self, coord: &TileCoordinate) -> Result<(), TileError> {
        if coord.zoom > self.max_zoom {
            return Err(TileError::invalid(format!(
                "zoom level {} exceeds maximum {}",
                coord.zoom, self.max_zoom
            )));
        }
        Ok(())
    }

    /// Map a tile coordinate to a crop of a `source_width × source_height` image.
    pub fn map(
        &self,
        coord: &TileCoordinate,
        source_width: u32,
        source_height: u32,
    ) -> Result<CropRegion, TileError> {
        self.validate(coord)?;

        let tile = u64::from(self.tile_size);
        let zoom = u32::from(coord.zoom);
        let crop = tile.checked_shr(zoom).unwrap_or(0).max(1);

        let origin = |index: u32| match self.mapping {
            TileMapping::Unscaled => u64::from(index) * tile,
            TileMapping::Pyramid => (u64::from(index) * tile)
                .checked_shr(zoom)
                .unwrap_or(0),
        };
        let origin_x = origin(coord.column);
        let origin_y = origin(coord.row);

        if origin_x >= u64::from(source_width) || origin_y >= u64::from(source_height) {
            return Err(TileError::invalid(format!(
                "tile {}/{}/{} lies outside the {}x{} source",
                coord.zoom, coord.column, coord.row, source_width, source_height
            )));
        }

        // Both origins are below u32 bounds here, so the narrowing is lossless.
        let width = crop.min(u64::from(source_width) - origin_x);
        let height = crop.min(u64::from(source_height) - origin_y);

        Ok(CropRegion {
            x: origin_x as u32,
            y: origin_y as u32,
            width: width as u32,
            height: height as u32,
            output_size: self.tile_size,
        })
    }
}
