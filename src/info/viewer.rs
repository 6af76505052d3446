//! Client viewer configuration served at `/viewer/{asset}/config`.

use serde::Serialize;

use crate::asset::{AssetId, SourceAsset};
use crate::tile::TileGrid;

use super::DocumentKind;

/// Smallest zoom factor offered to viewers.
pub const DEFAULT_MIN_ZOOM: f32 = 0.5;

/// Client-side viewer settings for one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    pub asset_id: AssetId,
    pub viewer_type: DocumentKind,
    pub tile_size: u32,
    pub max_zoom: u8,
    pub min_zoom: f32,
    pub enable_rotation: bool,
    pub enable_fullscreen: bool,
    pub enable_download: bool,
    pub show_navigator: bool,
}

impl ViewerConfig {
    /// Viewer settings matching the server's tile grid.
    ///
    /// Assets of unknown type open in the image viewer.
    pub fn for_asset(asset: &SourceAsset, grid: &TileGrid) -> Self {
        let viewer_type = match DocumentKind::classify(&asset.mime_type) {
            DocumentKind::Unknown => DocumentKind::Image,
            kind => kind,
        };

        Self {
            asset_id: asset.id,
            viewer_type,
            tile_size: grid.tile_size,
            max_zoom: grid.max_zoom,
            min_zoom: DEFAULT_MIN_ZOOM,
            enable_rotation: true,
            enable_fullscreen: true,
            enable_download: true,
            show_navigator: true,
        }
    }
}
