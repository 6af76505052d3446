//! Document info prober.
//!
//! Images are measured from their headers without a full decode. Page counts
//! for documents come from the shared [`PageCounter`], and a count that
//! cannot be determined is left out of the response instead of failing it.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::asset::SourceAsset;
use crate::error::TileError;
use crate::page::PageCounter;
use crate::raster::probe_dimensions;

use super::{DocumentInfo, DocumentKind};

/// Derives [`DocumentInfo`] from an asset and its source file.
pub struct DocumentProber {
    pages: Arc<PageCounter>,
}

impl DocumentProber {
    pub fn new(pages: Arc<PageCounter>) -> Self {
        Self { pages }
    }

    /// Probe one asset.
    ///
    /// Images get header-only dimensions and fail with `UnreadableAsset` when
    /// the file is missing or not decodable. Paginated documents get a page
    /// count, reported absent when it cannot be determined.
    pub async fn probe(&self, asset: &SourceAsset) -> Result<DocumentInfo, TileError> {
        let kind = DocumentKind::classify(&asset.mime_type);

        let (width, height) = match kind {
            DocumentKind::Image => {
                let (w, h) = probe_dimensions(&asset.path).await?;
                (Some(w), Some(h))
            }
            _ => (asset.width, asset.height),
        };

        let page_count = if kind.is_paginated() {
            match self.pages.page_count(asset).await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(asset_id = %asset.id, error = %e, "Page count unavailable");
                    None
                }
            }
        } else {
            None
        };

        let file_size = match asset.byte_size {
            Some(size) => size,
            None => tokio::fs::metadata(&asset.path)
                .await
                .map_err(|e| TileError::UnreadableAsset {
                    path: asset.path.clone(),
                    message: e.to_string(),
                })?
                .len(),
        };

        debug!(asset_id = %asset.id, kind = kind.as_str(), "Probed document");

        Ok(DocumentInfo {
            id: asset.id,
            name: asset.name.clone(),
            mime_type: asset.mime_type.clone(),
            file_size,
            width,
            height,
            page_count,
            kind,
        })
    }
}
