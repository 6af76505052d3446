//! Memoized page counts.
//!
//! Counting pages can mean parsing the whole document, so results are kept in
//! an LRU keyed by asset id. Each entry remembers the file's length and
//! modification time; a replaced source file is counted again.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::asset::{AssetId, SourceAsset};
use crate::error::TileError;
use crate::raster::{with_timeout, RasterEngine};

/// Default number of memoized page counts.
pub const DEFAULT_PAGE_COUNT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    async fn of(path: &Path) -> Result<Self, TileError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| TileError::UnreadableAsset {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct CountEntry {
    fingerprint: Fingerprint,
    count: u32,
}

/// Page-count probe with an LRU memo in front of the raster engine.
pub struct PageCounter {
    engine: Arc<dyn RasterEngine>,
    counts: Mutex<LruCache<AssetId, CountEntry>>,
    timeout: Duration,
}

impl PageCounter {
    /// Create a counter remembering up to `capacity` documents (minimum 1).
    pub fn new(engine: Arc<dyn RasterEngine>, capacity: usize, timeout: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            engine,
            counts: Mutex::new(LruCache::new(capacity)),
            timeout,
        }
    }

    /// Page count of `asset`, probing the engine on a miss or a changed file.
    pub async fn page_count(&self, asset: &SourceAsset) -> Result<u32, TileError> {
        let fingerprint = Fingerprint::of(&asset.path).await?;

        {
            let mut counts = self.counts.lock().await;
            if let Some(entry) = counts.get(&asset.id) {
                if entry.fingerprint == fingerprint {
                    return Ok(entry.count);
                }
                debug!(asset_id = %asset.id, "Source changed, recounting pages");
            }
        }

        let count = with_timeout(
            self.timeout,
            "page count",
            self.engine.page_count(&asset.path),
        )
        .await?;

        debug!(asset_id = %asset.id, page_count = count, "Counted pages");
        self.counts
            .lock()
            .await
            .put(asset.id, CountEntry { fingerprint, count });

        Ok(count)
    }

    #[cfg(test)]
    async fn cached_count(&self) -> usize {
        self.counts.lock().await.len()
    }
}
