//! Filesystem cache for generated tiles and pages.
//!
//! The cache is a plain directory tree. Entries carry no state beyond their
//! existence, so three small pieces are enough:
//!
//! - [`path`]: deterministic key → relative path mapping
//! - [`DiskCache`]: reads and atomic create-then-rename publishing
//! - [`SingleFlight`]: one generation per key across concurrent callers

mod flight;
mod path;
mod store;

pub use flight::SingleFlight;
pub use path::{page_path, tile_path, CacheKey, PAGE_DIRECTORY};
pub use store::{DiskCache, TEMP_SUFFIX};
