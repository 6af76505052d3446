//! Document metadata for client viewers.
//!
//! - [`DocumentKind`]: closed classification by declared MIME type
//! - [`DocumentProber`]: builds a [`DocumentInfo`] for one asset
//! - [`ViewerConfig`]: settings a pan/zoom client needs to open an asset

mod prober;
mod viewer;

use serde::Serialize;

use crate::asset::AssetId;

pub use prober::DocumentProber;
pub use viewer::{ViewerConfig, DEFAULT_MIN_ZOOM};

/// MIME types rendered page by page.
pub const PAGINATED_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

/// MIME types shown by a text viewer.
pub const TEXT_TYPES: &[&str] = &[
    "text/plain",
    "text/html",
    "text/xml",
    "application/xml",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.oasis.opendocument.text",
];

/// Coarse document type derived from the declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
    Text,
    Unknown,
}

impl DocumentKind {
    /// Classify a MIME type. No content sniffing is done.
    pub fn classify(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        // Drop parameters such as "; charset=utf-8"
        let mime = mime.split(';').next().unwrap_or_default().trim();

        if mime.starts_with("image/") {
            DocumentKind::Image
        } else if PAGINATED_TYPES.contains(&mime) {
            DocumentKind::Pdf
        } else if mime.starts_with("text/") || TEXT_TYPES.contains(&mime) {
            DocumentKind::Text
        } else {
            DocumentKind::Unknown
        }
    }

    pub fn is_paginated(self) -> bool {
        self == DocumentKind::Pdf
    }

    /// Whether tiles may be cut from this kind. Unknown types open in the
    /// image viewer, so they are attempted too.
    pub fn is_tileable(self) -> bool {
        matches!(self, DocumentKind::Image | DocumentKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Image => "image",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Unknown => "unknown",
        }
    }
}

/// Structural metadata of one asset, recomputed per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub id: AssetId,
    pub name: String,
    pub mime_type: String,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}
