use async_trait::async_trait;

use super::SourceAsset;

/// Authorization collaborator: decides whether an asset may be read.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    async fn can_read(&self, asset: &SourceAsset) -> bool;
}

/// Policy that allows every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessPolicy for AllowAll {
    async fn can_read(&self, _asset: &SourceAsset) -> bool {
        true
    }
}
