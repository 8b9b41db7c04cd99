//! Post-listing producer abstraction.

use async_trait::async_trait;

use crate::api::client::PartyApi;
use crate::api::types::{Creator, Post};
use crate::error::Result;

/// Anything that can list a creator's posts, newest first.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Return up to `limit` posts (all when `None`).
    async fn fetch_posts(&self, creator: &Creator, limit: Option<usize>) -> Result<Vec<Post>>;
}

#[async_trait]
impl PostSource for PartyApi {
    async fn fetch_posts(&self, creator: &Creator, limit: Option<usize>) -> Result<Vec<Post>> {
        self.list_posts(creator, limit).await
    }
}
