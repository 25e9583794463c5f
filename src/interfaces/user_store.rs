//! User storage interface.

use async_trait::async_trait;

use super::storage_error::Result;

/// The slice of user storage the caching engine needs.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Ids of every user with tracking enabled. These are the users primed at startup.
    async fn get_tracked_user_ids(&self) -> Result<Vec<String>>;
}
