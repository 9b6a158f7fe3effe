use std::sync::Arc;

use tracing::error;

use yatube_db::Database;

use crate::cache::PageCache;
use crate::error::ApiError;
use crate::media::MediaStorage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub media: MediaStorage,
    /// Cache of the global feed page.
    pub page_cache: PageCache,
}

/// Run blocking DB work off the async runtime.
pub async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::from)
}
