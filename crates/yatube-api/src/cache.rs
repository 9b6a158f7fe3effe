use std::time::Duration;

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use moka::future::Cache;
use tracing::{debug, error};

use crate::state::AppState;

/// Responses larger than this are served but never cached.
const MAX_CACHED_BODY: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct CachedPage {
    content_type: Option<HeaderValue>,
    body: Bytes,
}

/// Time-boxed response cache keyed by request URI (path and query).
///
/// Entries are never invalidated by writes; they expire after the TTL or when
/// the whole cache is cleared.
#[derive(Clone)]
pub struct PageCache {
    inner: Cache<String, CachedPage>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CachedPage> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, page: CachedPage) {
        self.inner.insert(key, page).await;
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl IntoResponse for CachedPage {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

/// Serves successful GET responses of the wrapped routes from the page cache.
pub async fn cache_page(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = req.uri().to_string();
    if let Some(page) = state.page_cache.get(&key).await {
        debug!("Page cache hit: {}", key);
        return page.into_response();
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to buffer response for {}: {}", key, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let page = CachedPage {
        content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
        body: bytes.clone(),
    };
    state.page_cache.insert(key, page).await;

    Response::from_parts(parts, Body::from(bytes))
}
