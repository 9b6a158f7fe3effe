//! Drives the full router in-process with an in-memory store and a
//! temporary media directory.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tempfile::TempDir;
use tower::ServiceExt;

use yatube_api::auth::{SESSION_COOKIE, create_token};
use yatube_api::cache::PageCache;
use yatube_api::media::MediaStorage;
use yatube_api::{AppState, AppStateInner, build_router};
use yatube_db::Database;

pub const SECRET: &str = "test-secret";
const BOUNDARY: &str = "yatube-test-boundary";

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }

    #[track_caller]
    pub fn assert_redirect(&self, to: &str) {
        assert!(
            self.status.is_redirection(),
            "expected redirect to {}, got {} with body {}",
            to,
            self.status,
            self.body
        );
        assert_eq!(self.location(), Some(to));
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _media: TempDir,
}

pub struct Upload<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl TestApp {
    pub async fn new() -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.to_string(),
            media: MediaStorage::new(media_dir.path().to_path_buf()).await.unwrap(),
            page_cache: PageCache::new(Duration::from_secs(20)),
        });
        let router = build_router(state.clone(), 1024 * 1024);
        Self {
            state,
            router,
            _media: media_dir,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn user(&self, username: &str) -> TestUser {
        let id = self
            .db()
            .create_user(username, &format!("{}@example.com", username), "unused-hash")
            .unwrap();
        TestUser {
            id,
            username: username.to_string(),
            token: create_token(SECRET, id, username).unwrap(),
        }
    }

    pub fn group(&self, slug: &str) -> i64 {
        self.db().create_group(&format!("Group {}", slug), slug, "").unwrap()
    }

    pub fn clear_cache(&self) {
        self.state.page_cache.clear();
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn request(method: &str, uri: &str, user: Option<&TestUser>) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, user.token));
        }
        builder
    }

    pub async fn get(&self, uri: &str, user: Option<&TestUser>) -> TestResponse {
        let req = Self::request("GET", uri, user).body(Body::empty()).unwrap();
        self.send(req).await
    }

    pub async fn post_form(&self, uri: &str, user: Option<&TestUser>, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, NON_ALPHANUMERIC),
                    utf8_percent_encode(v, NON_ALPHANUMERIC)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        let req = Self::request("POST", uri, user)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        user: Option<&TestUser>,
        fields: &[(&str, &str)],
        upload: Option<Upload<'_>>,
    ) -> TestResponse {
        let mut body: Vec<u8> = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(upload) = upload {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    upload.field, upload.file_name, upload.content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(upload.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Self::request("POST", uri, user)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(3, 3, image::Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
