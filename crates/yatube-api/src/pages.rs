use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use yatube_types::api::StaticPage;

use crate::error::error_document;

fn static_page(url: &str, title: &str, content: &str) -> Json<StaticPage> {
    Json(StaticPage {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    })
}

pub async fn about_author() -> impl IntoResponse {
    static_page(
        "/about-author/",
        "About the author",
        "Yatube is written and run by a single developer.",
    )
}

pub async fn about_spec() -> impl IntoResponse {
    static_page(
        "/about-spec/",
        "Technologies",
        "An HTTP service over SQLite: posts, groups, comments and subscriptions.",
    )
}

pub async fn about_us() -> impl IntoResponse {
    static_page(
        "/about-us/",
        "About us",
        "Yatube is a place to write, read and follow the authors you like.",
    )
}

pub async fn terms() -> impl IntoResponse {
    static_page(
        "/terms/",
        "Terms of use",
        "Be kind. Posts and comments are public and visible to everyone.",
    )
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> Response {
    error_document(StatusCode::NOT_FOUND, Some(uri.path().to_string()))
}
