use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::info;

use yatube_types::api::{Claims, CommentRequest};

use crate::error::{ApiError, ValidationError};
use crate::forms::REQUIRED;
use crate::posts::{load_post, post_url};
use crate::state::{AppState, with_db};

/// POST /{username}/{post_id}/comment/. Redirects back to the post.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((username, post_id)): Path<(String, String)>,
    Form(req): Form<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = load_post(&state, &username, &post_id).await?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ValidationError::from("text", REQUIRED).into());
    }

    let (post_id, author_id) = (post.id, claims.sub);
    let comment_id = with_db(&state, move |db| db.create_comment(post_id, author_id, &text)).await?;

    info!("Comment {} on post {} by {}", comment_id, post_id, claims.username);
    Ok(Redirect::to(&post_url(&post.author_username, post.id)))
}

/// GET /{username}/{post_id}/comment/. Nothing to submit, back to the post.
pub async fn comment_redirect(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let post = load_post(&state, &username, &post_id).await?;
    Ok(Redirect::to(&post_url(&post.author_username, post.id)))
}
