use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use tracing::info;

use yatube_db::FollowOutcome;
use yatube_types::api::{Claims, FollowFeedResponse, PageQuery};

use crate::error::ApiError;
use crate::pagination::POSTS_PER_PAGE;
use crate::posts::post_page;
use crate::state::{AppState, with_db};

fn profile_url(username: &str) -> String {
    format!("/{}/", username)
}

/// GET /follow/. Posts by the authors the viewer follows.
pub async fn follow_index(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let page = post_page(
        &state,
        query.page,
        POSTS_PER_PAGE,
        move |db| db.count_feed(user_id),
        move |db, limit, offset| db.list_feed(user_id, limit, offset),
    )
    .await?;

    Ok(Json(FollowFeedResponse { page }))
}

/// GET /{username}/follow/. Get-or-create the edge; following yourself is a no-op.
pub async fn profile_follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let lookup = username.clone();
    let outcome = with_db(&state, move |db| match db.get_user_by_username(&lookup)? {
        Some(author) => Ok(Some(db.follow(user_id, author.id)?)),
        None => Ok(None),
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    if outcome == FollowOutcome::Created {
        info!("{} now follows {}", claims.username, username);
    }
    Ok(Redirect::to(&profile_url(&username)))
}

/// GET /{username}/unfollow/. 404 when there is no such edge.
pub async fn profile_unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let lookup = username.clone();
    let removed = with_db(&state, move |db| match db.get_user_by_username(&lookup)? {
        Some(author) => db.unfollow(user_id, author.id),
        None => Ok(false),
    })
    .await?;

    if !removed {
        return Err(ApiError::NotFound);
    }

    info!("{} unfollowed {}", claims.username, username);
    Ok(Redirect::to(&profile_url(&username)))
}
