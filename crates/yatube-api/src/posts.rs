use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, warn};

use yatube_db::Database;
use yatube_db::models::PostRow;
use yatube_types::api::{
    Claims, GroupResponse, IndexResponse, PageDocument, PageQuery, PostFormContext, PostResponse,
    ProfileResponse,
};
use yatube_types::models::{Author, Post};

use crate::error::ApiError;
use crate::forms::{CleanPost, ImageChange, PostForm};
use crate::middleware::Viewer;
use crate::pagination::{POSTS_PER_PAGE, PROFILE_POSTS_PER_PAGE, Paginator};
use crate::state::{AppState, with_db};
use crate::views;

pub fn post_url(username: &str, post_id: i64) -> String {
    format!("/{}/{}/", username, post_id)
}

/// Count, clamp the requested page, then fetch that window, all in one
/// blocking call.
pub(crate) async fn post_page<C, L>(
    state: &AppState,
    requested: Option<String>,
    per_page: u32,
    count: C,
    list: L,
) -> Result<PageDocument<Post>, ApiError>
where
    C: FnOnce(&Database) -> anyhow::Result<u64> + Send + 'static,
    L: FnOnce(&Database, u32, u64) -> anyhow::Result<Vec<PostRow>> + Send + 'static,
{
    let (window, rows) = with_db(state, move |db| {
        let window = Paginator::new(count(db)?, per_page).get_page(requested.as_deref());
        let rows = list(db, window.limit(), window.offset())?;
        Ok((window, rows))
    })
    .await?;

    Ok(window.into_document(views::posts(rows, &state.media)))
}

/// Post addressed as `/{username}/{post_id}/`; the username must be the author's.
pub(crate) async fn load_post(state: &AppState, username: &str, post_id: &str) -> Result<PostRow, ApiError> {
    let post_id: i64 = post_id.parse().map_err(|_| ApiError::NotFound)?;
    let row = with_db(state, move |db| db.get_post(post_id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if row.author_username != username {
        return Err(ApiError::NotFound);
    }
    Ok(row)
}

/// GET /. Every post, newest first.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = post_page(
        &state,
        query.page,
        POSTS_PER_PAGE,
        |db| db.count_posts(),
        |db, limit, offset| db.list_posts(limit, offset),
    )
    .await?;

    Ok(Json(IndexResponse { page }))
}

/// GET /group/{slug}/
pub async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let group = with_db(&state, move |db| db.get_group_by_slug(&slug))
        .await?
        .ok_or(ApiError::NotFound)?;

    let group_id = group.id;
    let page = post_page(
        &state,
        query.page,
        POSTS_PER_PAGE,
        move |db| db.count_posts_in_group(group_id),
        move |db, limit, offset| db.list_posts_in_group(group_id, limit, offset),
    )
    .await?;

    Ok(Json(GroupResponse {
        group: views::group(group),
        page,
    }))
}

/// GET /{username}/
pub async fn profile(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer_id = viewer.user_id();
    let (author, follower_count, following_count, following) = with_db(&state, move |db| {
        let Some(author) = db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        let following = match viewer_id {
            Some(id) => db.is_following(id, author.id)?,
            None => false,
        };
        Ok(Some((
            author.clone(),
            db.count_followers(author.id)?,
            db.count_following(author.id)?,
            following,
        )))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    let author_id = author.id;
    let page = post_page(
        &state,
        query.page,
        PROFILE_POSTS_PER_PAGE,
        move |db| db.count_posts_by_author(author_id),
        move |db, limit, offset| db.list_posts_by_author(author_id, limit, offset),
    )
    .await?;

    Ok(Json(ProfileResponse {
        author: Author {
            id: author.id,
            username: author.username,
        },
        post_count: page.count,
        follower_count,
        following_count,
        following,
        page,
    }))
}

/// GET /{username}/{post_id}/. The post with its comments.
pub async fn post_view(
    State(state): State<AppState>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let row = load_post(&state, &username, &post_id).await?;

    let (post_id, author_id) = (row.id, row.author_id);
    let (comments, post_count) = with_db(&state, move |db| {
        Ok((db.list_comments(post_id)?, db.count_posts_by_author(author_id)?))
    })
    .await?;

    let post = views::post(row, &state.media);
    Ok(Json(PostResponse {
        author: post.author.clone(),
        post_count,
        post,
        comments: comments.into_iter().map(views::comment).collect(),
    }))
}

async fn form_context(state: &AppState, post: Option<Post>) -> Result<PostFormContext, ApiError> {
    let groups = with_db(state, |db| db.list_groups()).await?;
    Ok(PostFormContext {
        post,
        groups: groups.into_iter().map(views::group).collect(),
    })
}

/// Store a replacement image, or resolve what the post's image path becomes.
async fn resolve_image(
    state: &AppState,
    change: ImageChange,
    current: Option<String>,
) -> Result<Option<String>, ApiError> {
    Ok(match change {
        ImageChange::Keep => current,
        ImageChange::Clear => None,
        ImageChange::Replace { data, format } => {
            Some(state.media.save_post_image(&data, format).await?)
        }
    })
}

/// GET /new/
pub async fn new_post_form(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(form_context(&state, None).await?))
}

/// POST /new/. On success redirects to the index.
pub async fn new_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    form: PostForm,
) -> Result<impl IntoResponse, ApiError> {
    let CleanPost {
        text,
        group_id,
        image,
    } = form.validate(&state).await?;

    let image = resolve_image(&state, image, None).await?;
    let author_id = claims.sub;
    let post_id = with_db(&state, move |db| {
        db.create_post(author_id, &text, group_id, image.as_deref())
    })
    .await?;

    info!("Post {} created by {}", post_id, claims.username);
    Ok(Redirect::to("/"))
}

/// GET /{username}/{post_id}/edit/. Non-authors are sent back to the post.
pub async fn edit_post_form(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let row = load_post(&state, &username, &post_id).await?;
    if row.author_id != claims.sub {
        return Ok(Redirect::to(&post_url(&row.author_username, row.id)).into_response());
    }

    let post = views::post(row, &state.media);
    Ok(Json(form_context(&state, Some(post)).await?).into_response())
}

/// POST /{username}/{post_id}/edit/. Replaces text, group and image.
///
/// A non-author's submission is dropped without error and the caller is
/// redirected to the unchanged post.
pub async fn edit_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((username, post_id)): Path<(String, String)>,
    form: PostForm,
) -> Result<impl IntoResponse, ApiError> {
    let row = load_post(&state, &username, &post_id).await?;
    let target = post_url(&row.author_username, row.id);

    if row.author_id != claims.sub {
        warn!(
            "User {} tried to edit post {} owned by {}",
            claims.username, row.id, row.author_username
        );
        return Ok(Redirect::to(&target));
    }

    let CleanPost {
        text,
        group_id,
        image,
    } = form.validate(&state).await?;

    let image = resolve_image(&state, image, row.image).await?;
    let post_id = row.id;
    with_db(&state, move |db| {
        db.update_post(post_id, &text, group_id, image.as_deref())
    })
    .await?;

    info!("Post {} edited by {}", post_id, claims.username);
    Ok(Redirect::to(&target))
}
