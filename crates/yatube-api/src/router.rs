use std::any::Any;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::Response,
    routing::get,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::cache::cache_page;
use crate::error::error_document;
use crate::media::MEDIA_URL;
use crate::middleware::{authenticate, require_auth};
use crate::state::AppState;
use crate::{auth, comments, follow, pages, posts};

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    error_document(StatusCode::INTERNAL_SERVER_ERROR, None)
}

/// Every route of the site. `max_upload_bytes` caps request bodies.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cached_routes = Router::new()
        .route("/", get(posts::index))
        .route_layer(middleware::from_fn_with_state(state.clone(), cache_page))
        .with_state(state.clone());

    let public_routes = Router::new()
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", get(auth::logout))
        .route("/about-author/", get(pages::about_author))
        .route("/about-spec/", get(pages::about_spec))
        .route("/about-us/", get(pages::about_us))
        .route("/terms/", get(pages::terms))
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/{username}/", get(posts::profile))
        .route("/{username}/{post_id}/", get(posts::post_view))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/new/", get(posts::new_post_form).post(posts::new_post))
        .route("/follow/", get(follow::follow_index))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post),
        )
        .route(
            "/{username}/{post_id}/comment/",
            get(comments::comment_redirect).post(comments::add_comment),
        )
        .route("/{username}/follow/", get(follow::profile_follow))
        .route("/{username}/unfollow/", get(follow::profile_unfollow))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(cached_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(MEDIA_URL, ServeDir::new(state.media.root()))
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(state, authenticate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}
