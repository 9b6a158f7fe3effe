use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use yatube_types::api::Claims;

use crate::auth::SESSION_COOKIE;
use crate::error::ApiError;
use crate::state::AppState;

/// The signed-in user of the current request, if any.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|claims| claims.sub)
    }
}

fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

/// Resolve the session from the bearer header or the session cookie and
/// attach it as a [`Viewer`]. Never rejects: invalid tokens mean anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = bearer.or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value()));
    let claims = token.and_then(|t| decode_token(t, &state.jwt_secret));

    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

/// Send anonymous visitors to the login page, remembering where they were
/// going. Signed-in requests get their [`Claims`] as an extension.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Viewer>()
        .and_then(|viewer| viewer.0.clone());

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        None => {
            let uri = req.uri();
            let next = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| uri.path());
            Err(ApiError::LoginRequired {
                next: next.to_string(),
            })
        }
    }
}
