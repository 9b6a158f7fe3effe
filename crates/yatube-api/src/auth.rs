use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use yatube_types::api::{Claims, LoginContext, LoginRequest, NextQuery, SignupRequest};

use crate::error::{ApiError, ValidationError};
use crate::forms::REQUIRED;
use crate::state::{AppState, with_db};

pub const SESSION_COOKIE: &str = "yatube_session";

const SESSION_DAYS: i64 = 30;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;

/// First path segments taken by fixed routes; a user with one of these names
/// would have an unreachable profile.
const RESERVED_USERNAMES: &[&str] = &[
    "about-author",
    "about-spec",
    "about-us",
    "auth",
    "follow",
    "group",
    "media",
    "new",
    "terms",
];

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unparseable password hash: {}", e);
            false
        }
    }
}

pub fn create_token(secret: &str, user_id: i64, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .into()
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

fn validate_username(username: &str, errors: &mut ValidationError) {
    if username.is_empty() {
        errors.add_error("username", REQUIRED);
    } else if username.chars().count() > MAX_USERNAME_LEN {
        errors.add_error(
            "username",
            format!("Ensure this value has at most {} characters.", MAX_USERNAME_LEN),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        errors.add_error(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    } else if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
        errors.add_error("username", "This username is reserved.");
    }
}

fn validate_signup(req: &SignupRequest) -> ValidationError {
    let mut errors = ValidationError::default();

    validate_username(req.username.trim(), &mut errors);

    let email = req.email.trim();
    if !email.is_empty() && !email.contains('@') {
        errors.add_error("email", "Enter a valid email address.");
    }

    if req.password1.is_empty() {
        errors.add_error("password1", REQUIRED);
    } else if req.password1.chars().count() < MIN_PASSWORD_LEN {
        errors.add_error(
            "password2",
            format!(
                "This password is too short. It must contain at least {} characters.",
                MIN_PASSWORD_LEN
            ),
        );
    }
    if req.password2.is_empty() {
        errors.add_error("password2", REQUIRED);
    } else if req.password1 != req.password2 {
        errors.add_error("password2", "The two password fields didn't match.");
    }

    errors
}

/// GET /auth/signup/
pub async fn signup_form() -> impl IntoResponse {
    Json(serde_json::json!({
        "fields": ["username", "email", "password1", "password2"]
    }))
}

/// POST /auth/signup/. Creates the account, signs the new user in and
/// redirects to the index.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(req): Form<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req).into_result()?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    let password = req.password1;

    // Check and insert are one statement so concurrent signups cannot both pass.
    let user_id = with_db(&state, move |db| {
        let hash = hash_password(&password)?;
        Ok(match db.try_create_user(&username, &email, &hash)? {
            Some(id) => Ok((id, username)),
            None => Err(username),
        })
    })
    .await?;

    let (user_id, username) = user_id.map_err(|taken| {
        warn!("Signup rejected, username {} taken", taken);
        ValidationError::from("username", "A user with that username already exists.")
    })?;

    let token = create_token(&state.jwt_secret, user_id, &username)?;
    info!("User {} signed up", username);

    Ok((jar.add(session_cookie(token)), Redirect::to("/")))
}

/// GET /auth/login/
pub async fn login_form(Query(query): Query<NextQuery>) -> impl IntoResponse {
    Json(LoginContext { next: query.next })
}

/// POST /auth/login/. Sets the session cookie and redirects to `next`, taken
/// from the form first and then from the query string.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Form(req): Form<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let next = req.next.filter(|n| !n.is_empty()).or(query.next);
    let next = safe_next(next.as_deref()).to_string();
    let username = req.username.trim().to_string();
    let password = req.password;

    let user = with_db(&state, move |db| {
        let user = db.get_user_by_username(&username)?;
        Ok(user.filter(|u| verify_password(&password, &u.password)))
    })
    .await?
    .ok_or_else(|| {
        ValidationError::from(
            "__all__",
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        )
    })?;

    let token = create_token(&state.jwt_secret, user.id, &user.username)?;
    info!("User {} logged in", user.username);

    Ok((jar.add(session_cookie(token)), Redirect::to(&next)))
}

/// GET /auth/logout/
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}
