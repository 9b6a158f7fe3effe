use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use yatube_types::api::ErrorDocument;

pub const LOGIN_URL: &str = "/auth/login/";

/// Characters escaped in the `next` parameter; path separators stay readable.
const NEXT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("validation failed: {0:?}")]
    Validation(ValidationError),

    #[error("login required for {next}")]
    LoginRequired { next: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

/// Field name to messages, rendered as `{"errors": {...}}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError(BTreeMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        self.0.entry(key.into()).or_default().push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub fn login_url(next: &str) -> String {
    format!("{}?next={}", LOGIN_URL, utf8_percent_encode(next, NEXT_ESCAPE))
}

pub fn error_document(status: StatusCode, path: Option<String>) -> Response {
    let body = ErrorDocument {
        status: status.as_u16(),
        error: status
            .canonical_reason()
            .unwrap_or("error")
            .to_lowercase(),
        path,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => error_document(StatusCode::NOT_FOUND, None),
            ApiError::Validation(errors) => {
                warn!("Rejected form: {:?}", errors);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({ "errors": errors })),
                )
                    .into_response()
            }
            ApiError::LoginRequired { next } => Redirect::to(&login_url(&next)).into_response(),
            ApiError::BadRequest(reason) => {
                warn!("Bad request: {}", reason);
                error_document(StatusCode::BAD_REQUEST, None)
            }
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                error_document(StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        }
    }
}
