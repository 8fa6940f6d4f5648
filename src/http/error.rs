//! Mapping of core failures onto HTTP responses.

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::security::input::InputError;
use crate::security::rate_limit::{GateRejection, WINDOW_SECS};

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{source}")]
    Invalid {
        field: Option<&'static str>,
        source: InputError,
    },

    /// The request body could not be read or deserialized.
    #[error("{detail}")]
    Body { status: StatusCode, detail: String },

    #[error(transparent)]
    Gate(#[from] GateRejection),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A validation failure attributed to `field`.
    pub fn invalid(field: &'static str, source: InputError) -> Self {
        ApiError::Invalid {
            field: Some(field),
            source,
        }
    }
}

impl From<InputError> for ApiError {
    fn from(source: InputError) -> Self {
        let field = match source {
            InputError::InvalidFormat { field } => Some(field),
            InputError::TooLong { .. } => None,
        };
        ApiError::Invalid { field, source }
    }
}

impl ApiError {
    fn body_rejection(status: StatusCode, text: String) -> Self {
        // Oversized bodies keep their 413; every other body fault is a 400.
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
            status
        } else {
            StatusCode::BAD_REQUEST
        };
        ApiError::Body {
            status,
            detail: text,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::body_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::body_rejection(rejection.status(), rejection.body_text())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

fn unauthorized(detail: &str) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            detail: detail.to_string(),
            field: None,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn body(status: StatusCode, detail: impl Into<String>, field: Option<&'static str>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
            field,
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::MissingToken => unauthorized("Not authenticated"),
                AuthError::InvalidSignature
                | AuthError::Expired
                | AuthError::UnknownSubject => unauthorized("Could not validate credentials"),
                AuthError::InvalidCredentials => unauthorized("Incorrect email or password"),
                AuthError::InactiveAccount => body(StatusCode::BAD_REQUEST, "Inactive user", None),
                AuthError::InsufficientPrivilege => body(
                    StatusCode::FORBIDDEN,
                    "The user doesn't have enough privileges",
                    None,
                ),
                AuthError::DuplicateEmail => {
                    body(StatusCode::BAD_REQUEST, "Email already registered", Some("email"))
                }
                AuthError::NotFound => body(StatusCode::NOT_FOUND, "User not found", None),
                AuthError::Input(source) => ApiError::from(source).into_response(),
                AuthError::WeakPassword(rule) => {
                    body(StatusCode::BAD_REQUEST, rule.to_string(), Some("password"))
                }
                AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Store(_) => {
                    tracing::error!(error = %e, "Authentication backend failure");
                    body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
                }
            },
            ApiError::Invalid { field, source } => {
                body(StatusCode::BAD_REQUEST, source.to_string(), field)
            }
            ApiError::Body { status, detail } => body(status, detail, None),
            ApiError::Gate(rejection) => {
                let mut response = body(StatusCode::TOO_MANY_REQUESTS, rejection.to_string(), None);
                if rejection == GateRejection::RateLimited {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(WINDOW_SECS));
                }
                response
            }
            ApiError::NotFound(what) => body(StatusCode::NOT_FOUND, what, None),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        }
    }
}
