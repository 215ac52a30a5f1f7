use axum::http::{header::WWW_AUTHENTICATE, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;
use tracing::error;

/// Bearer validation failures.
///
/// Everything except `Misconfigured` is the caller's problem and maps to 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingBearer,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token header has no 'kid'")]
    MissingKeyId,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unknown signing key: {0}")]
    UnknownKeyId(String),

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token issuer is not trusted")]
    InvalidIssuer,

    #[error("token audience does not match")]
    InvalidAudience,

    #[error("identity provider metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// Settings needed to validate are absent.
    #[error("validator misconfigured: {0}")]
    Misconfigured(&'static str),
}

impl AuthError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingBearer => "missing_bearer",
            Self::Malformed(_) => "malformed",
            Self::MissingKeyId => "missing_kid",
            Self::UnsupportedAlgorithm(_) => "unsupported_alg",
            Self::UnknownKeyId(_) => "unknown_kid",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::MetadataUnavailable(_) => "metadata_unavailable",
            Self::Misconfigured(_) => "misconfigured",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidAudience => Self::InvalidAudience,
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm("algorithm mismatch".to_owned()),
            _ => Self::Malformed(e.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self.status() {
            StatusCode::UNAUTHORIZED => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, "Bearer")],
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            status => {
                error!(error = %self, "bearer validation could not run");
                (status, Json(json!({ "error": "internal error" }))).into_response()
            }
        }
    }
}
