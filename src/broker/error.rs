use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Session token gateway failures. The caller only ever sees a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("DIRECT_LINE_SECRET is not set")]
    MissingSecret,

    #[error("gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway answered {status}")]
    UpstreamStatus { status: reqwest::StatusCode },

    #[error("gateway response malformed: {0}")]
    Malformed(String),
}

impl BrokerError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingSecret => "missing_secret",
            Self::Transport(_) => "transport",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::Malformed(_) => "malformed",
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        error!(reason = self.reason(), error = %self, "session token generation failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_details_are_not_exposed() {
        let err = BrokerError::UpstreamStatus {
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert_eq!(err.to_string(), "gateway answered 403 Forbidden");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
