use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::auth::error::AuthError;
use crate::observability::metrics::get_metrics;
use crate::server::server::AppState;

/// Rejects the request unless it carries a valid bearer token.
///
/// On success the derived `UserIdentity` is put into the request extensions;
/// the wrapped handler is never reached otherwise.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let metrics = get_metrics().await;
    let path = request.uri().path().to_owned();

    // owned: the request body is not Sync, so no borrow of it may cross an await
    let token = bearer_token(request.headers()).map(str::to_owned);
    let result = match token {
        Some(token) => state.validator.validate(&token).await,
        None => Err(AuthError::MissingBearer),
    };

    match result {
        Ok(identity) => {
            metrics.token_validations.with_label_values(&["accepted"]).inc();
            info!(path = %path, user_id = %identity.id, "bearer token validated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            metrics.token_validations.with_label_values(&[e.reason()]).inc();
            warn!(path = %path, reason = e.reason(), error = %e, "bearer token rejected");
            e.into_response()
        }
    }
}

/// Token part of `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
