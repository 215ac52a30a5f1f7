use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::identity::UserIdentity;
use crate::broker::error::BrokerError;
use crate::server::server::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /api/directline/token`
///
/// Only reachable behind `require_bearer`; without the identity extension axum
/// refuses the request before this body runs.
pub async fn directline_token(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> Result<Json<TokenResponse>, BrokerError> {
    let session = state.broker.generate_token(&user.id).await?;
    Ok(Json(TokenResponse {
        token: session.token,
    }))
}
