use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use reqwest::Client;
use tracing::debug;

use crate::auth::error::AuthError;
use crate::auth::identity::{IdTokenClaims, UserIdentity};
use crate::auth::keys::ProviderKeys;
use crate::config::settings::OAuthConfig;
use crate::utils::constants::TOKEN_LEEWAY_SECS;

/// Turns a raw bearer token into a caller identity.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<UserIdentity, AuthError>;
}

/// OIDC bearer validation against the provider's published keys.
///
/// Checks signature, `exp`, `aud == client_id` and, when enabled, `iss`.
pub struct BearerValidator {
    oauth: OAuthConfig,
    keys: ProviderKeys,
}

impl BearerValidator {
    pub fn new(oauth: &OAuthConfig, client: Client) -> Self {
        let keys = ProviderKeys::new(
            client,
            oauth.metadata_endpoint.clone(),
            Duration::from_secs(oauth.jwks_cache_ttl_secs),
        );
        Self {
            oauth: oauth.clone(),
            keys,
        }
    }

    fn validation(&self, alg: Algorithm) -> Result<Validation, AuthError> {
        let client_id = self
            .oauth
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::Misconfigured("OAUTH_CLIENT_ID is not set"))?;

        let mut validation = Validation::new(alg);
        validation.leeway = TOKEN_LEEWAY_SECS;
        validation.set_audience(&[client_id]);

        if self.oauth.validate_issuer {
            let issuer = self
                .oauth
                .expected_issuer()
                .ok_or(AuthError::Misconfigured("TENANT_ID is not set"))?;
            validation.set_issuer(&[issuer]);
            validation.set_required_spec_claims(&["exp", "aud", "sub", "iss"]);
        } else {
            validation.set_required_spec_claims(&["exp", "aud", "sub"]);
        }

        Ok(validation)
    }
}

#[async_trait]
impl TokenValidator for BearerValidator {
    async fn validate(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let alg = supported_algorithm(header.alg)?;
        let validation = self.validation(alg)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let key = self.keys.decoding_key(&kid).await?;
        let claims = decode::<IdTokenClaims>(token, &key, &validation)?.claims;

        debug!(
            sub = %claims.sub,
            iss = claims.iss.as_deref().unwrap_or("-"),
            expires_at = ?claims.expires_at(),
            "bearer token accepted"
        );
        Ok(claims.into())
    }
}

/// Asymmetric algorithms only; an HMAC token could be "signed" with public data.
fn supported_algorithm(alg: Algorithm) -> Result<Algorithm, AuthError> {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::ES256
        | Algorithm::ES384 => Ok(alg),
        other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
    }
}
