//! Identity provider signing keys.
//!
//! The discovery document at `metadata_endpoint` names a `jwks_uri`; the JWK
//! set behind it is cached for `ttl` and refetched when a token refers to a
//! `kid` the cached set does not contain (key rollover). Such forced refetches
//! happen at most once per `refresh_cooldown`, and the cache lock is never held
//! across the network round trip.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::auth::error::AuthError;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::JWKS_REFRESH_COOLDOWN_SECS;

/// Subset of the OpenID discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub jwks_uri: String,
}

struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

pub struct ProviderKeys {
    client: Client,
    metadata_endpoint: String,
    ttl: Duration,
    refresh_cooldown: Duration,
    cache: RwLock<Option<CachedKeys>>,
    // serializes fetches so concurrent misses share one round trip
    refresh: Mutex<()>,
}

impl ProviderKeys {
    pub fn new(client: Client, metadata_endpoint: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            metadata_endpoint: metadata_endpoint.into(),
            ttl,
            refresh_cooldown: Duration::from_secs(JWKS_REFRESH_COOLDOWN_SECS),
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Minimum age of the cached set before an unknown `kid` may trigger a refetch.
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Decoding key for `kid`, refreshing the set if the key is unknown and
    /// the cached set is older than the refresh cooldown.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let keys = self.key_set(false).await?;
        if let Some(key) = find_key_in_jwks(&keys, kid) {
            return Ok(key);
        }

        let keys = self.key_set(true).await?;
        find_key_in_jwks(&keys, kid).ok_or_else(|| AuthError::UnknownKeyId(kid.to_owned()))
    }

    async fn key_set(&self, force_refresh: bool) -> Result<Arc<JwkSet>, AuthError> {
        if let Some(cached) = self.usable_keys(&*self.cache.read().await, force_refresh) {
            return Ok(cached);
        }

        let _refreshing = self.refresh.lock().await;
        // another request may have refreshed while we waited for the gate
        if let Some(cached) = self.usable_keys(&*self.cache.read().await, force_refresh) {
            return Ok(cached);
        }

        if force_refresh {
            debug!("key not in cached JWKS, refreshing");
        }
        let keys = Arc::new(self.fetch().await?);
        *self.cache.write().await = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Cached keys that may be served without a fetch. A forced refresh is
    /// refused while the set is younger than `refresh_cooldown`.
    fn usable_keys(&self, cached: &Option<CachedKeys>, force_refresh: bool) -> Option<Arc<JwkSet>> {
        let cached = cached.as_ref()?;
        let age = cached.fetched_at.elapsed();
        if force_refresh {
            if age < self.refresh_cooldown {
                debug!(age_ms = age.as_millis() as u64, "JWKS refreshed recently, not refetching");
                return Some(cached.keys.clone());
            }
            return None;
        }
        (age < self.ttl).then(|| cached.keys.clone())
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let metrics = get_metrics().await;
        let result = self.fetch_uncounted().await;
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics.provider_key_fetches.with_label_values(&[outcome]).inc();
        if let Err(e) = &result {
            warn!(endpoint = %self.metadata_endpoint, error = %e, "failed to load provider keys");
        }
        result
    }

    async fn fetch_uncounted(&self) -> Result<JwkSet, AuthError> {
        let metadata: ProviderMetadata = self.get_json(&self.metadata_endpoint).await?;
        debug!(
            issuer = metadata.issuer.as_deref().unwrap_or("-"),
            jwks_uri = %metadata.jwks_uri,
            "fetched provider metadata"
        );
        let keys: JwkSet = self.get_json(&metadata.jwks_uri).await?;
        debug!(keys = keys.keys.len(), "fetched JWKS");
        Ok(keys)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AuthError> {
        let unavailable = |e: reqwest::Error| AuthError::MetadataUnavailable(format!("{url}: {e}"));
        self.client
            .get(url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<T>()
            .await
            .map_err(unavailable)
    }
}

/// Find a JWK by `kid` and convert it to a `DecodingKey`.
fn find_key_in_jwks(jwks: &JwkSet, kid: &str) -> Option<DecodingKey> {
    let jwk = jwks
        .keys
        .iter()
        .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y).ok(),
        // symmetric keys are never published by an OIDC provider
        AlgorithmParameters::OctetKey(_) | AlgorithmParameters::OctetKeyPair(_) => None,
    }
}
