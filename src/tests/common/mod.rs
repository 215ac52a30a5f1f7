// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use chrono::Utc;
use httpmock::Method::GET;
use httpmock::MockServer;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde_json::Value;
use std::net::SocketAddr;

pub const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
/// Key the provider never published; same `kid` as the real one.
pub const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rogue_key.pem");
/// base64url modulus of `SIGNING_KEY_PEM`
const SIGNING_KEY_N: &str = include_str!("../fixtures/signing_key.n");

pub const TEST_KID: &str = "test-signing-key";
pub const TEST_CLIENT_ID: &str = "00000000-webchat-client";
pub const TEST_TENANT: &str = "test-tenant";
pub const TEST_ISSUER: &str = "https://login.microsoftonline.com/test-tenant/v2.0";

pub const DISCOVERY_PATH: &str = "/v2.0/.well-known/openid-configuration";
pub const JWKS_PATH: &str = "/discovery/v2.0/keys";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "kid": TEST_KID,
            "n": SIGNING_KEY_N.trim(),
            "e": "AQAB"
        }]
    })
}

/// Discovery document plus JWKS, the way the real provider lays them out.
pub async fn mock_identity_provider(server: &MockServer) {
    let jwks_uri = format!("{}{}", server.base_url(), JWKS_PATH);
    server
        .mock_async(|when, then| {
            when.method(GET).path(DISCOVERY_PATH);
            then.status(200).json_body(json!({
                "issuer": "https://login.microsoftonline.com/{tenantid}/v2.0",
                "jwks_uri": jwks_uri
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(JWKS_PATH);
            then.status(200).json_body(jwks_json());
        })
        .await;
}

/// Claims of a valid token for user `abc123`, expiring in one hour.
pub fn test_claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "abc123",
        "iss": TEST_ISSUER,
        "aud": TEST_CLIENT_ID,
        "iat": now,
        "nbf": now,
        "exp": now + 3600,
        "name": "Ada Lovelace",
        "preferred_username": "ada@contoso.com"
    })
}

pub fn sign_token(claims: &Value) -> String {
    sign_token_with(claims, SIGNING_KEY_PEM)
}

pub fn sign_token_with(claims: &Value, pem: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_owned());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("test key");
    encode(&header, claims, &key).expect("sign test token")
}
