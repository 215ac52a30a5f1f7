use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::broker::error::BrokerError;
use crate::config::secret::Secret;
use crate::config::settings::DirectLineConfig;
use crate::observability::metrics::get_metrics;

/// `{"User":{"Id":"<user id>"}}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GenerateTokenRequest<'a> {
    user: TokenUser<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TokenUser<'a> {
    id: &'a str,
}

/// Gateway answer; only `token` is handed back to the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionToken {
    pub token: String,
    #[serde(default, rename = "conversationId")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Mints per-user session tokens with the server-held secret.
#[derive(Debug, Clone)]
pub struct DirectLineBroker {
    client: Client,
    endpoint: String,
    secret: Option<Secret>,
}

impl DirectLineBroker {
    pub fn new(config: &DirectLineConfig, client: Client) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            secret: config.secret.clone().filter(|s| !s.is_empty()),
        }
    }

    /// One POST, no retry. Any failure ends the request.
    pub async fn generate_token(&self, user_id: &str) -> Result<SessionToken, BrokerError> {
        let metrics = get_metrics().await;
        let start = Instant::now();

        let result = self.request_token(user_id).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.reason(),
        };
        metrics.directline_requests.with_label_values(&[outcome]).inc();
        metrics
            .directline_duration
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn request_token(&self, user_id: &str) -> Result<SessionToken, BrokerError> {
        let secret = self.secret.as_ref().ok_or(BrokerError::MissingSecret)?;

        info!(user_id = %user_id, "requesting Direct Line token");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(secret.expose())
            .json(&GenerateTokenRequest {
                user: TokenUser { id: user_id },
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::UpstreamStatus { status });
        }

        let body = response.text().await?;
        let session: SessionToken =
            serde_json::from_str(&body).map_err(|e| BrokerError::Malformed(e.to_string()))?;
        if session.token.is_empty() {
            return Err(BrokerError::Malformed("empty token".to_owned()));
        }

        debug!(
            user_id = %user_id,
            conversation_id = session.conversation_id.as_deref().unwrap_or("-"),
            expires_in = ?session.expires_in,
            "Direct Line token issued"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn broker(server: &MockServer, secret: Option<&str>) -> DirectLineBroker {
        let config = DirectLineConfig {
            endpoint: format!("{}/v3/directline/tokens/generate", server.base_url()),
            secret: secret.map(Secret::new),
        };
        DirectLineBroker::new(&config, Client::new())
    }

    #[test]
    fn request_body_has_gateway_shape() {
        let body = serde_json::to_string(&GenerateTokenRequest {
            user: TokenUser { id: "abc123" },
        })
        .unwrap();
        assert_eq!(body, r#"{"User":{"Id":"abc123"}}"#);
    }

    #[tokio::test]
    async fn posts_user_id_with_secret_and_returns_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/directline/tokens/generate")
                    .header("authorization", "Bearer dl-secret")
                    .header("content-type", "application/json")
                    .body(r#"{"User":{"Id":"abc123"}}"#);
                then.status(200).json_body(json!({
                    "conversationId": "conv-1",
                    "token": "session-token-xyz",
                    "expires_in": 3600
                }));
            })
            .await;

        let session = broker(&server, Some("dl-secret")).generate_token("abc123").await.unwrap();

        mock.assert_async().await;
        assert_eq!(session.token, "session-token-xyz");
        assert_eq!(session.conversation_id.as_deref(), Some("conv-1"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/directline/tokens/generate");
                then.status(403).body("forbidden");
            })
            .await;

        let result = broker(&server, Some("dl-secret")).generate_token("abc123").await;
        assert!(matches!(result, Err(BrokerError::UpstreamStatus { status }) if status.as_u16() == 403));
    }

    #[tokio::test]
    async fn body_without_token_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v3/directline/tokens/generate");
                then.status(200).body("{\"conversationId\":\"c\"}");
            })
            .await;

        let result = broker(&server, Some("dl-secret")).generate_token("abc123").await;
        assert!(matches!(result, Err(BrokerError::Malformed(_))));
    }

    #[tokio::test]
    async fn missing_secret_never_calls_gateway() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"token": "t"}));
            })
            .await;

        let result = broker(&server, None).generate_token("abc123").await;
        assert!(matches!(result, Err(BrokerError::MissingSecret)));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_transport_error() {
        let config = DirectLineConfig {
            endpoint: "http://127.0.0.1:1/v3/directline/tokens/generate".to_owned(),
            secret: Some(Secret::new("dl-secret")),
        };
        let result = DirectLineBroker::new(&config, Client::new()).generate_token("abc123").await;
        assert!(matches!(result, Err(BrokerError::Transport(_))));
    }
}
