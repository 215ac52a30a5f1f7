use std::path::PathBuf;

use serde::Deserialize;

use crate::config::secret::Secret;
use crate::utils::constants::{
    DEFAULT_DIRECT_LINE_ENDPOINT, DEFAULT_HOST, DEFAULT_HTTP_TIMEOUT_MS,
    DEFAULT_JWKS_CACHE_TTL_SECS, DEFAULT_METADATA_ENDPOINT, DEFAULT_METRICS_PATH, DEFAULT_PORT,
    DEFAULT_STATIC_FILES, ISSUER_TEMPLATE_PREFIX, ISSUER_TEMPLATE_SUFFIX,
};

/// ================================
/// Full service configuration
/// ================================
///
/// Built once at startup and shared read-only through `Arc`.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub direct_line: DirectLineConfig,
    pub http: HttpClientConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` disables static serving.
    #[serde(deserialize_with = "deserialize_static_dir")]
    pub static_files: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            static_files: Some(PathBuf::from(DEFAULT_STATIC_FILES)),
        }
    }
}

/// ================================
/// Identity provider
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthConfig {
    /// OpenID discovery document url
    pub metadata_endpoint: String,
    /// expected `aud` claim
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    /// explicit issuer, wins over the tenant-derived one
    pub issuer: Option<String>,
    /// Turning this off accepts a validly signed token from ANY tenant.
    pub validate_issuer: bool,
    pub jwks_cache_ttl_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_owned(),
            client_id: None,
            tenant_id: None,
            issuer: None,
            validate_issuer: true,
            jwks_cache_ttl_secs: DEFAULT_JWKS_CACHE_TTL_SECS,
        }
    }
}

impl OAuthConfig {
    /// Issuer a token must carry when issuer validation is on.
    pub fn expected_issuer(&self) -> Option<String> {
        self.issuer.clone().or_else(|| {
            self.tenant_id
                .as_ref()
                .map(|tenant| format!("{ISSUER_TEMPLATE_PREFIX}{tenant}{ISSUER_TEMPLATE_SUFFIX}"))
        })
    }
}

/// ================================
/// Session token gateway
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DirectLineConfig {
    pub endpoint: String,
    pub secret: Option<Secret>,
}

impl Default for DirectLineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DIRECT_LINE_ENDPOINT.to_owned(),
            secret: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpClientConfig {
    pub timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

/// Empty or blank directory names switch static serving off.
pub fn static_dir_from(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn deserialize_static_dir<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(static_dir_from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_issuer_is_derived_from_tenant() {
        let oauth = OAuthConfig {
            tenant_id: Some("contoso-tenant".to_owned()),
            ..OAuthConfig::default()
        };
        assert_eq!(
            oauth.expected_issuer().as_deref(),
            Some("https://login.microsoftonline.com/contoso-tenant/v2.0")
        );
    }

    #[test]
    fn explicit_issuer_wins_over_tenant() {
        let oauth = OAuthConfig {
            tenant_id: Some("contoso-tenant".to_owned()),
            issuer: Some("https://idp.example.com".to_owned()),
            ..OAuthConfig::default()
        };
        assert_eq!(oauth.expected_issuer().as_deref(), Some("https://idp.example.com"));
    }

    #[test]
    fn no_tenant_means_no_expected_issuer() {
        assert!(OAuthConfig::default().expected_issuer().is_none());
    }

    #[test]
    fn blank_static_dir_disables_serving() {
        assert_eq!(static_dir_from("   "), None);
        assert_eq!(static_dir_from("public"), Some(PathBuf::from("public")));
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.server.static_files, Some(PathBuf::from("public")));
        assert!(cfg.oauth.validate_issuer);
        assert!(cfg.oauth.metadata_endpoint.ends_with("/.well-known/openid-configuration"));
        assert!(!cfg.metrics.is_enabled);
    }
}
