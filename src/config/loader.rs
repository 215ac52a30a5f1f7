use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use clap::builder::BoolishValueParser;
use regex::Regex;

use crate::config::secret::Secret;
use crate::config::settings::{static_dir_from, LogFormat, LoggingConfig, ServiceConfig};

/// Environment-backed settings. Every field wins over the YAML file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    #[arg(long, env = "HOST")]
    pub host: Option<String>,
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    /// directory with the web chat assets, relative to the working directory
    /// (not the binary's location); empty disables static serving
    #[arg(long, env = "STATIC_FILES")]
    pub static_files: Option<String>,
    #[arg(long, env = "OAUTH_METADATA_ENDPOINT")]
    pub oauth_metadata_endpoint: Option<String>,
    #[arg(long, env = "OAUTH_CLIENT_ID")]
    pub oauth_client_id: Option<String>,
    #[arg(long, env = "TENANT_ID")]
    pub tenant_id: Option<String>,
    #[arg(long, env = "OAUTH_ISSUER")]
    pub oauth_issuer: Option<String>,
    /// false accepts tokens from any tenant
    #[arg(long, env = "OAUTH_VALIDATE_ISSUER", value_parser = BoolishValueParser::new())]
    pub oauth_validate_issuer: Option<bool>,
    #[arg(long, env = "JWKS_CACHE_TTL_SECS")]
    pub jwks_cache_ttl_secs: Option<u64>,
    #[arg(long, env = "DIRECT_LINE_SECRET", hide_env_values = true)]
    pub direct_line_secret: Option<String>,
    #[arg(long, env = "DIRECT_LINE_ENDPOINT")]
    pub direct_line_endpoint: Option<String>,
    #[arg(long, env = "HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,
    #[arg(long, env = "LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
    #[arg(long, env = "METRICS_ENABLED", value_parser = BoolishValueParser::new())]
    pub metrics_enabled: Option<bool>,
    #[arg(long, env = "METRICS_PATH")]
    pub metrics_path: Option<String>,
}

/// Defaults, then the optional YAML file, then overrides.
///
/// Runs before logging is up, so failures are returned rather than logged.
pub async fn run(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ServiceConfig> {
    let base = match config_path {
        Some(path) => file_to_config(path)
            .await
            .map_err(|e| anyhow!(format!("Invalid config format: {}", e)))?,
        None => ServiceConfig::default(),
    };
    Ok(apply_overrides(base, overrides))
}

/// Load config from YAML file, expanding `${VAR}` / `${VAR:default}`.
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)?;
    let expanded = expand_env_vars(&content);
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let service_config: ServiceConfig = serde_yaml::from_str(content)?;
    Ok(service_config)
}

/// Logging settings known without the YAML file: defaults plus `LOG_FORMAT`.
/// Used when the file cannot be loaded, so the load error still gets logged.
pub fn bootstrap_logging(overrides: &ConfigOverrides) -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(format) = overrides.log_format {
        logging.format = format;
    }
    logging
}

pub fn apply_overrides(mut config: ServiceConfig, overrides: &ConfigOverrides) -> ServiceConfig {
    let o = overrides.clone();

    if let Some(host) = o.host {
        config.server.host = host;
    }
    if let Some(port) = o.port {
        config.server.port = port;
    }
    if let Some(dir) = o.static_files {
        config.server.static_files = static_dir_from(&dir);
    }
    if let Some(endpoint) = o.oauth_metadata_endpoint {
        config.oauth.metadata_endpoint = endpoint;
    }
    if o.oauth_client_id.is_some() {
        config.oauth.client_id = o.oauth_client_id;
    }
    if o.tenant_id.is_some() {
        config.oauth.tenant_id = o.tenant_id;
    }
    if o.oauth_issuer.is_some() {
        config.oauth.issuer = o.oauth_issuer;
    }
    if let Some(validate) = o.oauth_validate_issuer {
        config.oauth.validate_issuer = validate;
    }
    if let Some(ttl) = o.jwks_cache_ttl_secs {
        config.oauth.jwks_cache_ttl_secs = ttl;
    }
    if let Some(secret) = o.direct_line_secret {
        config.direct_line.secret = Some(Secret::new(secret));
    }
    if let Some(endpoint) = o.direct_line_endpoint {
        config.direct_line.endpoint = endpoint;
    }
    if let Some(timeout) = o.http_timeout_ms {
        config.http.timeout_ms = timeout;
    }
    if let Some(format) = o.log_format {
        config.logging.format = format;
    }
    if let Some(enabled) = o.metrics_enabled {
        config.metrics.is_enabled = enabled;
    }
    if let Some(path) = o.metrics_path {
        config.metrics.path = path;
    }

    config
}

fn expand_env_vars(input: &str) -> String {
    let re = match Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}") {
        Ok(re) => re,
        Err(_) => return input.to_owned(),
    };
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
