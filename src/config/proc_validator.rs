//! Startup configuration checks.
//! - Aggregates all issues into Vec<String>
//! - Never fails startup: missing credentials surface on the first request
//!   that needs them, the list only goes to the log.

use tracing::{info, warn};

use crate::config::settings::ServiceConfig;
use crate::observability::metrics::get_metrics;

pub async fn validate_service_config(cfg: &ServiceConfig) -> Vec<String> {
    let issues = collect_issues(cfg);
    let metrics = get_metrics().await;

    if issues.is_empty() {
        info!("config validation passed");
    } else {
        for issue in &issues {
            warn!("config: {}", issue);
            metrics.config_errors.inc();
        }
    }
    issues
}

pub fn collect_issues(cfg: &ServiceConfig) -> Vec<String> {
    let mut issues = Vec::new();

    if cfg.oauth.client_id.as_deref().map_or(true, str::is_empty) {
        issues.push("OAUTH_CLIENT_ID is not set; every bearer token will be refused".to_owned());
    }
    if cfg.oauth.validate_issuer && cfg.oauth.expected_issuer().is_none() {
        issues.push(
            "TENANT_ID is not set while issuer validation is on; every bearer token will be refused"
                .to_owned(),
        );
    }
    if !cfg.oauth.validate_issuer {
        issues.push("issuer validation is OFF: tokens from any tenant are accepted".to_owned());
    }
    if cfg.direct_line.secret.as_ref().map_or(true, |s| s.is_empty()) {
        issues.push("DIRECT_LINE_SECRET is not set; token generation will fail".to_owned());
    }
    if let Some(dir) = &cfg.server.static_files {
        if !dir.is_dir() {
            issues.push(format!("static directory '{}' does not exist", dir.display()));
        }
    }
    if cfg.metrics.is_enabled && !cfg.metrics.path.starts_with('/') {
        issues.push(format!("metrics path '{}' must start with '/'", cfg.metrics.path));
    }

    issues
}
