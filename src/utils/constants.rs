//! Shared constants and defaults

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STATIC_FILES: &str = "public";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub const DEFAULT_METADATA_ENDPOINT: &str =
    "https://login.microsoftonline.com/common/v2.0/.well-known/openid-configuration";
pub const ISSUER_TEMPLATE_PREFIX: &str = "https://login.microsoftonline.com/";
pub const ISSUER_TEMPLATE_SUFFIX: &str = "/v2.0";

pub const DEFAULT_DIRECT_LINE_ENDPOINT: &str =
    "https://directline.botframework.com/v3/directline/tokens/generate";

pub const DIRECT_LINE_TOKEN_ROUTE: &str = "/api/directline/token";
pub const INDEX_DOCUMENT: &str = "index.html";

/// Clock skew tolerated on `exp`/`nbf`.
pub const TOKEN_LEEWAY_SECS: u64 = 60;

/// Minimum age of the cached JWKS before an unknown `kid` may force a refetch.
pub const JWKS_REFRESH_COOLDOWN_SECS: u64 = 60;
