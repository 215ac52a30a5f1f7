use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Caller identity derived from a validated bearer token.
///
/// Lives in the request extensions for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    /// `sub` claim; the id forwarded to the gateway
    pub id: String,
    pub name: Option<String>,
    pub upn: Option<String>,
}

/// Claims read from an identity token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub preferred_name: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
}

impl IdTokenClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

impl From<IdTokenClaims> for UserIdentity {
    fn from(claims: IdTokenClaims) -> Self {
        // v2.0 tokens carry `preferred_username`, v1.0 tokens `upn`
        let upn = claims
            .preferred_username
            .or(claims.preferred_name)
            .or(claims.upn);
        Self {
            id: claims.sub,
            name: claims.name,
            upn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: serde_json::Value) -> IdTokenClaims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn identity_uses_sub_name_and_preferred_username() {
        let identity: UserIdentity = claims(json!({
            "sub": "abc123",
            "exp": 1_900_000_000,
            "name": "Ada Lovelace",
            "preferred_username": "ada@contoso.com",
            "upn": "legacy@contoso.com"
        }))
        .into();

        assert_eq!(identity.id, "abc123");
        assert_eq!(identity.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(identity.upn.as_deref(), Some("ada@contoso.com"));
    }

    #[test]
    fn upn_falls_back_through_alternative_claims() {
        let from_preferred_name: UserIdentity = claims(json!({
            "sub": "s", "exp": 1, "preferred_name": "pn"
        }))
        .into();
        assert_eq!(from_preferred_name.upn.as_deref(), Some("pn"));

        let from_upn: UserIdentity = claims(json!({"sub": "s", "exp": 1, "upn": "u"})).into();
        assert_eq!(from_upn.upn.as_deref(), Some("u"));

        let bare: UserIdentity = claims(json!({"sub": "s", "exp": 1})).into();
        assert_eq!(bare.upn, None);
        assert_eq!(bare.name, None);
    }

    #[test]
    fn expiry_is_exposed_as_utc_timestamp() {
        let c = claims(json!({"sub": "s", "exp": 1_700_000_000}));
        assert_eq!(c.expires_at().map(|t| t.timestamp()), Some(1_700_000_000));
    }
}
