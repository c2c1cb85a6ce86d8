//! Claim set carried by gateway tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Distinguishes access tokens from refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    Access,
    Refresh,
}

/// Signed payload of a token.
///
/// Field names on the wire follow the auth service: `userId`, `role`,
/// `category`, `iat`, `exp`. Any other claim is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub subject: String,

    pub role: String,

    pub category: TokenCategory,

    /// Issued-at, seconds since the Unix epoch.
    #[serde(rename = "iat")]
    pub issued_at: u64,

    /// Expiration, seconds since the Unix epoch.
    #[serde(rename = "exp")]
    pub expiration: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(
        subject: impl Into<String>,
        role: impl Into<String>,
        category: TokenCategory,
        issued_at: u64,
        expiration: u64,
    ) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
            category,
            issued_at,
            expiration,
            extra: Map::new(),
        }
    }

    /// Claims issued now and valid for `ttl`.
    pub fn issue(
        subject: impl Into<String>,
        role: impl Into<String>,
        category: TokenCategory,
        ttl: Duration,
    ) -> Self {
        let now = jsonwebtoken::get_current_timestamp();
        Self::new(subject, role, category, now, now + ttl.as_secs())
    }

    /// Look up a claim by its wire name.
    pub fn claim(&self, name: &str) -> Option<Value> {
        match name {
            "userId" => Some(Value::String(self.subject.clone())),
            "role" => Some(Value::String(self.role.clone())),
            "category" => serde_json::to_value(self.category).ok(),
            "iat" => Some(Value::from(self.issued_at)),
            "exp" => Some(Value::from(self.expiration)),
            other => self.extra.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let claims = Claims::new("user123", "ROLE_USER", TokenCategory::Access, 10, 20);
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({"userId": "user123", "role": "ROLE_USER", "category": "access", "iat": 10, "exp": 20})
        );
    }

    #[test]
    fn test_claim_lookup() {
        let mut claims = Claims::new("user123", "ROLE_ADMIN", TokenCategory::Refresh, 10, 20);
        claims.extra.insert("tenant".into(), json!("books"));

        assert_eq!(claims.claim("userId"), Some(json!("user123")));
        assert_eq!(claims.claim("role"), Some(json!("ROLE_ADMIN")));
        assert_eq!(claims.claim("category"), Some(json!("refresh")));
        assert_eq!(claims.claim("exp"), Some(json!(20)));
        assert_eq!(claims.claim("tenant"), Some(json!("books")));
        assert_eq!(claims.claim("missing"), None);
    }
}
