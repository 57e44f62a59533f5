//! Token-based namespace scoping
//!
//! `AUTH_TOKENS` holds a JSON object mapping bearer tokens to the
//! namespaces they may touch; `"*"` grants everything. When the variable
//! is absent the transport decides whether to run open (stdio) or refuse
//! (network).

use crate::{EngineError, EngineResult};
use std::collections::HashMap;

/// Token → namespace-scope table
#[derive(Clone, Debug, Default)]
pub struct AuthTokens {
    scopes: HashMap<String, Vec<String>>,
}

impl AuthTokens {
    /// Parse the `AUTH_TOKENS` JSON shape
    pub fn parse(json: &str) -> EngineResult<Self> {
        let scopes: HashMap<String, Vec<String>> = serde_json::from_str(json)
            .map_err(|e| EngineError::Validation(format!("bad AUTH_TOKENS: {e}")))?;
        Ok(Self { scopes })
    }

    /// Read from the environment; `Ok(None)` when unset
    pub fn from_env() -> EngineResult<Option<Self>> {
        match std::env::var("AUTH_TOKENS") {
            Ok(json) if !json.is_empty() => Ok(Some(Self::parse(&json)?)),
            _ => Ok(None),
        }
    }

    /// Check a bearer token against a namespace
    pub fn authorize(&self, token: Option<&str>, namespace: &str) -> EngineResult<()> {
        let token = token.ok_or(EngineError::Unauthenticated)?;
        let scopes = self
            .scopes
            .get(token)
            .ok_or(EngineError::Unauthenticated)?;
        if scopes.iter().any(|s| s == "*" || s == namespace) {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied(namespace.to_string()))
        }
    }

    /// Number of configured tokens
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check whether no tokens are configured
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_token() {
        let auth = AuthTokens::parse(r#"{"t1": ["ns_a"], "admin": ["*"]}"#).unwrap();
        assert!(auth.authorize(Some("t1"), "ns_a").is_ok());
        assert!(matches!(
            auth.authorize(Some("t1"), "ns_b"),
            Err(EngineError::PermissionDenied(_))
        ));
        assert!(auth.authorize(Some("admin"), "ns_b").is_ok());
    }

    #[test]
    fn test_unknown_or_missing_token() {
        let auth = AuthTokens::parse(r#"{"t1": ["ns_a"]}"#).unwrap();
        assert!(matches!(
            auth.authorize(Some("nope"), "ns_a"),
            Err(EngineError::Unauthenticated)
        ));
        assert!(matches!(
            auth.authorize(None, "ns_a"),
            Err(EngineError::Unauthenticated)
        ));
    }

    #[test]
    fn test_bad_json() {
        assert!(AuthTokens::parse("not json").is_err());
    }
}
