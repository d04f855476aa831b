use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifies one browser session. Carried in the `session_id` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a cookie value.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The token pair issued by the restaurant API.
///
/// Both tokens are wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    /// Short-lived credential sent as `Authorization: Bearer`.
    pub access_token: String,
    /// Long-lived credential used to mint a new access token.
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Applies a refresh answer. A rotated refresh token replaces the stored one.
    pub fn rotated(&self, grant: &RefreshGrant) -> Self {
        Self {
            access_token: grant.access.clone(),
            refresh_token: grant
                .refresh
                .clone()
                .or_else(|| self.refresh_token.clone()),
        }
    }

    /// The `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Tokens never reach the logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Answer of `POST /api/auth/token/`.
#[derive(Deserialize)]
pub struct TokenGrant {
    pub access: String,
    pub refresh: String,
}

impl From<TokenGrant> for Session {
    fn from(grant: TokenGrant) -> Self {
        Session::new(grant.access, Some(grant.refresh))
    }
}

/// Body of the refresh and logout calls.
#[derive(Serialize)]
pub struct RefreshBody<'a> {
    pub refresh: &'a str,
}

/// Answer of `POST /api/auth/token/refresh/`.
#[derive(Deserialize, Clone)]
pub struct RefreshGrant {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_keeps_refresh_token_unless_replaced() {
        let session = Session::new("A1", Some("R1".into()));

        let kept = session.rotated(&RefreshGrant { access: "A2".into(), refresh: None });
        assert_eq!(kept.access_token, "A2");
        assert_eq!(kept.refresh_token.as_deref(), Some("R1"));

        let rotated = session.rotated(&RefreshGrant {
            access: "A3".into(),
            refresh: Some("R2".into()),
        });
        assert_eq!(rotated.refresh_token.as_deref(), Some("R2"));
    }

    #[test]
    fn debug_output_hides_tokens() {
        let session = Session::new("secret-access", Some("secret-refresh".into()));
        let printed = format!("{:?}", session);
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn session_id_parses_cookie_values() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("not-a-uuid"), None);
    }
}
