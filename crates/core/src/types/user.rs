//! Authenticated shopper identity: the bearer credential and the cached
//! profile record returned by `/user/me`.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Opaque bearer credential issued at login or OAuth callback.
///
/// `Debug` is redacted so tokens never end up in logs or error reports.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the backend handed back an empty string.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Shopper profile as returned by the backend.
///
/// This is a display cache. Authorization decisions are made from the
/// token alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "ID", alias = "id")]
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(rename = "CreatedAt", alias = "created_at", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", alias = "updated_at", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "pending".to_string()
}

impl UserProfile {
    /// Name to greet the shopper with, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = BearerToken::new("eyJhbGciOi.secret");
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn test_profile_parses_backend_shape() {
        let json = r#"{
            "ID": 12,
            "CreatedAt": "2024-03-01T10:00:00Z",
            "UpdatedAt": "2024-03-02T10:00:00Z",
            "DeletedAt": null,
            "google_id": "g-123",
            "email": "jane@example.com",
            "name": "Jane",
            "picture": null
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, UserId::new(12));
        assert_eq!(profile.status, "pending");
        assert_eq!(profile.google_id.as_deref(), Some("g-123"));
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_profile_accepts_lowercase_keys() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"id": 3, "email": "a@b.co"}"#).unwrap();
        assert_eq!(profile.display_name(), "a@b.co");
    }
}
