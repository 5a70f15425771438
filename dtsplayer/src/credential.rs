//! Bearer credential issued by the Spotify accounts service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Access/refresh token pair with the access token expiry.
///
/// A credential is never modified once built: a refresh produces a new
/// value that supersedes the previous one. The JSON form uses the field
/// names of the OAuth2 token document (`access_token`, `token_type`,
/// `refresh_token`, `expiry`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    expiry: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            refresh_token: refresh_token.into(),
            expiry,
        }
    }

    /// Builds a credential valid for `expires_in` from now
    pub fn expiring_in(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: Duration,
    ) -> Self {
        let expires_in = chrono::Duration::from_std(expires_in).unwrap_or(chrono::Duration::zero());
        Self::new(access_token, refresh_token, Utc::now() + expires_in)
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Validity left at `now`, zero once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expiry - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Validity left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// True when the access token expires within `margin`
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.remaining() <= margin
    }
}

// Les jetons ne doivent jamais apparaître dans les logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expiry", &self.expiry)
            .finish()
    }
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining() {
        let now = Utc::now();
        let credential = Credential::new("a", "r", now + chrono::Duration::seconds(90));
        assert_eq!(credential.remaining_at(now), Duration::from_secs(90));

        let expired = Credential::new("a", "r", now - chrono::Duration::seconds(1));
        assert_eq!(expired.remaining_at(now), Duration::ZERO);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_expires_within() {
        let credential = Credential::expiring_in("a", "r", Duration::from_secs(30));
        assert!(credential.expires_within(Duration::from_secs(60)));
        assert!(!credential.expires_within(Duration::from_secs(5)));
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{
            "access_token": "BQD",
            "token_type": "Bearer",
            "refresh_token": "AQB",
            "expiry": "2030-01-01T12:00:00Z"
        }"#;
        let credential: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(credential.access_token(), "BQD");
        assert_eq!(credential.refresh_token(), "AQB");
        assert_eq!(credential.expiry().to_rfc3339(), "2030-01-01T12:00:00+00:00");

        let value = serde_json::to_value(&credential).unwrap();
        assert_eq!(value["token_type"], "Bearer");
    }

    #[test]
    fn test_debug_hides_tokens() {
        let credential = Credential::expiring_in("secret-access", "secret-refresh", Duration::from_secs(60));
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }
}
