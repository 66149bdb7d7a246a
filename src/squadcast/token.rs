//! Access-token lifecycle.
//!
//! Squadcast hands out short-lived bearer tokens in exchange for a long-lived
//! refresh secret. A [`Credential`] is replaced wholesale on refresh and is
//! considered stale once three quarters of its validity window has elapsed.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Method;

use super::client::ApiClient;
use super::types::AccessTokenResponse;
use crate::errors::ApiError;

const ACCESS_TOKEN_PATH: &str = "/v3/oauth/access-token";

#[derive(Clone)]
pub struct Credential {
    token: String,
    issued_at: Instant,
    validity: Duration,
}

impl Credential {
    pub fn new(token: impl Into<String>, issued_at: Instant, validity: Duration) -> Self {
        Self {
            token: token.into(),
            issued_at,
            validity,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// True once more than 75% of the validity window has passed at `now`.
    pub fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) > self.validity * 3 / 4
    }

    /// Remaining lifetime at `now`, zero once expired.
    pub fn expires_in(&self, now: Instant) -> Duration {
        self.validity
            .saturating_sub(now.saturating_duration_since(self.issued_at))
    }
}

// Keep the bearer token out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("validity", &self.validity)
            .finish()
    }
}

/// Exchanges the refresh secret for access tokens.
#[derive(Clone)]
pub struct TokenManager {
    client: ApiClient,
    refresh_token: String,
}

impl TokenManager {
    pub fn new(client: ApiClient, refresh_token: impl Into<String>) -> Self {
        Self {
            client,
            refresh_token: refresh_token.into(),
        }
    }

    /// Fetch a fresh access token. Every failure mode maps to [`ApiError::Auth`].
    pub async fn acquire(&self) -> Result<Credential, ApiError> {
        let req = self
            .client
            .request(Method::GET, ACCESS_TOKEN_PATH)
            .header("X-Refresh-Token", &self.refresh_token);

        let resp: AccessTokenResponse = self
            .client
            .execute(ACCESS_TOKEN_PATH, req)
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        if resp.data.access_token.is_empty() {
            return Err(ApiError::Auth("server returned an empty access token".into()));
        }

        let validity = Duration::from_secs(resp.data.validity_secs());
        tracing::info!(validity_secs = validity.as_secs(), "acquired Squadcast access token");

        Ok(Credential::new(resp.data.access_token, Instant::now(), validity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(validity_secs: u64) -> (Credential, Instant) {
        let issued = Instant::now();
        (
            Credential::new("tok", issued, Duration::from_secs(validity_secs)),
            issued,
        )
    }

    #[test]
    fn test_refresh_due_after_three_quarters() {
        let (cred, issued) = credential(100);
        assert!(cred.is_stale(issued + Duration::from_secs(76)));
    }

    #[test]
    fn test_no_refresh_before_three_quarters() {
        let (cred, issued) = credential(100);
        assert!(!cred.is_stale(issued + Duration::from_secs(74)));
        assert!(!cred.is_stale(issued + Duration::from_secs(75)));
    }

    #[test]
    fn test_expires_in_saturates() {
        let (cred, issued) = credential(10);
        assert_eq!(cred.expires_in(issued + Duration::from_secs(4)), Duration::from_secs(6));
        assert_eq!(cred.expires_in(issued + Duration::from_secs(40)), Duration::ZERO);
    }

    #[test]
    fn test_zero_validity_is_immediately_stale() {
        let (cred, issued) = credential(0);
        assert!(cred.is_stale(issued + Duration::from_millis(1)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let (cred, _) = credential(10);
        let out = format!("{:?}", cred);
        assert!(!out.contains("tok\""));
        assert!(out.contains("<redacted>"));
    }
}
