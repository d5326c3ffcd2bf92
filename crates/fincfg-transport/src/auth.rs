//! Credentials and the OAuth2 client-credentials token cache

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Tokens are treated as expired this long before their real expiry
pub const DEFAULT_TOKEN_MARGIN: Duration = Duration::from_secs(30);

/// OAuth2 client-credentials triple
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// HTTP Basic username/password pair
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Everything the client may authenticate with.
///
/// OAuth2 is preferred when configured; Basic is used otherwise, or as a
/// fallback when token acquisition fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub oauth: Option<ClientCredentials>,
    pub basic: Option<BasicCredentials>,
}

impl Credentials {
    /// Read `CLIENT_ID`/`CLIENT_SECRET`/`TOKEN_URL` and `USERNAME`/`PASSWORD`
    /// from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Credentials::from_env`] with a custom variable source.
    ///
    /// A group is only used when every variable in it is non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let oauth = match (get("CLIENT_ID"), get("CLIENT_SECRET"), get("TOKEN_URL")) {
            (Some(client_id), Some(client_secret), Some(token_url)) => Some(ClientCredentials {
                client_id,
                client_secret,
                token_url,
            }),
            _ => None,
        };
        let basic = match (get("USERNAME"), get("PASSWORD")) {
            (Some(username), Some(password)) => Some(BasicCredentials { username, password }),
            _ => None,
        };

        Self { oauth, basic }
    }

    pub fn is_empty(&self) -> bool {
        self.oauth.is_none() && self.basic.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_expired_at(&self, now: Instant, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

/// Acquires and caches OAuth2 access tokens.
///
/// The cache lock is held across acquisition, so back-to-back callers never
/// fetch two tokens inside the same validity window.
pub struct TokenManager {
    credentials: ClientCredentials,
    margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(credentials: ClientCredentials, margin: Duration) -> Self {
        Self {
            credentials,
            margin,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, acquiring a new one if the cached token
    /// is missing or within the safety margin of its expiry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the token endpoint is unreachable, rejects
    /// the credentials, or answers with something other than a token.
    pub fn bearer(&self, http: &reqwest::blocking::Client) -> Result<String> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| Error::auth("token cache lock poisoned"))?;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired_at(Instant::now(), self.margin) {
                return Ok(token.access_token.clone());
            }
            debug!("Cached access token is within {:?} of expiry", self.margin);
        }

        let token = self.acquire(http)?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-acquires
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }

    fn acquire(&self, http: &reqwest::blocking::Client) -> Result<CachedToken> {
        debug!("Fetching OAuth2 access token from {}", self.credentials.token_url);

        let response = http
            .post(&self.credentials.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ])
            .send()
            .map_err(|e| Error::auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::auth(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                crate::client::truncate(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| Error::auth(format!("invalid token response: {}", e)))?;
        let lifetime = token
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        debug!("Acquired access token valid for {:?}", lifetime);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("margin", &self.margin)
            .finish_non_exhaustive()
    }
}
