//! Blocking HTTP client for the admin API
//!
//! Every call goes through the same path:
//!
//! 1. Resolve an `Authorization` header (cached bearer token, falling back
//!    to Basic when token acquisition fails and a Basic pair exists).
//! 2. Send with bounded exponential backoff on retryable statuses and
//!    network errors.
//! 3. On a 401 under a bearer token, drop the token, re-acquire, and try
//!    the call once more.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{BasicCredentials, Credentials, DEFAULT_TOKEN_MARGIN, TokenManager};
use crate::remote::{Remote, TENANT_HEADER};
use crate::retry::{RetryPolicy, is_retryable};
use crate::{Error, Result};

const USER_AGENT: &str = concat!("fincfg/", env!("CARGO_PKG_VERSION"));
const MAX_BODY_IN_ERROR: usize = 500;

/// Connection settings for [`ApiClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API base, e.g. `https://core.example/fineract-provider/api/v1`
    pub base_url: String,
    pub tenant: String,
    /// Socket timeout per call
    pub timeout: Duration,
    pub verify_tls: bool,
    pub token_margin: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            tenant: tenant.into(),
            timeout: Duration::from_secs(30),
            verify_tls: true,
            token_margin: DEFAULT_TOKEN_MARGIN,
            retry: RetryPolicy::default(),
        }
    }
}

enum Authorization {
    Bearer(String),
    Basic(BasicCredentials),
}

impl Authorization {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
        }
    }
}

/// Authenticated, retrying client implementing [`Remote`]
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
    tokens: Option<TokenManager>,
    basic: Option<BasicCredentials>,
}

impl ApiClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL or tenant is unusable, or
    /// if no credentials are configured at all.
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid remote URL '{}': {}", config.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "remote URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if credentials.is_empty() {
            return Err(Error::config(
                "no credentials configured; set CLIENT_ID/CLIENT_SECRET/TOKEN_URL or USERNAME/PASSWORD",
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let tenant = HeaderValue::from_str(&config.tenant)
            .map_err(|_| Error::config(format!("invalid tenant '{}'", config.tenant)))?;
        headers.insert(TENANT_HEADER, tenant);

        if !config.verify_tls {
            warn!("TLS certificate verification is disabled");
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            tokens: credentials
                .oauth
                .map(|creds| TokenManager::new(creds, config.token_margin)),
            basic: credentials.basic,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorization(&self) -> Result<Authorization> {
        let Some(tokens) = &self.tokens else {
            return self
                .basic
                .clone()
                .map(Authorization::Basic)
                .ok_or_else(|| Error::auth("no credentials configured"));
        };

        match tokens.bearer(&self.http) {
            Ok(token) => Ok(Authorization::Bearer(token)),
            Err(e) => match &self.basic {
                Some(basic) => {
                    warn!("OAuth2 token acquisition failed, falling back to Basic auth: {}", e);
                    Ok(Authorization::Basic(basic.clone()))
                }
                None => Err(e),
            },
        }
    }

    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        let mut refreshed = false;

        loop {
            let auth = self.authorization()?;
            match self.send_with_retry(&method, &url, body, &auth) {
                Err(Error::Status { status: 401, .. })
                    if matches!(auth, Authorization::Bearer(_)) && !refreshed =>
                {
                    debug!("{} {} returned 401, re-acquiring token", method, url);
                    if let Some(tokens) = &self.tokens {
                        tokens.invalidate();
                    }
                    refreshed = true;
                }
                Err(Error::Status { status: 401, body, .. }) => {
                    return Err(Error::auth(format!(
                        "{} {} rejected credentials: {}",
                        method, url, body
                    )));
                }
                other => return other,
            }
        }
    }

    fn send_with_retry(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        auth: &Authorization,
    ) -> Result<Value> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        let operation = || {
            attempt += 1;
            let mut request = auth.apply(self.http.request(method.clone(), url));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send() {
                Ok(response) => response,
                Err(e) => {
                    let message = e.to_string();
                    if attempt >= max_attempts {
                        return Err(backoff::Error::permanent(Error::RetriesExhausted {
                            method: method.to_string(),
                            url: url.to_string(),
                            attempts: attempt,
                            last: message,
                        }));
                    }
                    warn!("{} {} attempt {}/{} failed: {}", method, url, attempt, max_attempts, message);
                    return Err(backoff::Error::transient(Error::Network {
                        method: method.to_string(),
                        url: url.to_string(),
                        message,
                    }));
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                return decode(url, response).map_err(backoff::Error::permanent);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = truncate(&response.text().unwrap_or_default());

            if !is_retryable(status) {
                return Err(backoff::Error::permanent(Error::Status {
                    method: method.to_string(),
                    url: url.to_string(),
                    status,
                    body: text,
                }));
            }
            if attempt >= max_attempts {
                return Err(backoff::Error::permanent(Error::RetriesExhausted {
                    method: method.to_string(),
                    url: url.to_string(),
                    attempts: attempt,
                    last: format!("status {}: {}", status, text),
                }));
            }

            warn!("{} {} returned {} (attempt {}/{}), retrying", method, url, status, attempt, max_attempts);
            let err = Error::Status {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: text,
            };
            match retry_after {
                Some(wait) if status == 429 => Err(backoff::Error::retry_after(err, wait)),
                _ => Err(backoff::Error::transient(err)),
            }
        };

        backoff::retry(self.retry.backoff(), operation).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

impl Remote for ApiClient {
    fn get(&self, path: &str) -> Result<Value> {
        self.call(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.call(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.call(Method::PUT, path, Some(body))
    }
}

fn decode(url: &str, response: reqwest::blocking::Response) -> Result<Value> {
    let text = response.text().map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn truncate(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_IN_ERROR) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
