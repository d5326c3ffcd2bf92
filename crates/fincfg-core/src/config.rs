//! Run configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. `fincfg.toml` (or the file given with `--config`)
//! 3. environment variables (alert sinks)
//! 4. command-line flags, applied by the CLI
//!
//! ```toml
//! [remote]
//! url = "https://fineract.example.org/fineract-provider/api/v1"
//! tenant = "default"
//! timeout_secs = 30
//!
//! [loader]
//! max_passes = 5
//!
//! [alerts.webhook]
//! url = "https://hooks.slack.com/services/T000/B000/XXXX"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fincfg_transport::{ClientConfig, RetryPolicy};

use crate::loader::{DEFAULT_MAX_PASSES, LoaderOptions};
use crate::{Error, Result};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "fincfg.toml";

pub const DEFAULT_EMAIL_SUBJECT: &str = "Fineract Configuration Drift Detected";

fn default_tenant() -> String {
    "default".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_margin_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    DEFAULT_EMAIL_SUBJECT.to_string()
}

/// `[remote]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSection {
    /// API base URL, e.g. `https://host/fineract-provider/api/v1`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_token_margin_secs")]
    pub token_margin_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            url: None,
            tenant: default_tenant(),
            timeout_secs: default_timeout_secs(),
            verify_tls: true,
            token_margin_secs: default_token_margin_secs(),
        }
    }
}

/// `[retry]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// `[loader]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSection {
    /// Pass budget, pass 0 included
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
        }
    }
}

/// `[drift]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftSection {
    /// Kinds checked when none are named on the command line; empty means all
    #[serde(default)]
    pub kinds: Vec<String>,
}

/// `[alerts.webhook]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
}

/// `[alerts.email]`
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// STARTTLS when true, implicit TLS when false
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: true,
            from: String::new(),
            to: Vec::new(),
            subject: default_subject(),
        }
    }
}

impl EmailConfig {
    /// Host, sender and at least one recipient are set
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.from.trim().is_empty() && !self.to.is_empty()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .finish()
    }
}

/// `[alerts]` section; an absent sink is disabled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Fully layered configuration for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub loader: LoaderSection,
    #[serde(default)]
    pub drift: DriftSection,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

impl RunConfig {
    /// Parse configuration from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the explicit file, else `fincfg.toml` in `dir` if present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            tracing::debug!(path = ?fallback, "Loading configuration");
            Self::load(&fallback)
        } else {
            Ok(Self::default())
        }
    }

    /// Overlay alert settings from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Overlay alert settings from `lookup`; blank values count as unset
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = var("SLACK_WEBHOOK_URL") {
            self.alerts.webhook = Some(WebhookConfig { url });
        }

        let email_vars = [
            "SMTP_HOST",
            "SMTP_PORT",
            "SMTP_USERNAME",
            "SMTP_PASSWORD",
            "SMTP_USE_TLS",
            "ALERT_EMAIL_FROM",
            "ALERT_EMAIL_TO",
            "ALERT_EMAIL_SUBJECT",
        ];
        if email_vars.iter().all(|name| var(name).is_none()) {
            return Ok(());
        }

        let email = self.alerts.email.get_or_insert_with(EmailConfig::default);
        if let Some(host) = var("SMTP_HOST") {
            email.host = host;
        }
        if let Some(port) = var("SMTP_PORT") {
            email.port = port
                .parse()
                .map_err(|_| Error::invalid_config(format!("SMTP_PORT '{}' is not a port number", port)))?;
        }
        if let Some(username) = var("SMTP_USERNAME") {
            email.username = Some(username);
        }
        if let Some(password) = var("SMTP_PASSWORD") {
            email.password = Some(password);
        }
        if let Some(flag) = var("SMTP_USE_TLS") {
            email.use_tls = parse_flag(&flag)
                .ok_or_else(|| Error::invalid_config(format!("SMTP_USE_TLS '{}' is not true or false", flag)))?;
        }
        if let Some(from) = var("ALERT_EMAIL_FROM") {
            email.from = from;
        }
        if let Some(to) = var("ALERT_EMAIL_TO") {
            email.to = to
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(subject) = var("ALERT_EMAIL_SUBJECT") {
            email.subject = subject;
        }
        Ok(())
    }

    /// Transport settings for [`fincfg_transport::ApiClient`]
    pub fn client_config(&self) -> Result<ClientConfig> {
        let url = self
            .remote
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::invalid_config("remote URL is not set (use --remote-url or [remote] url)"))?;
        if self.retry.max_attempts == 0 {
            return Err(Error::invalid_config("retry.max_attempts must be at least 1"));
        }

        let mut config = ClientConfig::new(url, self.remote.tenant.clone());
        config.timeout = Duration::from_secs(self.remote.timeout_secs);
        config.verify_tls = self.remote.verify_tls;
        config.token_margin = Duration::from_secs(self.remote.token_margin_secs);
        config.retry = RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_interval: Duration::from_millis(self.retry.initial_backoff_ms),
            ..RetryPolicy::default()
        };
        Ok(config)
    }

    pub fn loader_options(&self, dry_run: bool) -> LoaderOptions {
        LoaderOptions {
            max_passes: self.loader.max_passes,
            dry_run,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
