//! Configuration structures for chassis clients.
//!
//! [`ChassisConfig`] carries the endpoint, credentials, authentication mode
//! and transport tuning. It is validated on construction and threaded into
//! the transport once; nothing reads process-wide settings afterwards.

use crate::retry::{RetryPolicy, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_SECS};
use crate::Error;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// How credentials are presented to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Log in once and present the issued token.
    #[default]
    Session,
    /// Send username and password with every request; never log in.
    Stateless,
}

/// Configuration for a chassis client instance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChassisConfig {
    /// API base URL including the version prefix (e.g. `https://chassis/v2.0`)
    #[validate(url)]
    pub endpoint: String,

    /// Login name
    #[validate(length(min = 1))]
    pub username: String,

    /// Login password
    #[serde(skip_serializing)]
    pub password: SecretString,

    /// Authentication mode
    #[serde(default)]
    pub auth_mode: AuthMode,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts after a refused connection
    #[validate(range(min = 0, max = 10))]
    #[serde(default = "default_connection_retries")]
    pub connection_retries: u32,

    /// Fixed delay between connection attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Log every request and response at debug level
    #[serde(default)]
    pub log_http: bool,

    /// Whether to verify TLS certificates
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_connection_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

const fn default_tls_verify() -> bool {
    true
}

impl ChassisConfig {
    /// Create a new client configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a URL or the username is empty.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            auth_mode: AuthMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
            connection_retries: default_connection_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            log_http: false,
            tls_verify: default_tls_verify(),
        };

        config.check()?;
        Ok(config)
    }

    /// Re-run validation, e.g. after `with_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid field.
    pub fn check(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// Set the authentication mode.
    #[must_use]
    pub const fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    /// Switch to stateless per-request credentials.
    #[must_use]
    pub const fn stateless(self) -> Self {
        self.with_auth_mode(AuthMode::Stateless)
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the number of extra attempts after a refused connection.
    #[must_use]
    pub const fn with_connection_retries(mut self, retries: u32) -> Self {
        self.connection_retries = retries;
        self
    }

    /// Set the delay between connection attempts.
    #[must_use]
    pub const fn with_retry_delay_ms(mut self, millis: u64) -> Self {
        self.retry_delay_ms = millis;
        self
    }

    /// Enable or disable request/response logging.
    #[must_use]
    pub const fn with_logging(mut self, enabled: bool) -> Self {
        self.log_http = enabled;
        self
    }

    /// Set whether to verify TLS certificates.
    #[must_use]
    pub const fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for refused connections.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_retries(self.connection_retries)
            .with_delay(Duration::from_millis(self.retry_delay_ms))
    }

    /// Parse and validate the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_endpoint(&self) -> Result<Url, Error> {
        Url::parse(&self.endpoint)
            .map_err(|e| Error::ConfigError(format!("Invalid endpoint URL: {e}")))
    }
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost/v2.0".to_string(),
            username: "admin".to_string(),
            password: SecretString::from("seamicro".to_string()),
            auth_mode: AuthMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
            connection_retries: default_connection_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            log_http: false,
            tls_verify: default_tls_verify(),
        }
    }
}
