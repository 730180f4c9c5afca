//! Authenticating HTTP transport.
//!
//! Every request passes through three layers:
//!
//! 1. the re-authentication layer (session mode only), which clears the
//!    token, logs in again and retries exactly once after an
//!    [`Error::Unauthorized`] or [`Error::BadRequest`];
//! 2. the connection layer, which repeats the same request after
//!    [`Error::ConnectionRefused`] up to the configured budget with a fixed
//!    delay;
//! 3. a single HTTP exchange that attaches credentials, records timing and
//!    classifies the response.
//!
//! The two retry layers never share a counter.

use crate::auth::{embed_token, extract_token, Credentials, RequestKind, LOGIN_PATH};
use crate::config::{AuthMode, ChassisConfig};
use crate::error::snippet;
use crate::query::QueryParams;
use crate::retry::RetryPolicy;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, Method};
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("seamicro-core/", env!("CARGO_PKG_VERSION"));

const REDACTED: &str = "***";

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// JSON body, sent only with POST and PUT
    pub body: Option<Value>,

    /// Query parameters
    pub query: QueryParams,

    /// Whether this is the login exchange
    pub kind: RequestKind,
}

impl RequestOptions {
    /// Options with no body and no query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the login exchange.
    #[must_use]
    pub fn login(body: Value) -> Self {
        Self {
            body: Some(body),
            query: QueryParams::new(),
            kind: RequestKind::Login,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }
}

/// Status and decoded body of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// Decoded body: JSON when parseable, a JSON string for other text,
    /// `null` when empty
    pub body: Value,
}

impl TransportResponse {
    /// Build a response value.
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// Timing of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTiming {
    /// `"METHOD path"`
    pub label: String,
    /// When the request was sent
    pub started_at: DateTime<Utc>,
    /// When the response (or failure) arrived
    pub finished_at: DateTime<Utc>,
}

impl RequestTiming {
    /// Wall-clock duration of the attempt.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// A single authenticated request/response mechanism shared by all managers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a request against a path relative to the API base.
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse>;

    /// Obtain a session token unless one is already held.
    async fn authenticate(&self) -> Result<()>;

    /// Forget the current session token.
    fn unauthenticate(&self);

    /// Timings recorded since construction or the last reset.
    fn timings(&self) -> Vec<RequestTiming>;

    /// Discard recorded timings.
    fn reset_timings(&self);
}

/// Builder for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    config: ChassisConfig,
    retry_policy: RetryPolicy,
}

impl HttpTransportBuilder {
    /// Create a builder from a validated configuration.
    #[must_use]
    pub fn new(config: ChassisConfig) -> Self {
        Self {
            retry_policy: config.retry_policy(),
            config,
        }
    }

    /// Override the connection retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the HTTP client cannot
    /// be constructed.
    pub fn build(self) -> Result<HttpTransport> {
        let mut base_url = self.config.parse_endpoint()?;
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigError(format!(
                "Endpoint `{}` cannot be used as a base URL",
                self.config.endpoint
            )));
        }
        // Keep the version prefix when joining relative paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = ClientBuilder::new()
            .timeout(self.config.timeout())
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(!self.config.tls_verify)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpTransport {
            http,
            base_url,
            credentials: Credentials::new(self.config.username, self.config.password),
            auth_mode: self.config.auth_mode,
            retry_policy: self.retry_policy,
            log_http: self.config.log_http,
            token: RwLock::new(None),
            timings: Mutex::new(Vec::new()),
        })
    }
}

/// reqwest-backed [`Transport`].
#[derive(Debug)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    credentials: Credentials,
    auth_mode: AuthMode,
    retry_policy: RetryPolicy,
    log_http: bool,
    token: RwLock<Option<SecretString>>,
    timings: Mutex<Vec<RequestTiming>>,
}

impl HttpTransport {
    /// Create a transport for the given configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpTransportBuilder::build`].
    pub fn new(config: ChassisConfig) -> Result<Self> {
        HttpTransportBuilder::new(config).build()
    }

    /// Access the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Active authentication mode.
    #[must_use]
    pub const fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    /// Returns true while a session token is held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.current_token().is_some()
    }

    fn current_token(&self) -> Option<SecretString> {
        self.token.read().map(|token| token.clone()).unwrap_or(None)
    }

    fn store_token(&self, token: Option<SecretString>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    /// Append `path` to the base URL.
    ///
    /// `/` separates segments (compound ids such as `0/p0/vol` stay
    /// hierarchical); every other character is percent-encoded, so `?`, `#`
    /// and spaces in names never leak into the query or fragment.
    fn build_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidEndpoint(format!("Cannot append `{path}` to {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(path.trim_start_matches('/').split('/'));
        Ok(url)
    }

    fn attach_credentials(
        &self,
        method: &Method,
        kind: RequestKind,
        query: &mut QueryParams,
        body: &mut Option<Value>,
    ) -> Result<()> {
        if kind == RequestKind::Login {
            return Ok(());
        }
        let carries_body = *method == Method::POST || *method == Method::PUT;

        match self.auth_mode {
            AuthMode::Stateless if carries_body => self.credentials.embed(body),
            AuthMode::Stateless => {
                self.credentials.push_query(query);
                Ok(())
            }
            AuthMode::Session => match self.current_token() {
                None => Ok(()),
                Some(token) if carries_body => embed_token(body, &token),
                Some(_) => {
                    self.credentials.push_query(query);
                    Ok(())
                }
            },
        }
    }

    fn record_timing(&self, label: String, started_at: DateTime<Utc>) {
        let timing = RequestTiming {
            label,
            started_at,
            finished_at: Utc::now(),
        };
        if let Ok(mut timings) = self.timings.lock() {
            timings.push(timing);
        }
    }

    async fn send_with_retries(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
    ) -> Result<TransportResponse> {
        let max_attempts = self.retry_policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(method, path, options, attempt).await {
                Err(err) if err.is_connection_refused() => {
                    if attempt >= max_attempts {
                        warn!(path, attempt, "connection refused, retries exhausted");
                        return Err(err);
                    }
                    debug!(
                        "Retrying {method} {path} after {:?}: {err}",
                        self.retry_policy.delay
                    );
                    sleep(self.retry_policy.delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        options: &RequestOptions,
        attempt: u32,
    ) -> Result<TransportResponse> {
        let url = self.build_url(path)?;
        let mut query = options.query.clone();
        let mut body = if *method == Method::POST || *method == Method::PUT {
            options.body.clone()
        } else {
            None
        };
        self.attach_credentials(method, options.kind, &mut query, &mut body)?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .query(query.as_pairs())
            .header(ACCEPT, "application/json");
        if let Some(payload) = &body {
            request = request.json(payload);
        }

        info!(path, attempt, "chassis request");
        if self.log_http {
            debug!(
                "REQ: {method} {url} query={:?} body={}",
                redact_query(&query),
                body.as_ref().map_or_else(String::new, |b| redact_body(b).to_string())
            );
        }

        let started_at = Utc::now();
        let result = request.send().await;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.record_timing(format!("{method} {path}"), started_at);
                return Err(Error::from(err.without_url()));
            }
        };
        let status = response.status().as_u16();
        let text = response.text().await;
        self.record_timing(format!("{method} {path}"), started_at);
        let text = text.map_err(|err| Error::from(err.without_url()))?;

        if self.log_http {
            debug!("RESP: {status} {}", snippet(&text));
        }

        if status >= 400 {
            return Err(Error::from_status(status, method.as_str(), url.as_str(), &text));
        }

        Ok(TransportResponse::new(status, decode_body(&text)))
    }

    async fn login(&self) -> Result<()> {
        let options = RequestOptions::login(self.credentials.login_body());
        let response = self
            .send_with_retries(&Method::POST, LOGIN_PATH, &options)
            .await?;

        if response.status != 200 && response.status != 201 {
            return Err(Error::AuthorizationFailure(format!(
                "login returned HTTP {}",
                response.status
            )));
        }

        let token = extract_token(&response.body).ok_or_else(|| {
            Error::AuthorizationFailure(format!(
                "login response for `{}` carried no session token",
                self.credentials.username()
            ))
        })?;
        self.store_token(Some(SecretString::from(token)));
        info!(username = self.credentials.username(), "authenticated");
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse> {
        if !matches!(method, Method::GET | Method::POST | Method::PUT | Method::DELETE) {
            return Err(Error::InvalidRequest(format!(
                "unsupported HTTP method {method}"
            )));
        }

        if options.kind == RequestKind::Login || self.auth_mode == AuthMode::Stateless {
            return self.send_with_retries(&method, path, &options).await;
        }

        match self.send_with_retries(&method, path, &options).await {
            Err(err) if err.is_auth_class() => {
                debug!(path, "request rejected, re-authenticating: {err}");
                self.unauthenticate();
                if let Err(auth_err) = self.authenticate().await {
                    if auth_err.should_log() {
                        warn!(path, "re-authentication failed: {auth_err}");
                    } else {
                        debug!(path, "re-authentication failed: {auth_err}");
                    }
                    return Err(err);
                }
                self.send_with_retries(&method, path, &options).await
            }
            other => other,
        }
    }

    async fn authenticate(&self) -> Result<()> {
        if self.auth_mode == AuthMode::Stateless || self.has_token() {
            return Ok(());
        }
        self.login().await
    }

    fn unauthenticate(&self) {
        self.store_token(None);
    }

    fn timings(&self) -> Vec<RequestTiming> {
        self.timings
            .lock()
            .map(|timings| timings.clone())
            .unwrap_or_default()
    }

    fn reset_timings(&self) {
        if let Ok(mut timings) = self.timings.lock() {
            timings.clear();
        }
    }
}

/// Decode a response body: JSON when possible, otherwise the raw text.
#[must_use]
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn redact_query(query: &QueryParams) -> Vec<(&'static str, String)> {
    query
        .as_pairs()
        .iter()
        .map(|(key, value)| {
            if *key == "password" {
                (*key, REDACTED.to_string())
            } else {
                (*key, value.clone())
            }
        })
        .collect()
}

fn redact_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if key == "password" || key == crate::auth::TOKEN_FIELD {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), value.clone())
                    }
                })
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}
