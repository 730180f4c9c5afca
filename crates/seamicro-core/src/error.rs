//! Error types for chassis operations.
//!
//! HTTP failures are classified by status code so callers can match on the
//! error kind; the transport relies on the same classification to decide
//! between the re-authentication path and the connection-refused path.

use thiserror::Error;

/// Maximum number of response-body bytes kept in an error message.
pub const MAX_BODY_SNIPPET: usize = 200;

/// Main error type for chassis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The endpoint refused the connection.
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// HTTP 401 from the endpoint.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 400 from the endpoint.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP 403 from the endpoint.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404, or no match in a `find`).
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 409 from the endpoint.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other HTTP status >= 400.
    #[error("HTTP {status} {reason} for {method} {url}: {body}")]
    Http {
        /// Numeric status code
        status: u16,
        /// Canonical reason phrase
        reason: String,
        /// Request method
        method: String,
        /// Request URL
        url: String,
        /// Truncated response body
        body: String,
    },

    /// Login succeeded at the HTTP level but no token was issued.
    #[error("Authorization failure: {0}")]
    AuthorizationFailure(String),

    /// More than one resource matched a `find`.
    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    /// Attribute still missing after the single lazy load.
    #[error("{kind} has no attribute `{attribute}`")]
    AttributeNotFound {
        /// Resource kind name
        kind: String,
        /// Requested attribute
        attribute: String,
    },

    /// No client is registered for the requested API version.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Caller supplied an invalid argument.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint or path
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Request rejected before any I/O
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport failure that is neither a timeout nor a refusal
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Response could not be decoded
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Specialized result type for chassis operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionRefused(_) => "CONNECTION_REFUSED",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Http { .. } => "HTTP_STATUS",
            Self::AuthorizationFailure(_) => "AUTHORIZATION_FAILURE",
            Self::AmbiguousMatch(_) => "AMBIGUOUS_MATCH",
            Self::AttributeNotFound { .. } => "ATTRIBUTE_NOT_FOUND",
            Self::UnsupportedVersion(_) => "UNSUPPORTED_VERSION",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Timeout(_) => "TIMEOUT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
        }
    }

    /// Returns true for rejections that a fresh login may cure.
    #[must_use]
    pub const fn is_auth_class(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::BadRequest(_))
    }

    /// Returns true if the endpoint refused the connection.
    #[must_use]
    pub const fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused(_))
    }

    /// Returns the HTTP status this error was built from, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::BadRequest(_) => Some(400),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::ConfigError(_) | Self::ParseError(_) | Self::HttpError(_)
        )
    }

    /// Classify an HTTP error response.
    ///
    /// A 400 whose body carries a connection-refusal marker becomes
    /// [`Error::ConnectionRefused`]; some proxies report refusals that way.
    #[must_use]
    pub fn from_status(status: u16, method: &str, url: &str, body: &str) -> Self {
        if status == 400 && is_refusal_text(body) {
            return Self::ConnectionRefused(snippet(body));
        }

        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        let detail = format!(
            "{reason} (HTTP {status}) for {method} {url}: {}",
            snippet(body)
        );

        match status {
            400 => Self::BadRequest(detail),
            401 => Self::Unauthorized(detail),
            403 => Self::Forbidden(detail),
            404 => Self::NotFound(detail),
            409 => Self::Conflict(detail),
            _ => Self::Http {
                status,
                reason,
                method: method.to_string(),
                url: url.to_string(),
                body: snippet(body),
            },
        }
    }
}

/// Returns true if a response body reports a refused connection.
#[must_use]
pub fn is_refusal_text(body: &str) -> bool {
    body.contains("Connection refused") || body.contains("actively refused")
}

/// Truncate a response body for inclusion in an error message.
#[must_use]
pub fn snippet(body: &str) -> String {
    if body.len() <= MAX_BODY_SNIPPET {
        return body.to_string();
    }
    let mut end = MAX_BODY_SNIPPET;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [{} bytes total]", &body[..end], body.len())
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionRefused(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
