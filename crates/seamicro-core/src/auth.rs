//! Credentials, login markers and credential placement.
//!
//! GET and DELETE requests carry credentials as query parameters; POST and
//! PUT requests carry them inside the JSON body. Session mode sends the
//! issued token in bodies and the username/password pair in queries, which
//! is what the chassis expects.

use crate::query::QueryParams;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

/// Path of the login endpoint, relative to the API base.
pub const LOGIN_PATH: &str = "/login";

/// Marker that a successful login response must contain.
pub const TOKEN_MARKER: &str = "OpaqueRef";

/// Body key carrying the session token on POST/PUT requests.
pub const TOKEN_FIELD: &str = "authtoken";

/// Distinguishes the login exchange from ordinary requests.
///
/// A login request never carries token credentials and never triggers the
/// re-authentication path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestKind {
    /// Ordinary API request.
    #[default]
    Normal,
    /// The login exchange itself.
    Login,
}

/// Username and password pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials from a username and secret password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// Login name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// JSON body posted to the login endpoint.
    #[must_use]
    pub fn login_body(&self) -> Value {
        json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        })
    }

    /// Append `username` and `password` query parameters.
    pub fn push_query(&self, query: &mut QueryParams) {
        query.push("username", &self.username);
        query.push("password", self.password.expose_secret());
    }

    /// Embed `username` and `password` into a request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when the body is not a JSON object.
    pub fn embed(&self, body: &mut Option<Value>) -> Result<()> {
        let map = object_body(body)?;
        map.insert("username".to_string(), Value::String(self.username.clone()));
        map.insert(
            "password".to_string(),
            Value::String(self.password.expose_secret().to_string()),
        );
        Ok(())
    }
}

/// Embed a session token into a request body.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] when the body is not a JSON object.
pub fn embed_token(body: &mut Option<Value>, token: &SecretString) -> Result<()> {
    let map = object_body(body)?;
    map.insert(
        TOKEN_FIELD.to_string(),
        Value::String(token.expose_secret().to_string()),
    );
    Ok(())
}

/// Pull the session token out of a login response body.
///
/// The chassis answers with a bare `OpaqueRef:...` string; an object keyed
/// by the marker is accepted too.
#[must_use]
pub fn extract_token(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if text.contains(TOKEN_MARKER) => Some(text.clone()),
        Value::Object(map) => map.get(TOKEN_MARKER).map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }),
        _ => None,
    }
}

fn object_body(body: &mut Option<Value>) -> Result<&mut Map<String, Value>> {
    match body.get_or_insert_with(|| Value::Object(Map::new())) {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidRequest(format!(
            "request body must be a JSON object to carry credentials, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("admin", SecretString::from("pw".to_string()))
    }

    #[test]
    fn login_body_contains_both_fields() {
        assert_eq!(
            creds().login_body(),
            json!({"username": "admin", "password": "pw"})
        );
    }

    #[test]
    fn embed_creates_body_when_absent() {
        let mut body = None;
        creds().embed(&mut body).unwrap();
        assert_eq!(body, Some(json!({"username": "admin", "password": "pw"})));
    }

    #[test]
    fn embed_token_keeps_existing_fields() {
        let mut body = Some(json!({"action": "power-on"}));
        embed_token(&mut body, &SecretString::from("OpaqueRef:abc".to_string())).unwrap();
        assert_eq!(
            body,
            Some(json!({"action": "power-on", "authtoken": "OpaqueRef:abc"}))
        );
    }

    #[test]
    fn embed_rejects_non_object_body() {
        let mut body = Some(json!([1, 2]));
        let err = creds().embed(&mut body).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn query_credentials() {
        let mut query = QueryParams::new();
        creds().push_query(&mut query);
        assert_eq!(
            query.into_pairs(),
            vec![
                ("username", "admin".to_string()),
                ("password", "pw".to_string())
            ]
        );
    }

    #[test]
    fn token_extraction() {
        assert_eq!(
            extract_token(&json!("OpaqueRef:1234")),
            Some("OpaqueRef:1234".to_string())
        );
        assert_eq!(
            extract_token(&json!({"OpaqueRef": "abcd"})),
            Some("abcd".to_string())
        );
        assert_eq!(extract_token(&json!("Login failed")), None);
        assert_eq!(extract_token(&json!({"error": "denied"})), None);
        assert_eq!(extract_token(&Value::Null), None);
    }
}
