//! Per-kind gateway between domain operations and the transport.

use crate::filter::{self, Filters};
use crate::resource::{Resource, ResourceId, ResourceKind};
use crate::transport::{RequestOptions, Transport};
use crate::{Error, Result};
use reqwest::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a create or update call.
#[derive(Debug, Clone, PartialEq)]
pub enum Created<K: ResourceKind> {
    /// The response carried the new object.
    Resource(Resource<K>),
    /// The response was a bare identifier string.
    Id(String),
    /// The response carried nothing usable.
    Empty,
}

impl<K: ResourceKind> Created<K> {
    /// Identifier of the created entity, if one was returned.
    #[must_use]
    pub fn id(&self) -> Option<ResourceId> {
        match self {
            Self::Resource(resource) => resource.id(),
            Self::Id(id) => Some(ResourceId::from(id)),
            Self::Empty => None,
        }
    }
}

/// Gateway for one resource kind.
pub struct Manager<K: ResourceKind> {
    transport: Arc<dyn Transport>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Manager<K> {
    /// Create a manager over a shared transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            _kind: PhantomData,
        }
    }

    /// Shared transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// List the collection, optionally narrowed client-side.
    ///
    /// # Errors
    ///
    /// Propagates transport errors and non-attribute filter errors.
    pub async fn list(&self, filters: Option<&Filters>) -> Result<Vec<Resource<K>>> {
        let listing = self.list_at(K::COLLECTION, None).await?;
        match filters {
            Some(filters) if !filters.is_empty() => filter::findall(listing, filters).await,
            _ => Ok(listing),
        }
    }

    /// List an arbitrary path with the same decoding as [`Manager::list`].
    ///
    /// A body turns the request into a POST.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn list_at(&self, path: &str, body: Option<Value>) -> Result<Vec<Resource<K>>> {
        let response = match body {
            Some(body) => {
                self.transport
                    .request(Method::POST, path, RequestOptions::new().with_body(body))
                    .await?
            }
            None => {
                self.transport
                    .request(Method::GET, path, RequestOptions::new())
                    .await?
            }
        };

        let resources: Vec<_> = decode_listing(response.body)
            .into_iter()
            .map(|attrs| Resource::new(self.clone(), attrs, true))
            .collect();
        debug!(kind = K::NAME, count = resources.len(), "decoded listing");
        Ok(resources)
    }

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for kinds without single-item
    /// access, [`Error::ParseError`] when the body is not an object, and
    /// transport errors.
    pub async fn get(&self, id: impl Into<ResourceId>) -> Result<Resource<K>> {
        if !K::SUPPORTS_GET {
            return Err(Error::InvalidRequest(format!(
                "{} does not support fetching single items",
                K::NAME
            )));
        }
        let id = id.into();
        let path = K::item_path(&id);
        let response = self
            .transport
            .request(Method::GET, &path, RequestOptions::new())
            .await?;

        let mut attrs = match response.body {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::ParseError(format!(
                    "expected an object for {} `{id}`, got {other}",
                    K::NAME
                )))
            }
        };
        attrs.insert("id".to_string(), id.to_value());
        Ok(Resource::new(self.clone(), attrs, K::GET_IS_COMPLETE))
    }

    /// POST a body and decode the created entity.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn create(&self, path: &str, body: Value) -> Result<Created<K>> {
        let response = self
            .transport
            .request(Method::POST, path, RequestOptions::new().with_body(body))
            .await?;
        Ok(self.decode_created(response.body))
    }

    /// PUT a body and decode the response like [`Manager::create`].
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn update(&self, path: &str, body: Value) -> Result<Created<K>> {
        let response = self
            .transport
            .request(Method::PUT, path, RequestOptions::new().with_body(body))
            .await?;
        Ok(self.decode_created(response.body))
    }

    /// Delete an item by id.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn delete(&self, id: impl Into<ResourceId>) -> Result<()> {
        self.delete_path(&K::item_path(&id.into())).await
    }

    /// Delete an arbitrary path.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn delete_path(&self, path: &str) -> Result<()> {
        self.transport
            .request(Method::DELETE, path, RequestOptions::new())
            .await?;
        Ok(())
    }

    /// Run a named action against an item: `PUT <item> {"action": name, ...}`.
    ///
    /// Keys in `params` other than `action` are merged into the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] when `params` is not an object, and
    /// transport errors.
    pub async fn action(
        &self,
        name: &str,
        id: impl Into<ResourceId>,
        params: Option<Value>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("action".to_string(), Value::String(name.to_string()));
        match params {
            None | Some(Value::Null) => {}
            Some(Value::Object(extra)) => {
                for (key, value) in extra {
                    if key != "action" {
                        body.insert(key, value);
                    }
                }
            }
            Some(other) => {
                return Err(Error::InvalidRequest(format!(
                    "action parameters must be an object, got {other}"
                )))
            }
        }

        let path = K::item_path(&id.into());
        self.put_path(&path, Value::Object(body)).await
    }

    /// PUT a body to an arbitrary sub-resource and return the decoded body.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn put_path(&self, path: &str, body: Value) -> Result<Value> {
        let response = self
            .transport
            .request(Method::PUT, path, RequestOptions::new().with_body(body))
            .await?;
        Ok(response.body)
    }

    /// All listed items satisfying every predicate.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn findall(&self, filters: &Filters) -> Result<Vec<Resource<K>>> {
        let listing = self.list_at(K::COLLECTION, None).await?;
        filter::findall(listing, filters).await
    }

    /// The single listed item satisfying every predicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for zero matches and
    /// [`Error::AmbiguousMatch`] for more than one.
    pub async fn find(&self, filters: &Filters) -> Result<Resource<K>> {
        let matches = self.findall(filters).await?;
        filter::exactly_one(matches, filters)
    }

    fn decode_created(&self, body: Value) -> Created<K> {
        match body {
            Value::String(text) => {
                let id = text.split_once('/').map_or(text.as_str(), |(_, rest)| rest);
                Created::Id(id.to_string())
            }
            Value::Object(map) => match map.values().next().map(Value::is_object) {
                None => Created::Empty,
                Some(true) => match map.into_iter().next() {
                    Some((key, Value::Object(mut attrs))) => {
                        attrs.insert("id".to_string(), Value::String(key));
                        Created::Resource(Resource::new(self.clone(), attrs, false))
                    }
                    _ => Created::Empty,
                },
                // A flat object is the created entity itself.
                Some(false) => Created::Resource(Resource::new(self.clone(), map, false)),
            },
            _ => Created::Empty,
        }
    }
}

impl<K: ResourceKind> Clone for Manager<K> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> fmt::Debug for Manager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("kind", &K::NAME)
            .field("collection", &K::COLLECTION)
            .finish()
    }
}

/// Normalize a listing response into attribute maps.
///
/// * an object whose values are objects yields one entry per key, with the
///   key injected as `id`;
/// * null, `false`, zero and empty-string values are skipped;
/// * the first other non-object value turns the whole response into a
///   single entry;
/// * an array yields one entry per element (non-objects wrapped as
///   `{"value": ...}`);
/// * any other scalar becomes a single `{"value": ...}` entry, and null
///   yields nothing.
#[must_use]
pub fn decode_listing(body: Value) -> Vec<Map<String, Value>> {
    match body {
        Value::Null => Vec::new(),
        Value::Object(data) => {
            if data.values().any(|v| !is_skipped(v) && !v.is_object()) {
                return vec![data];
            }
            data.into_iter()
                .filter(|(_, value)| !is_skipped(value))
                .filter_map(|(key, value)| match value {
                    Value::Object(mut attrs) => {
                        attrs.insert("id".to_string(), Value::String(key));
                        Some(attrs)
                    }
                    _ => None,
                })
                .collect()
        }
        Value::Array(items) => items.into_iter().map(wrap_value).collect(),
        other => vec![wrap_value(other)],
    }
}

fn is_skipped(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn wrap_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
