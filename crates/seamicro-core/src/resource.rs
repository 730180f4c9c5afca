//! Resources: attribute bags for one remote entity.
//!
//! A [`Resource`] keeps the decoded JSON attributes of one server, pool,
//! volume or other entity, together with a handle to the [`Manager`] that
//! produced it. Fetch points are explicit: [`Resource::get`] never touches
//! the network, while [`Resource::get_or_fetch`] and
//! [`Resource::ensure_loaded`] complete a partial resource at most once.

use crate::manager::Manager;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

/// Attribute names that never land in the attribute map.
pub const CORE_RESERVED: &[&str] = &["manager", "loaded"];

/// Opaque identifier assigned by the chassis.
///
/// Identifiers are usually strings, often compound (`"0/0"`,
/// `"3/pool-a/vol-1"`), but some collections use integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    /// Integer identifier
    Int(i64),
    /// String identifier
    Str(String),
}

impl ResourceId {
    /// Read an identifier out of a JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }

    /// JSON form of the identifier.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for ResourceId {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for ResourceId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for ResourceId {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(value: &ResourceId) -> Self {
        value.clone()
    }
}

/// Static description of one resource type.
pub trait ResourceKind: Send + Sync + 'static {
    /// Human-readable type name used in errors and debug output.
    const NAME: &'static str;

    /// Collection path relative to the API base, e.g. `/servers`.
    const COLLECTION: &'static str;

    /// Attribute names that shadow typed accessors and are dropped on
    /// construction.
    const RESERVED: &'static [&'static str] = &[];

    /// Whether `get` responses are complete objects.
    const GET_IS_COMPLETE: bool = false;

    /// Whether single items can be fetched at all.
    const SUPPORTS_GET: bool = true;

    /// Typed view decoded by [`Resource::record`].
    type Record: DeserializeOwned;

    /// Path of a single item.
    #[must_use]
    fn item_path(id: &ResourceId) -> String {
        format!("{}/{id}", Self::COLLECTION)
    }
}

/// One remote entity.
pub struct Resource<K: ResourceKind> {
    manager: Manager<K>,
    attrs: Map<String, Value>,
    loaded: bool,
}

impl<K: ResourceKind> Resource<K> {
    /// Build a resource from decoded attributes.
    ///
    /// Reserved keys are skipped.
    #[must_use]
    pub fn new(manager: Manager<K>, attrs: Map<String, Value>, loaded: bool) -> Self {
        let mut resource = Self {
            manager,
            attrs: Map::new(),
            loaded,
        };
        resource.add_details(attrs);
        resource
    }

    /// Identifier, if the resource carries one.
    #[must_use]
    pub fn id(&self) -> Option<ResourceId> {
        self.attrs.get("id").and_then(ResourceId::from_value)
    }

    /// Attribute lookup without any fetch.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    /// String attribute lookup without any fetch.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.attrs.get(field).and_then(Value::as_str)
    }

    /// Attribute lookup that completes an unloaded resource once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttributeNotFound`] when the attribute is still
    /// missing after the single fetch, or immediately when the resource was
    /// already loaded. Transport errors from the fetch propagate.
    pub async fn get_or_fetch(&mut self, field: &str) -> Result<&Value> {
        if !self.attrs.contains_key(field) {
            self.ensure_loaded().await?;
        }
        self.attrs.get(field).ok_or_else(|| Error::AttributeNotFound {
            kind: K::NAME.to_string(),
            attribute: field.to_string(),
        })
    }

    /// Fetch the full attribute set unless that already happened.
    ///
    /// The resource is marked loaded before the fetch, so a failed fetch is
    /// not repeated implicitly.
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the fetch.
    pub async fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.loaded = true;

        if !K::SUPPORTS_GET {
            return Ok(());
        }
        let Some(id) = self.id() else {
            return Ok(());
        };

        let fresh = self.manager.get(id).await?;
        self.add_details(fresh.attrs);
        Ok(())
    }

    /// Re-fetch this resource, optionally after a delay.
    ///
    /// The current value is left untouched; callers rebind to the returned
    /// resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for a resource without an id, or
    /// any error from the fetch.
    pub async fn refresh(&self, delay: Option<Duration>) -> Result<Self> {
        let id = self.id().ok_or_else(|| {
            Error::InvalidRequest(format!("{} without an id cannot be refreshed", K::NAME))
        })?;
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.manager.get(id).await
    }

    /// Decode the attributes into this kind's typed record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseError`] when the attributes do not fit the
    /// record.
    pub fn record(&self) -> Result<K::Record> {
        serde_json::from_value(Value::Object(self.attrs.clone())).map_err(|err| {
            Error::ParseError(format!("Failed to decode {}: {err}", K::NAME))
        })
    }

    /// All attributes.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Consume the resource and return its attributes.
    #[must_use]
    pub fn into_attributes(self) -> Map<String, Value> {
        self.attrs
    }

    /// Whether the full attribute set has been fetched.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Override the loaded flag.
    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    /// Manager that produced this resource.
    #[must_use]
    pub fn manager(&self) -> &Manager<K> {
        &self.manager
    }

    fn add_details(&mut self, attrs: Map<String, Value>) {
        for (key, value) in attrs {
            if CORE_RESERVED.contains(&key.as_str()) || K::RESERVED.contains(&key.as_str()) {
                continue;
            }
            self.attrs.insert(key, value);
        }
    }
}

impl<K: ResourceKind> Clone for Resource<K> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            attrs: self.attrs.clone(),
            loaded: self.loaded,
        }
    }
}

impl<K: ResourceKind> PartialEq for Resource<K> {
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.attrs == other.attrs,
        }
    }
}

impl<K: ResourceKind> fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::NAME)
            .field("attrs", &self.attrs)
            .field("loaded", &self.loaded)
            .finish()
    }
}
