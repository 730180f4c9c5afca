//! Fixtures shared by unit tests.

use crate::manager::Manager;
use crate::resource::{Resource, ResourceKind};
use crate::transport::MockTransport;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widget;

impl ResourceKind for Widget {
    const NAME: &'static str = "Widget";
    const COLLECTION: &'static str = "/widgets";
    const RESERVED: &'static [&'static str] = &["shadowed"];
    type Record = WidgetRecord;
}

#[derive(Debug, Deserialize)]
pub struct WidgetRecord {
    pub id: String,
    pub size: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn manager_with(mock: MockTransport) -> Manager<Widget> {
    Manager::new(Arc::new(mock))
}

pub fn widget(mock: MockTransport, attrs: Value, loaded: bool) -> Resource<Widget> {
    let attrs = match attrs {
        Value::Object(map) => map,
        other => panic!("widget fixture needs an object, got {other}"),
    };
    Resource::new(manager_with(mock), attrs, loaded)
}
