//! Chassis network interfaces.

use crate::macros::require_id;
use crate::models::InterfaceRecord;
use crate::servers::VlanKind;
use crate::Result;
use async_trait::async_trait;
use seamicro_core::{Error, ResourceId, ResourceKind};
use serde_json::{json, Map, Value};
use tracing::info;

resource_kind!(
    InterfaceKind,
    Interface,
    InterfaceManager,
    "Interface",
    "/interfaces",
    InterfaceRecord,
    fetchable
);

fn join_vlans(vlans: &[u16]) -> Result<String> {
    if vlans.is_empty() {
        return Err(Error::ValidationError("at least one VLAN id is required".into()));
    }
    Ok(vlans
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(","))
}

impl InterfaceManager {
    /// Administratively disable an interface.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn shutdown(&self, interface: impl Into<ResourceId>) -> Result<Value> {
        self.set_shutdown(interface.into(), true).await
    }

    /// Re-enable an interface.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn no_shutdown(&self, interface: impl Into<ResourceId>) -> Result<Value> {
        self.set_shutdown(interface.into(), false).await
    }

    /// Add one or more tagged VLANs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for an empty list, and transport
    /// errors.
    pub async fn add_tagged_vlan(
        &self,
        interface: impl Into<ResourceId>,
        vlans: &[u16],
    ) -> Result<Value> {
        let vlans = join_vlans(vlans)?;
        self.edit_vlan(interface.into(), VlanKind::Tagged, "add", vlans)
            .await
    }

    /// Remove a tagged VLAN.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn remove_tagged_vlan(
        &self,
        interface: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(interface.into(), VlanKind::Tagged, "remove", vlan_id.to_string())
            .await
    }

    /// Add an untagged VLAN.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn add_untagged_vlan(
        &self,
        interface: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(interface.into(), VlanKind::Untagged, "add", vlan_id.to_string())
            .await
    }

    /// Remove an untagged VLAN.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn remove_untagged_vlan(
        &self,
        interface: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(interface.into(), VlanKind::Untagged, "remove", vlan_id.to_string())
            .await
    }

    async fn set_shutdown(&self, interface: ResourceId, shutdown: bool) -> Result<Value> {
        info!(interface = %interface, shutdown, "changing interface admin state");
        self.inner
            .put_path(
                &format!("{}/shutdown", InterfaceKind::item_path(&interface)),
                json!({ "value": shutdown }),
            )
            .await
    }

    async fn edit_vlan(
        &self,
        interface: ResourceId,
        kind: VlanKind,
        op: &str,
        vlans: String,
    ) -> Result<Value> {
        let path = format!(
            "{}/vlans/{}",
            InterfaceKind::item_path(&interface),
            kind.segment()
        );
        let mut body = Map::new();
        body.insert(op.to_string(), Value::String(vlans));
        self.inner.put_path(&path, Value::Object(body)).await
    }
}

/// Operations on an interface that was listed or fetched.
#[async_trait]
pub trait InterfaceExt {
    /// See [`InterfaceManager::shutdown`].
    async fn shutdown(&self) -> Result<Value>;
    /// See [`InterfaceManager::no_shutdown`].
    async fn no_shutdown(&self) -> Result<Value>;
    /// See [`InterfaceManager::add_tagged_vlan`].
    async fn add_tagged_vlan(&self, vlans: &[u16]) -> Result<Value>;
    /// See [`InterfaceManager::remove_tagged_vlan`].
    async fn remove_tagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`InterfaceManager::add_untagged_vlan`].
    async fn add_untagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`InterfaceManager::remove_untagged_vlan`].
    async fn remove_untagged_vlan(&self, vlan_id: u16) -> Result<Value>;
}

#[async_trait]
impl InterfaceExt for Interface {
    async fn shutdown(&self) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self).shutdown(id).await
    }

    async fn no_shutdown(&self) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self).no_shutdown(id).await
    }

    async fn add_tagged_vlan(&self, vlans: &[u16]) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self)
            .add_tagged_vlan(id, vlans)
            .await
    }

    async fn remove_tagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self)
            .remove_tagged_vlan(id, vlan_id)
            .await
    }

    async fn add_untagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self)
            .add_untagged_vlan(id, vlan_id)
            .await
    }

    async fn remove_untagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        InterfaceManager::from_resource(self)
            .remove_untagged_vlan(id, vlan_id)
            .await
    }
}
