//! Server power, VLAN, volume and boot management.

use crate::macros::require_id;
use crate::models::ServerRecord;
use crate::Result;
use async_trait::async_trait;
use seamicro_core::{Error, ResourceId};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Path segment of the tagged VLAN list on a server NIC.
pub const TAGGED_VLAN: &str = "taggedVlans";

/// Path segment of the untagged VLAN list on a server NIC.
pub const UNTAGGED_VLAN: &str = "untaggedVlans";

/// Boot order used unless another one is requested.
pub const DEFAULT_BOOT_ORDER: &str = "hd0";

resource_kind!(ServerKind, Server, ServerManager, "Server", "/servers", ServerRecord, fetchable);

/// Power operations accepted by `PUT /servers/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Power the server on.
    On,
    /// Power the server off.
    Off,
    /// Power-cycle the server.
    Reset,
}

impl PowerState {
    /// Action name sent to the chassis.
    #[must_use]
    pub const fn action(self) -> &'static str {
        match self {
            Self::On => "power-on",
            Self::Off => "power-off",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

impl FromStr for PowerState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "power-on" | "on" => Ok(Self::On),
            "power-off" | "off" => Ok(Self::Off),
            "reset" => Ok(Self::Reset),
            other => Err(Error::ValidationError(format!(
                "Invalid power operation `{other}`; expected power-on, power-off or reset"
            ))),
        }
    }
}

/// Which VLAN list of a NIC to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlanKind {
    /// 802.1Q tagged VLANs
    Tagged,
    /// Native (untagged) VLAN
    Untagged,
}

impl VlanKind {
    /// Path segment for this list.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Tagged => TAGGED_VLAN,
            Self::Untagged => UNTAGGED_VLAN,
        }
    }
}

impl ServerManager {
    /// Power a server on, optionally booting from the network.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn power_on(&self, server: impl Into<ResourceId>, using_pxe: bool) -> Result<Value> {
        self.set_power_state(server, PowerState::On, using_pxe, false)
            .await
    }

    /// Power a server off, optionally forcing it.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn power_off(&self, server: impl Into<ResourceId>, force: bool) -> Result<Value> {
        self.set_power_state(server, PowerState::Off, false, force)
            .await
    }

    /// Reset a server, optionally booting from the network afterwards.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn reset(&self, server: impl Into<ResourceId>, using_pxe: bool) -> Result<Value> {
        self.set_power_state(server, PowerState::Reset, using_pxe, false)
            .await
    }

    /// Apply a power operation.
    ///
    /// `using_pxe` only applies to power-on and reset; `force` only to
    /// power-off.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn set_power_state(
        &self,
        server: impl Into<ResourceId>,
        state: PowerState,
        using_pxe: bool,
        force: bool,
    ) -> Result<Value> {
        let server = server.into();
        let mut params = Map::new();
        match state {
            PowerState::On | PowerState::Reset if using_pxe => {
                params.insert("using-pxe".to_string(), Value::Bool(true));
            }
            PowerState::Off if force => {
                params.insert("force".to_string(), Value::Bool(true));
            }
            _ => {}
        }

        info!(server = %server, action = state.action(), "server power operation");
        self.inner
            .action(state.action(), server, Some(Value::Object(params)))
            .await
    }

    /// Apply a power operation named by string (`power-on`, `power-off`,
    /// `reset`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for an unknown operation, before
    /// any request is sent.
    pub async fn power(
        &self,
        server: impl Into<ResourceId>,
        state: &str,
        using_pxe: bool,
        force: bool,
    ) -> Result<Value> {
        let state = state.parse::<PowerState>()?;
        self.set_power_state(server, state, using_pxe, force).await
    }

    /// Add a tagged VLAN to the server's first NIC.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn set_tagged_vlan(
        &self,
        server: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(server.into(), VlanKind::Tagged, "add", vlan_id)
            .await
    }

    /// Remove a tagged VLAN from the server's first NIC.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn unset_tagged_vlan(
        &self,
        server: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(server.into(), VlanKind::Tagged, "remove", vlan_id)
            .await
    }

    /// Set the untagged VLAN of the server's first NIC.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn set_untagged_vlan(
        &self,
        server: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(server.into(), VlanKind::Untagged, "add", vlan_id)
            .await
    }

    /// Clear the untagged VLAN of the server's first NIC.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn unset_untagged_vlan(
        &self,
        server: impl Into<ResourceId>,
        vlan_id: u16,
    ) -> Result<Value> {
        self.edit_vlan(server.into(), VlanKind::Untagged, "remove", vlan_id)
            .await
    }

    /// Attach a volume to the given vdisk slot.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn attach_volume(
        &self,
        server: impl Into<ResourceId>,
        volume: impl Into<ResourceId>,
        vdisk: u32,
    ) -> Result<Value> {
        let path = format!("/servers/{}/vdisk/{vdisk}", server.into());
        self.inner
            .put_path(&path, json!({ "value": volume.into().to_value() }))
            .await
    }

    /// Detach whatever volume occupies the given vdisk slot.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn detach_volume(&self, server: impl Into<ResourceId>, vdisk: u32) -> Result<()> {
        let path = format!("/servers/{}/vdisk/{vdisk}", server.into());
        self.inner.delete_path(&path).await
    }

    /// Set the BIOS boot order; `pxe` expands to `pxe,hd0`.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn set_boot_order(
        &self,
        server: impl Into<ResourceId>,
        boot_order: &str,
    ) -> Result<Value> {
        let order = if boot_order == "pxe" { "pxe,hd0" } else { boot_order };
        self.inner
            .action(
                "set-bios-boot-order",
                server,
                Some(json!({ "boot-order": order })),
            )
            .await
    }

    async fn edit_vlan(
        &self,
        server: ResourceId,
        kind: VlanKind,
        op: &str,
        vlan_id: u16,
    ) -> Result<Value> {
        let path = format!("/servers/{server}/nic/0/{}", kind.segment());
        let mut body = Map::new();
        body.insert(op.to_string(), Value::from(vlan_id));
        self.inner.put_path(&path, Value::Object(body)).await
    }
}

/// Operations on a server that was listed or fetched.
///
/// Each call goes through the manager the server came from; a server
/// without an id yields [`Error::InvalidRequest`].
#[async_trait]
pub trait ServerExt {
    /// See [`ServerManager::power_on`].
    async fn power_on(&self, using_pxe: bool) -> Result<Value>;
    /// See [`ServerManager::power_off`].
    async fn power_off(&self, force: bool) -> Result<Value>;
    /// See [`ServerManager::reset`].
    async fn reset(&self, using_pxe: bool) -> Result<Value>;
    /// See [`ServerManager::set_tagged_vlan`].
    async fn set_tagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`ServerManager::unset_tagged_vlan`].
    async fn unset_tagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`ServerManager::set_untagged_vlan`].
    async fn set_untagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`ServerManager::unset_untagged_vlan`].
    async fn unset_untagged_vlan(&self, vlan_id: u16) -> Result<Value>;
    /// See [`ServerManager::attach_volume`].
    async fn attach_volume(&self, volume: ResourceId, vdisk: u32) -> Result<Value>;
    /// See [`ServerManager::detach_volume`].
    async fn detach_volume(&self, vdisk: u32) -> Result<()>;
    /// See [`ServerManager::set_boot_order`].
    async fn set_boot_order(&self, boot_order: &str) -> Result<Value>;
}

#[async_trait]
impl ServerExt for Server {
    async fn power_on(&self, using_pxe: bool) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self).power_on(id, using_pxe).await
    }

    async fn power_off(&self, force: bool) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self).power_off(id, force).await
    }

    async fn reset(&self, using_pxe: bool) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self).reset(id, using_pxe).await
    }

    async fn set_tagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .set_tagged_vlan(id, vlan_id)
            .await
    }

    async fn unset_tagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .unset_tagged_vlan(id, vlan_id)
            .await
    }

    async fn set_untagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .set_untagged_vlan(id, vlan_id)
            .await
    }

    async fn unset_untagged_vlan(&self, vlan_id: u16) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .unset_untagged_vlan(id, vlan_id)
            .await
    }

    async fn attach_volume(&self, volume: ResourceId, vdisk: u32) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .attach_volume(id, volume, vdisk)
            .await
    }

    async fn detach_volume(&self, vdisk: u32) -> Result<()> {
        let id = require_id(self)?;
        ServerManager::from_resource(self).detach_volume(id, vdisk).await
    }

    async fn set_boot_order(&self, boot_order: &str) -> Result<Value> {
        let id = require_id(self)?;
        ServerManager::from_resource(self)
            .set_boot_order(id, boot_order)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn power_state_parsing() {
        assert_eq!("power-on".parse::<PowerState>().unwrap(), PowerState::On);
        assert_eq!("off".parse::<PowerState>().unwrap(), PowerState::Off);
        assert_eq!("reset".parse::<PowerState>().unwrap(), PowerState::Reset);
        let err = "hibernate".parse::<PowerState>().unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(PowerState::Off.to_string(), "power-off");
    }

    #[tokio::test]
    async fn list_servers_uses_compound_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"0/0": {}, "1/0": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let servers = client.servers().list(None).await.unwrap();
        let ids: Vec<String> = servers
            .iter()
            .filter_map(|s| s.id().map(|id| id.to_string()))
            .collect();
        assert_eq!(ids, vec!["0/0", "1/0"]);
    }

    #[tokio::test]
    async fn power_on_with_pxe() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/servers/1"))
            .and(body_json(json!({"action": "power-on", "using-pxe": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.servers().power_on("1", true).await.unwrap();
    }

    #[tokio::test]
    async fn reset_without_pxe_sends_bare_action() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/servers/2/0"))
            .and(body_json(json!({"action": "reset"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.servers().reset("2/0", false).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_power_operation_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .servers()
            .power("1", "sleep", false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[tokio::test]
    async fn vlan_edits_target_nic_zero() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/servers/1/nic/0/taggedVlans"))
            .and(body_json(json!({"add": 100})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/1/nic/0/untaggedVlans"))
            .and(body_json(json!({"remove": 200})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.servers().set_tagged_vlan("1", 100).await.unwrap();
        client.servers().unset_untagged_vlan("1", 200).await.unwrap();
    }

    #[tokio::test]
    async fn attach_and_detach_volume() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/servers/1/vdisk/3"))
            .and(body_json(json!({"value": "0/p0-0/1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/servers/1/vdisk/0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .servers()
            .attach_volume("1", "0/p0-0/1", 3)
            .await
            .unwrap();
        client.servers().detach_volume("1", 0).await.unwrap();
    }

    #[tokio::test]
    async fn pxe_boot_order_expands() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/servers/1"))
            .and(body_json(
                json!({"action": "set-bios-boot-order", "boot-order": "pxe,hd0"}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/2"))
            .and(body_json(
                json!({"action": "set-bios-boot-order", "boot-order": DEFAULT_BOOT_ORDER}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.servers().set_boot_order("1", "pxe").await.unwrap();
        client
            .servers()
            .set_boot_order("2", DEFAULT_BOOT_ORDER)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_server_merges_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "sample-server"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let srv = client.servers().get("1").await.unwrap();
        assert_eq!(srv.id(), Some(ResourceId::from("1")));
        assert_eq!(srv.get_str("name"), Some("sample-server"));
        let record = srv.record().unwrap();
        assert_eq!(record.id, Some(ResourceId::from("1")));
        assert_eq!(record.name.as_deref(), Some("sample-server"));
    }

    #[tokio::test]
    async fn listed_server_acts_on_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/servers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"2/0": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/2/0"))
            .and(body_json(json!({"action": "power-off", "force": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/2/0/vdisk/0"))
            .and(body_json(json!({"value": "0/p0/v1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/servers/2/0/nic/0/taggedVlans"))
            .and(body_json(json!({"add": 42})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let servers = client.servers().list(None).await.unwrap();
        let srv = &servers[0];
        srv.power_off(true).await.unwrap();
        srv.attach_volume(ResourceId::from("0/p0/v1"), 0)
            .await
            .unwrap();
        srv.set_tagged_vlan(42).await.unwrap();
    }

    #[tokio::test]
    async fn server_without_id_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let srv = Server::new(client.servers().manager().clone(), Map::new(), true);
        let err = srv.power_on(false).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
