//! Chassis-wide components: system, storage cards, fans, power supplies.

use crate::macros::require_id;
use crate::models::{ChassisRecord, ComponentRecord, SystemRecord};
use crate::Result;
use async_trait::async_trait;
use seamicro_core::{Manager, ResourceId, ResourceKind};
use serde_json::{json, Value};
use std::fmt;
use tracing::{info, warn};

/// Persist the running configuration to flash.
pub const WRITE_MEM_PATH: &str = "/chassis/system/writeMem";

/// Move the active role to another management card.
pub const SWITCHOVER_PATH: &str = "/chassis/system/switchover";

/// Reload the chassis into its boot image.
pub const RELOAD_PATH: &str = "/chassis/system/reload";

resource_kind!(
    ChassisKind,
    Chassis,
    ChassisManager,
    "Chassis",
    "/chassis",
    ChassisRecord,
    list_only
);
resource_kind!(
    SystemKind,
    System,
    SystemManager,
    "System",
    "/chassis/systems",
    SystemRecord,
    list_only
);
resource_kind!(
    FanTrayKind,
    FanTray,
    FanTrayManager,
    "FanTray",
    "/chassis/fanTray",
    ComponentRecord,
    fetchable
);
resource_kind!(
    PowerSupplyKind,
    PowerSupply,
    PowerSupplyManager,
    "PowerSupply",
    "/chassis/powersupply",
    ComponentRecord,
    fetchable
);
resource_kind!(
    ScardKind,
    Scard,
    ScardManager,
    "Scard",
    "/chassis/scard",
    ComponentRecord,
    fetchable
);
resource_kind!(
    SmcardKind,
    Smcard,
    SmcardManager,
    "Smcard",
    "/chassis/smcard",
    ComponentRecord,
    fetchable
);

/// How a storage card exposes its disks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagementMode {
    /// Disks are pooled and carved into volumes.
    Volume,
    /// Disks are handed out whole.
    Disk,
}

impl ManagementMode {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Disk => "disk",
        }
    }
}

impl fmt::Display for ManagementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

async fn write_mem<K: ResourceKind>(manager: &Manager<K>) -> Result<Value> {
    info!(kind = K::NAME, "writing running config to flash");
    manager.put_path(WRITE_MEM_PATH, json!({})).await
}

impl ChassisManager {
    /// Persist the running configuration across reboots.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn write_mem(&self) -> Result<Value> {
        write_mem(&self.inner).await
    }
}

impl SystemManager {
    /// Switch the active management card, to `mxcard` when given.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn switchover(&self, mxcard: Option<u32>) -> Result<Value> {
        let body = match mxcard {
            Some(card) => json!({ "newActive": card }),
            None => json!({}),
        };
        warn!(?mxcard, "requesting management card switchover");
        self.inner.put_path(SWITCHOVER_PATH, body).await
    }

    /// Persist the running configuration across reboots.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn write_mem(&self) -> Result<Value> {
        write_mem(&self.inner).await
    }

    /// Reload the chassis.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn reload(&self) -> Result<Value> {
        warn!("requesting chassis reload");
        self.inner.put_path(RELOAD_PATH, json!({})).await
    }
}

impl ScardManager {
    /// Set the management mode of a storage card.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn set_management_mode(
        &self,
        scard: impl Into<ResourceId>,
        mode: ManagementMode,
    ) -> Result<Value> {
        let scard = scard.into();
        info!(scard = %scard, %mode, "setting storage card management mode");
        self.inner
            .put_path(
                &format!("{}/mgmtMode", ScardKind::item_path(&scard)),
                json!({ "value": mode.as_str() }),
            )
            .await
    }

    /// Switch between volume (`true`) and whole-disk (`false`) management.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn volume_mode(&self, scard: impl Into<ResourceId>, enabled: bool) -> Result<Value> {
        let mode = if enabled {
            ManagementMode::Volume
        } else {
            ManagementMode::Disk
        };
        self.set_management_mode(scard, mode).await
    }
}

/// Operations on a listed chassis.
#[async_trait]
pub trait ChassisExt {
    /// See [`ChassisManager::write_mem`].
    async fn write_mem(&self) -> Result<Value>;
}

#[async_trait]
impl ChassisExt for Chassis {
    async fn write_mem(&self) -> Result<Value> {
        ChassisManager::from_resource(self).write_mem().await
    }
}

/// Operations on a listed system.
#[async_trait]
pub trait SystemExt {
    /// See [`SystemManager::switchover`].
    async fn switchover(&self, mxcard: Option<u32>) -> Result<Value>;
    /// See [`SystemManager::write_mem`].
    async fn write_mem(&self) -> Result<Value>;
}

#[async_trait]
impl SystemExt for System {
    async fn switchover(&self, mxcard: Option<u32>) -> Result<Value> {
        SystemManager::from_resource(self).switchover(mxcard).await
    }

    async fn write_mem(&self) -> Result<Value> {
        SystemManager::from_resource(self).write_mem().await
    }
}

/// Operations on a listed or fetched storage card.
#[async_trait]
pub trait ScardExt {
    /// See [`ScardManager::set_management_mode`].
    async fn set_management_mode(&self, mode: ManagementMode) -> Result<Value>;
    /// See [`ScardManager::volume_mode`].
    async fn volume_mode(&self, enabled: bool) -> Result<Value>;
}

#[async_trait]
impl ScardExt for Scard {
    async fn set_management_mode(&self, mode: ManagementMode) -> Result<Value> {
        let id = require_id(self)?;
        ScardManager::from_resource(self)
            .set_management_mode(id, mode)
            .await
    }

    async fn volume_mode(&self, enabled: bool) -> Result<Value> {
        let id = require_id(self)?;
        ScardManager::from_resource(self)
            .volume_mode(id, enabled)
            .await
    }
}
