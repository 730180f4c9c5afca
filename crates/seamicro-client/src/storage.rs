//! Storage pools, volumes and physical disks.

use crate::macros::require_id;
use crate::models::{DiskRecord, PoolRecord, VolumeRecord};
use crate::Result;
use async_trait::async_trait;
use seamicro_core::{Created, Error, ResourceId};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

/// Length of generated volume identifiers.
pub const VOLUME_ID_LEN: usize = 12;

resource_kind!(PoolKind, Pool, PoolManager, "Pool", "/storage/pools", PoolRecord, fetchable);
resource_kind!(
    VolumeKind,
    Volume,
    VolumeManager,
    "Volume",
    "/storage/volumes",
    VolumeRecord,
    fetchable
);
resource_kind!(DiskKind, Disk, DiskManager, "Disk", "/storage/disks", DiskRecord, fetchable);

/// Random lowercase hex identifier for a new volume.
#[must_use]
pub fn generate_volume_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(VOLUME_ID_LEN);
    id
}

impl PoolManager {
    /// Create a pool named `name` on a storage card slot from a set of disks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for an empty name or disk list, and
    /// transport errors.
    pub async fn create(
        &self,
        slot: u32,
        name: &str,
        disks: &[u32],
    ) -> Result<Created<PoolKind>> {
        if name.is_empty() {
            return Err(Error::ValidationError("pool name must not be empty".into()));
        }
        if disks.is_empty() {
            return Err(Error::ValidationError("a pool needs at least one disk".into()));
        }
        let disks = disks
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        info!(slot, name, disks = %disks, "creating pool");
        self.inner
            .update(
                &format!("/storage/pools/{slot}/{name}"),
                json!({ "action": "create", "disks": disks }),
            )
            .await
    }

    /// Delete a pool.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn delete(&self, pool: impl Into<ResourceId>) -> Result<()> {
        self.inner.delete(pool).await
    }

    /// Mount a pool.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn mount(&self, pool: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("mount", pool, None).await
    }

    /// Unmount a pool.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn unmount(&self, pool: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("unmount", pool, None).await
    }
}

impl VolumeManager {
    /// Create a volume of `size` GB in `pool`.
    ///
    /// A random identifier is generated when `volume_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValidationError`] for a zero size, and transport
    /// errors.
    pub async fn create(
        &self,
        size: u64,
        pool: impl Into<ResourceId>,
        volume_id: Option<&str>,
    ) -> Result<Created<VolumeKind>> {
        if size == 0 {
            return Err(Error::ValidationError("volume size must be positive".into()));
        }
        let pool = pool.into();
        let volume_id = volume_id.map_or_else(generate_volume_id, str::to_string);

        info!(pool = %pool, volume = %volume_id, size, "creating volume");
        self.inner
            .update(
                &format!("/storage/volumes/{pool}/{volume_id}"),
                json!({ "action": "create", "volume-size": size.to_string() }),
            )
            .await
    }

    /// Delete a volume.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn delete(&self, volume: impl Into<ResourceId>) -> Result<()> {
        self.inner.delete(volume).await
    }
}

impl DiskManager {
    /// Power a disk on.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn power_on(&self, disk: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("power-on", disk, None).await
    }

    /// Power a disk off.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn power_off(&self, disk: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("power-off", disk, None).await
    }

    /// Turn on the locator LED.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn activate_led(&self, disk: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("activate-led", disk, None).await
    }

    /// Turn off the locator LED.
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub async fn deactivate_led(&self, disk: impl Into<ResourceId>) -> Result<Value> {
        self.inner.action("deactivate-led", disk, None).await
    }
}

/// Operations on a volume that was listed or fetched.
#[async_trait]
pub trait VolumeExt {
    /// See [`VolumeManager::delete`].
    async fn delete(&self) -> Result<()>;
}

#[async_trait]
impl VolumeExt for Volume {
    async fn delete(&self) -> Result<()> {
        let id = require_id(self)?;
        VolumeManager::from_resource(self).delete(id).await
    }
}

/// Operations on a disk that was listed or fetched.
#[async_trait]
pub trait DiskExt {
    /// See [`DiskManager::power_on`].
    async fn power_on(&self) -> Result<Value>;
    /// See [`DiskManager::power_off`].
    async fn power_off(&self) -> Result<Value>;
    /// See [`DiskManager::activate_led`].
    async fn activate_led(&self) -> Result<Value>;
    /// See [`DiskManager::deactivate_led`].
    async fn deactivate_led(&self) -> Result<Value>;
}

#[async_trait]
impl DiskExt for Disk {
    async fn power_on(&self) -> Result<Value> {
        let id = require_id(self)?;
        DiskManager::from_resource(self).power_on(id).await
    }

    async fn power_off(&self) -> Result<Value> {
        let id = require_id(self)?;
        DiskManager::from_resource(self).power_off(id).await
    }

    async fn activate_led(&self) -> Result<Value> {
        let id = require_id(self)?;
        DiskManager::from_resource(self).activate_led(id).await
    }

    async fn deactivate_led(&self) -> Result<Value> {
        let id = require_id(self)?;
        DiskManager::from_resource(self).deactivate_led(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use seamicro_core::Filters;
    use wiremock::matchers::{body_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn generated_volume_ids_are_short_hex() {
        let id = generate_volume_id();
        assert_eq!(id.len(), VOLUME_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_volume_id());
    }

    #[tokio::test]
    async fn pool_create_joins_disks() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/pools/0/p0"))
            .and(body_json(json!({"action": "create", "disks": "1,5,6"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("0/p0")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client.pools().create(0, "p0", &[1, 5, 6]).await.unwrap();
        assert_eq!(created, Created::Id("p0".to_string()));
    }

    #[tokio::test]
    async fn pool_name_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/pools/0/a%3Fb%23c%20d"))
            .and(body_json(json!({"action": "create", "disks": "1"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client.pools().create(0, "a?b#c d", &[1]).await.unwrap();
        assert_eq!(created, Created::Empty);
    }

    #[tokio::test]
    async fn volume_id_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/volumes/0/p0/v%3F1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client
            .volumes()
            .create(5, "0/p0", Some("v?1"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn pool_create_rejects_empty_disks() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let err = client.pools().create(0, "p0", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[tokio::test]
    async fn pool_mount_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/pools/0/p0"))
            .and(body_json(json!({"action": "mount"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/storage/pools/0/p0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.pools().mount("0/p0").await.unwrap();
        client.pools().delete("0/p0").await.unwrap();
    }

    #[tokio::test]
    async fn volume_create_with_generated_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/storage/volumes/0/p0/[0-9a-f]{12}$"))
            .and(body_json(json!({"action": "create", "volume-size": "10"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client.volumes().create(10, "0/p0", None).await.unwrap();
        assert_eq!(created, Created::Empty);
    }

    #[tokio::test]
    async fn volume_create_with_explicit_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/volumes/0/p0/vol1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("0/p0/vol1")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let created = client
            .volumes()
            .create(5, "0/p0", Some("vol1"))
            .await
            .unwrap();
        assert_eq!(created.id(), Some(ResourceId::from("p0/vol1")));
    }

    #[tokio::test]
    async fn zero_sized_volume_is_rejected() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let err = client.volumes().create(0, "0/p0", None).await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[tokio::test]
    async fn volume_delete_uses_collection_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/volumes/0/p0/vol1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.volumes().delete("0/p0/vol1").await.unwrap();
    }

    #[tokio::test]
    async fn fetched_volume_deletes_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/volumes/0/p0/vol1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"actualSize": 5})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/storage/volumes/0/p0/vol1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let volume = client.volumes().get("0/p0/vol1").await.unwrap();
        let record = volume.record().unwrap();
        assert_eq!(record.id, Some(ResourceId::from("0/p0/vol1")));
        assert_eq!(record.actual_size, Some(5));
        volume.delete().await.unwrap();
    }

    #[tokio::test]
    async fn listed_disk_acts_on_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/disks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "0/3": {"size": 500, "pool": "p0", "vendor": "acme"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        for action in ["power-on", "power-off", "activate-led", "deactivate-led"] {
            Mock::given(method("PUT"))
                .and(path("/storage/disks/0/3"))
                .and(body_json(json!({ "action": action })))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = test_client(&server);
        let disks = client.disks().list(None).await.unwrap();
        let disk = &disks[0];
        let record = disk.record().unwrap();
        assert_eq!(record.size, Some(500));
        assert_eq!(record.pool.as_deref(), Some("p0"));
        assert_eq!(record.extra.get("vendor"), Some(&json!("acme")));

        disk.power_on().await.unwrap();
        disk.power_off().await.unwrap();
        disk.activate_led().await.unwrap();
        disk.deactivate_led().await.unwrap();
    }

    #[tokio::test]
    async fn disk_led_actions() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/storage/disks/0/3"))
            .and(body_json(json!({"action": "activate-led"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/storage/disks/0/3"))
            .and(body_json(json!({"action": "deactivate-led"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.disks().activate_led("0/3").await.unwrap();
        client.disks().deactivate_led("0/3").await.unwrap();
    }

    #[tokio::test]
    async fn pools_filtered_by_capacity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/pools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "0/p0": {"freeSize": 400, "usedSize": 300},
                "0/p1": {"freeSize": 900, "usedSize": 300},
                "1/p0": {"freeSize": 100, "usedSize": 50}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let filters: Filters = [("freeSize_le", 500), ("usedSize", 300)]
            .into_iter()
            .collect();
        let pool = client.pools().find(&filters).await.unwrap();
        assert_eq!(pool.id(), Some(ResourceId::from("0/p0")));
    }
}
