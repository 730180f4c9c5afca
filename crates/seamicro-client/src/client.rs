//! Top-level v2.0 chassis client.

use crate::chassis::{
    ChassisManager, FanTrayManager, PowerSupplyManager, ScardManager, SmcardManager, SystemManager,
};
use crate::interfaces::InterfaceManager;
use crate::servers::ServerManager;
use crate::storage::{DiskManager, PoolManager, VolumeManager};
use crate::Result;
use seamicro_core::retry::RetryPolicy;
use seamicro_core::transport::RequestTiming;
use seamicro_core::{AuthMode, ChassisConfig, Error, HttpTransportBuilder, Transport};
use std::sync::Arc;
use tracing::debug;

/// API versions [`client_for_version`] accepts.
pub const SUPPORTED_VERSIONS: &[&str] = &["2", "2.0", "v2", "v2.0"];

/// Builder for [`ChassisClient`].
#[derive(Debug, Clone)]
pub struct ChassisClientBuilder {
    config: ChassisConfig,
    retry_policy: Option<RetryPolicy>,
}

impl ChassisClientBuilder {
    /// Create a builder for the given endpoint, e.g. `https://chassis/v2.0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an invalid endpoint or an empty
    /// username.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let config = ChassisConfig::new(endpoint, username, password)?;
        Ok(Self::from_config(config))
    }

    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: ChassisConfig) -> Self {
        Self {
            config,
            retry_policy: None,
        }
    }

    /// Choose session or stateless authentication.
    #[must_use]
    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.config = self.config.with_auth_mode(mode);
        self
    }

    /// Request timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config = self.config.with_timeout(seconds);
        self
    }

    /// Retries after a refused connection.
    #[must_use]
    pub fn with_connection_retries(mut self, retries: u32) -> Self {
        self.config = self.config.with_connection_retries(retries);
        self
    }

    /// Delay between connection retries in milliseconds.
    #[must_use]
    pub fn with_retry_delay_ms(mut self, millis: u64) -> Self {
        self.config = self.config.with_retry_delay_ms(millis);
        self
    }

    /// Override the retry policy derived from the configuration.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    /// Log redacted request and response lines at debug level.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.config = self.config.with_logging(enabled);
        self
    }

    /// Toggle TLS certificate verification.
    #[must_use]
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.config = self.config.with_tls_verify(verify);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when an override left the
    /// configuration invalid or the HTTP client cannot be built.
    pub fn build(self) -> Result<ChassisClient> {
        self.config.check()?;
        let mut transport = HttpTransportBuilder::new(self.config);
        if let Some(policy) = self.retry_policy {
            transport = transport.with_retry_policy(policy);
        }
        Ok(ChassisClient::with_transport(Arc::new(transport.build()?)))
    }
}

/// Entry point to every manager of one chassis.
///
/// Cloning is cheap; clones share the transport and its session.
#[derive(Clone)]
pub struct ChassisClient {
    transport: Arc<dyn Transport>,
    servers: ServerManager,
    pools: PoolManager,
    volumes: VolumeManager,
    disks: DiskManager,
    chassis: ChassisManager,
    fantrays: FanTrayManager,
    interfaces: InterfaceManager,
    powersupplies: PowerSupplyManager,
    scards: ScardManager,
    smcards: SmcardManager,
    system: SystemManager,
}

impl ChassisClient {
    /// Create a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// See [`ChassisClientBuilder::build`].
    pub fn new(config: ChassisConfig) -> Result<Self> {
        ChassisClientBuilder::from_config(config).build()
    }

    /// Wrap an existing transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            servers: ServerManager::new(Arc::clone(&transport)),
            pools: PoolManager::new(Arc::clone(&transport)),
            volumes: VolumeManager::new(Arc::clone(&transport)),
            disks: DiskManager::new(Arc::clone(&transport)),
            chassis: ChassisManager::new(Arc::clone(&transport)),
            fantrays: FanTrayManager::new(Arc::clone(&transport)),
            interfaces: InterfaceManager::new(Arc::clone(&transport)),
            powersupplies: PowerSupplyManager::new(Arc::clone(&transport)),
            scards: ScardManager::new(Arc::clone(&transport)),
            smcards: SmcardManager::new(Arc::clone(&transport)),
            system: SystemManager::new(Arc::clone(&transport)),
            transport,
        }
    }

    /// Shared transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Compute servers.
    #[must_use]
    pub const fn servers(&self) -> &ServerManager {
        &self.servers
    }

    /// Storage pools.
    #[must_use]
    pub const fn pools(&self) -> &PoolManager {
        &self.pools
    }

    /// Volumes.
    #[must_use]
    pub const fn volumes(&self) -> &VolumeManager {
        &self.volumes
    }

    /// Physical disks.
    #[must_use]
    pub const fn disks(&self) -> &DiskManager {
        &self.disks
    }

    /// Chassis summary.
    #[must_use]
    pub const fn chassis(&self) -> &ChassisManager {
        &self.chassis
    }

    /// Fan trays.
    #[must_use]
    pub const fn fantrays(&self) -> &FanTrayManager {
        &self.fantrays
    }

    /// Network interfaces.
    #[must_use]
    pub const fn interfaces(&self) -> &InterfaceManager {
        &self.interfaces
    }

    /// Power supplies.
    #[must_use]
    pub const fn powersupplies(&self) -> &PowerSupplyManager {
        &self.powersupplies
    }

    /// Storage cards.
    #[must_use]
    pub const fn scards(&self) -> &ScardManager {
        &self.scards
    }

    /// Management cards.
    #[must_use]
    pub const fn smcards(&self) -> &SmcardManager {
        &self.smcards
    }

    /// System-wide operations.
    #[must_use]
    pub const fn system(&self) -> &SystemManager {
        &self.system
    }

    /// Log in now instead of on the first rejected request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthorizationFailure`] when the chassis does not
    /// hand out a session token.
    pub async fn authenticate(&self) -> Result<()> {
        self.transport.authenticate().await
    }

    /// Drop the session token; the next request runs unauthenticated.
    pub fn unauthenticate(&self) {
        self.transport.unauthenticate();
    }

    /// Per-request timings recorded so far.
    #[must_use]
    pub fn timings(&self) -> Vec<RequestTiming> {
        self.transport.timings()
    }

    /// Clear recorded timings.
    pub fn reset_timings(&self) {
        self.transport.reset_timings();
    }
}

impl std::fmt::Debug for ChassisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChassisClient").finish_non_exhaustive()
    }
}

/// Build a client for an API version string.
///
/// # Errors
///
/// Returns [`Error::UnsupportedVersion`] for anything outside
/// [`SUPPORTED_VERSIONS`], and configuration errors from the build.
pub fn client_for_version(version: &str, config: ChassisConfig) -> Result<ChassisClient> {
    let version = version.trim();
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(Error::UnsupportedVersion(format!(
            "Invalid client version '{version}'. must be one of: {}",
            SUPPORTED_VERSIONS.join(", ")
        )));
    }
    debug!(version, "building v2.0 chassis client");
    ChassisClient::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn unknown_version_is_rejected() {
        let err = client_for_version("3", ChassisConfig::default()).unwrap_err();
        match err {
            Error::UnsupportedVersion(msg) => {
                assert!(msg.contains("'3'"));
                assert!(msg.contains("v2.0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn known_versions_build() {
        for version in SUPPORTED_VERSIONS {
            assert!(client_for_version(version, ChassisConfig::default()).is_ok());
        }
    }

    #[test]
    fn builder_revalidates_overrides() {
        let err = ChassisClientBuilder::new("http://chassis/v2.0", "admin", "pw")
            .unwrap()
            .with_connection_retries(50)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn builder_rejects_bad_endpoint() {
        let err = ChassisClientBuilder::new("chassis", "admin", "pw").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn authenticate_stores_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2.0/login"))
            .and(body_json(json!({"username": "admin", "password": "seamicro"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("OpaqueRef:abc")))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = format!("{}/v2.0", server.uri());
        let client = ChassisClientBuilder::new(endpoint, "admin", "seamicro")
            .unwrap()
            .build()
            .unwrap();
        client.authenticate().await.unwrap();
        client.authenticate().await.unwrap();
    }

    #[tokio::test]
    async fn timings_are_shared_between_clones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/interfaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let clone = client.clone();
        assert!(clone.interfaces().list(None).await.unwrap().is_empty());
        let timings = client.timings();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].label, "GET /interfaces");
        client.reset_timings();
        assert!(clone.timings().is_empty());
    }
}
