use crate::client::{ChassisClient, ChassisClientBuilder};
use wiremock::MockServer;

/// Client against a mock chassis mounted at the server root.
pub(crate) fn test_client(server: &MockServer) -> ChassisClient {
    ChassisClientBuilder::new(server.uri(), "admin", "seamicro")
        .expect("valid mock endpoint")
        .with_connection_retries(0)
        .with_retry_delay_ms(1)
        .build()
        .expect("client builds")
}
