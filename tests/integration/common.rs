//! Common test harness for accessplane integration tests.

use std::sync::{Arc, Once};
use std::time::Duration;

use accessplane::Client;
use accessplane::events::Event;
use accessplane::testing::MockTransport;
use accessplane::transport::WireEvent;
use accessplane::types::{Role, RoleSpec, User, UserSpec};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Installs a log subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A client wired to a mock control plane.
pub struct TestFixture {
    pub transport: Arc<MockTransport>,
    pub client: Client,
}

impl TestFixture {
    /// Creates a client over a fresh mock transport.
    pub async fn create() -> Result<Self> {
        init_tracing();
        let transport = MockTransport::shared();
        let client = Client::builder()
            .url("https://auth.example.com:3025")
            .build_with_transport(transport.clone())
            .await?;
        Ok(Self { transport, client })
    }

    /// Encodes `event` the way the control plane would send it.
    pub fn put_frame(&self, event: Event) -> Result<WireEvent> {
        Ok(self.client.event_codec().encode_event(&event)?)
    }
}

/// A user with the given name and no traits.
pub fn user(name: &str) -> User {
    User::new(name, UserSpec::default())
}

/// A role with the given name and default spec.
pub fn role(name: &str) -> Role {
    Role::new(name, RoleSpec::default())
}
