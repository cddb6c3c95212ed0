//! Test node management.
//!
//! Spawns and manages relayd instances for integration testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::{Child, Command};
use tempfile::TempDir;

/// Relay endpoints a node under test connects to.
pub struct NodeEndpoints {
    pub broker_back: SocketAddr,
    pub proxy_pub: SocketAddr,
    pub proxy_sub: SocketAddr,
    pub reference: SocketAddr,
}

/// A spawned relayd process with its own data directory.
pub struct TestNode {
    child: Child,
    data_dir: TempDir,
}

impl TestNode {
    /// Spawns a node named `name` against the given relay endpoints.
    ///
    /// Timers are shortened so integration tests see heartbeat and
    /// replication cycles within seconds.
    pub fn spawn(
        name: &str,
        endpoints: &NodeEndpoints,
        replication_secs: u64,
    ) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[node]
name = "{name}"

[relay]
broker = "{broker}"
proxy_pub = "{proxy_pub}"
proxy_sub = "{proxy_sub}"
reference = "{reference}"
encoding = "msgpack"

[storage]
data_dir = "{data}"

[timing]
heartbeat_secs = 1
replication_secs = {replication_secs}
reference_timeout_secs = 2
"#,
            broker = endpoints.broker_back,
            proxy_pub = endpoints.proxy_pub,
            proxy_sub = endpoints.proxy_sub,
            reference = endpoints.reference,
            data = data_dir.path().join("store").display(),
        );
        std::fs::write(&config_path, config_content)?;

        // `cargo test` builds the bin target first, so the binary is in
        // the workspace target dir.
        let binary_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/relayd");

        let child = Command::new(&binary_path)
            .arg(&config_path)
            .env("RUST_LOG", "info")
            .spawn()?;

        Ok(Self { child, data_dir })
    }

    /// Path to one of the node's durable collection files.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.data_dir.path().join("store").join(name)
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
