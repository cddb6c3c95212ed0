//! relayd - coordinated chat node.
//!
//! Serves login, channel management, private messaging, and channel
//! publication over a shared message-queue relay, while replicating
//! state to peers and observing the externally elected coordinator.

mod cluster;
mod config;
mod error;
mod relay;
mod services;
mod state;

use crate::config::Config;
use crate::relay::{Publisher, ReferenceClient};
use crate::services::Registry;
use crate::state::NodeState;
use crate::state::store::Store;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let name = config.node.display_name();
    info!(
        node = %name,
        broker = %config.relay.broker,
        reference = %config.relay.reference,
        "Starting relayd"
    );

    // Open the durable store
    let store = Store::open(&config.storage.data_dir)?;
    info!(
        users = store.users().len(),
        channels = store.channels().len(),
        messages = store.messages().len(),
        publications = store.publications().len(),
        "Store loaded"
    );

    // Connect the fanout publisher (best-effort; retried per frame)
    let publisher = Publisher::new(
        &config.relay.proxy_pub,
        config.relay.encoding,
        config.timing.reference_timeout(),
    );
    publisher.ensure_connected().await;

    let state = Arc::new(NodeState::new(
        name,
        config.relay.encoding,
        store,
        publisher,
    ));

    let reference = Arc::new(ReferenceClient::new(
        &config.relay.reference,
        config.relay.encoding,
        config.timing.reference_timeout(),
    ));

    // STARTING -> REGISTERED. A failed registration is not fatal: the
    // heartbeat task re-attempts it before resuming beats.
    if let Err(e) = cluster::register(&state, &reference).await {
        warn!(error = %e, "initial registration failed, heartbeat task will retry");
    }

    // REGISTERED -> RUNNING: spawn the membership activities.
    let heartbeat = cluster::spawn_heartbeat(
        Arc::clone(&state),
        Arc::clone(&reference),
        config.timing.heartbeat(),
    );
    let replication = cluster::spawn_replication(
        Arc::clone(&state),
        Arc::clone(&reference),
        config.timing.replication(),
    );
    let intake = cluster::spawn_intake(Arc::clone(&state), config.relay.proxy_sub.clone());

    // Serve the request-reply loop on the main task.
    let registry = Arc::new(Registry::new());
    tokio::select! {
        _ = relay::broker::run(Arc::clone(&state), registry, config.relay.broker.clone()) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    heartbeat.abort();
    replication.abort();
    intake.abort();

    Ok(())
}
