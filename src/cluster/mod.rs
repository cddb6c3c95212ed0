//! Membership and replication.
//!
//! Lifecycle: STARTING (rank registration against the reference service)
//! → REGISTERED (subscribed to `servers` and `replication`) → RUNNING.
//! While running, three independently fault-isolated tasks operate: a
//! heartbeat timer, a replication-broadcast timer, and the continuous
//! subscription intake. One timer's failure never halts another's; every
//! reference call applies the configured bounded wait and a failed
//! attempt is simply retried on the next interval.

use crate::relay::{ReferenceClient, RelayError, Subscriber};
use crate::state::NodeState;
use relay_proto::{
    ElectionData, Envelope, HeartbeatRequest, ListRequest, PubFrame, RankRequest, ReplicationData,
    ResponseData, service, topic, unix_now,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// Registers this node with the reference service and stores its rank.
///
/// The rank is assigned once and immutable thereafter; a repeat call
/// (after a transport failure at startup) leaves an already-set rank
/// untouched.
pub async fn register(
    state: &Arc<NodeState>,
    reference: &ReferenceClient,
) -> Result<u64, RelayError> {
    let request = Envelope::new(
        service::RANK,
        RankRequest {
            user: state.name.clone(),
            timestamp: unix_now(),
            clock: state.clock.tick(),
        },
    );
    let reply = reference.call(&request).await?;
    if let Some(clock) = reply.clock() {
        state.clock.observe(clock);
    }
    let rank = reply.data.get("rank").and_then(Value::as_u64).unwrap_or(0);
    let _ = state.rank.set(rank);
    info!(node = %state.name, rank, "registered with reference service");
    Ok(rank)
}

/// Spawns the fixed-interval heartbeat task.
///
/// If the node was never registered (startup transport failure), the
/// task re-attempts rank registration before resuming heartbeats.
pub fn spawn_heartbeat(
    state: Arc<NodeState>,
    reference: Arc<ReferenceClient>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            if state.rank.get().is_none() {
                if let Err(e) = register(&state, &reference).await {
                    warn!(error = %e, "rank registration failed, will retry");
                    continue;
                }
            }

            let request = Envelope::new(
                service::HEARTBEAT,
                HeartbeatRequest {
                    user: state.name.clone(),
                    timestamp: unix_now(),
                    clock: state.clock.tick(),
                },
            );
            match reference.call(&request).await {
                Ok(reply) => {
                    if let Some(clock) = reply.clock() {
                        state.clock.observe(clock);
                    }
                    let status = reply
                        .data
                        .get("status")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    debug!(status, "heartbeat acknowledged");
                }
                Err(e) => warn!(error = %e, "heartbeat failed"),
            }
        }
    })
}

/// Spawns the fixed-interval replication broadcast task.
///
/// Each cycle first refreshes the server roster with a `list` request
/// (failure non-fatal), then publishes the full Users/Channels snapshot
/// on the `replication` topic.
pub fn spawn_replication(
    state: Arc<NodeState>,
    reference: Arc<ReferenceClient>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            let request = Envelope::new(
                service::LIST,
                ListRequest {
                    timestamp: unix_now(),
                    clock: state.clock.tick(),
                },
            );
            match reference.call(&request).await {
                Ok(reply) => {
                    if let Some(clock) = reply.clock() {
                        state.clock.observe(clock);
                    }
                    match reply.payload::<ResponseData>() {
                        Ok(data) => {
                            if let Some(list) = data.list {
                                debug!(servers = list.len(), "server roster refreshed");
                                *state.roster.write() = list;
                            }
                        }
                        Err(e) => warn!(error = %e, "undecodable roster reply"),
                    }
                }
                Err(e) => warn!(error = %e, "roster refresh failed"),
            }

            let (users, channels) = {
                let store = state.store.lock().await;
                (store.users().to_vec(), store.channels().to_vec())
            };
            let snapshot = Envelope::new(
                service::REPLICATION,
                ReplicationData {
                    server: state.name.clone(),
                    users,
                    channels,
                    timestamp: unix_now(),
                    clock: state.clock.tick(),
                },
            );
            state.publisher.publish(topic::REPLICATION, snapshot).await;
            debug!("replication snapshot published");
        }
    })
}

/// Spawns the continuous subscription-intake task.
///
/// Subscribes to the `servers` and `replication` topics; a malformed
/// frame is dropped with a warning, a lost connection is re-established.
pub fn spawn_intake(state: Arc<NodeState>, addr: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match Subscriber::connect(&addr, state.encoding, &[topic::SERVERS, topic::REPLICATION])
                .await
            {
                Err(e) => {
                    warn!(addr = %addr, error = %e, "proxy subscription failed, retrying");
                }
                Ok(mut subscriber) => {
                    info!(addr = %addr, "subscribed to servers and replication topics");
                    loop {
                        match subscriber.next().await {
                            Ok(Some(frame)) => apply_frame(&state, frame).await,
                            Ok(None) => {
                                warn!("subscription closed, reconnecting");
                                break;
                            }
                            Err(RelayError::Protocol(e)) => {
                                warn!(error = %e, "dropping malformed intake frame");
                            }
                            Err(e) => {
                                warn!(error = %e, "subscription failed, reconnecting");
                                break;
                            }
                        }
                    }
                }
            }
            tokio::time::sleep(RESUBSCRIBE_DELAY).await;
        }
    })
}

/// Applies one intake frame: election adoption or replication merge.
async fn apply_frame(state: &NodeState, frame: PubFrame) {
    match frame.service.as_str() {
        service::ELECTION => match serde_json::from_value::<ElectionData>(frame.data) {
            Ok(election) => {
                // Last-writer-wins, adopted unconditionally. The value is
                // read-only decoration: it never gates writes.
                *state.coordinator.write() = election.coordinator.clone();
                state.clock.observe(election.clock);
                info!(coordinator = ?election.coordinator, "coordinator announced");
            }
            Err(e) => warn!(error = %e, "dropping malformed election frame"),
        },
        service::REPLICATION => match serde_json::from_value::<ReplicationData>(frame.data) {
            Ok(replication) => {
                if replication.server == state.name {
                    return;
                }
                {
                    let mut store = state.store.lock().await;
                    match store.merge(&replication.users, &replication.channels) {
                        Ok((users, channels)) if users + channels > 0 => {
                            info!(
                                from = %replication.server,
                                users, channels, "merged replicated state"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "failed to persist merged state"),
                    }
                }
                state.clock.observe(replication.clock);
            }
            Err(e) => warn!(error = %e, "dropping malformed replication frame"),
        },
        other => debug!(service = other, topic = %frame.topic, "ignoring frame"),
    }
}
