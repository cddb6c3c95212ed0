//! Shared node state.
//!
//! One [`NodeState`] is shared as `Arc` across the four concurrently
//! scheduled activities (request-reply loop, intake loop, heartbeat timer,
//! replication timer). The store sits behind one async mutex so every
//! mutation-plus-save is a single critical section; the clock sits behind
//! a sync mutex so tick/observe are atomic.

pub mod store;

use crate::relay::Publisher;
use parking_lot::{Mutex, RwLock};
use relay_proto::{Encoding, LamportClock, ServerEntry};
use std::sync::{Arc, OnceLock};
use store::Store;

/// The node's Lamport clock, shared across tasks.
///
/// Every tick/observe is one atomic critical section, so values handed
/// out are strictly increasing process-wide.
#[derive(Clone, Default)]
pub struct SharedClock(Arc<Mutex<LamportClock>>);

impl SharedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments for a local event and returns the new value.
    pub fn tick(&self) -> u64 {
        self.0.lock().tick()
    }

    /// Folds in a received clock value and returns the new value.
    pub fn observe(&self, received: u64) -> u64 {
        self.0.lock().observe(received)
    }

    /// The current value, without advancing.
    pub fn value(&self) -> u64 {
        self.0.lock().value()
    }
}

/// Everything the node's activities share.
pub struct NodeState {
    /// Display name, unique per deployment.
    pub name: String,
    /// Wire encoding for every connection this node opens.
    pub encoding: Encoding,
    /// Process-wide causality counter.
    pub clock: SharedClock,
    /// Durable collections; lock scope is the mutation critical section.
    pub store: tokio::sync::Mutex<Store>,
    /// Best-effort fanout to the proxy.
    pub publisher: Publisher,
    /// Rank assigned once by the reference service.
    pub rank: OnceLock<u64>,
    /// Last-announced coordinator; read-only decoration, never gates writes.
    pub coordinator: RwLock<Option<String>>,
    /// Server roster from the latest `list` refresh.
    pub roster: RwLock<Vec<ServerEntry>>,
}

impl NodeState {
    pub fn new(name: String, encoding: Encoding, store: Store, publisher: Publisher) -> Self {
        Self {
            name,
            encoding,
            clock: SharedClock::new(),
            store: tokio::sync::Mutex::new(store),
            publisher,
            rank: OnceLock::new(),
            coordinator: RwLock::new(None),
            roster: RwLock::new(Vec::new()),
        }
    }
}
