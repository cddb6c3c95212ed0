//! Node-side transports for the relay.
//!
//! The node opens four outbound connections: the broker (request-reply
//! serving), the proxy publish side (fanout), the proxy subscribe side
//! (membership intake), and the reference service (rank/heartbeat/list).
//! All four carry length-delimited frames in the configured encoding.

pub mod broker;
mod publisher;
mod reference;
mod subscriber;

pub use publisher::Publisher;
pub use reference::ReferenceClient;
pub use subscriber::Subscriber;

use std::time::Duration;
use thiserror::Error;

/// Transport-level faults on a relay connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("transport: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire: {0}")]
    Protocol(#[from] relay_proto::ProtocolError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection closed by peer")]
    Closed,
}
