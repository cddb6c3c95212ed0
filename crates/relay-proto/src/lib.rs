//! # relay-proto
//!
//! Wire protocol shared by every participant in the relay chat network:
//! the node daemon, the client and bot programs, and the reference
//! (election) service.
//!
//! ## Features
//!
//! - `{service, data}` envelope types with a closed set of typed payloads
//! - Lamport logical clock for causal ordering of events
//! - MessagePack and JSON encodings selectable per deployment
//! - Length-delimited framing over async TCP streams
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_proto::{Encoding, Envelope, LoginRequest};
//!
//! let request = Envelope::new(
//!     relay_proto::service::LOGIN,
//!     LoginRequest {
//!         user: Some("alice".to_string()),
//!         timestamp: relay_proto::unix_now(),
//!         clock: 1,
//!     },
//! );
//!
//! let bytes = Encoding::Msgpack.encode(&request).unwrap();
//! let back: Envelope = Encoding::Msgpack.decode(&bytes).unwrap();
//! assert_eq!(back.service, "login");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod clock;
mod envelope;
mod error;
mod wire;

pub use clock::LamportClock;
pub use envelope::{
    ChannelRequest, DirectMessage, ElectionData, Envelope, HeartbeatRequest, ListRequest,
    LoginRequest, MessageRequest, PubFrame, PublishEvent, PublishRequest, RankRequest,
    ReplicationData, ResponseData, ServerEntry, SubscribeRequest, service, status, topic, unix_now,
};
pub use error::ProtocolError;
pub use wire::{Encoding, FrameTransport, frame_transport, recv_frame, send_frame};
