//! The `{service, data}` envelope and the closed set of typed payloads.
//!
//! Every frame on every connection is one [`Envelope`]: a service tag and
//! a free-form `data` object. Typed payload structs serialize into `data`;
//! decoding validates the required-field set of the service at hand.
//! Request payloads keep their name fields optional so a missing field
//! surfaces as a per-service validation error rather than a decode fault.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ProtocolError;

/// Service tags carried in [`Envelope::service`].
pub mod service {
    /// Register a user name.
    pub const LOGIN: &str = "login";
    /// List all known users.
    pub const USERS: &str = "users";
    /// Create a channel.
    pub const CHANNEL: &str = "channel";
    /// List all known channels.
    pub const CHANNELS: &str = "channels";
    /// Post to a channel (fans out to the channel topic).
    pub const PUBLISH: &str = "publish";
    /// Direct message to a user (fans out to the user topic).
    pub const MESSAGE: &str = "message";
    /// Reference service: request this node's rank.
    pub const RANK: &str = "rank";
    /// Reference service: liveness beacon.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Reference service: fetch the server roster.
    pub const LIST: &str = "list";
    /// Periodic full-state broadcast between nodes.
    pub const REPLICATION: &str = "replication";
    /// Coordinator announcement from the election service.
    pub const ELECTION: &str = "election";
    /// Subscriber control frame naming the topics to receive.
    pub const SUBSCRIBE: &str = "subscribe";
    /// Generic fault reply for requests that could not be decoded.
    pub const ERROR: &str = "error";
}

/// Status strings carried in [`ResponseData::status`].
pub mod status {
    /// Login and channel creation succeeded.
    pub const SUCCESS: &str = "success";
    /// Publish, message, and heartbeat acknowledgement.
    pub const OK: &str = "OK";
    /// Any failure reply; `description` names the fault.
    pub const ERROR: &str = "error";
}

/// Well-known pub/sub topics (user and channel names are topics too).
pub mod topic {
    /// Heartbeat/rank scope; election announcements arrive here.
    pub const SERVERS: &str = "servers";
    /// Periodic state-sync broadcasts between nodes.
    pub const REPLICATION: &str = "replication";
}

/// Seconds since the Unix epoch as a float, the `timestamp` convention
/// shared by every participant. Not semantically interpreted anywhere.
#[must_use]
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// The outer shape of every frame: a service tag plus a data object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Service tag selecting the handler (or naming the reply's origin).
    pub service: String,
    /// Service-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Builds an envelope from a typed payload.
    ///
    /// All payload types in this crate serialize infallibly; a payload
    /// that cannot become a JSON value degrades to `null` data.
    pub fn new(service: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            service: service.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// Decodes the data object into a typed payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// The Lamport clock stamped on the data object, if any.
    #[must_use]
    pub fn clock(&self) -> Option<u64> {
        self.data.get("clock").and_then(Value::as_u64)
    }
}

/// One pub/sub frame: an envelope tagged with the topic it rides on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubFrame {
    /// Topic the relay matches subscribers against.
    pub topic: String,
    /// Service tag of the carried envelope.
    pub service: String,
    /// Payload of the carried envelope.
    #[serde(default)]
    pub data: Value,
}

impl PubFrame {
    /// Wraps an envelope for publication on `topic`.
    pub fn new(topic: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            topic: topic.into(),
            service: envelope.service,
            data: envelope.data,
        }
    }

    /// Unwraps the carried envelope, discarding the topic.
    #[must_use]
    pub fn into_envelope(self) -> Envelope {
        Envelope {
            service: self.service,
            data: self.data,
        }
    }
}

/// Subscriber control payload: the topics this connection wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    /// Topic names; user and channel names are valid topics.
    pub topics: Vec<String>,
}

/// `login` request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Name to register; absence is a validation error, not a decode fault.
    #[serde(default)]
    pub user: Option<String>,
    /// Caller's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Caller's Lamport clock at send time.
    #[serde(default)]
    pub clock: u64,
}

/// `channel` request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRequest {
    /// Channel to create; absence is a validation error.
    #[serde(default)]
    pub channel: Option<String>,
    /// Caller's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Caller's Lamport clock at send time.
    #[serde(default)]
    pub clock: u64,
}

/// `publish` request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Posting user.
    #[serde(default)]
    pub user: Option<String>,
    /// Target channel; must exist at routing time.
    #[serde(default)]
    pub channel: Option<String>,
    /// Post body.
    #[serde(default)]
    pub message: Option<String>,
    /// Caller's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Caller's Lamport clock at send time.
    #[serde(default)]
    pub clock: u64,
}

/// `message` (direct message) request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// Sending user.
    #[serde(default)]
    pub src: Option<String>,
    /// Receiving user; must exist at routing time.
    #[serde(default)]
    pub dst: Option<String>,
    /// Message body.
    #[serde(default)]
    pub message: Option<String>,
    /// Caller's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Caller's Lamport clock at send time.
    #[serde(default)]
    pub clock: u64,
}

/// `rank` request to the reference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    /// Node display name registering for a rank.
    pub user: String,
    /// Node's wall-clock time.
    pub timestamp: f64,
    /// Node's Lamport clock at send time.
    pub clock: u64,
}

/// `heartbeat` request to the reference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    /// Node display name.
    pub user: String,
    /// Node's wall-clock time.
    pub timestamp: f64,
    /// Node's Lamport clock at send time.
    pub clock: u64,
}

/// `list` request to the reference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Node's wall-clock time.
    pub timestamp: f64,
    /// Node's Lamport clock at send time.
    pub clock: u64,
}

/// One entry in the reference service's server roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Node display name.
    pub name: String,
    /// Rank assigned at registration, immutable thereafter.
    pub rank: u64,
}

/// Uniform reply payload: one struct with optional fields so every reply
/// round-trips through both encodings. Absent fields are omitted on the
/// wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Outcome, one of the [`status`] strings; list replies omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Human-readable fault description on error replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Full user list (`users` replies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    /// Full channel list (`channels` replies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    /// Assigned rank (`rank` replies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u64>,
    /// Server roster (`list` replies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<ServerEntry>>,
    /// Responder's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Responder's freshly ticked Lamport clock.
    #[serde(default)]
    pub clock: u64,
}

impl ResponseData {
    /// A bare status reply; clock and timestamp are stamped by the sender.
    #[must_use]
    pub fn with_status(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Self::default()
        }
    }

    /// An error reply with the given fault description.
    pub fn error(description: impl Into<String>) -> Self {
        Self {
            status: Some(status::ERROR.to_string()),
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// Fanout payload for channel posts, delivered on the channel topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEvent {
    /// Posting user.
    pub user: String,
    /// Channel the post was routed to.
    pub channel: String,
    /// Post body.
    pub message: String,
    /// Original request timestamp, passed through.
    pub timestamp: f64,
    /// Node's Lamport clock at fanout time.
    pub clock: u64,
}

/// Fanout payload for direct messages, delivered on the recipient topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Sending user.
    pub src: String,
    /// Receiving user.
    pub dst: String,
    /// Message body.
    pub message: String,
    /// Original request timestamp, passed through.
    pub timestamp: f64,
    /// Node's Lamport clock at fanout time.
    pub clock: u64,
}

/// Periodic full-state broadcast on the `replication` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationData {
    /// Originating node; nodes skip their own broadcasts on intake.
    pub server: String,
    /// Full user snapshot.
    #[serde(default)]
    pub users: Vec<String>,
    /// Full channel snapshot.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Node's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Node's Lamport clock at broadcast time.
    #[serde(default)]
    pub clock: u64,
}

/// Coordinator announcement carried on the `servers` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionData {
    /// Newly elected coordinator; adopted last-writer-wins.
    #[serde(default)]
    pub coordinator: Option<String>,
    /// Announcer's wall-clock time.
    #[serde(default)]
    pub timestamp: f64,
    /// Announcer's Lamport clock.
    #[serde(default)]
    pub clock: u64,
}
