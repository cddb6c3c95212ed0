//! Protocol error types.

use thiserror::Error;

/// Errors arising from encoding, decoding, or framing relay traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MessagePack serialization failed.
    #[error("msgpack encode: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack deserialization failed.
    #[error("msgpack decode: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    /// JSON serialization or deserialization failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The underlying stream failed while reading or writing a frame.
    #[error("transport: {0}")]
    Io(#[from] std::io::Error),
}
