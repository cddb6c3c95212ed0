//! Wire encoding and framing.
//!
//! Every connection carries length-delimited frames (4-byte big-endian
//! prefix); each frame is one envelope in the deployment-chosen encoding.
//! MessagePack is the default; JSON is available for debuggability.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::ProtocolError;

/// Deployment-chosen serialization for everything on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// MessagePack via `rmp-serde` (default).
    #[default]
    Msgpack,
    /// JSON via `serde_json`.
    Json,
}

impl Encoding {
    /// Encodes a value into one frame's payload bytes.
    ///
    /// MessagePack uses named struct fields so both encodings present the
    /// same map-shaped data to the peer.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        match self {
            Self::Msgpack => Ok(rmp_serde::to_vec_named(value)?),
            Self::Json => Ok(serde_json::to_vec(value)?),
        }
    }

    /// Decodes one frame's payload bytes.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ProtocolError> {
        match self {
            Self::Msgpack => Ok(rmp_serde::from_slice(bytes)?),
            Self::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }
}

/// Length-delimited frame transport over one relay connection.
pub type FrameTransport<S> = Framed<S, LengthDelimitedCodec>;

/// Wraps a stream in the relay's length-delimited framing.
pub fn frame_transport<S: AsyncRead + AsyncWrite>(stream: S) -> FrameTransport<S> {
    Framed::new(stream, LengthDelimitedCodec::new())
}

/// Encodes `value` and writes it as one frame.
pub async fn send_frame<T, S>(
    transport: &mut FrameTransport<S>,
    encoding: Encoding,
    value: &T,
) -> Result<(), ProtocolError>
where
    T: Serialize,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let bytes = encoding.encode(value)?;
    transport.send(Bytes::from(bytes)).await?;
    Ok(())
}

/// Reads one frame and decodes it, or `None` when the peer closed.
pub async fn recv_frame<T, S>(
    transport: &mut FrameTransport<S>,
    encoding: Encoding,
) -> Result<Option<T>, ProtocolError>
where
    T: DeserializeOwned,
    S: AsyncRead + AsyncWrite + Unpin,
{
    match transport.next().await {
        None => Ok(None),
        Some(frame) => {
            let bytes = frame?;
            Ok(Some(encoding.decode(&bytes)?))
        }
    }
}
