//! Request-reply serving loop against the broker.
//!
//! The node connects out to the broker's back side and answers forwarded
//! client requests over that single connection. Pairing is strict 1:1:
//! exactly one reply per frame read, including frames that fail to decode
//! (answered with a generic error envelope), because the transport blocks
//! each caller until its reply arrives. The connection is re-established
//! with a delay whenever it drops.

use super::RelayError;
use crate::services::{self, Registry};
use crate::state::NodeState;
use futures_util::StreamExt;
use relay_proto::{Envelope, FrameTransport, frame_transport, send_frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Runs the request-reply loop forever, reconnecting as needed.
pub async fn run(state: Arc<NodeState>, registry: Arc<Registry>, addr: String) {
    loop {
        match TcpStream::connect(&addr).await {
            Ok(stream) => {
                info!(addr = %addr, "connected to broker");
                match serve(&state, &registry, frame_transport(stream)).await {
                    Ok(()) => warn!("broker closed the connection"),
                    Err(e) => warn!(error = %e, "broker link failed"),
                }
            }
            Err(e) => warn!(addr = %addr, error = %e, "broker unreachable"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn serve(
    state: &Arc<NodeState>,
    registry: &Registry,
    mut transport: FrameTransport<TcpStream>,
) -> Result<(), RelayError> {
    while let Some(raw) = transport.next().await {
        let raw = raw?;
        let reply = match state.encoding.decode::<Envelope>(&raw) {
            Ok(request) => registry.dispatch(state, request).await,
            Err(e) => {
                warn!(error = %e, "undecodable request frame");
                services::fault_reply(state, e.to_string())
            }
        };
        send_frame(&mut transport, state.encoding, &reply).await?;
    }
    Ok(())
}
