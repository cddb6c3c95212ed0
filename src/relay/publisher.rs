//! Best-effort fanout publisher.
//!
//! Frames `{topic, service, data}` and writes them to the proxy's publish
//! side. Delivery is at-most-once per currently connected subscriber and
//! there is no backlog; a failed or absent proxy connection drops the
//! frame with a warning and never fails the triggering request. The
//! connect and the write both run under the configured bounded wait, so
//! a stalled proxy cannot hold up the handler that triggered the fanout.

use relay_proto::{Encoding, Envelope, FrameTransport, PubFrame, frame_transport, send_frame};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

struct PublisherInner {
    addr: Option<String>,
    encoding: Encoding,
    wait: Duration,
    conn: Mutex<Option<FrameTransport<TcpStream>>>,
}

/// Cloneable handle to the node's single proxy-publish connection.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Publisher {
    /// A publisher that will connect to `addr` on first use, bounding
    /// every connect and write by `wait`.
    pub fn new(addr: impl Into<String>, encoding: Encoding, wait: Duration) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                addr: Some(addr.into()),
                encoding,
                wait,
                conn: Mutex::new(None),
            }),
        }
    }

    /// A publisher with no proxy; every frame is dropped. Used by tests
    /// exercising the dispatcher without a relay.
    #[cfg(test)]
    pub fn disabled(encoding: Encoding) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                addr: None,
                encoding,
                wait: Duration::from_secs(1),
                conn: Mutex::new(None),
            }),
        }
    }

    /// Attempts the proxy connection eagerly, logging the outcome.
    /// Failure is not fatal; `publish` retries per frame.
    pub async fn ensure_connected(&self) {
        let Some(addr) = &self.inner.addr else { return };
        let mut conn = self.inner.conn.lock().await;
        if conn.is_some() {
            return;
        }
        match timeout(self.inner.wait, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                info!(addr = %addr, "connected to proxy publish side");
                *conn = Some(frame_transport(stream));
            }
            Ok(Err(e)) => warn!(addr = %addr, error = %e, "proxy unreachable at startup"),
            Err(_) => warn!(addr = %addr, "proxy connect timed out at startup"),
        }
    }

    /// Publishes one envelope on `topic`, best-effort within the bounded
    /// wait.
    pub async fn publish(&self, topic: &str, envelope: Envelope) {
        let Some(addr) = &self.inner.addr else { return };
        let frame = PubFrame::new(topic, envelope);

        let mut conn = self.inner.conn.lock().await;
        if conn.is_none() {
            match timeout(self.inner.wait, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => *conn = Some(frame_transport(stream)),
                Ok(Err(e)) => {
                    warn!(topic, addr = %addr, error = %e, "proxy unreachable, dropping frame");
                    return;
                }
                Err(_) => {
                    warn!(topic, addr = %addr, "proxy connect timed out, dropping frame");
                    return;
                }
            }
        }
        if let Some(transport) = conn.as_mut() {
            match timeout(
                self.inner.wait,
                send_frame(transport, self.inner.encoding, &frame),
            )
            .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(topic, error = %e, "proxy write failed, dropping frame");
                    *conn = None;
                }
                // Write state is unknown after a timeout; reconnect next
                // frame.
                Err(_) => {
                    warn!(topic, "proxy write timed out, dropping frame");
                    *conn = None;
                }
            }
        }
    }
}
