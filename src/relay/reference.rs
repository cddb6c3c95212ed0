//! Request-reply client for the reference (election) service.
//!
//! Strictly synchronous per connection: one request, then exactly one
//! reply, serialized behind a mutex. Every call applies the configured
//! bounded wait; any fault drops the connection so the next call
//! reconnects fresh.

use super::RelayError;
use relay_proto::{Encoding, Envelope, FrameTransport, frame_transport, recv_frame, send_frame};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

pub struct ReferenceClient {
    addr: String,
    encoding: Encoding,
    wait: Duration,
    conn: Mutex<Option<FrameTransport<TcpStream>>>,
}

impl ReferenceClient {
    pub fn new(addr: impl Into<String>, encoding: Encoding, wait: Duration) -> Self {
        Self {
            addr: addr.into(),
            encoding,
            wait,
            conn: Mutex::new(None),
        }
    }

    /// Sends one request and waits for its reply, within the bounded wait.
    pub async fn call(&self, request: &Envelope) -> Result<Envelope, RelayError> {
        let mut conn = self.conn.lock().await;

        let mut transport = match conn.take() {
            Some(transport) => transport,
            None => {
                let stream = timeout(self.wait, TcpStream::connect(&self.addr))
                    .await
                    .map_err(|_| RelayError::Timeout(self.wait))??;
                frame_transport(stream)
            }
        };

        let exchange = async {
            send_frame(&mut transport, self.encoding, request).await?;
            match recv_frame::<Envelope, _>(&mut transport, self.encoding).await? {
                Some(reply) => Ok(reply),
                None => Err(RelayError::Closed),
            }
        };

        match timeout(self.wait, exchange).await {
            Ok(Ok(reply)) => {
                *conn = Some(transport);
                Ok(reply)
            }
            // Connection state is unknown after a fault; reconnect next call.
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RelayError::Timeout(self.wait)),
        }
    }
}
