//! Subscription intake from the proxy.
//!
//! On connect the subscriber sends one `subscribe` control frame naming
//! its topics; the proxy then forwards every matching
//! `{topic, service, data}` frame.

use super::RelayError;
use relay_proto::{
    Encoding, Envelope, FrameTransport, PubFrame, SubscribeRequest, frame_transport, send_frame,
    service,
};
use futures_util::StreamExt;
use tokio::net::TcpStream;

pub struct Subscriber {
    transport: FrameTransport<TcpStream>,
    encoding: Encoding,
}

impl Subscriber {
    /// Connects and subscribes to `topics`.
    pub async fn connect(
        addr: &str,
        encoding: Encoding,
        topics: &[&str],
    ) -> Result<Self, RelayError> {
        let stream = TcpStream::connect(addr).await?;
        let mut transport = frame_transport(stream);
        let subscribe = Envelope::new(
            service::SUBSCRIBE,
            SubscribeRequest {
                topics: topics.iter().map(|t| t.to_string()).collect(),
            },
        );
        send_frame(&mut transport, encoding, &subscribe).await?;
        Ok(Self {
            transport,
            encoding,
        })
    }

    /// Next frame, `None` when the proxy closed the connection.
    ///
    /// A decode fault ([`RelayError::Protocol`]) leaves the framing
    /// intact; the caller may drop the single frame and keep reading.
    pub async fn next(&mut self) -> Result<Option<PubFrame>, RelayError> {
        match self.transport.next().await {
            None => Ok(None),
            Some(raw) => {
                let bytes = raw?;
                Ok(Some(self.encoding.decode(&bytes)?))
            }
        }
    }
}
