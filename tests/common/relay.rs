//! In-process relay fixtures and test peers.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use relay_proto::{
    Encoding, Envelope, FrameTransport, LamportClock, PubFrame, ResponseData, ServerEntry,
    SubscribeRequest, frame_transport, recv_frame, send_frame, service, unix_now,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{sleep, timeout};

type Transport = FrameTransport<TcpStream>;

/// Store-and-forward request-reply broker.
///
/// Clients connect to `front_addr`; nodes connect to `back_addr` and
/// serve. Frames are shuttled opaquely: the broker never decodes them.
pub struct BrokerFixture {
    pub front_addr: SocketAddr,
    pub back_addr: SocketAddr,
}

impl BrokerFixture {
    pub async fn spawn() -> anyhow::Result<Self> {
        let front = TcpListener::bind("127.0.0.1:0").await?;
        let back = TcpListener::bind("127.0.0.1:0").await?;
        let front_addr = front.local_addr()?;
        let back_addr = back.local_addr()?;

        let workers: std::sync::Arc<Mutex<Vec<Transport>>> = Default::default();

        let pool = workers.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = back.accept().await {
                pool.lock().await.push(frame_transport(stream));
            }
        });

        tokio::spawn(async move {
            while let Ok((stream, _)) = front.accept().await {
                let workers = workers.clone();
                tokio::spawn(async move {
                    let mut client = frame_transport(stream);
                    while let Some(Ok(raw)) = client.next().await {
                        let reply = forward(&workers, raw.freeze()).await;
                        if client.send(reply.freeze()).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Ok(Self {
            front_addr,
            back_addr,
        })
    }
}

/// Forwards one request to a connected node, strictly request-then-reply.
/// Waits for a node to connect if none has yet; dead nodes are dropped.
async fn forward(workers: &Mutex<Vec<Transport>>, raw: Bytes) -> bytes::BytesMut {
    loop {
        let mut pool = workers.lock().await;
        if pool.is_empty() {
            drop(pool);
            sleep(Duration::from_millis(25)).await;
            continue;
        }
        let worker = &mut pool[0];
        if worker.send(raw.clone()).await.is_err() {
            pool.remove(0);
            continue;
        }
        match worker.next().await {
            Some(Ok(reply)) => return reply,
            _ => {
                pool.remove(0);
            }
        }
    }
}

struct SubscriberEntry {
    topics: HashSet<String>,
    tx: mpsc::UnboundedSender<Bytes>,
}

/// Topic-matching pub/sub proxy.
///
/// Publishers connect to `pub_addr` and send `{topic, service, data}`
/// frames; subscribers connect to `sub_addr`, send one subscribe control
/// frame, and receive every matching frame. Delivery is best-effort:
/// no subscriber, no backlog.
pub struct ProxyFixture {
    pub pub_addr: SocketAddr,
    pub sub_addr: SocketAddr,
    encoding: Encoding,
}

impl ProxyFixture {
    pub async fn spawn(encoding: Encoding) -> anyhow::Result<Self> {
        let pub_listener = TcpListener::bind("127.0.0.1:0").await?;
        let sub_listener = TcpListener::bind("127.0.0.1:0").await?;
        let pub_addr = pub_listener.local_addr()?;
        let sub_addr = sub_listener.local_addr()?;

        let subscribers: std::sync::Arc<Mutex<Vec<SubscriberEntry>>> = Default::default();

        let subs = subscribers.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = pub_listener.accept().await {
                let subs = subs.clone();
                tokio::spawn(async move {
                    let mut publisher = frame_transport(stream);
                    while let Some(Ok(raw)) = publisher.next().await {
                        let Ok(frame) = encoding.decode::<PubFrame>(&raw) else {
                            continue;
                        };
                        let bytes = raw.freeze();
                        let mut subs = subs.lock().await;
                        subs.retain(|s| {
                            !s.topics.contains(&frame.topic) || s.tx.send(bytes.clone()).is_ok()
                        });
                    }
                });
            }
        });

        tokio::spawn(async move {
            while let Ok((stream, _)) = sub_listener.accept().await {
                let subscribers = subscribers.clone();
                tokio::spawn(async move {
                    let mut transport = frame_transport(stream);
                    let Ok(Some(control)) = recv_frame::<Envelope, _>(&mut transport, encoding).await
                    else {
                        return;
                    };
                    if control.service != service::SUBSCRIBE {
                        return;
                    }
                    let Ok(request) = control.payload::<SubscribeRequest>() else {
                        return;
                    };
                    let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
                    subscribers.lock().await.push(SubscriberEntry {
                        topics: request.topics.into_iter().collect(),
                        tx,
                    });
                    while let Some(bytes) = rx.recv().await {
                        if transport.send(bytes).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Ok(Self {
            pub_addr,
            sub_addr,
            encoding,
        })
    }

    /// Publishes one frame as an external peer (e.g. an election
    /// announcement on the `servers` topic).
    pub async fn publish(&self, frame: PubFrame) -> anyhow::Result<()> {
        let stream = TcpStream::connect(self.pub_addr).await?;
        let mut transport = frame_transport(stream);
        send_frame(&mut transport, self.encoding, &frame).await?;
        Ok(())
    }
}

struct ReferenceState {
    clock: LamportClock,
    ranks: HashMap<String, u64>,
    next_rank: u64,
}

/// Minimal reference (election) service: rank assignment, heartbeat
/// acknowledgement, and the server roster.
pub struct ReferenceFixture {
    pub addr: SocketAddr,
}

impl ReferenceFixture {
    pub async fn spawn(encoding: Encoding) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shared = std::sync::Arc::new(Mutex::new(ReferenceState {
            clock: LamportClock::new(),
            ranks: HashMap::new(),
            next_rank: 1,
        }));

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = shared.clone();
                tokio::spawn(async move {
                    let mut transport = frame_transport(stream);
                    while let Ok(Some(request)) =
                        recv_frame::<Envelope, _>(&mut transport, encoding).await
                    {
                        let reply = answer(&shared, &request).await;
                        if send_frame(&mut transport, encoding, &reply).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Ok(Self { addr })
    }
}

async fn answer(shared: &Mutex<ReferenceState>, request: &Envelope) -> Envelope {
    let mut state = shared.lock().await;
    if let Some(clock) = request.clock() {
        state.clock.observe(clock);
    }

    let user = request
        .data
        .get("user")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let mut body = ResponseData::default();
    match request.service.as_str() {
        service::RANK => {
            let rank = match state.ranks.get(&user) {
                Some(rank) => *rank,
                None => {
                    let rank = state.next_rank;
                    state.next_rank += 1;
                    state.ranks.insert(user, rank);
                    rank
                }
            };
            body.rank = Some(rank);
        }
        service::HEARTBEAT => {
            body.status = Some(if state.ranks.contains_key(&user) {
                "OK".to_string()
            } else {
                "unknown".to_string()
            });
        }
        service::LIST => {
            body.list = Some(
                state
                    .ranks
                    .iter()
                    .map(|(name, rank)| ServerEntry {
                        name: name.clone(),
                        rank: *rank,
                    })
                    .collect(),
            );
        }
        _ => {
            body.status = Some("error".to_string());
            body.description = Some("unrecognized service".to_string());
        }
    }
    body.timestamp = unix_now();
    body.clock = state.clock.tick();
    Envelope::new(request.service.clone(), body)
}

/// A request-reply client speaking through the broker front side,
/// tracking its own Lamport clock like any participant.
pub struct TestClient {
    transport: Transport,
    encoding: Encoding,
    clock: LamportClock,
}

impl TestClient {
    pub async fn connect(front_addr: SocketAddr, encoding: Encoding) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(front_addr).await?;
        Ok(Self {
            transport: frame_transport(stream),
            encoding,
            clock: LamportClock::new(),
        })
    }

    /// Sends `{service, data}` with clock and timestamp stamped in, and
    /// waits for the single reply.
    pub async fn request(&mut self, service: &str, mut data: Value) -> anyhow::Result<Envelope> {
        if let Value::Object(map) = &mut data {
            map.insert("clock".to_string(), Value::from(self.clock.tick()));
            map.insert("timestamp".to_string(), Value::from(unix_now()));
        }
        let envelope = Envelope {
            service: service.to_string(),
            data,
        };
        send_frame(&mut self.transport, self.encoding, &envelope).await?;
        self.recv_reply().await
    }

    /// Writes raw bytes as one frame (for undecodable-request tests) and
    /// waits for the reply.
    pub async fn request_raw(&mut self, bytes: &'static [u8]) -> anyhow::Result<Envelope> {
        self.transport.send(Bytes::from_static(bytes)).await?;
        self.recv_reply().await
    }

    async fn recv_reply(&mut self) -> anyhow::Result<Envelope> {
        let reply = timeout(
            Duration::from_secs(10),
            recv_frame::<Envelope, _>(&mut self.transport, self.encoding),
        )
        .await??
        .ok_or_else(|| anyhow::anyhow!("broker closed the connection"))?;
        if let Some(clock) = reply.clock() {
            self.clock.observe(clock);
        }
        Ok(reply)
    }

    /// The reply body of a request, decoded.
    pub async fn request_body(
        &mut self,
        service: &str,
        data: Value,
    ) -> anyhow::Result<ResponseData> {
        Ok(self.request(service, data).await?.payload()?)
    }

    /// The client's current clock value.
    pub fn clock(&self) -> u64 {
        self.clock.value()
    }
}

/// A pub/sub subscriber connected to the proxy.
pub struct TestSubscriber {
    transport: Transport,
    encoding: Encoding,
}

impl TestSubscriber {
    pub async fn connect(
        sub_addr: SocketAddr,
        encoding: Encoding,
        topics: &[&str],
    ) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(sub_addr).await?;
        let mut transport = frame_transport(stream);
        let control = Envelope::new(
            service::SUBSCRIBE,
            SubscribeRequest {
                topics: topics.iter().map(|t| t.to_string()).collect(),
            },
        );
        send_frame(&mut transport, encoding, &control).await?;
        // Give the proxy a beat to register the subscription before the
        // caller triggers any fanout.
        sleep(Duration::from_millis(100)).await;
        Ok(Self {
            transport,
            encoding,
        })
    }

    /// Next delivered frame, within `wait`.
    pub async fn recv(&mut self, wait: Duration) -> anyhow::Result<PubFrame> {
        timeout(wait, recv_frame::<PubFrame, _>(&mut self.transport, self.encoding))
            .await??
            .ok_or_else(|| anyhow::anyhow!("proxy closed the connection"))
    }

    /// Asserts that nothing is delivered within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        let outcome = timeout(
            wait,
            recv_frame::<PubFrame, _>(&mut self.transport, self.encoding),
        )
        .await;
        assert!(outcome.is_err(), "expected no delivery, got {outcome:?}");
    }
}
