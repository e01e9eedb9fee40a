// Websocket feed client - Socket.IO subscription with reconnect
use crate::infrastructure::socket_io::{
    decode_engine, decode_socket, encode_connect, encode_disconnect, EnginePacket, FeedEndpoint,
    PacketError, SocketPacket, PONG,
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("server rejected namespace {namespace}: {reason}")]
    Rejected { namespace: String, reason: String },
    #[error("no handshake from server within {0:?}")]
    HandshakeTimeout(Duration),
    #[error("no ping from server within {0:?}")]
    PingTimeout(Duration),
    #[error("server closed the connection")]
    Closed,
    #[error("event consumer is gone")]
    ConsumerClosed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Doubled delay, capped at `max`
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    endpoint: FeedEndpoint,
    event: String,
    policy: ReconnectPolicy,
}

impl FeedClient {
    pub fn new(endpoint: FeedEndpoint, event: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            endpoint,
            event: event.into(),
            policy,
        }
    }

    /// Run the subscription until `shutdown` flips to true (or its sender is dropped).
    /// Payloads of the subscribed event are forwarded in delivery order.
    pub fn spawn(self, events: mpsc::Sender<Value>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.supervise(events, shutdown).await })
    }

    async fn supervise(&self, events: mpsc::Sender<Value>, mut shutdown: watch::Receiver<bool>) {
        let mut delay = self.policy.initial;

        loop {
            let mut connected = false;
            match self.session(&events, &mut shutdown, &mut connected).await {
                Ok(()) => break,
                Err(FeedError::ConsumerClosed) => {
                    tracing::debug!("Feed consumer closed, stopping subscription");
                    break;
                }
                Err(e) => tracing::warn!("Feed connection to {} lost: {}", self.endpoint.url, e),
            }

            if connected {
                delay = self.policy.initial;
            }

            tracing::info!("Reconnecting to feed in {:?}", delay);
            tokio::select! {
                _ = stopped(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = self.policy.next_delay(delay);
        }

        tracing::info!("Feed subscription to {} closed", self.endpoint.url);
    }

    /// One websocket connection. `Ok` means shutdown was requested and the socket was closed.
    async fn session(
        &self,
        events: &mpsc::Sender<Value>,
        shutdown: &mut watch::Receiver<bool>,
        connected: &mut bool,
    ) -> Result<(), FeedError> {
        if *shutdown.borrow() {
            return Ok(());
        }

        tracing::debug!("Connecting to feed {}", self.endpoint.url);
        let (ws, _) = tokio::select! {
            _ = stopped(shutdown) => return Ok(()),
            res = tokio_tungstenite::connect_async(self.endpoint.url.as_str()) => res?,
        };
        let (mut write, mut read) = ws.split();

        let namespace = self.endpoint.namespace.as_str();
        let mut liveness = HANDSHAKE_TIMEOUT;
        let mut deadline = Instant::now() + liveness;
        let mut opened = false;

        loop {
            tokio::select! {
                biased;

                _ = stopped(shutdown) => {
                    if *connected {
                        let _ = write.send(Message::Text(encode_disconnect(namespace).into())).await;
                    }
                    let _ = write.close().await;
                    return Ok(());
                }
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(if opened {
                        FeedError::PingTimeout(liveness)
                    } else {
                        FeedError::HandshakeTimeout(liveness)
                    });
                }
                frame = read.next() => {
                    let text = match frame.ok_or(FeedError::Closed)?? {
                        Message::Text(text) => text,
                        Message::Close(_) => return Err(FeedError::Closed),
                        _ => continue,
                    };

                    let packet = match decode_engine(text.as_str()) {
                        Ok(packet) => packet,
                        Err(e) => {
                            tracing::warn!("Skipping undecodable feed packet: {}", e);
                            continue;
                        }
                    };

                    match packet {
                        EnginePacket::Open(handshake) => {
                            tracing::debug!("Engine.IO session {} opened", handshake.sid);
                            opened = true;
                            liveness = Duration::from_millis(
                                handshake.ping_interval.saturating_add(handshake.ping_timeout),
                            );
                            deadline = Instant::now() + liveness;
                            write.send(Message::Text(encode_connect(namespace).into())).await?;
                        }
                        EnginePacket::Ping(payload) => {
                            deadline = Instant::now() + liveness;
                            write.send(Message::Text(format!("{}{}", PONG, payload).into())).await?;
                        }
                        EnginePacket::Close => return Err(FeedError::Closed),
                        EnginePacket::Message(body) => {
                            self.on_socket_packet(&body, events, shutdown, connected).await?;
                        }
                        other => tracing::trace!("Ignoring engine packet {:?}", other),
                    }
                }
            }
        }
    }

    /// A full event channel must not hold up shutdown: the event is dropped and the
    /// session loop then sends the disconnect.
    async fn on_socket_packet(
        &self,
        body: &str,
        events: &mpsc::Sender<Value>,
        shutdown: &mut watch::Receiver<bool>,
        connected: &mut bool,
    ) -> Result<(), FeedError> {
        let namespace = self.endpoint.namespace.as_str();
        let packet = match decode_socket(body) {
            Ok(packet) => packet,
            Err(PacketError::Binary) => {
                tracing::debug!("Ignoring binary socket packet");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Skipping malformed socket packet: {}", e);
                return Ok(());
            }
        };

        match packet {
            SocketPacket::Connect { namespace: ns, data } if ns == namespace => {
                *connected = true;
                let sid = data
                    .as_ref()
                    .and_then(|d| d.get("sid"))
                    .and_then(Value::as_str)
                    .unwrap_or("-");
                tracing::info!(
                    "Subscribed to '{}' on {} (namespace {}, sid {})",
                    self.event,
                    self.endpoint.url,
                    ns,
                    sid
                );
            }
            SocketPacket::Event {
                namespace: ns,
                id,
                name,
                args,
            } if ns == namespace && name == self.event => {
                if let Some(id) = id {
                    tracing::trace!("Event '{}' requested ack {}, not sending one", name, id);
                }
                let payload = args.into_iter().next().unwrap_or(Value::Null);
                tokio::select! {
                    biased;

                    _ = stopped(shutdown) => {
                        tracing::debug!("Shutdown requested while forwarding '{}', dropping it", name);
                    }
                    sent = events.send(payload) => {
                        sent.map_err(|_| FeedError::ConsumerClosed)?;
                    }
                }
            }
            SocketPacket::Ack { namespace: ns } => {
                tracing::trace!("Ignoring unrequested ack on namespace {}", ns);
            }
            SocketPacket::Disconnect { namespace: ns } if ns == namespace => {
                return Err(FeedError::Closed);
            }
            SocketPacket::ConnectError { namespace: ns, data } if ns == namespace => {
                let reason = data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                return Err(FeedError::Rejected {
                    namespace: ns,
                    reason,
                });
            }
            other => tracing::trace!("Ignoring socket packet {:?}", other),
        }

        Ok(())
    }
}

/// Resolves once shutdown is requested or the controlling side is dropped
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
