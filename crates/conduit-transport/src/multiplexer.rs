use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use conduit_core::{Error, Result};
use conduit_message::Message;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::endpoint::Endpoint;

/// Encode the multiplexer's name frame: `<nameLen:u32 LE><utf8 name>`.
fn encode_name_frame(name: &str) -> Bytes {
    let mut buf = Vec::with_capacity(4 + name.len());
    buf.extend_from_slice(&u32::try_from(name.len()).unwrap_or(u32::MAX).to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    Bytes::from(buf)
}

fn decode_name_frame(frame: &[u8]) -> Option<String> {
    if frame.len() < 4 {
        return None;
    }
    let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    let name_bytes = frame.get(4..4 + len)?;
    std::str::from_utf8(name_bytes).ok().map(ToString::to_string)
}

/// Demultiplexes a single underlying [`Endpoint`] into many named
/// sub-endpoints, each presented as its own [`Endpoint`]. A background
/// task continuously drains the underlying endpoint, pops the outermost
/// name frame, and routes the remaining message to the sub-endpoint's
/// inbound queue; an unregistered name is dropped with a log notice
/// rather than surfaced as an error, since the sender and receiver's sets
/// of open names are not expected to be synchronized.
/// Default per-sub-endpoint inbound queue depth; overridable via
/// [`Multiplexer::open_with_queue_depth`] for a hosted deployment wired to
/// `conduit-config`'s `transport.inbound_queue_depth`.
const DEFAULT_SUB_QUEUE_DEPTH: usize = 1024;

pub struct Multiplexer {
    inner: Arc<dyn Endpoint>,
    subs: DashMap<String, mpsc::Sender<(Message, SocketAddr)>>,
}

impl Multiplexer {
    #[must_use]
    pub fn new(inner: Arc<dyn Endpoint>) -> Arc<Self> {
        let mux = Arc::new(Self {
            inner,
            subs: DashMap::new(),
        });
        let pump = Arc::clone(&mux);
        tokio::spawn(async move { pump.pump_loop().await });
        mux
    }

    async fn pump_loop(self: Arc<Self>) {
        loop {
            match self.inner.receive().await {
                Ok((mut message, remote)) => {
                    let Some(frame) = message.pop_frame() else {
                        warn!("multiplexer received a message with no name frame, dropping");
                        continue;
                    };
                    let Some(name) = decode_name_frame(&frame) else {
                        warn!("multiplexer received a malformed name frame, dropping");
                        continue;
                    };
                    match self.subs.get(&name) {
                        Some(sub) => match sub.try_send((message, remote)) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!(%name, "sub-endpoint inbound queue full, dropping newest message");
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                warn!(%name, "multiplexer sub-endpoint dropped, removing registration");
                                drop(sub);
                                self.subs.remove(&name);
                            }
                        },
                        None => warn!(%name, "no sub-endpoint registered, dropping message"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "multiplexer's underlying endpoint closed, stopping pump");
                    return;
                }
            }
        }
    }

    /// Open (or reopen) a named sub-endpoint. Opening a name a second time
    /// replaces the previous registration; messages in flight to the old
    /// one are dropped.
    pub fn open(self: &Arc<Self>, name: impl Into<String>) -> Arc<MultiplexedEndpoint> {
        self.open_with_queue_depth(name, DEFAULT_SUB_QUEUE_DEPTH)
    }

    /// As [`Self::open`], with an explicit inbound queue depth.
    pub fn open_with_queue_depth(self: &Arc<Self>, name: impl Into<String>, queue_depth: usize) -> Arc<MultiplexedEndpoint> {
        let name = name.into();
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        self.subs.insert(name.clone(), tx);
        Arc::new(MultiplexedEndpoint {
            name,
            inner: Arc::clone(&self.inner),
            inbound: Mutex::new(rx),
        })
    }
}

/// One named sub-endpoint of a [`Multiplexer`].
pub struct MultiplexedEndpoint {
    name: String,
    inner: Arc<dyn Endpoint>,
    inbound: Mutex<mpsc::Receiver<(Message, SocketAddr)>>,
}

impl MultiplexedEndpoint {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Endpoint for MultiplexedEndpoint {
    async fn send(&self, mut message: Message, remote: SocketAddr) -> Result<()> {
        message.push_frame(encode_name_frame(&self.name));
        self.inner.send(message, remote).await
    }

    async fn receive(&self) -> Result<(Message, SocketAddr)> {
        let mut rx = self.inbound.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| Error::transport_failure("multiplexer sub-endpoint closed"))
    }
}
