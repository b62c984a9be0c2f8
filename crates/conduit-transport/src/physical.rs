use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::{Error, Result};
use conduit_message::Message;
use dashmap::DashMap;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::endpoint::Endpoint;

/// Bound on reconnect attempts within a single `send` call before giving up
/// and surfacing a transport failure, per the "implementation-defined
/// bound" the physical endpoint contract allows.
const MAX_RECONNECT_ATTEMPTS: u32 = 3;
const READ_CHUNK: usize = 8192;

/// Default inbound queue depth when a caller binds without specifying one
/// (`conduit-config`'s `transport.inbound_queue_depth` overrides this for a
/// hosted endpoint; tests and ad-hoc callers get a reasonable default).
const DEFAULT_INBOUND_QUEUE_DEPTH: usize = 1024;

struct Connection {
    writer: Mutex<OwnedWriteHalf>,
}

type Connections = Arc<DashMap<SocketAddr, Arc<Connection>>>;

/// Stream-variant physical endpoint over `tokio::net::TcpStream`: a
/// bidirectional channel indexed by the process's bound local address,
/// reusing a persistent connection per remote and reconnecting
/// transparently when a send observes a dead connection.
pub struct TcpPhysicalEndpoint {
    local_addr: SocketAddr,
    connections: Connections,
    inbound_tx: mpsc::Sender<(Message, SocketAddr)>,
    inbound_rx: Mutex<mpsc::Receiver<(Message, SocketAddr)>>,
}

impl TcpPhysicalEndpoint {
    /// Bind a listener at `local_addr` (port 0 picks an ephemeral port) and
    /// start accepting inbound connections in the background, with the
    /// default inbound queue depth.
    pub async fn bind(local_addr: SocketAddr) -> Result<Arc<Self>> {
        Self::bind_with_queue_depth(local_addr, DEFAULT_INBOUND_QUEUE_DEPTH).await
    }

    /// Bind with an explicit inbound queue depth (spec §5: "Incoming queues
    /// are bounded per endpoint"). Once the queue is full, newly arriving
    /// messages are dropped rather than the oldest queued one.
    pub async fn bind_with_queue_depth(local_addr: SocketAddr, queue_depth: usize) -> Result<Arc<Self>> {
        let listener = TcpListener::bind(local_addr)
            .await
            .map_err(|e| Error::transport_failure(format!("bind {local_addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::transport_failure(e.to_string()))?;

        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let endpoint = Arc::new(Self {
            local_addr,
            connections: Arc::new(DashMap::new()),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
        });

        let connections = Arc::clone(&endpoint.connections);
        let inbound_tx = endpoint.inbound_tx.clone();
        tokio::spawn(async move { accept_loop(listener, connections, inbound_tx).await });

        Ok(endpoint)
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Eagerly open (or reuse) a connection to `remote` rather than waiting
    /// for the first `send`. The request/reply and logical-endpoint layers
    /// call this after resolving a physical address so `send`'s retry bound
    /// covers only genuine mid-flight failures, not first contact.
    pub async fn connect_to(&self, remote: SocketAddr) -> Result<()> {
        if self.connections.contains_key(&remote) {
            return Ok(());
        }
        let stream = TcpStream::connect(remote)
            .await
            .map_err(|e| Error::transport_failure(format!("connect {remote}: {e}")))?;
        adopt_stream(&self.connections, self.inbound_tx.clone(), remote, stream);
        Ok(())
    }
}

fn adopt_stream(
    connections: &Connections,
    inbound_tx: mpsc::Sender<(Message, SocketAddr)>,
    remote: SocketAddr,
    stream: TcpStream,
) -> Arc<Connection> {
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    let conn = Arc::new(Connection {
        writer: Mutex::new(write_half),
    });
    connections.insert(remote, Arc::clone(&conn));

    let reader_connections = Arc::clone(connections);
    tokio::spawn(async move {
        read_loop(read_half, remote, &inbound_tx).await;
        reader_connections.remove(&remote);
    });
    conn
}

async fn accept_loop(
    listener: TcpListener,
    connections: Connections,
    inbound_tx: mpsc::Sender<(Message, SocketAddr)>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                debug!(%remote, "accepted inbound connection");
                adopt_stream(&connections, inbound_tx.clone(), remote, stream);
            }
            Err(e) => {
                warn!(error = %e, "accept failed, listener stopping");
                return;
            }
        }
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    remote: SocketAddr,
    tx: &mpsc::Sender<(Message, SocketAddr)>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => {
                debug!(%remote, "peer closed connection");
                return;
            }
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                loop {
                    match conduit_message::decode(&buf) {
                        Ok((message, rest)) => {
                            let consumed = buf.len() - rest.len();
                            match tx.try_send((message, remote)) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    warn!(%remote, "inbound queue full, dropping newest message");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => return,
                            }
                            buf.drain(..consumed);
                        }
                        // Not a full message yet; wait for more bytes.
                        Err(_) => break,
                    }
                }
            }
            Err(e) => {
                warn!(%remote, error = %e, "read error, closing connection");
                return;
            }
        }
    }
}

#[async_trait]
impl Endpoint for TcpPhysicalEndpoint {
    async fn send(&self, message: Message, remote: SocketAddr) -> Result<()> {
        let encoded = conduit_message::encode(&message);
        let mut attempt = 0;
        loop {
            if !self.connections.contains_key(&remote) {
                self.connect_to(remote).await?;
            }
            let conn = {
                let entry = self
                    .connections
                    .get(&remote)
                    .ok_or_else(|| Error::transport_failure(format!("lost connection to {remote}")))?;
                Arc::clone(&entry)
            };
            let mut writer = conn.writer.lock().await;
            match tokio::io::AsyncWriteExt::write_all(&mut *writer, &encoded).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    drop(writer);
                    self.connections.remove(&remote);
                    attempt += 1;
                    if attempt > MAX_RECONNECT_ATTEMPTS {
                        return Err(Error::transport_failure(format!(
                            "send to {remote} failed after {attempt} attempt(s): {e}"
                        )));
                    }
                    warn!(%remote, attempt, error = %e, "send failed, reconnecting");
                }
            }
        }
    }

    async fn receive(&self) -> Result<(Message, SocketAddr)> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| Error::transport_failure("physical endpoint closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_message::MessageBuilder;

    #[tokio::test]
    async fn loopback_round_trip_delivers_message_and_sender() {
        let server = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let client = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let msg = MessageBuilder::new()
            .push(bytes::Bytes::from_static(b"hello"))
            .build();
        client.send(msg.clone(), server.local_addr()).await.unwrap();

        let (received, from) = server.receive().await.unwrap();
        assert_eq!(received, msg);
        assert_eq!(from.ip(), client.local_addr().ip());
    }

    #[tokio::test]
    async fn send_to_unreachable_address_fails() {
        let client = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let unreachable: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let msg = MessageBuilder::new().push(bytes::Bytes::from_static(b"x")).build();
        assert!(client.send(msg, unreachable).await.is_err());
    }
}
