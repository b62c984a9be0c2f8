use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use conduit_core::{Error, Result};
use conduit_message::Message;
use conduit_transport::Endpoint;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::header::{decode_header, encode_header, Kind};
use crate::receive_result::MessageReceiveResult;

/// How long the requester waits for a `cancellation-ack` after emitting
/// `cancel`, before giving up and completing the local operation anyway.
const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Correlation-id mask: ids are 31-bit per the wire contract, so the high
/// bit is always clear.
const CORR_ID_MASK: u32 = 0x7FFF_FFFF;

pub(crate) enum OutgoingOutcome {
    Response(Message),
    Ack,
    CancellationAck,
}

/// Correlates outgoing requests with their inbound responses/acks/cancels
/// over one underlying [`Endpoint`], and surfaces inbound requests to
/// callers of [`ReqRepEndpoint::receive`].
pub struct ReqRepEndpoint<E: Endpoint> {
    pub(crate) inner: Arc<E>,
    next_corr_id: AtomicU32,
    pub(crate) outgoing: DashMap<u32, oneshot::Sender<OutgoingOutcome>>,
    pub(crate) incoming_cancel: DashMap<u32, CancellationToken>,
    incoming_tx: mpsc::UnboundedSender<MessageReceiveResult<E>>,
    incoming_rx: Mutex<mpsc::UnboundedReceiver<MessageReceiveResult<E>>>,
}

impl<E: Endpoint + 'static> ReqRepEndpoint<E> {
    #[must_use]
    pub fn new(inner: Arc<E>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let correlator = Arc::new(Self {
            inner,
            next_corr_id: AtomicU32::new(1),
            outgoing: DashMap::new(),
            incoming_cancel: DashMap::new(),
            incoming_tx: tx,
            incoming_rx: Mutex::new(rx),
        });
        let pump = Arc::clone(&correlator);
        tokio::spawn(async move { pump.pump_loop().await });
        correlator
    }

    async fn pump_loop(self: Arc<Self>) {
        loop {
            match self.inner.receive().await {
                Ok((mut message, remote)) => {
                    let Some(header) = message.pop_frame() else {
                        warn!("request/reply frame missing header, dropping");
                        continue;
                    };
                    let Some((kind, corr_id)) = decode_header(&header) else {
                        warn!("request/reply frame has malformed header, dropping");
                        continue;
                    };
                    self.handle_inbound(kind, corr_id, message, remote);
                }
                Err(e) => {
                    warn!(error = %e, "request/reply endpoint's transport closed, stopping pump");
                    return;
                }
            }
        }
    }

    fn handle_inbound(self: &Arc<Self>, kind: Kind, corr_id: u32, message: Message, remote: SocketAddr) {
        match kind {
            Kind::Request => {
                let token = CancellationToken::new();
                self.incoming_cancel.insert(corr_id, token.clone());
                let result = MessageReceiveResult::new(Arc::clone(self), corr_id, remote, message, token);
                if self.incoming_tx.send(result).is_err() {
                    warn!(corr_id, "no receiver for inbound request, dropping");
                }
            }
            Kind::Cancel => {
                if let Some(token) = self.incoming_cancel.get(&corr_id) {
                    token.cancel();
                }
            }
            Kind::Response | Kind::Ack | Kind::CancellationAck => {
                if let Some((_, sender)) = self.outgoing.remove(&corr_id) {
                    let outcome = match kind {
                        Kind::Response => OutgoingOutcome::Response(message),
                        Kind::Ack => OutgoingOutcome::Ack,
                        Kind::CancellationAck => OutgoingOutcome::CancellationAck,
                        Kind::Request | Kind::Cancel => unreachable!(),
                    };
                    let _ = sender.send(outcome);
                }
            }
        }
    }

    fn allocate_corr_id(&self) -> u32 {
        self.next_corr_id.fetch_add(1, Ordering::Relaxed) & CORR_ID_MASK
    }

    /// Send `packet` as a request to `remote` and await exactly one of
    /// `{response, ack, cancel-ack, timeout, transport-failure}` per the
    /// request/reply contract. `cancel` is observed cooperatively: on
    /// cancellation a `cancel` frame is emitted to the peer and the call
    /// waits up to [`CANCEL_GRACE_PERIOD`] for `cancellation-ack` before
    /// completing locally with [`Error::Cancelled`].
    pub async fn send(
        self: &Arc<Self>,
        packet: Message,
        remote: SocketAddr,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Message> {
        let corr_id = self.allocate_corr_id();
        let (tx, rx) = oneshot::channel();
        self.outgoing.insert(corr_id, tx);

        let mut framed = packet;
        framed.push_frame(encode_header(Kind::Request, corr_id));
        if let Err(e) = self.inner.send(framed, remote).await {
            self.outgoing.remove(&corr_id);
            return Err(e);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => self.cancel_in_flight(corr_id, remote).await,
            result = rx => Self::complete(result),
            () = tokio::time::sleep(deadline) => {
                self.outgoing.remove(&corr_id);
                Err(Error::Timeout { elapsed_ms: u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX) })
            }
        }
    }

    fn complete(result: std::result::Result<OutgoingOutcome, oneshot::error::RecvError>) -> Result<Message> {
        match result {
            Ok(OutgoingOutcome::Response(msg)) => Ok(msg),
            Ok(OutgoingOutcome::Ack) => Ok(Message::new()),
            Ok(OutgoingOutcome::CancellationAck) => Err(Error::Cancelled),
            Err(_) => Err(Error::transport_failure("correlator dropped before a reply arrived")),
        }
    }

    async fn cancel_in_flight(self: &Arc<Self>, corr_id: u32, remote: SocketAddr) -> Result<Message> {
        let (tx, rx) = oneshot::channel();
        self.outgoing.insert(corr_id, tx);

        let mut cancel_msg = Message::new();
        cancel_msg.push_frame(encode_header(Kind::Cancel, corr_id));
        let _ = self.inner.send(cancel_msg, remote).await;

        match tokio::time::timeout(CANCEL_GRACE_PERIOD, rx).await {
            Ok(_) => {}
            Err(_) => {
                self.outgoing.remove(&corr_id);
            }
        }
        Err(Error::Cancelled)
    }

    /// Await the next inbound request, surfaced with a handle to reply.
    pub async fn receive(self: &Arc<Self>) -> Result<MessageReceiveResult<E>> {
        let mut rx = self.incoming_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| Error::transport_failure("request/reply endpoint closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_transport::TcpPhysicalEndpoint;

    #[tokio::test]
    async fn request_is_answered_with_response() {
        let server_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let client_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_phys.local_addr();

        let server = ReqRepEndpoint::new(server_phys);
        let client = ReqRepEndpoint::new(client_phys);

        let server_task = tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                let received = server.receive().await.unwrap();
                let mut response = Message::new();
                response.push_frame(bytes::Bytes::from_static(b"pong"));
                received.send_response(response).await.unwrap();
            }
        });

        let mut request = Message::new();
        request.push_frame(bytes::Bytes::from_static(b"ping"));
        let response = client
            .send(request, server_addr, CancellationToken::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response.top_frame(), Some(&bytes::Bytes::from_static(b"pong")));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let server_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let client_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_phys.local_addr();
        let _server = ReqRepEndpoint::new(server_phys);
        let client = ReqRepEndpoint::new(client_phys);

        let request = Message::new();
        let err = client
            .send(request, server_addr, CancellationToken::new(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn caller_cancellation_yields_cancelled_after_peer_acks() {
        let server_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let client_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let server_addr = server_phys.local_addr();

        let server = ReqRepEndpoint::new(server_phys);
        let client = ReqRepEndpoint::new(client_phys);

        let server_task = tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                let received = server.receive().await.unwrap();
                received.cancelled().await;
                received.send_cancellation().await.unwrap();
            }
        });

        let cancel = CancellationToken::new();
        let request_cancel = cancel.clone();
        let request = Message::new();
        let send_task = tokio::spawn({
            let client = Arc::clone(&client);
            async move {
                client
                    .send(request, server_addr, request_cancel, Duration::from_secs(5))
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = send_task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        server_task.await.unwrap();
        assert!(client.outgoing.is_empty());
    }
}
