use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use conduit_core::Result;
use conduit_message::Message;
use conduit_transport::Endpoint;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::correlator::ReqRepEndpoint;
use crate::header::{encode_header, Kind};

/// A received request together with the context needed to reply to it.
///
/// Exactly one of [`Self::send_response`], [`Self::send_ack`], or
/// [`Self::send_cancellation`] should be called. Dropping the handle
/// without calling any of them sends an implicit ack, per the contract
/// that disposing a receive result is equivalent to acking it.
pub struct MessageReceiveResult<E: Endpoint> {
    endpoint: Arc<ReqRepEndpoint<E>>,
    corr_id: u32,
    remote: SocketAddr,
    message: Message,
    cancel: CancellationToken,
    completed: AtomicBool,
}

impl<E: Endpoint + 'static> MessageReceiveResult<E> {
    pub(crate) fn new(
        endpoint: Arc<ReqRepEndpoint<E>>,
        corr_id: u32,
        remote: SocketAddr,
        message: Message,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            endpoint,
            corr_id,
            remote,
            message,
            cancel,
            completed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    #[must_use]
    pub const fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Resolves once the requester emits a `cancel` frame for this request.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Reply with a response payload, completing the requester's `send`.
    pub async fn send_response(&self, response: Message) -> Result<()> {
        self.mark_completed();
        let mut framed = response;
        framed.push_frame(encode_header(Kind::Response, self.corr_id));
        self.endpoint.inner.send(framed, self.remote).await
    }

    /// Acknowledge the request with no payload.
    pub async fn send_ack(&self) -> Result<()> {
        self.mark_completed();
        let mut framed = Message::new();
        framed.push_frame(encode_header(Kind::Ack, self.corr_id));
        self.endpoint.inner.send(framed, self.remote).await
    }

    /// Acknowledge that cancellation was observed and honored.
    pub async fn send_cancellation(&self) -> Result<()> {
        self.mark_completed();
        let mut framed = Message::new();
        framed.push_frame(encode_header(Kind::CancellationAck, self.corr_id));
        self.endpoint.inner.send(framed, self.remote).await
    }

    fn mark_completed(&self) {
        self.completed.store(true, Ordering::Relaxed);
        self.endpoint.incoming_cancel.remove(&self.corr_id);
    }
}

impl<E: Endpoint + 'static> Drop for MessageReceiveResult<E> {
    fn drop(&mut self) {
        if self.completed.load(Ordering::Relaxed) {
            return;
        }
        self.endpoint.incoming_cancel.remove(&self.corr_id);
        let endpoint = Arc::clone(&self.endpoint);
        let corr_id = self.corr_id;
        let remote = self.remote;
        tokio::spawn(async move {
            let mut framed = Message::new();
            framed.push_frame(encode_header(Kind::Ack, corr_id));
            if let Err(e) = endpoint.inner.send(framed, remote).await {
                warn!(corr_id, error = %e, "implicit ack on drop failed to send");
            }
        });
    }
}
