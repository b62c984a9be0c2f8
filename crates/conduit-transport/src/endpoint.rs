use std::net::SocketAddr;

use async_trait::async_trait;
use conduit_core::Result;
use conduit_message::Message;

/// A bidirectional datagram channel keyed by a physical address.
///
/// Implemented by the raw TCP physical endpoint and by each named
/// multiplexer sub-endpoint, so layers above (request/reply, route
/// manager) can be written once against this trait.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Send `message` to `remote`, opening or reusing a connection as
    /// needed. Framing and any reconnect-on-failure behavior is the
    /// implementation's concern; callers see only success or a
    /// [`conduit_core::Error::TransportFailure`].
    async fn send(&self, message: Message, remote: SocketAddr) -> Result<()>;

    /// Await the next inbound message along with the address it arrived
    /// from.
    async fn receive(&self) -> Result<(Message, SocketAddr)>;
}
