use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use conduit_coordination::{CoordinationService, SessionToken};
use conduit_core::{EndPointAddress, Error, Result};
use conduit_message::Message;
use conduit_transport::Endpoint;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::correlator::ReqRepEndpoint;
use crate::receive_result::MessageReceiveResult;

/// Bound on address re-resolution attempts within one `send` call; the
/// ceiling governs how large the backoff delay between attempts grows, not
/// how many times it's made.
const MAX_RESOLVE_ATTEMPTS: usize = 6;

#[derive(Debug, Clone)]
pub struct LogicalEndpointConfig {
    /// Initial delay before the first re-resolution retry.
    pub backoff_base: Duration,
    /// Upper bound on the exponential backoff delay between re-resolution
    /// attempts, per `conduit-config`'s `logical_endpoint.backoff_ceiling`.
    pub backoff_ceiling: Duration,
}

impl Default for LogicalEndpointConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(50),
            backoff_ceiling: Duration::from_secs(10),
        }
    }
}

fn coordination_key(address: &EndPointAddress) -> String {
    format!("logical-endpoint/{}", address.display())
}

/// Owns a routable [`EndPointAddress`] and resolves it to a physical
/// [`SocketAddr`] through a [`CoordinationService`], re-resolving with
/// exponential backoff whenever a send observes a stale mapping.
pub struct LogicalEndpoint<E: Endpoint + 'static> {
    address: EndPointAddress,
    session: SessionToken,
    coordination: Arc<dyn CoordinationService>,
    reqrep: Arc<ReqRepEndpoint<E>>,
    config: LogicalEndpointConfig,
    cached_physical: RwLock<Option<SocketAddr>>,
}

impl<E: Endpoint + 'static> LogicalEndpoint<E> {
    #[must_use]
    pub fn new(
        address: EndPointAddress,
        session: SessionToken,
        coordination: Arc<dyn CoordinationService>,
        reqrep: Arc<ReqRepEndpoint<E>>,
        config: LogicalEndpointConfig,
    ) -> Self {
        Self {
            address,
            session,
            coordination,
            reqrep,
            config,
            cached_physical: RwLock::new(None),
        }
    }

    #[must_use]
    pub const fn address(&self) -> &EndPointAddress {
        &self.address
    }

    /// Publish this endpoint's physical location so peers can resolve it.
    pub async fn advertise(&self, physical: SocketAddr) -> Result<()> {
        self.coordination
            .put(coordination_key(&self.address), physical.to_string().into_bytes(), self.session.clone())
            .await?;
        *self.cached_physical.write() = Some(physical);
        Ok(())
    }

    fn cached(&self) -> Option<SocketAddr> {
        *self.cached_physical.read()
    }

    fn invalidate(&self) {
        *self.cached_physical.write() = None;
    }

    async fn resolve(&self, remote: &EndPointAddress) -> Result<SocketAddr> {
        let raw = self
            .coordination
            .get(coordination_key(remote))
            .await?
            .ok_or_else(|| Error::transport_failure(format!("no physical address registered for '{remote}'")))?;
        let text = String::from_utf8(raw)
            .map_err(|_| Error::transport_failure(format!("malformed physical address for '{remote}'")))?;
        text.parse::<SocketAddr>()
            .map_err(|e| Error::transport_failure(format!("malformed physical address for '{remote}': {e}")))
    }

    async fn resolve_with_backoff(&self, remote: &EndPointAddress) -> Result<SocketAddr> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.backoff_base)
            .with_max_delay(self.config.backoff_ceiling)
            .with_max_times(MAX_RESOLVE_ATTEMPTS);

        (|| async { self.resolve(remote).await })
            .retry(backoff)
            .when(|_| true)
            .notify(|e: &Error, dur: Duration| {
                warn!(error = %e, delay = ?dur, "re-resolving logical endpoint address");
            })
            .await
    }

    /// Send `packet` to `remote`, resolving its physical address (from
    /// cache, or via the coordination service with backoff on miss or
    /// stale-cache failure) before delegating to the request/reply layer.
    pub async fn send(
        &self,
        remote: &EndPointAddress,
        packet: Message,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Message> {
        let physical = match self.cached() {
            Some(addr) => addr,
            None => {
                let addr = self.resolve_with_backoff(remote).await?;
                debug!(%remote, %addr, "resolved logical endpoint address");
                addr
            }
        };

        match self
            .reqrep
            .send(packet.clone(), physical, cancel.clone(), deadline)
            .await
        {
            Ok(response) => {
                *self.cached_physical.write() = Some(physical);
                Ok(response)
            }
            Err(Error::TransportFailure { .. }) => {
                self.invalidate();
                let addr = self.resolve_with_backoff(remote).await?;
                let result = self.reqrep.send(packet, addr, cancel, deadline).await;
                if result.is_ok() {
                    *self.cached_physical.write() = Some(addr);
                }
                result
            }
            Err(other) => Err(other),
        }
    }

    /// Await the next inbound request on the underlying request/reply
    /// endpoint.
    pub async fn receive(&self) -> Result<MessageReceiveResult<E>> {
        self.reqrep.receive().await
    }
}
