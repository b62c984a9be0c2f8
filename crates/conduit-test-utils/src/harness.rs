//! A ready-made client/worker pair of TCP-backed logical endpoints
//! sharing one in-memory coordination service, for routing and dispatch
//! integration tests that would otherwise hand-assemble the same four or
//! five collaborators in every test module.

use std::sync::Arc;

use conduit_coordination::{CoordinationService, InMemoryCoordinationService, SessionToken};
use conduit_core::EndPointAddress;
use conduit_reqrep::{LogicalEndpoint, LogicalEndpointConfig, ReqRepEndpoint};
use conduit_routing::RouteManager;
use conduit_transport::TcpPhysicalEndpoint;

/// One side of an [`EndpointPair`]: a bound physical endpoint wrapped in a
/// request/reply correlator and a logical endpoint advertised under its
/// name.
pub struct HarnessEndpoint {
    pub logical: Arc<LogicalEndpoint<TcpPhysicalEndpoint>>,
}

/// A client and a worker logical endpoint, both advertised to the same
/// shared coordination service, plus a [`RouteManager`] ready for routes
/// to be registered against the worker.
pub struct EndpointPair {
    pub coordination: Arc<dyn CoordinationService>,
    pub route_manager: Arc<RouteManager>,
    pub client: HarnessEndpoint,
    pub worker: HarnessEndpoint,
}

impl EndpointPair {
    /// Bind both sides on ephemeral loopback ports and advertise the
    /// worker's physical address so routes can resolve it immediately.
    pub async fn bind() -> Self {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());

        let client = Self::bind_side(Arc::clone(&coordination), "client", SessionToken::new("client")).await;
        let worker = Self::bind_side(Arc::clone(&coordination), "worker", SessionToken::new("worker")).await;

        let route_manager = Arc::new(RouteManager::new(Arc::clone(&coordination), SessionToken::new("route-manager")));

        Self { coordination, route_manager, client, worker }
    }

    async fn bind_side(coordination: Arc<dyn CoordinationService>, name: &str, session: SessionToken) -> HarnessEndpoint {
        let physical = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let local_addr = physical.local_addr();
        let logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from(name),
            session,
            coordination,
            ReqRepEndpoint::new(physical),
            LogicalEndpointConfig::default(),
        ));
        logical.advertise(local_addr).await.unwrap();
        HarnessEndpoint { logical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::RouteOptions;
    use conduit_message::MessageBuilder;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn client_can_reach_worker_after_a_route_is_registered() {
        let pair = EndpointPair::bind().await;
        pair.route_manager
            .add_route(
                EndPointAddress::from("worker"),
                conduit_core::Route::from("Orders.Place"),
                RouteOptions::persistent(),
                SessionToken::new("route-manager"),
            )
            .await
            .unwrap();

        let worker_logical = Arc::clone(&pair.worker.logical);
        let server = tokio::spawn(async move {
            let received = worker_logical.receive().await.unwrap();
            let response = MessageBuilder::new().push(bytes::Bytes::from_static(b"ack")).build();
            received.send_response(response).await.unwrap();
        });

        let request = MessageBuilder::new().push(bytes::Bytes::from_static(b"place-order")).build();
        let response = pair
            .client
            .logical
            .send(&EndPointAddress::from("worker"), request, CancellationToken::new(), Duration::from_secs(2))
            .await
            .unwrap();

        crate::assertions::assert_top_frame(&response, b"ack");
        server.await.unwrap();
    }
}
