use std::sync::Arc;
use std::time::Duration;

use conduit_core::{EndPointAddress, Error, Result, Route, TargetOutcome};
use conduit_message::Message;
use conduit_reqrep::LogicalEndpoint;
use conduit_transport::Endpoint;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::manager::RouteManager;

/// Looks up targets for a route via the [`RouteManager`] and applies the
/// P2P-vs-publish policy and hierarchy descent, sending through a shared
/// [`LogicalEndpoint`].
pub struct MessageRouter<E: Endpoint + 'static> {
    route_manager: Arc<RouteManager>,
    logical: Arc<LogicalEndpoint<E>>,
}

impl<E: Endpoint + 'static> MessageRouter<E> {
    #[must_use]
    pub const fn new(route_manager: Arc<RouteManager>, logical: Arc<LogicalEndpoint<E>>) -> Self {
        Self { route_manager, logical }
    }

    /// Route `message` along `routes`, most-derived type first. Descends to
    /// a base type only for P2P dispatch when every target at the current
    /// level either has no registration or fails with a dispatch-not-found
    /// error.
    pub async fn route(
        &self,
        routes: &[Route],
        message: &Message,
        publish: bool,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Vec<Message>> {
        if publish {
            let Some(first) = routes.first() else {
                return Err(Error::dispatch_not_found("<empty route hierarchy>"));
            };
            return self.publish_at(first, message, &cancel, deadline).await;
        }

        for (level, route) in routes.iter().enumerate() {
            match self.try_p2p_at(route, message, &cancel, deadline).await {
                Ok(response) => return Ok(vec![response]),
                Err(e) if e.is_dispatch_not_found() => {
                    debug!(%route, level, "no handler at this level, descending hierarchy");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::dispatch_not_found(
            routes.last().map_or_else(|| "<empty route hierarchy>".to_string(), ToString::to_string),
        ))
    }

    /// Explicit-target form: send directly to `target`, bypassing the
    /// `publishOnly` filter the route-manager lookup would otherwise apply.
    pub async fn route_to(
        &self,
        target: &EndPointAddress,
        message: Message,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Message> {
        self.logical.send(target, message, cancel, deadline).await
    }

    async fn try_p2p_at(&self, route: &Route, message: &Message, cancel: &CancellationToken, deadline: Duration) -> Result<Message> {
        let targets = self.route_manager.get_routes(route);
        let mut last_not_found = Error::dispatch_not_found(route.to_string());
        for target in targets.iter().filter(|t| !t.options.publish_only) {
            match self
                .logical
                .send(&target.endpoint, message.clone(), cancel.clone(), deadline)
                .await
            {
                Ok(response) => return Ok(response),
                Err(e) if e.is_dispatch_not_found() => last_not_found = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_not_found)
    }

    async fn publish_at(&self, route: &Route, message: &Message, cancel: &CancellationToken, deadline: Duration) -> Result<Vec<Message>> {
        let targets = self.route_manager.get_routes(route);
        if targets.is_empty() {
            return Err(Error::dispatch_not_found(route.to_string()));
        }

        let sends = targets.iter().map(|target| {
            let logical = Arc::clone(&self.logical);
            let endpoint = target.endpoint.clone();
            let message = message.clone();
            let cancel = cancel.clone();
            async move {
                let outcome = logical.send(&endpoint, message, cancel, deadline).await;
                (endpoint, outcome)
            }
        });
        let results = join_all(sends).await;

        let mut responses = Vec::new();
        let mut outcomes = Vec::new();
        for (endpoint, outcome) in results {
            match outcome {
                Ok(response) => {
                    outcomes.push(TargetOutcome {
                        endpoint: endpoint.to_string(),
                        succeeded: true,
                        detail: None,
                    });
                    responses.push(response);
                }
                Err(e) => outcomes.push(TargetOutcome {
                    endpoint: endpoint.to_string(),
                    succeeded: false,
                    detail: Some(e.to_string()),
                }),
            }
        }

        if responses.is_empty() {
            return Err(Error::AggregateFailure { outcomes });
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_coordination::{CoordinationService, InMemoryCoordinationService, SessionToken};
    use conduit_core::RouteOptions;
    use conduit_message::MessageBuilder;
    use conduit_reqrep::{LogicalEndpointConfig, ReqRepEndpoint};
    use conduit_transport::TcpPhysicalEndpoint;

    async fn server_pair(
        coordination: &Arc<dyn CoordinationService>,
        name: &str,
    ) -> Arc<LogicalEndpoint<TcpPhysicalEndpoint>> {
        let phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = phys.local_addr();
        let reqrep = ReqRepEndpoint::new(phys);
        let logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from(name),
            SessionToken::new(name),
            Arc::clone(coordination),
            reqrep,
            LogicalEndpointConfig::default(),
        ));
        logical.advertise(addr).await.unwrap();
        logical
    }

    #[tokio::test]
    async fn p2p_route_reaches_registered_target() {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());
        let worker = server_pair(&coordination, "worker-1").await;
        let client_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let client_logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from("client"),
            SessionToken::new("client"),
            Arc::clone(&coordination),
            ReqRepEndpoint::new(client_phys),
            LogicalEndpointConfig::default(),
        ));

        let route_manager = RouteManager::new(Arc::clone(&coordination), SessionToken::new("rm"));
        route_manager
            .add_route(
                EndPointAddress::from("worker-1"),
                Route::from("Orders.Place"),
                RouteOptions::persistent(),
                SessionToken::new("rm"),
            )
            .await
            .unwrap();

        let router = MessageRouter::new(route_manager, client_logical);

        let server_task = tokio::spawn(async move {
            let received = worker.receive().await.unwrap();
            let response = MessageBuilder::new().push(bytes::Bytes::from_static(b"placed")).build();
            received.send_response(response).await.unwrap();
        });

        let request = MessageBuilder::new().push(bytes::Bytes::from_static(b"place")).build();
        let responses = router
            .route(&[Route::from("Orders.Place")], &request, false, CancellationToken::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].top_frame(), Some(&bytes::Bytes::from_static(b"placed")));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn p2p_route_with_no_registration_fails_dispatch_not_found() {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());
        let client_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let client_logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from("client"),
            SessionToken::new("client"),
            Arc::clone(&coordination),
            ReqRepEndpoint::new(client_phys),
            LogicalEndpointConfig::default(),
        ));
        let route_manager = RouteManager::new(coordination, SessionToken::new("rm"));
        let router = MessageRouter::new(route_manager, client_logical);

        let request = Message::new();
        let err = router
            .route(&[Route::from("Orders.Place")], &request, false, CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_dispatch_not_found());
    }
}
