use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use conduit_core::{Error, Result, Route, TargetOutcome};
use conduit_routing::MessageRouter;
use conduit_transport::Endpoint;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::data::{DispatchData, DispatchOutcome};
use crate::hierarchy::MessageTypeHierarchy;
use crate::processor::{build_chain, BoxFuture, MessageProcessor};
use crate::registry::{HandlerContext, HandlerRegistration, HandlerRegistry};

/// Ties the handler registry and message-type hierarchy to a
/// [`MessageRouter`], applying the local-first / P2P-vs-publish / descent
/// policy described in spec §4.3.
pub struct MessageDispatcher<E: Endpoint + 'static> {
    registry: Arc<HandlerRegistry>,
    hierarchy: Arc<MessageTypeHierarchy>,
    router: Arc<MessageRouter<E>>,
    processors: RwLock<Arc<[Arc<dyn MessageProcessor>]>>,
}

impl<E: Endpoint + 'static> MessageDispatcher<E> {
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>, hierarchy: Arc<MessageTypeHierarchy>, router: Arc<MessageRouter<E>>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            hierarchy,
            router,
            processors: RwLock::new(Arc::from(Vec::new())),
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Arc<MessageTypeHierarchy> {
        &self.hierarchy
    }

    /// Append a processor to the end of the chain (outermost stays
    /// outermost; new processors sit closest to the handler).
    pub fn add_processor(&self, processor: Arc<dyn MessageProcessor>) {
        let mut guard = self.processors.write();
        let mut next: Vec<Arc<dyn MessageProcessor>> = guard.iter().cloned().collect();
        next.push(processor);
        *guard = Arc::from(next);
    }

    async fn invoke_with_pipeline(self: &Arc<Self>, registration: &HandlerRegistration, data: DispatchData) -> Result<DispatchOutcome> {
        let processors = self.processors.read().clone();
        let ctx = HandlerContext {
            dispatcher: Some(Arc::clone(self) as Arc<dyn Any + Send + Sync>),
        };
        let handler = Arc::clone(&registration.handler);
        let tail: Arc<dyn Fn(DispatchData) -> BoxFuture<'static, Result<DispatchOutcome>> + Send + Sync> = Arc::new(move |data| {
            let handler = Arc::clone(&handler);
            let ctx = ctx.clone();
            Box::pin(async move { handler(ctx, data).await })
        });
        let chain = build_chain(processors, 0, tail);
        chain(data).await
    }

    async fn try_local(self: &Arc<Self>, route: &Route, data: &DispatchData, publish: bool) -> Result<DispatchOutcome> {
        let registrations = self.registry.resolve(route);
        let mut last_not_found = Error::dispatch_not_found(route.to_string());
        for registration in registrations.iter() {
            if !publish && registration.options.publish_only {
                continue;
            }
            match self.invoke_with_pipeline(registration, data.clone()).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_dispatch_not_found() => last_not_found = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_not_found)
    }

    /// Dispatch `data` along `route`'s hierarchy. P2P tries local handlers
    /// at each level before the router, descending only when the level is
    /// entirely unroutable (no local or remote handler). Publish never
    /// descends, aggregating every local and remote target at `route`
    /// itself.
    pub async fn dispatch(
        self: &Arc<Self>,
        route: &Route,
        data: DispatchData,
        publish: bool,
        cancel: CancellationToken,
        deadline: Duration,
    ) -> Result<Vec<DispatchOutcome>> {
        let routes = self.hierarchy.ancestors_most_derived_first(route);
        if publish {
            self.dispatch_publish(&routes[0], data, cancel, deadline).await
        } else {
            self.dispatch_p2p(&routes, data, cancel, deadline).await
        }
    }

    async fn dispatch_p2p(self: &Arc<Self>, routes: &[Route], data: DispatchData, cancel: CancellationToken, deadline: Duration) -> Result<Vec<DispatchOutcome>> {
        for (level, route) in routes.iter().enumerate() {
            match self.try_local(route, &data, false).await {
                Ok(outcome) => return Ok(vec![outcome]),
                Err(e) if !e.is_dispatch_not_found() => return Err(e),
                Err(_) => {}
            }

            match self.router.route(std::slice::from_ref(route), &data.message, false, cancel.clone(), deadline).await {
                Ok(responses) => return Ok(responses.into_iter().map(DispatchOutcome::Payload).collect()),
                Err(e) if e.is_dispatch_not_found() => {
                    debug!(%route, level, "no local or remote handler, descending hierarchy");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::dispatch_not_found(routes.last().map_or_else(|| "<empty route hierarchy>".to_string(), ToString::to_string)))
    }

    async fn dispatch_publish(self: &Arc<Self>, route: &Route, data: DispatchData, cancel: CancellationToken, deadline: Duration) -> Result<Vec<DispatchOutcome>> {
        let registrations = self.registry.resolve(route);
        let mut outcomes = Vec::new();
        let mut target_outcomes = Vec::new();
        let mut any_failed = false;

        for registration in registrations.iter() {
            match self.invoke_with_pipeline(registration, data.clone()).await {
                Ok(outcome) => {
                    target_outcomes.push(TargetOutcome {
                        endpoint: format!("local#{}", registration.id),
                        succeeded: true,
                        detail: None,
                    });
                    outcomes.push(outcome);
                }
                Err(e) => {
                    any_failed = true;
                    target_outcomes.push(TargetOutcome {
                        endpoint: format!("local#{}", registration.id),
                        succeeded: false,
                        detail: Some(e.to_string()),
                    });
                }
            }
        }

        match self.router.route(std::slice::from_ref(route), &data.message, true, cancel, deadline).await {
            Ok(responses) => {
                for response in responses {
                    target_outcomes.push(TargetOutcome {
                        endpoint: format!("remote:{route}"),
                        succeeded: true,
                        detail: None,
                    });
                    outcomes.push(DispatchOutcome::Payload(response));
                }
            }
            Err(Error::AggregateFailure { outcomes: remote }) => {
                any_failed = any_failed || remote.iter().any(|o| !o.succeeded);
                target_outcomes.extend(remote);
            }
            Err(e) if e.is_dispatch_not_found() && !target_outcomes.is_empty() => {}
            Err(e) => {
                any_failed = true;
                target_outcomes.push(TargetOutcome {
                    endpoint: route.to_string(),
                    succeeded: false,
                    detail: Some(e.to_string()),
                });
            }
        }

        if target_outcomes.is_empty() {
            return Err(Error::dispatch_not_found(route.to_string()));
        }
        // A publish with any failing target is reported as a mixed
        // aggregate failure, never a bare success that silently drops
        // the failing targets (spec §7/§8 scenario 5).
        if any_failed {
            return Err(Error::AggregateFailure { outcomes: target_outcomes });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use conduit_coordination::{CoordinationService, InMemoryCoordinationService, SessionToken};
    use conduit_core::{EndPointAddress, HandlerFailureKind, RouteOptions};
    use conduit_message::{Message, MessageBuilder};
    use conduit_reqrep::{LogicalEndpoint, LogicalEndpointConfig, ReqRepEndpoint};
    use conduit_routing::RouteManager;
    use conduit_transport::TcpPhysicalEndpoint;

    use super::*;
    use crate::registry::{HandlerOptions, HandlerRegistry};

    async fn client_only_router() -> Arc<MessageRouter<TcpPhysicalEndpoint>> {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());
        let phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from("client"),
            SessionToken::new("client"),
            Arc::clone(&coordination),
            ReqRepEndpoint::new(phys),
            LogicalEndpointConfig::default(),
        ));
        let route_manager = RouteManager::new(coordination, SessionToken::new("rm"));
        Arc::new(MessageRouter::new(route_manager, logical))
    }

    async fn router_with_worker(route: Route) -> (Arc<MessageRouter<TcpPhysicalEndpoint>>, tokio::task::JoinHandle<()>) {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());

        let worker_phys = TcpPhysicalEndpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let worker_addr = worker_phys.local_addr();
        let worker_logical = Arc::new(LogicalEndpoint::new(
            EndPointAddress::from("worker"),
            SessionToken::new("worker"),
            Arc::clone(&coordination),
            ReqRepEndpoint::new(worker_phys),
            LogicalEndpointConfig::default(),
        ));
        worker_logical.advertise(worker_addr).await.unwrap();

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
            .add_route(EndPointAddress::from("worker"), route, RouteOptions::persistent(), SessionToken::new("rm"))
            .await
            .unwrap();

        let server = tokio::spawn(async move {
            let received = worker_logical.receive().await.unwrap();
            let response = MessageBuilder::new().push(bytes::Bytes::from_static(b"remote-reply")).build();
            received.send_response(response).await.unwrap();
        });

        (Arc::new(MessageRouter::new(route_manager, client_logical)), server)
    }

    fn payload_handler(payload: &'static [u8]) -> crate::registry::HandlerFn {
        Arc::new(move |_ctx, _data| Box::pin(async move { Ok(DispatchOutcome::Payload(MessageBuilder::new().push(bytes::Bytes::from_static(payload)).build())) }))
    }

    fn failing_handler() -> crate::registry::HandlerFn {
        Arc::new(|_ctx, _data| Box::pin(async move { Err(Error::handler_failure(HandlerFailureKind::Validation, "nope")) }))
    }

    #[tokio::test]
    async fn local_handler_reached_without_network_hop() {
        let registry = HandlerRegistry::new();
        let hierarchy = Arc::new(MessageTypeHierarchy::new());
        let route = Route::from("Orders.Place");
        let _handle = registry.register(route.clone(), HandlerOptions::default(), payload_handler(b"local-reply"));

        let router = client_only_router().await;
        let dispatcher = MessageDispatcher::new(registry, hierarchy, router);

        let outcomes = dispatcher
            .dispatch(&route, DispatchData::new(Message::new()), false, CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].payload().and_then(Message::top_frame), Some(&bytes::Bytes::from_static(b"local-reply")));
    }

    #[tokio::test]
    async fn p2p_falls_back_to_router_when_no_local_handler() {
        let route = Route::from("Orders.Place");
        let registry = HandlerRegistry::new();
        let hierarchy = Arc::new(MessageTypeHierarchy::new());
        let (router, server) = router_with_worker(route.clone()).await;
        let dispatcher = MessageDispatcher::new(registry, hierarchy, router);

        let outcomes = dispatcher
            .dispatch(&route, DispatchData::new(Message::new()), false, CancellationToken::new(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].payload().and_then(Message::top_frame), Some(&bytes::Bytes::from_static(b"remote-reply")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn dispatch_descends_hierarchy_to_a_base_route_with_a_local_handler() {
        let derived = Route::from("Derived");
        let base = Route::from("Base");
        let registry = HandlerRegistry::new();
        let hierarchy = Arc::new(MessageTypeHierarchy::new());
        hierarchy.register(derived.clone(), &[base.clone()]);
        let _handle = registry.register(base.clone(), HandlerOptions::default(), payload_handler(b"base-reply"));

        let router = client_only_router().await;
        let dispatcher = MessageDispatcher::new(registry, hierarchy, router);

        let outcomes = dispatcher
            .dispatch(&derived, DispatchData::new(Message::new()), false, CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(outcomes[0].payload().and_then(Message::top_frame), Some(&bytes::Bytes::from_static(b"base-reply")));
    }

    #[tokio::test]
    async fn publish_aggregates_mixed_local_successes_and_failures() {
        let route = Route::from("Orders.Placed");
        let registry = HandlerRegistry::new();
        let hierarchy = Arc::new(MessageTypeHierarchy::new());
        let _ok_handle = registry.register(route.clone(), HandlerOptions::default(), payload_handler(b"subscriber-reply"));
        let _fail_handle = registry.register(route.clone(), HandlerOptions::default(), failing_handler());

        let router = client_only_router().await;
        let dispatcher = MessageDispatcher::new(registry, hierarchy, router);

        let err = dispatcher
            .dispatch(&route, DispatchData::new(Message::new()), true, CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            Error::AggregateFailure { outcomes } => {
                assert_eq!(outcomes.len(), 2);
                assert!(outcomes.iter().any(|o| o.succeeded), "the succeeding target must still be reported");
                assert!(outcomes.iter().any(|o| !o.succeeded), "the failing target must still be reported");
            }
            other => panic!("expected a mixed AggregateFailure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_with_no_successes_yields_aggregate_failure() {
        let route = Route::from("Orders.Placed");
        let registry = HandlerRegistry::new();
        let hierarchy = Arc::new(MessageTypeHierarchy::new());
        let _fail_handle = registry.register(route.clone(), HandlerOptions::default(), failing_handler());

        let router = client_only_router().await;
        let dispatcher = MessageDispatcher::new(registry, hierarchy, router);

        let err = dispatcher
            .dispatch(&route, DispatchData::new(Message::new()), true, CancellationToken::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AggregateFailure { .. }));
    }
}
