use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use conduit_core::{Error, Result, Route};
use dashmap::DashMap;

use crate::data::{DispatchData, DispatchOutcome};
use crate::processor::BoxFuture;

/// Registration-time flags controlling when a handler is eligible:
/// `publish_only` handlers are skipped by P2P route dispatch and reached
/// only via publish or an explicit target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandlerOptions {
    pub publish_only: bool,
}

/// Context passed to a handler invocation. `dispatcher` is an opaque,
/// type-erased back-reference a handler can downcast to the concrete
/// dispatcher type it was registered against, replacing the source
/// system's annotated-member dispatcher injection (§9).
#[derive(Clone, Default)]
pub struct HandlerContext {
    pub dispatcher: Option<Arc<dyn Any + Send + Sync>>,
}

impl HandlerContext {
    #[must_use]
    pub fn downcast_dispatcher<T: 'static>(&self) -> Option<Arc<T>> {
        self.dispatcher.clone()?.downcast::<T>().ok()
    }
}

/// The typed invocation closure a `HandlerRegistration` wraps, matching
/// spec §4.6's explicit-manifest replacement for reflection-discovered
/// handler methods.
pub type HandlerFn = Arc<dyn Fn(HandlerContext, DispatchData) -> BoxFuture<'static, Result<DispatchOutcome>> + Send + Sync>;

#[derive(Clone)]
pub struct HandlerRegistration {
    pub(crate) id: u64,
    pub route: Route,
    pub options: HandlerOptions,
    pub(crate) handler: HandlerFn,
}

impl HandlerRegistration {
    pub(crate) async fn invoke(&self, ctx: HandlerContext, data: DispatchData) -> Result<DispatchOutcome> {
        (self.handler)(ctx, data).await
    }
}

/// A handle returned by [`HandlerRegistry::register`]; dropping it does
/// nothing (in-flight invocations hold their own `Arc` clone of the
/// registration), only an explicit [`Self::deregister`] removes it.
#[must_use = "dropping this handle does not deregister the handler"]
pub struct DeregistrationHandle {
    registry: Weak<HandlerRegistry>,
    route: Route,
    id: u64,
}

impl DeregistrationHandle {
    pub fn deregister(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.route, self.id);
        }
    }
}

/// Copy-on-write per-route registration list: readers clone an `Arc`
/// snapshot cheaply; `register`/`deregister` atomically replace the
/// snapshot behind `DashMap`'s per-bucket lock rather than mutating it
/// in place, so an in-flight invocation's registration never changes out
/// from under it.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<Route, Arc<[HandlerRegistration]>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a handler for `route`. Returns a handle whose
    /// `deregister()` removes exactly this registration, preserving any
    /// invocation already in flight (it holds its own clone of the
    /// registration's `Arc`).
    pub fn register(self: &Arc<Self>, route: Route, options: HandlerOptions, handler: HandlerFn) -> DeregistrationHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = HandlerRegistration {
            id,
            route: route.clone(),
            options,
            handler,
        };

        self.handlers
            .entry(route.clone())
            .and_modify(|existing| {
                let mut next: Vec<HandlerRegistration> = existing.iter().cloned().collect();
                next.push(registration.clone());
                *existing = Arc::from(next);
            })
            .or_insert_with(|| Arc::from(vec![registration]));

        DeregistrationHandle {
            registry: Arc::downgrade(self),
            route,
            id,
        }
    }

    fn remove(&self, route: &Route, id: u64) {
        if let Some(mut entry) = self.handlers.get_mut(route) {
            let next: Vec<HandlerRegistration> = entry.iter().filter(|r| r.id != id).cloned().collect();
            *entry = Arc::from(next);
        }
    }

    /// Registrations for exactly `route` (no hierarchy descent — that is
    /// the router's and dispatcher's job).
    #[must_use]
    pub fn resolve(&self, route: &Route) -> Arc<[HandlerRegistration]> {
        self.handlers.get(route).map_or_else(|| Arc::from(Vec::new()), |entry| Arc::clone(&entry))
    }

    #[must_use]
    pub fn is_registered(&self, route: &Route) -> bool {
        self.handlers.get(route).is_some_and(|entry| !entry.is_empty())
    }
}

impl HandlerRegistration {
    /// Whether invoking `self` failed with the specific signal meaning
    /// "no handler was actually reachable", used by dispatcher descent.
    #[must_use]
    pub fn is_dispatch_not_found(err: &Error) -> bool {
        err.is_dispatch_not_found()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_message::Message;

    fn noop_handler() -> HandlerFn {
        Arc::new(|_ctx, _data| Box::pin(async { Ok(DispatchOutcome::Empty) }))
    }

    #[test]
    fn register_then_resolve_returns_registration() {
        let registry = HandlerRegistry::new();
        let route = Route::from("Orders.Place");
        let _handle = registry.register(route.clone(), HandlerOptions::default(), noop_handler());
        assert_eq!(registry.resolve(&route).len(), 1);
    }

    #[test]
    fn deregister_removes_exactly_that_registration() {
        let registry = HandlerRegistry::new();
        let route = Route::from("Orders.Place");
        let handle_a = registry.register(route.clone(), HandlerOptions::default(), noop_handler());
        let _handle_b = registry.register(route.clone(), HandlerOptions::default(), noop_handler());
        assert_eq!(registry.resolve(&route).len(), 2);

        handle_a.deregister();
        assert_eq!(registry.resolve(&route).len(), 1);
    }

    #[tokio::test]
    async fn invoke_runs_the_registered_closure() {
        let registry = HandlerRegistry::new();
        let route = Route::from("Orders.Place");
        let handler: HandlerFn = Arc::new(|_ctx, data| {
            Box::pin(async move { Ok(DispatchOutcome::Payload(data.message)) })
        });
        let _handle = registry.register(route.clone(), HandlerOptions::default(), handler);

        let registrations = registry.resolve(&route);
        let mut message = Message::new();
        message.push_frame(bytes::Bytes::from_static(b"payload"));
        let outcome = registrations[0]
            .invoke(HandlerContext::default(), DispatchData::new(message))
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Payload(_)));
    }
}
