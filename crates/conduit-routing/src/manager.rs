use std::sync::Arc;

use conduit_coordination::{Change, CoordinationService, SessionToken};
use conduit_core::{EndPointAddress, Result, Route, RouteOptions};
use dashmap::DashMap;
use tracing::{debug, warn};

/// One registered `(endpoint, options)` pair for a route, as returned by
/// [`RouteManager::get_routes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    pub endpoint: EndPointAddress,
    pub options: RouteOptions,
}

fn coordination_key(route: &Route, endpoint: &EndPointAddress) -> String {
    format!("route/{}\u{0}{}", route.as_str(), endpoint.display())
}

/// Persistent mapping from [`Route`] to the set of endpoints registered to
/// receive it, each with its own [`RouteOptions`].
///
/// Transient registrations additionally live as coordination-service
/// entries owned by the registering session; the manager watches the
/// `route/` key prefix and removes its local copy of an entry the moment
/// the coordination service reports it deleted (including the bulk
/// deletion a session expiry produces), giving the "removed automatically
/// when the owning session ends" guarantee spec §4.5 requires.
pub struct RouteManager {
    routes: DashMap<Route, DashMap<EndPointAddress, RouteOptions>>,
    transient_keys: DashMap<String, (Route, EndPointAddress)>,
    coordination: Arc<dyn CoordinationService>,
    watch_session: SessionToken,
}

impl RouteManager {
    #[must_use]
    pub fn new(coordination: Arc<dyn CoordinationService>, watch_session: SessionToken) -> Arc<Self> {
        let manager = Arc::new(Self {
            routes: DashMap::new(),
            transient_keys: DashMap::new(),
            coordination,
            watch_session,
        });
        let watcher = Arc::clone(&manager);
        tokio::spawn(async move { watcher.watch_loop().await });
        manager
    }

    async fn watch_loop(self: Arc<Self>) {
        let mut stream = match self.coordination.watch("route/".to_string(), self.watch_session.clone()).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "route manager failed to subscribe for transient-route cleanup");
                return;
            }
        };
        loop {
            match stream.next().await {
                Some(Change::Deleted { key }) => self.handle_external_delete(&key),
                Some(Change::SessionExpired) => {
                    warn!("route manager's own watch session expired, cleanup subscription ended");
                    return;
                }
                Some(Change::Put { .. }) => {}
                None => return,
            }
        }
    }

    fn handle_external_delete(&self, key: &str) {
        let Some((_, (route, endpoint))) = self.transient_keys.remove(key) else {
            return;
        };
        if let Some(targets) = self.routes.get(&route) {
            targets.remove(&endpoint);
        }
        debug!(%route, %endpoint, "removed transient route after coordination delete");
    }

    /// Register `endpoint` for `route` with `options`. Registering the same
    /// pair twice overwrites the previous options. `owner` ties a
    /// `transient` registration to a coordination-service session; it is
    /// ignored for persistent registrations.
    pub async fn add_route(&self, endpoint: EndPointAddress, route: Route, options: RouteOptions, owner: SessionToken) -> Result<()> {
        self.routes.entry(route.clone()).or_default().insert(endpoint.clone(), options);

        if options.transient {
            let key = coordination_key(&route, &endpoint);
            self.coordination.put(key.clone(), Vec::new(), owner).await?;
            self.transient_keys.insert(key, (route, endpoint));
        }
        Ok(())
    }

    /// Remove a single `(endpoint, route)` registration.
    pub async fn remove_route(&self, endpoint: &EndPointAddress, route: &Route) -> Result<()> {
        if let Some(targets) = self.routes.get(route) {
            targets.remove(endpoint);
        }
        let key = coordination_key(route, endpoint);
        if self.transient_keys.remove(&key).is_some() {
            self.coordination.delete(key).await?;
        }
        Ok(())
    }

    /// Remove every registration for `endpoint`. When `remove_persistent`
    /// is `false`, only `transient` registrations are dropped.
    pub async fn remove_all_routes(&self, endpoint: &EndPointAddress, remove_persistent: bool) -> Result<()> {
        let mut to_delete = Vec::new();
        for entry in &self.routes {
            let route = entry.key().clone();
            if entry.value().remove_if(endpoint, |_, opts| remove_persistent || opts.transient).is_some() {
                let key = coordination_key(&route, endpoint);
                if self.transient_keys.remove(&key).is_some() {
                    to_delete.push(key);
                }
            }
        }
        for key in to_delete {
            self.coordination.delete(key).await?;
        }
        Ok(())
    }

    /// Snapshot the current registrations for `route`. Never borrows into
    /// the internal map: callers get an owned, immutable view.
    #[must_use]
    pub fn get_routes(&self, route: &Route) -> Arc<[RouteTarget]> {
        let Some(targets) = self.routes.get(route) else {
            return Arc::from(Vec::new());
        };
        let snapshot: Vec<RouteTarget> = targets
            .iter()
            .map(|entry| RouteTarget {
                endpoint: entry.key().clone(),
                options: *entry.value(),
            })
            .collect();
        Arc::from(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_coordination::InMemoryCoordinationService;

    fn route_manager() -> Arc<RouteManager> {
        let coordination: Arc<dyn CoordinationService> = Arc::new(InMemoryCoordinationService::default());
        RouteManager::new(coordination, SessionToken::new("route-manager"))
    }

    #[tokio::test]
    async fn adding_same_pair_twice_overwrites_options() {
        let rm = route_manager();
        let endpoint = EndPointAddress::from("worker-1");
        let route = Route::from("OrderPlaced");

        rm.add_route(endpoint.clone(), route.clone(), RouteOptions::persistent(), SessionToken::new("s"))
            .await
            .unwrap();
        rm.add_route(
            endpoint.clone(),
            route.clone(),
            RouteOptions::persistent().publish_only(),
            SessionToken::new("s"),
        )
        .await
        .unwrap();

        let targets = rm.get_routes(&route);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].options.publish_only);
    }

    #[tokio::test]
    async fn remove_all_routes_respects_remove_persistent_flag() {
        let rm = route_manager();
        let endpoint = EndPointAddress::from("worker-1");
        let persistent_route = Route::from("OrderPlaced");
        let transient_route = Route::from("OrderPlaced.Ephemeral");

        rm.add_route(endpoint.clone(), persistent_route.clone(), RouteOptions::persistent(), SessionToken::new("s"))
            .await
            .unwrap();
        rm.add_route(endpoint.clone(), transient_route.clone(), RouteOptions::transient(), SessionToken::new("s"))
            .await
            .unwrap();

        rm.remove_all_routes(&endpoint, false).await.unwrap();
        assert_eq!(rm.get_routes(&persistent_route).len(), 1);
        assert_eq!(rm.get_routes(&transient_route).len(), 0);

        rm.remove_all_routes(&endpoint, true).await.unwrap();
        assert_eq!(rm.get_routes(&persistent_route).len(), 0);
    }

    #[tokio::test]
    async fn transient_route_is_removed_when_owning_session_expires() {
        let coordination = Arc::new(InMemoryCoordinationService::default());
        let rm = RouteManager::new(Arc::clone(&coordination) as Arc<dyn CoordinationService>, SessionToken::new("route-manager"));
        let endpoint = EndPointAddress::from("worker-1");
        let route = Route::from("OrderPlaced");
        let owner = SessionToken::new("caller-session");

        rm.add_route(endpoint.clone(), route.clone(), RouteOptions::transient(), owner.clone())
            .await
            .unwrap();
        assert_eq!(rm.get_routes(&route).len(), 1);

        coordination.expire_session(owner).await.unwrap();
        // Give the background watch task a chance to observe the deletion.
        for _ in 0..50 {
            if rm.get_routes(&route).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(rm.get_routes(&route).len(), 0);
    }
}
