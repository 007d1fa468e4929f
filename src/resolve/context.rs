//! Shared context snapshot for the advisory subsystem.
//!
//! Bundles everything the advisory layer needs to answer questions about
//! the network (sites, service and role definitions, the current station
//! page) behind one short-lived, process-wide snapshot. Rebuilds happen on
//! demand, single-flight, and tolerate any one source failing: a source
//! that cannot load right now contributes whatever it has cached, never
//! failing the snapshot as a whole.

use crate::controller::models::{Role, Service, Site, Station};
use crate::resolve::service_role::ServiceRoleResolver;
use crate::resolve::site::SiteResolver;
use crate::resolve::stations::StationDirectory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// How long a built snapshot is reused before the next request rebuilds it.
const SNAPSHOT_TTL: Duration = Duration::from_secs(60);

/// One coherent view of the network for advisory queries.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub sites: Vec<Site>,
    pub services: Vec<Service>,
    pub roles: Vec<Role>,
    pub stations: Arc<Vec<Station>>,
}

pub struct QueryContextCache {
    sites: Arc<SiteResolver>,
    service_roles: Arc<ServiceRoleResolver>,
    stations: Arc<StationDirectory>,
    current: Mutex<Option<(Instant, Arc<QueryContext>)>>,
}

impl QueryContextCache {
    pub fn new(
        sites: Arc<SiteResolver>,
        service_roles: Arc<ServiceRoleResolver>,
        stations: Arc<StationDirectory>,
    ) -> Self {
        Self {
            sites,
            service_roles,
            stations,
            current: Mutex::new(None),
        }
    }

    /// Return the current snapshot, rebuilding it when stale or absent.
    /// Concurrent callers share one rebuild.
    pub async fn snapshot(&self) -> Arc<QueryContext> {
        let mut current = self.current.lock().await;
        if let Some((built_at, snapshot)) = current.as_ref()
            && built_at.elapsed() < SNAPSHOT_TTL
        {
            return snapshot.clone();
        }

        let snapshot = Arc::new(self.build().await);
        *current = Some((Instant::now(), snapshot.clone()));
        snapshot
    }

    /// Drop the snapshot so the next request rebuilds from the resolvers.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }

    async fn build(&self) -> QueryContext {
        // The resolvers absorb their own fetch failures, so each section
        // independently degrades to cached-or-empty.
        self.sites.reload_if_stale().await;
        self.service_roles.ensure_loaded().await;

        let context = QueryContext {
            sites: self.sites.cached_sites(),
            services: self.service_roles.cached_services().await,
            roles: self.service_roles.cached_roles().await,
            stations: self.stations.snapshot().await,
        };
        debug!(
            sites = context.sites.len(),
            services = context.services.len(),
            roles = context.roles.len(),
            stations = context.stations.len(),
            "query context rebuilt"
        );
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::testing::{StubApi, service, site, station_at_site};
    use std::sync::atomic::Ordering;

    fn cache_over(api: Arc<StubApi>) -> (QueryContextCache, Arc<StationDirectory>) {
        let stations = Arc::new(StationDirectory::new());
        let sites = Arc::new(SiteResolver::new(api.clone(), stations.clone()));
        let service_roles = Arc::new(ServiceRoleResolver::new(api));
        (
            QueryContextCache::new(sites, service_roles, stations.clone()),
            stations,
        )
    }

    #[tokio::test]
    async fn snapshot_gathers_all_sources() {
        let api = Arc::new(StubApi::default());
        *api.sites.lock().unwrap() = vec![site("east", "East Campus")];
        *api.services.lock().unwrap() = vec![service("svc-guest", "Guest WiFi", 30)];
        let (cache, stations) = cache_over(api.clone());
        stations
            .replace(vec![station_at_site("aa:00:00:00:00:01", "east", None)])
            .await;

        let context = cache.snapshot().await;
        assert_eq!(context.sites.len(), 1);
        assert_eq!(context.services.len(), 1);
        assert!(context.roles.is_empty());
        assert_eq!(context.stations.len(), 1);
    }

    #[tokio::test]
    async fn one_broken_source_degrades_only_its_own_section() {
        let api = Arc::new(StubApi::default());
        *api.sites.lock().unwrap() = vec![site("east", "East Campus")];
        api.services_fail.store(true, Ordering::SeqCst);
        api.roles_fail.store(true, Ordering::SeqCst);
        let (cache, _) = cache_over(api.clone());

        let context = cache.snapshot().await;
        assert_eq!(context.sites.len(), 1);
        assert!(context.services.is_empty());
        assert!(context.roles.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_snapshot_is_reused_without_refetching() {
        let api = Arc::new(StubApi::default());
        *api.sites.lock().unwrap() = vec![site("east", "East Campus")];
        let (cache, _) = cache_over(api.clone());

        cache.snapshot().await;
        cache.snapshot().await;
        assert_eq!(api.sites_calls.load(Ordering::SeqCst), 1);

        // Past the snapshot TTL a rebuild happens, but the site cache is
        // still fresh underneath, so no extra outbound request either.
        tokio::time::advance(Duration::from_secs(90)).await;
        cache.snapshot().await;
        assert_eq!(api.sites_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_rebuild() {
        let api = Arc::new(StubApi::default());
        let (cache, stations) = cache_over(api.clone());

        let before = cache.snapshot().await;
        assert!(before.stations.is_empty());

        stations
            .replace(vec![station_at_site("aa:00:00:00:00:01", "east", None)])
            .await;
        cache.invalidate().await;
        let after = cache.snapshot().await;
        assert_eq!(after.stations.len(), 1);
    }
}
