//! Composition root wiring the resolvers together.
//!
//! Every cache in the crate is an explicitly constructed instance owned
//! here, never a module-level global, so separate `ResolverSet`s (tests,
//! multiple controllers) never share state, while one shared set gives the
//! whole dashboard process the single-flight and TTL behavior the caches
//! guarantee per instance.

use crate::config::Config;
use crate::controller::models::{Station, TrafficCounters};
use crate::controller::{ControllerApi, HttpControllerApi};
use crate::resolve::context::{QueryContext, QueryContextCache};
use crate::resolve::service_role::{ServiceDetails, ServiceRoleResolver};
use crate::resolve::site::SiteResolver;
use crate::resolve::stations::StationDirectory;
use crate::resolve::traffic::TrafficAggregator;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ResolverSet {
    sites: Arc<SiteResolver>,
    service_roles: Arc<ServiceRoleResolver>,
    traffic: TrafficAggregator,
    stations: Arc<StationDirectory>,
    context: QueryContextCache,
}

impl ResolverSet {
    /// Wire a resolver set over any controller client.
    pub fn new(api: Arc<dyn ControllerApi>) -> Self {
        let stations = Arc::new(StationDirectory::new());
        let sites = Arc::new(SiteResolver::new(api.clone(), stations.clone()));
        let service_roles = Arc::new(ServiceRoleResolver::new(api.clone()));
        let traffic = TrafficAggregator::new(api);
        let context = QueryContextCache::new(sites.clone(), service_roles.clone(), stations.clone());
        Self {
            sites,
            service_roles,
            traffic,
            stations,
            context,
        }
    }

    /// Convenience constructor over the production HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api = HttpControllerApi::from_config(config)?;
        Ok(Self::new(Arc::new(api)))
    }

    /// Site id → display name. Never fails; see [`SiteResolver`].
    pub async fn resolve_site_name(&self, site_id: &str) -> String {
        self.sites.resolve_name(site_id).await
    }

    /// Service id → SSID, network name and VLAN. Never fails.
    pub async fn resolve_service_details(&self, service_id: &str) -> ServiceDetails {
        self.service_roles.resolve_service(service_id).await
    }

    /// Role id → role name. Never fails.
    pub async fn resolve_role_name(&self, role_id: &str) -> String {
        self.service_roles.resolve_role(role_id).await
    }

    /// Traffic counters for the given station page, keyed by MAC address.
    /// Possibly partial, possibly empty, never an error.
    pub async fn load_traffic_for_page(
        &self,
        stations: &[Station],
        limit: usize,
        offset: usize,
    ) -> HashMap<String, TrafficCounters> {
        self.traffic.load_page(stations, limit, offset).await
    }

    /// Record the station page the dashboard currently shows. Feeds derived
    /// site-name extraction and the query context.
    pub async fn record_station_page(&self, stations: Vec<Station>) {
        self.stations.replace(stations).await;
    }

    /// Manual "Refresh" hook for the site cache.
    pub async fn invalidate_site_cache(&self) {
        self.sites.invalidate().await;
    }

    /// Manual "Refresh" hook for service and role definitions.
    pub async fn invalidate_service_role_cache(&self) {
        self.service_roles.invalidate().await;
    }

    /// Advisory-subsystem snapshot of everything resolvable right now.
    pub async fn query_context(&self) -> Arc<QueryContext> {
        self.context.snapshot().await
    }
}
