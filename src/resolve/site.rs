//! Site name resolution with an escalating fallback chain.
//!
//! Stages, strictly in order, each tried only when the previous one yields
//! nothing: cache lookup → bulk reload and re-lookup → individual fetch →
//! inline name scraped from the current station page → synthetic label.
//! Ordering matters twice over: the bulk reload populates the cache the
//! first lookup missed, and the later stages are the expensive ones. The
//! individual fetch exists for ids the bulk response omits (a freshly
//! created site, eventual-consistency lag on the controller).

use crate::cache::TtlCache;
use crate::controller::ControllerApi;
use crate::controller::models::Site;
use crate::resolve::stations::StationDirectory;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SiteResolver {
    api: Arc<dyn ControllerApi>,
    cache: TtlCache<Site>,
    stations: Arc<StationDirectory>,
}

impl SiteResolver {
    pub fn new(api: Arc<dyn ControllerApi>, stations: Arc<StationDirectory>) -> Self {
        Self {
            api,
            cache: TtlCache::new(),
            stations,
        }
    }

    /// Resolve a site id to a display name. Infallible: the worst case is a
    /// deterministic synthetic label derived from the id.
    pub async fn resolve_name(&self, site_id: &str) -> String {
        if let Some(name) = self.cached_label(site_id) {
            return name;
        }

        self.reload_if_stale().await;
        if let Some(name) = self.cached_label(site_id) {
            return name;
        }

        match self.api.fetch_site_by_id(site_id).await {
            Ok(Some(site)) => {
                if let Some(label) = site.label().map(str::to_owned) {
                    // One-off addition: never counts toward the bulk budget.
                    self.cache.upsert(site.id.clone(), site);
                    return label;
                }
            }
            Ok(None) => debug!(site_id, "site absent from individual lookup"),
            Err(e) => warn!(site_id, error = %e, "individual site lookup failed"),
        }

        if let Some(name) = self.stations.site_name_for(site_id).await {
            self.cache.upsert(
                site_id.to_owned(),
                Site {
                    id: site_id.to_owned(),
                    name: Some(name.clone()),
                    display_name: None,
                },
            );
            return name;
        }

        synthetic_site_name(site_id)
    }

    /// Refresh the bulk cache if it is stale or cold, budget permitting.
    pub(crate) async fn reload_if_stale(&self) {
        let api = self.api.clone();
        self.cache
            .ensure_loaded(|| async move {
                let sites = api.fetch_sites().await?;
                Ok(sites.into_iter().map(|s| (s.id.clone(), s)).collect())
            })
            .await;
    }

    /// Every currently cached site, for the query-context snapshot.
    pub(crate) fn cached_sites(&self) -> Vec<Site> {
        self.cache.values()
    }

    /// Manual refresh hook: forget everything, including the retry budget.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    fn cached_label(&self, site_id: &str) -> Option<String> {
        self.cache
            .get(site_id)
            .and_then(|s| s.label().map(str::to_owned))
    }
}

/// Deterministic last-resort label: first dash-delimited segment of the id,
/// uppercased. `"c7395471-9f62-4f10"` → `"Site C7395471"`.
pub(crate) fn synthetic_site_name(site_id: &str) -> String {
    let head = site_id.split('-').next().unwrap_or_default();
    format!("Site {}", head.to_uppercase())
}
