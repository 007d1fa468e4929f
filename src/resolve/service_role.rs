//! Service and role resolution: one combined load, then immutable snapshots.
//!
//! Unlike the site cache, this resolver loads at most once per process
//! lifetime: SSID and role definitions are treated as static for a session,
//! so the first resolve of either kind triggers both fetches concurrently
//! and no automatic retry ever follows; only the explicit refresh hook
//! re-arms the load. The two fetches fail independently; some controller
//! deployments have no role endpoint at all, and that must stay quiet.

use crate::controller::ControllerApi;
use crate::controller::models::{Role, Service};
use crate::utils::log_if_slow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Resolved service details handed to the UI. Always populated; synthetic
/// when the id is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDetails {
    pub ssid: String,
    pub network_name: Option<String>,
    pub vlan: Option<u16>,
}

pub struct ServiceRoleResolver {
    api: Arc<dyn ControllerApi>,
    services: RwLock<HashMap<String, Service>>,
    roles: RwLock<HashMap<String, Role>>,
    /// `true` once a load attempt has finished, successful or not. The
    /// mutex doubles as the single-flight guard for the first load.
    loaded: Mutex<bool>,
}

impl ServiceRoleResolver {
    pub fn new(api: Arc<dyn ControllerApi>) -> Self {
        Self {
            api,
            services: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
            loaded: Mutex::new(false),
        }
    }

    /// Run the combined bulk load at most once per process lifetime.
    /// Concurrent first callers collapse onto one pair of requests.
    pub(crate) async fn ensure_loaded(&self) {
        let mut loaded = self.loaded.lock().await;
        if *loaded {
            return;
        }

        let start = Instant::now();
        let (services, roles) = tokio::join!(self.api.fetch_services(), self.api.fetch_roles());
        log_if_slow(start, Duration::from_secs(3), "service/role bulk load");

        match services {
            Ok(list) => {
                let map: HashMap<_, _> = list.into_iter().map(|s| (s.id.clone(), s)).collect();
                info!(services = map.len(), "service definitions loaded");
                *self.services.write().await = map;
            }
            Err(e) => warn!(error = %e, "failed to load service definitions"),
        }
        match roles {
            Ok(list) => {
                let map: HashMap<_, _> = list.into_iter().map(|r| (r.id.clone(), r)).collect();
                info!(roles = map.len(), "role definitions loaded");
                *self.roles.write().await = map;
            }
            // Not every deployment exposes a role endpoint.
            Err(e) => debug!(error = %e, "role definitions unavailable"),
        }

        *loaded = true;
    }

    /// Resolve a service id to its details. Infallible; unknown ids get a
    /// synthetic SSID derived from the id.
    pub async fn resolve_service(&self, service_id: &str) -> ServiceDetails {
        self.ensure_loaded().await;
        let services = self.services.read().await;
        match services.get(service_id) {
            Some(service) => ServiceDetails {
                ssid: service
                    .ssid
                    .clone()
                    .unwrap_or_else(|| synthetic_service_name(service_id)),
                network_name: service.network_name.clone(),
                vlan: service.vlan,
            },
            None => ServiceDetails {
                ssid: synthetic_service_name(service_id),
                network_name: None,
                vlan: None,
            },
        }
    }

    /// Resolve a role id to a name. Infallible.
    pub async fn resolve_role(&self, role_id: &str) -> String {
        self.ensure_loaded().await;
        let roles = self.roles.read().await;
        roles
            .get(role_id)
            .and_then(|r| r.name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| synthetic_role_name(role_id))
    }

    pub(crate) async fn cached_services(&self) -> Vec<Service> {
        self.services.read().await.values().cloned().collect()
    }

    pub(crate) async fn cached_roles(&self) -> Vec<Role> {
        self.roles.read().await.values().cloned().collect()
    }

    /// Manual refresh hook: clears both snapshots and re-arms the one-shot
    /// load.
    pub async fn invalidate(&self) {
        let mut loaded = self.loaded.lock().await;
        self.services.write().await.clear();
        self.roles.write().await.clear();
        *loaded = false;
    }
}

/// `"Service "` plus the first 8 characters of the id.
fn synthetic_service_name(id: &str) -> String {
    format!("Service {}", short_id(id))
}

/// `"Role "` plus the first 8 characters of the id.
fn synthetic_role_name(id: &str) -> String {
    format!("Role {}", short_id(id))
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
