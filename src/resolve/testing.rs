//! Shared in-memory `ControllerApi` stub for resolver tests.
//!
//! Every endpoint has a call counter, a failure switch, and a canned
//! response, so tests can assert exactly how many outbound requests a
//! resolution path performed.

use crate::controller::errors::ControllerError;
use crate::controller::models::{Role, Service, Site, Station, TrafficRecord};
use crate::controller::{ControllerApi, StationQuery};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn unavailable(what: &str) -> ControllerError {
    ControllerError::RequestFailed(anyhow::anyhow!("{what} endpoint unavailable"))
}

#[derive(Default)]
pub(crate) struct StubApi {
    pub sites: Mutex<Vec<Site>>,
    pub sites_fail: AtomicBool,
    pub sites_calls: AtomicUsize,

    pub sites_by_id: Mutex<HashMap<String, Site>>,
    pub site_by_id_fail: AtomicBool,
    pub site_by_id_calls: AtomicUsize,

    pub stations: Mutex<Vec<Station>>,
    pub stations_fail: AtomicBool,
    pub stations_calls: AtomicUsize,

    pub traffic: Mutex<HashMap<String, TrafficRecord>>,
    pub traffic_fail_macs: Mutex<HashSet<String>>,
    pub traffic_calls: AtomicUsize,

    pub services: Mutex<Vec<Service>>,
    pub services_fail: AtomicBool,
    pub services_calls: AtomicUsize,

    pub roles: Mutex<Vec<Role>>,
    pub roles_fail: AtomicBool,
    pub roles_calls: AtomicUsize,
}

#[async_trait]
impl ControllerApi for StubApi {
    async fn fetch_sites(&self) -> Result<Vec<Site>, ControllerError> {
        self.sites_calls.fetch_add(1, Ordering::SeqCst);
        if self.sites_fail.load(Ordering::SeqCst) {
            return Err(unavailable("site list"));
        }
        Ok(self.sites.lock().unwrap().clone())
    }

    async fn fetch_site_by_id(&self, id: &str) -> Result<Option<Site>, ControllerError> {
        self.site_by_id_calls.fetch_add(1, Ordering::SeqCst);
        if self.site_by_id_fail.load(Ordering::SeqCst) {
            return Err(unavailable("site"));
        }
        Ok(self.sites_by_id.lock().unwrap().get(id).cloned())
    }

    async fn fetch_stations(&self, _query: &StationQuery) -> Result<Vec<Station>, ControllerError> {
        self.stations_calls.fetch_add(1, Ordering::SeqCst);
        if self.stations_fail.load(Ordering::SeqCst) {
            return Err(unavailable("station list"));
        }
        Ok(self.stations.lock().unwrap().clone())
    }

    async fn fetch_station_traffic(
        &self,
        mac: &str,
    ) -> Result<Option<TrafficRecord>, ControllerError> {
        self.traffic_calls.fetch_add(1, Ordering::SeqCst);
        if self.traffic_fail_macs.lock().unwrap().contains(mac) {
            return Err(unavailable("station traffic"));
        }
        Ok(self.traffic.lock().unwrap().get(mac).cloned())
    }

    async fn fetch_services(&self) -> Result<Vec<Service>, ControllerError> {
        self.services_calls.fetch_add(1, Ordering::SeqCst);
        if self.services_fail.load(Ordering::SeqCst) {
            return Err(unavailable("service list"));
        }
        Ok(self.services.lock().unwrap().clone())
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, ControllerError> {
        self.roles_calls.fetch_add(1, Ordering::SeqCst);
        if self.roles_fail.load(Ordering::SeqCst) {
            return Err(unavailable("role list"));
        }
        Ok(self.roles.lock().unwrap().clone())
    }
}

pub(crate) fn site(id: &str, display_name: &str) -> Site {
    Site {
        id: id.to_string(),
        name: None,
        display_name: Some(display_name.to_string()),
    }
}

pub(crate) fn service(id: &str, ssid: &str, vlan: u16) -> Service {
    Service {
        id: id.to_string(),
        ssid: Some(ssid.to_string()),
        network_name: Some(format!("{ssid} network")),
        vlan: Some(vlan),
    }
}

pub(crate) fn role(id: &str, name: &str) -> Role {
    Role {
        id: id.to_string(),
        name: Some(name.to_string()),
    }
}

pub(crate) fn station(mac: &str) -> Station {
    Station {
        mac_address: mac.to_string(),
        ..Station::default()
    }
}

pub(crate) fn station_at_site(mac: &str, site_id: &str, site_name: Option<&str>) -> Station {
    Station {
        mac_address: mac.to_string(),
        site_id: Some(site_id.to_string()),
        site_name: site_name.map(str::to_owned),
        ..Station::default()
    }
}
