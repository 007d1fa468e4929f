//! Wire models for the controller API.
//!
//! Field names mirror the controller's camelCase JSON. Nearly everything is
//! optional: controller firmware lines differ in which fields they populate,
//! and one missing field must never fail a whole payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A managed site (venue) on the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    /// Internal name, often a short slug.
    #[serde(default)]
    pub name: Option<String>,
    /// Operator-facing name, preferred for display when present.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Site {
    /// Best human-readable label: `displayName`, falling back to `name`.
    /// Blank strings count as absent.
    pub fn label(&self) -> Option<&str> {
        [self.display_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// A wireless service (SSID) definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default)]
    pub vlan: Option<u16>,
}

/// An access role assignable to client stations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw traffic counters exactly as the controller reports them.
///
/// Firmware lines disagree on field names (`inBytes` vs `rxBytes`,
/// `outBytes` vs `txBytes`). All aliases are kept verbatim here and
/// reconciled by the traffic aggregator in a fixed priority order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficRecord {
    #[serde(default)]
    pub in_bytes: Option<u64>,
    #[serde(default)]
    pub out_bytes: Option<u64>,
    #[serde(default)]
    pub rx_bytes: Option<u64>,
    #[serde(default)]
    pub tx_bytes: Option<u64>,
    #[serde(default)]
    pub packets_in: Option<u64>,
    #[serde(default)]
    pub packets_out: Option<u64>,
    #[serde(default)]
    pub signal_strength_dbm: Option<i32>,
}

/// Reconciled per-station counters as the aggregator returns them,
/// keyed by MAC address in the result map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficCounters {
    pub in_bytes: u64,
    pub out_bytes: u64,
    pub packets_in: u64,
    pub packets_out: u64,
    pub signal_strength_dbm: Option<i32>,
}

/// A client station row as returned by the station listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub mac_address: String,
    #[serde(default)]
    pub site_id: Option<String>,
    /// Inline site name some firmware attaches to station rows. The site
    /// resolver scrapes it as a last resort before synthesizing a label.
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    /// Traffic fields arrive inline on station rows when the listing is
    /// queried with a traffic field projection.
    #[serde(flatten)]
    pub traffic: TrafficRecord,
}
