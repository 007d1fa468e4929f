//! Per-station traffic aggregation for one page of the station table.
//!
//! The common path is a single projected batch query covering the whole
//! page. When the controller rejects it, the aggregator degrades to capped,
//! concurrent per-station fetches, settling each independently — a bad
//! batch or a bad station shrinks the result map, it never empties it for
//! everyone else and never surfaces as an error.

use crate::controller::models::{Station, TrafficCounters, TrafficRecord};
use crate::controller::{ControllerApi, StationQuery};
use crate::utils::fmt_duration;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Hard cap on per-station fallback fetches for one page.
const FALLBACK_FETCH_CAP: usize = 20;

/// Fields requested from the station listing on the batch path.
const TRAFFIC_FIELDS: &[&str] = &[
    "macAddress",
    "inBytes",
    "outBytes",
    "rxBytes",
    "txBytes",
    "packetsIn",
    "packetsOut",
    "signalStrengthDbm",
];

type AliasTable = &'static [(&'static str, fn(&TrafficRecord) -> Option<u64>)];

fn in_bytes(r: &TrafficRecord) -> Option<u64> {
    r.in_bytes
}
fn rx_bytes(r: &TrafficRecord) -> Option<u64> {
    r.rx_bytes
}
fn out_bytes(r: &TrafficRecord) -> Option<u64> {
    r.out_bytes
}
fn tx_bytes(r: &TrafficRecord) -> Option<u64> {
    r.tx_bytes
}

/// Ordered alias accessors per logical field: the first populated alias
/// wins, always in this order.
const IN_BYTES_ALIASES: AliasTable = &[("inBytes", in_bytes), ("rxBytes", rx_bytes)];
const OUT_BYTES_ALIASES: AliasTable = &[("outBytes", out_bytes), ("txBytes", tx_bytes)];

fn first_populated(record: &TrafficRecord, aliases: AliasTable) -> u64 {
    aliases
        .iter()
        .find_map(|(_, read)| read(record))
        .unwrap_or(0)
}

/// Reconcile one raw record into canonical counters.
pub(crate) fn reconcile(record: &TrafficRecord) -> TrafficCounters {
    TrafficCounters {
        in_bytes: first_populated(record, IN_BYTES_ALIASES),
        out_bytes: first_populated(record, OUT_BYTES_ALIASES),
        packets_in: record.packets_in.unwrap_or(0),
        packets_out: record.packets_out.unwrap_or(0),
        signal_strength_dbm: record.signal_strength_dbm,
    }
}

pub struct TrafficAggregator {
    api: Arc<dyn ControllerApi>,
}

impl TrafficAggregator {
    pub fn new(api: Arc<dyn ControllerApi>) -> Self {
        Self { api }
    }

    /// Load traffic counters for one page of stations, keyed by MAC.
    /// Infallible: failures shrink the map, they never surface.
    pub async fn load_page(
        &self,
        stations: &[Station],
        limit: usize,
        offset: usize,
    ) -> HashMap<String, TrafficCounters> {
        let start = Instant::now();
        let query = StationQuery {
            fields: TRAFFIC_FIELDS.to_vec(),
            limit: Some(limit),
            offset: Some(offset),
        };

        match self.api.fetch_stations(&query).await {
            Ok(rows) => {
                let map: HashMap<_, _> = rows
                    .into_iter()
                    .map(|row| {
                        let counters = reconcile(&row.traffic);
                        (row.mac_address, counters)
                    })
                    .collect();
                debug!(
                    stations = map.len(),
                    elapsed = fmt_duration(start.elapsed()),
                    "traffic batch query succeeded"
                );
                map
            }
            Err(e) => {
                warn!(error = %e, "traffic batch query failed, falling back to per-station fetches");
                self.load_individually(stations, limit).await
            }
        }
    }

    /// Capped, concurrent per-station fallback. Every fetch settles on its
    /// own; failed or absent stations are simply missing from the map.
    async fn load_individually(
        &self,
        stations: &[Station],
        limit: usize,
    ) -> HashMap<String, TrafficCounters> {
        let cap = limit.min(FALLBACK_FETCH_CAP);
        let fetches = stations.iter().take(cap).map(|station| {
            let api = self.api.clone();
            let mac = station.mac_address.clone();
            async move {
                match api.fetch_station_traffic(&mac).await {
                    Ok(Some(record)) => Some((mac, reconcile(&record))),
                    Ok(None) => None,
                    Err(e) => {
                        debug!(mac = %mac, error = %e, "per-station traffic fetch failed");
                        None
                    }
                }
            }
        });

        let map: HashMap<_, _> = join_all(fetches).await.into_iter().flatten().collect();
        debug!(
            requested = cap.min(stations.len()),
            resolved = map.len(),
            "traffic fallback settled"
        );
        map
    }
}
