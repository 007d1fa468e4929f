//! Snapshot of the most recently listed station page.
//!
//! The dashboard rebuilds this wholesale on every page or filter change:
//! it is a transient projection of what the table currently shows, never a
//! merged history. The site resolver scans it for inline site names
//! (derived extraction) and the query context embeds it.

use crate::controller::models::Station;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct StationDirectory {
    current: RwLock<Arc<Vec<Station>>>,
}

impl StationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole page. Never merges with the previous one.
    pub async fn replace(&self, stations: Vec<Station>) {
        *self.current.write().await = Arc::new(stations);
    }

    /// Cheap handle on the current page.
    pub async fn snapshot(&self) -> Arc<Vec<Station>> {
        self.current.read().await.clone()
    }

    /// Find a usable inline site name carried by any station of the
    /// current page.
    pub async fn site_name_for(&self, site_id: &str) -> Option<String> {
        let stations = self.current.read().await;
        stations
            .iter()
            .filter(|s| s.site_id.as_deref() == Some(site_id))
            .find_map(|s| {
                s.site_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
            })
    }
}
