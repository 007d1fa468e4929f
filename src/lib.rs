//! Entity resolution and traffic aggregation core for the airlens
//! wireless-network dashboard.
//!
//! Turns opaque controller identifiers (site, service, role) and station MAC
//! addresses into display names and traffic counters while shielding the
//! controller API from redundant load: TTL-bounded caches with single-flight
//! reloads, a bounded retry budget per bulk source, multi-stage fallback
//! chains, and a batch traffic query that degrades to capped per-station
//! fetches when the batch path is unavailable.
//!
//! The dashboard's HTTP layer consumes this crate; nothing here renders or
//! routes. Resolution methods never fail — callers always receive a
//! presentable value, possibly stale, possibly synthetic.

pub mod cache;
pub mod config;
pub mod controller;
pub mod resolve;
pub mod state;
mod utils;

pub use config::Config;
pub use state::ResolverSet;
