//! storeroom — cached data layer for inventory/order dashboards.
//!
//! One [`provider::Provider`] per store is the single source of truth for
//! every screen: it bulk-fetches a normalized snapshot over the hosted
//! table API, serves it from an in-memory TTL cache, derives aggregate
//! totals, patches the snapshot optimistically on writes, and reconciles
//! with realtime change events.
//!
//! ```ignore
//! let config = config::Config::load(None)?;
//! let provider = provider::Provider::connect(&config)?;
//!
//! provider.fetch_snapshot(false).await?;
//! let viewer = access::Viewer::new(user_id, profile.role);
//! let totals = provider.calculations(&viewer);
//!
//! // Keep the snapshot reconciled while the dashboard is open.
//! let client = store::Client::new(&config)?;
//! let _listener = realtime::Listener::connect(
//!   provider.clone(),
//!   client.realtime_url()?,
//!   config.realtime.tables.clone(),
//! );
//! ```

pub mod access;
pub mod browse;
pub mod cache;
pub mod config;
pub mod logging;
pub mod notify;
pub mod provider;
pub mod realtime;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use access::{Permission, Role, Viewer};
pub use config::Config;
pub use provider::Provider;
pub use stats::Totals;
pub use store::{Client, Snapshot};
