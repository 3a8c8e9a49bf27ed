//! In-memory snapshot caching.
//!
//! The cache holds whole snapshots keyed by a derived cache key, each entry
//! stamped with its fetch time and a monotonic version. It is constructed
//! once and injected into the provider; there is no process-global state.

mod snapshot;

pub use snapshot::{snapshot_key, CacheEntry, SnapshotCache};
