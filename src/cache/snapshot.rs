//! Snapshot cache store: key -> {payload, fetch timestamp, version}.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::store::Snapshot;

/// One cached snapshot with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub snapshot: Arc<Snapshot>,
  /// When the snapshot was stored.
  pub stored_at: DateTime<Utc>,
  /// Publish version of the stored snapshot.
  pub version: u64,
}

/// Derive the cache key for a store's bulk snapshot.
///
/// The key embeds a hash of the store URL and schema so two providers
/// pointed at different stores can never serve each other's entries.
pub fn snapshot_key(url: &str, schema: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.trim().to_lowercase().as_bytes());
  hasher.update(b":");
  hasher.update(schema.as_bytes());
  format!("complete_inventory:{}", hex::encode(hasher.finalize()))
}

/// In-memory cache of bulk snapshots with a fixed time-to-live.
///
/// There is no eviction beyond explicit deletion; in practice a provider
/// owns exactly one entry. Writes carry the snapshot's version and are
/// rejected when an entry with a higher version is already stored, so a
/// slow fetch resolving late can never regress the cache to older data.
pub struct SnapshotCache {
  entries: Mutex<HashMap<String, CacheEntry>>,
  ttl: Duration,
}

impl SnapshotCache {
  pub fn new(ttl: std::time::Duration) -> Self {
    let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(300));
    Self {
      entries: Mutex::new(HashMap::new()),
      ttl,
    }
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
    self.entries.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Get the entry for a key regardless of freshness.
  pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    Ok(self.lock()?.get(key).cloned())
  }

  /// Get the entry for a key only if it is younger than the TTL.
  pub fn get_fresh(&self, key: &str) -> Result<Option<CacheEntry>> {
    let entries = self.lock()?;
    match entries.get(key) {
      Some(entry) if !self.is_stale(entry.stored_at) => Ok(Some(entry.clone())),
      _ => Ok(None),
    }
  }

  /// Store a snapshot under a key.
  ///
  /// Returns `false` (leaving the existing entry in place) when the stored
  /// entry's version is higher than the incoming one.
  pub fn set(&self, key: &str, snapshot: Arc<Snapshot>) -> Result<bool> {
    let mut entries = self.lock()?;

    if let Some(existing) = entries.get(key) {
      if existing.version > snapshot.version {
        return Ok(false);
      }
    }

    entries.insert(
      key.to_string(),
      CacheEntry {
        version: snapshot.version,
        snapshot,
        stored_at: Utc::now(),
      },
    );
    Ok(true)
  }

  /// Drop the entry for a key, forcing the next fetch to go remote.
  pub fn delete(&self, key: &str) -> Result<()> {
    self.lock()?.remove(key);
    Ok(())
  }

  /// Check whether a stored-at timestamp has outlived the TTL.
  pub fn is_stale(&self, stored_at: DateTime<Utc>) -> bool {
    Utc::now() - stored_at > self.ttl
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn snapshot_with_version(version: u64) -> Arc<Snapshot> {
    Arc::new(Snapshot {
      version,
      fetched_at: Some(Utc::now()),
      ..Snapshot::default()
    })
  }

  #[test]
  fn set_then_get_round_trips() {
    let cache = SnapshotCache::new(std::time::Duration::from_secs(300));
    assert!(cache.set("k", snapshot_with_version(1)).unwrap());

    let entry = cache.get("k").unwrap().expect("entry stored");
    assert_eq!(entry.version, 1);
    assert!(cache.get_fresh("k").unwrap().is_some());
  }

  #[test]
  fn zero_ttl_makes_entries_stale_immediately() {
    let cache = SnapshotCache::new(std::time::Duration::ZERO);
    cache.set("k", snapshot_with_version(1)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    // Still retrievable, but never considered fresh.
    assert!(cache.get("k").unwrap().is_some());
    assert!(cache.get_fresh("k").unwrap().is_none());
  }

  #[test]
  fn delete_removes_entry() {
    let cache = SnapshotCache::new(std::time::Duration::from_secs(300));
    cache.set("k", snapshot_with_version(1)).unwrap();
    cache.delete("k").unwrap();
    assert!(cache.get("k").unwrap().is_none());
  }

  #[test]
  fn older_version_never_overwrites_newer() {
    let cache = SnapshotCache::new(std::time::Duration::from_secs(300));
    assert!(cache.set("k", snapshot_with_version(5)).unwrap());

    // A slow fetch from before version 5 resolves late.
    assert!(!cache.set("k", snapshot_with_version(3)).unwrap());
    assert_eq!(cache.get("k").unwrap().unwrap().version, 5);

    // Equal or newer versions still go through.
    assert!(cache.set("k", snapshot_with_version(6)).unwrap());
    assert_eq!(cache.get("k").unwrap().unwrap().version, 6);
  }

  #[test]
  fn keys_differ_by_store_identity() {
    let a = snapshot_key("https://acme.example.co", "public");
    let b = snapshot_key("https://other.example.co", "public");
    let c = snapshot_key("https://acme.example.co", "tenant_a");
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert!(a.starts_with("complete_inventory:"));
  }
}
