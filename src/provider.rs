//! The unified data provider: one authoritative cache/aggregation module.
//!
//! Every dashboard screen reads through a [`Provider`]. It owns the
//! snapshot cache, performs the bulk fetch, patches the snapshot
//! optimistically on writes, and hands out role-scoped views plus derived
//! totals. Nothing else in the crate talks to the cache directly.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::access::{self, Viewer};
use crate::cache::{snapshot_key, SnapshotCache};
use crate::config::{Config, StatsConfig};
use crate::notify::{Notification, Notifier};
use crate::stats::{self, CustomerSpend, ProductSales, Totals};
use crate::store::{
  Client, Customer, CustomerPatch, DataSource, NewCustomer, NewOrder, NewProduct, Order,
  OrderPatch, Product, ProductPatch, ProfitRecord, Snapshot,
};
use crate::store::{Category, Color, Department, Size};

/// Consumer-facing state besides the snapshot itself.
struct State {
  snapshot: Arc<Snapshot>,
  loading: bool,
  error: Option<String>,
}

impl Default for State {
  fn default() -> Self {
    Self {
      snapshot: Arc::new(Snapshot::default()),
      loading: true,
      error: None,
    }
  }
}

/// Memoized totals for the snapshot version they were derived from.
#[derive(Default)]
struct TotalsMemo {
  version: u64,
  by_scope: HashMap<String, Arc<Totals>>,
}

struct Inner<S> {
  source: S,
  cache: SnapshotCache,
  cache_key: String,
  stats_config: StatsConfig,
  notifier: Notifier,
  state: RwLock<State>,
  /// Monotonic version source for snapshot publishes and patches.
  version: AtomicU64,
  changed: watch::Sender<u64>,
  totals: Mutex<TotalsMemo>,
}

/// Cached, role-scoped read/write surface over the remote store.
pub struct Provider<S> {
  inner: Arc<Inner<S>>,
}

impl<S> Clone for Provider<S> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl Provider<Client> {
  /// Build a provider over the HTTP client, reading the API key from the
  /// environment.
  pub fn connect(config: &Config) -> Result<Self> {
    let client = Client::new(config)?;
    Ok(Self::new(client, config))
  }
}

impl<S: DataSource> Provider<S> {
  pub fn new(source: S, config: &Config) -> Self {
    let (changed, _) = watch::channel(0);
    Self {
      inner: Arc::new(Inner {
        source,
        cache: SnapshotCache::new(config.cache.ttl()),
        cache_key: snapshot_key(&config.store.url, &config.store.schema),
        stats_config: config.stats.clone(),
        notifier: Notifier::default(),
        state: RwLock::new(State::default()),
        version: AtomicU64::new(0),
        changed,
        totals: Mutex::new(TotalsMemo::default()),
      }),
    }
  }

  fn next_version(&self) -> u64 {
    self.inner.version.fetch_add(1, Ordering::SeqCst) + 1
  }

  // ==========================================================================
  // Bulk fetch
  // ==========================================================================

  /// Fetch the complete inventory snapshot.
  ///
  /// With `force == false` a cache entry younger than the TTL is returned
  /// without any remote call. Otherwise all entity queries run
  /// concurrently and the snapshot is published all-or-nothing: if any
  /// query fails the previously held snapshot stays readable and the
  /// error is surfaced instead.
  pub async fn fetch_snapshot(&self, force: bool) -> Result<Arc<Snapshot>> {
    if !force {
      if let Ok(Some(entry)) = self.inner.cache.get_fresh(&self.inner.cache_key) {
        let current = self.current();
        if entry.version < current.version {
          // The in-memory snapshot carries optimistic patches newer than
          // the cached entry; keep serving it.
          return Ok(current);
        }
        debug!(version = entry.version, "serving cached snapshot");
        self.install(entry.snapshot.clone());
        return Ok(entry.snapshot);
      }
    }

    self.set_loading();
    let version = self.next_version();
    debug!(version, force, "fetching complete inventory");

    let fetched = tokio::try_join!(
      self.inner.source.departments(),
      self.inner.source.categories(),
      self.inner.source.colors(),
      self.inner.source.sizes(),
      self.inner.source.products(),
      self.inner.source.customers(),
      self.inner.source.orders(),
      self.inner.source.profits(),
    );

    let (departments, categories, colors, sizes, products, customers, orders, profits) =
      match fetched {
        Ok(collections) => collections,
        Err(e) => {
          let message = e.to_string();
          warn!(%message, "snapshot fetch failed, keeping previous data");
          if let Ok(mut state) = self.inner.state.write() {
            state.loading = false;
            state.error = Some(message.clone());
          }
          self.inner.notifier.error("Failed to load data", &message);
          return Err(e);
        }
      };

    let snapshot = Arc::new(Snapshot {
      departments,
      categories,
      colors,
      sizes,
      products,
      customers,
      orders,
      profits,
      fetched_at: Some(Utc::now()),
      version,
    });

    match self.inner.cache.set(&self.inner.cache_key, snapshot.clone()) {
      Ok(true) => {}
      Ok(false) => debug!(version, "discarding fetch older than cached snapshot"),
      Err(e) => warn!("cache write failed: {}", e),
    }
    self.install(snapshot.clone());
    info!(
      version,
      products = snapshot.products.len(),
      orders = snapshot.orders.len(),
      "snapshot published"
    );

    Ok(snapshot)
  }

  /// Force a refetch regardless of cache age.
  pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
    self.fetch_snapshot(true).await
  }

  fn set_loading(&self) {
    if let Ok(mut state) = self.inner.state.write() {
      state.loading = true;
      state.error = None;
    }
  }

  /// Install a snapshot into consumer state unless a newer one is already
  /// there (a slow fetch must never clobber later patches).
  fn install(&self, snapshot: Arc<Snapshot>) {
    let version = snapshot.version;
    if let Ok(mut state) = self.inner.state.write() {
      if version >= state.snapshot.version {
        state.snapshot = snapshot;
        state.error = None;
      }
      state.loading = false;
    }
    if version > *self.inner.changed.borrow() {
      self.inner.changed.send_replace(version);
    }
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  /// Patch the in-memory snapshot after a confirmed remote write.
  ///
  /// `invalidate` drops the cache entry so the next TTL-expiry or forced
  /// fetch reconciles with the remote store (optimistic local writes);
  /// reconciling patches derived from remote change events refresh the
  /// cache entry in place instead.
  fn patch_snapshot(&self, invalidate: bool, apply: impl FnOnce(&mut Snapshot)) {
    let version = self.next_version();
    let patched = {
      let Ok(mut state) = self.inner.state.write() else {
        return;
      };
      let mut snapshot = (*state.snapshot).clone();
      apply(&mut snapshot);
      snapshot.version = version;
      let snapshot = Arc::new(snapshot);
      state.snapshot = snapshot.clone();
      snapshot
    };

    if invalidate {
      if let Err(e) = self.inner.cache.delete(&self.inner.cache_key) {
        warn!("cache invalidation failed: {}", e);
      }
    } else if let Err(e) = self.inner.cache.set(&self.inner.cache_key, patched) {
      warn!("cache reconcile failed: {}", e);
    }

    self.inner.changed.send_replace(version);
  }

  pub async fn update_product(&self, id: &str, patch: ProductPatch) -> Result<()> {
    match self.inner.source.update_product(id, &patch).await {
      Err(e) => {
        self.inner.notifier.error("Update failed", e.to_string());
        Err(e)
      }
      Ok(()) => {
        self.patch_snapshot(true, |snapshot| {
          for product in &mut snapshot.products {
            if product.id == id {
              patch.apply(product);
            }
          }
        });
        self.inner.notifier.success("Product updated", id);
        Ok(())
      }
    }
  }

  pub async fn add_product(&self, new: NewProduct) -> Result<Product> {
    match self.inner.source.insert_product(&new).await {
      Err(e) => {
        self.inner.notifier.error("Create failed", e.to_string());
        Err(e)
      }
      Ok(created) => {
        let row = created.clone();
        self.patch_snapshot(true, |snapshot| {
          snapshot.products.insert(0, row);
        });
        self.inner.notifier.success("Product added", &created.name);
        Ok(created)
      }
    }
  }

  pub async fn update_order(&self, id: &str, patch: OrderPatch) -> Result<()> {
    match self.inner.source.update_order(id, &patch).await {
      Err(e) => {
        self.inner.notifier.error("Update failed", e.to_string());
        Err(e)
      }
      Ok(()) => {
        self.patch_snapshot(true, |snapshot| {
          for order in &mut snapshot.orders {
            if order.id == id {
              patch.apply(order);
            }
          }
        });
        self.inner.notifier.success("Order updated", id);
        Ok(())
      }
    }
  }

  pub async fn add_order(&self, new: NewOrder) -> Result<Order> {
    match self.inner.source.insert_order(&new).await {
      Err(e) => {
        self.inner.notifier.error("Create failed", e.to_string());
        Err(e)
      }
      Ok(created) => {
        let row = created.clone();
        self.patch_snapshot(true, |snapshot| {
          snapshot.orders.insert(0, row);
        });
        self
          .inner
          .notifier
          .success("Order added", &created.order_number);
        Ok(created)
      }
    }
  }

  pub async fn update_customer(&self, id: &str, patch: CustomerPatch) -> Result<()> {
    match self.inner.source.update_customer(id, &patch).await {
      Err(e) => {
        self.inner.notifier.error("Update failed", e.to_string());
        Err(e)
      }
      Ok(()) => {
        self.patch_snapshot(true, |snapshot| {
          for customer in &mut snapshot.customers {
            if customer.id == id {
              patch.apply(customer);
            }
          }
        });
        self.inner.notifier.success("Customer updated", id);
        Ok(())
      }
    }
  }

  pub async fn add_customer(&self, new: NewCustomer) -> Result<Customer> {
    match self.inner.source.insert_customer(&new).await {
      Err(e) => {
        self.inner.notifier.error("Create failed", e.to_string());
        Err(e)
      }
      Ok(created) => {
        let row = created.clone();
        self.patch_snapshot(true, |snapshot| {
          snapshot.customers.insert(0, row);
        });
        self.inner.notifier.success("Customer added", &created.name);
        Ok(created)
      }
    }
  }

  /// Set a variant's stock counters, e.g. after a warehouse adjustment.
  pub async fn update_variant_stock(
    &self,
    variant_id: &str,
    stock_quantity: i64,
    reserved_quantity: i64,
  ) -> Result<()> {
    match self
      .inner
      .source
      .update_variant_stock(variant_id, stock_quantity, reserved_quantity)
      .await
    {
      Err(e) => {
        self.inner.notifier.error("Update failed", e.to_string());
        Err(e)
      }
      Ok(()) => {
        self.patch_snapshot(true, |snapshot| {
          for product in &mut snapshot.products {
            for variant in &mut product.variants {
              if variant.id == variant_id {
                variant.stock_quantity = stock_quantity;
                variant.reserved_quantity = reserved_quantity;
              }
            }
          }
        });
        self.inner.notifier.success("Stock updated", variant_id);
        Ok(())
      }
    }
  }

  // ==========================================================================
  // Reconciliation hooks for the change listener
  // ==========================================================================

  /// Merge scalar fields of a changed product row, keeping nested
  /// variants. Returns false when the row is unknown locally.
  pub(crate) fn reconcile_product_update(&self, row: crate::store::api_types::ProductRow) -> bool {
    let incoming = row.into_domain();
    if !self.current().products.iter().any(|p| p.id == incoming.id) {
      return false;
    }
    self.patch_snapshot(false, |snapshot| {
      for product in &mut snapshot.products {
        if product.id == incoming.id {
          let variants = std::mem::take(&mut product.variants);
          let category_name = product.category_name.take();
          *product = incoming.clone();
          product.variants = variants;
          if product.category_name.is_none() {
            product.category_name = category_name;
          }
        }
      }
    });
    true
  }

  /// Merge scalar fields of a changed order row, keeping line items.
  pub(crate) fn reconcile_order_update(&self, row: crate::store::api_types::OrderRow) -> bool {
    let incoming = row.into_domain();
    if !self.current().orders.iter().any(|o| o.id == incoming.id) {
      return false;
    }
    self.patch_snapshot(false, |snapshot| {
      for order in &mut snapshot.orders {
        if order.id == incoming.id {
          let items = std::mem::take(&mut order.items);
          let customer_name = order.customer_name.take();
          let customer_phone = order.customer_phone.take();
          *order = incoming.clone();
          order.items = items;
          if order.customer_name.is_none() {
            order.customer_name = customer_name;
          }
          if order.customer_phone.is_none() {
            order.customer_phone = customer_phone;
          }
        }
      }
    });
    true
  }

  /// Insert or replace a customer row; customers carry no nested data so
  /// the event payload is the whole truth.
  pub(crate) fn reconcile_customer_upsert(&self, row: crate::store::api_types::CustomerRow) {
    let incoming = row.into_domain();
    self.patch_snapshot(false, |snapshot| {
      match snapshot.customers.iter_mut().find(|c| c.id == incoming.id) {
        Some(existing) => *existing = incoming.clone(),
        None => snapshot.customers.insert(0, incoming.clone()),
      }
    });
  }

  /// Drop a deleted row from whichever collection holds it.
  pub(crate) fn reconcile_delete(&self, table: &str, id: &str) {
    self.patch_snapshot(false, |snapshot| match table {
      "products" => snapshot.products.retain(|p| p.id != id),
      "orders" => snapshot.orders.retain(|o| o.id != id),
      "customers" => snapshot.customers.retain(|c| c.id != id),
      _ => {}
    });
  }

  // ==========================================================================
  // Read surface
  // ==========================================================================

  /// The current snapshot. Before the first successful fetch this is the
  /// empty shape, never an error.
  pub fn snapshot(&self) -> Arc<Snapshot> {
    self.current()
  }

  fn current(&self) -> Arc<Snapshot> {
    self
      .inner
      .state
      .read()
      .map(|state| state.snapshot.clone())
      .unwrap_or_else(|_| Arc::new(Snapshot::default()))
  }

  pub fn is_loading(&self) -> bool {
    self
      .inner
      .state
      .read()
      .map(|state| state.loading)
      .unwrap_or(false)
  }

  pub fn error(&self) -> Option<String> {
    self
      .inner
      .state
      .read()
      .ok()
      .and_then(|state| state.error.clone())
  }

  /// Data has loaded and no fetch error is pending.
  pub fn is_ready(&self) -> bool {
    self
      .inner
      .state
      .read()
      .map(|state| !state.loading && state.error.is_none())
      .unwrap_or(false)
  }

  pub fn last_updated(&self) -> Option<DateTime<Utc>> {
    self.current().fetched_at
  }

  /// Watch channel carrying the latest snapshot version; bumped on every
  /// publish and patch so screens know when to re-read.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.inner.changed.subscribe()
  }

  pub fn notifications(&self) -> broadcast::Receiver<Notification> {
    self.inner.notifier.subscribe()
  }

  pub fn products(&self, viewer: &Viewer) -> Vec<Product> {
    access::scope_products(&self.current().products, viewer)
  }

  pub fn orders(&self, viewer: &Viewer) -> Vec<Order> {
    access::scope_orders(&self.current().orders, viewer)
  }

  pub fn customers(&self, viewer: &Viewer) -> Vec<Customer> {
    access::scope_customers(&self.current().customers, viewer)
  }

  pub fn profits(&self, viewer: &Viewer) -> Vec<ProfitRecord> {
    access::scope_profits(&self.current().profits, viewer)
  }

  // Reference data is visible to every role.

  pub fn departments(&self) -> Vec<Department> {
    self.current().departments.clone()
  }

  pub fn categories(&self) -> Vec<Category> {
    self.current().categories.clone()
  }

  pub fn colors(&self) -> Vec<Color> {
    self.current().colors.clone()
  }

  pub fn sizes(&self) -> Vec<Size> {
    self.current().sizes.clone()
  }

  pub fn product_by_id(&self, id: &str) -> Option<Product> {
    self.current().products.iter().find(|p| p.id == id).cloned()
  }

  pub fn order_by_id(&self, id: &str) -> Option<Order> {
    self.current().orders.iter().find(|o| o.id == id).cloned()
  }

  pub fn customer_by_id(&self, id: &str) -> Option<Customer> {
    self
      .current()
      .customers
      .iter()
      .find(|c| c.id == id)
      .cloned()
  }

  pub fn top_products(&self, limit: usize) -> Vec<ProductSales> {
    stats::top_products(&self.current(), limit)
  }

  pub fn top_customers(&self, limit: usize) -> Vec<CustomerSpend> {
    stats::top_customers(&self.current(), limit)
  }

  /// Derived totals over the viewer's visible rows, memoized per snapshot
  /// version.
  pub fn calculations(&self, viewer: &Viewer) -> Arc<Totals> {
    let snapshot = self.current();
    let scope_key = if viewer.can_view_all() {
      "*".to_string()
    } else {
      viewer.user_id.clone()
    };

    if let Ok(memo) = self.inner.totals.lock() {
      if memo.version == snapshot.version {
        if let Some(totals) = memo.by_scope.get(&scope_key) {
          return totals.clone();
        }
      }
    }

    let totals = Arc::new(self.compute_scoped(&snapshot, viewer));

    if let Ok(mut memo) = self.inner.totals.lock() {
      if memo.version != snapshot.version {
        memo.version = snapshot.version;
        memo.by_scope.clear();
      }
      memo.by_scope.insert(scope_key, totals.clone());
    }

    totals
  }

  fn compute_scoped(&self, snapshot: &Snapshot, viewer: &Viewer) -> Totals {
    if viewer.can_view_all() {
      return stats::compute(snapshot, &self.inner.stats_config);
    }
    let scoped = Snapshot {
      departments: Vec::new(),
      categories: Vec::new(),
      colors: Vec::new(),
      sizes: Vec::new(),
      products: access::scope_products(&snapshot.products, viewer),
      customers: access::scope_customers(&snapshot.customers, viewer),
      orders: access::scope_orders(&snapshot.orders, viewer),
      profits: access::scope_profits(&snapshot.profits, viewer),
      fetched_at: snapshot.fetched_at,
      version: snapshot.version,
    };
    stats::compute(&scoped, &self.inner.stats_config)
  }
}

#[cfg(test)]
impl Provider<crate::testutil::MockSource> {
  /// How many bulk fetches hit the mock source.
  pub(crate) fn inner_fetches(&self) -> usize {
    self.inner.source.fetches()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::access::Role;
  use crate::notify::Severity;
  use crate::store::OrderStatus;
  use crate::testutil::{order, product, test_config, variant, MockSource};
  use std::sync::atomic::Ordering as AtomicOrdering;

  fn provider_with(source: MockSource, ttl_secs: u64) -> Provider<MockSource> {
    Provider::new(source, &test_config(ttl_secs))
  }

  fn seeded_source() -> MockSource {
    let source = MockSource::with_orders(vec![
      order("1", OrderStatus::Completed, 100.0),
      order("2", OrderStatus::Pending, 50.0),
      order("3", OrderStatus::Completed, 200.0),
    ]);
    *source.products.lock().unwrap() = vec![product("p1", vec![variant("v1", 3, 2.0)])];
    source
  }

  #[tokio::test]
  async fn fresh_cache_skips_remote_calls() {
    let provider = provider_with(seeded_source(), 300);

    let first = provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 1);

    let second = provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 1, "cache hit went remote");
    assert_eq!(first.version, second.version);
    assert_eq!(second.orders.len(), 3);
  }

  #[tokio::test]
  async fn forced_refresh_bypasses_cache_age() {
    let provider = provider_with(seeded_source(), 300);

    provider.fetch_snapshot(false).await.unwrap();
    provider.fetch_snapshot(true).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 2);
  }

  #[tokio::test]
  async fn expired_ttl_goes_remote_again() {
    let provider = provider_with(seeded_source(), 0);

    provider.fetch_snapshot(false).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 2);
  }

  #[tokio::test]
  async fn failed_fetch_keeps_previous_snapshot() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");

    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.orders(&viewer).len(), 3);

    provider
      .inner
      .source
      .fail_orders
      .store(true, AtomicOrdering::SeqCst);

    let result = provider.fetch_snapshot(true).await;
    assert!(result.is_err());

    // Previous data still readable, error surfaced.
    assert_eq!(provider.orders(&viewer).len(), 3);
    let error = provider.error().expect("error recorded");
    assert!(error.contains("simulated outage"));
    assert!(!provider.is_loading());
    assert!(!provider.is_ready());
  }

  #[tokio::test]
  async fn fetch_failure_emits_notification() {
    let source = seeded_source();
    source.fail_orders.store(true, AtomicOrdering::SeqCst);
    let provider = provider_with(source, 300);
    let mut notifications = provider.notifications();

    let _ = provider.fetch_snapshot(false).await;

    let n = notifications.recv().await.unwrap();
    assert_eq!(n.severity, Severity::Error);
    assert_eq!(n.title, "Failed to load data");
  }

  #[tokio::test]
  async fn optimistic_update_is_visible_without_refetch() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");

    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 1);

    provider
      .update_product(
        "p1",
        ProductPatch {
          name: Some("Renamed".to_string()),
          ..ProductPatch::default()
        },
      )
      .await
      .unwrap();

    // Synchronous read reflects the patch; no remote call happened.
    let products = provider.products(&viewer);
    assert_eq!(products[0].name, "Renamed");
    assert_eq!(provider.inner.source.fetches(), 1);

    // The cache entry was invalidated, so the next read-through fetch
    // reconciles with the remote store even inside the TTL window.
    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 2);
  }

  #[tokio::test]
  async fn add_product_prepends_created_row() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");

    provider.fetch_snapshot(false).await.unwrap();
    provider
      .add_product(NewProduct {
        name: "Fresh".to_string(),
        base_price: 20.0,
        cost_price: 8.0,
        category_id: None,
        is_active: true,
        created_by: Some("boss".to_string()),
      })
      .await
      .unwrap();

    let products = provider.products(&viewer);
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Fresh");
  }

  #[tokio::test]
  async fn failed_mutation_leaves_cache_untouched() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");
    let mut notifications = provider.notifications();

    provider.fetch_snapshot(false).await.unwrap();
    let before = provider.products(&viewer);

    let result = provider
      .update_product(
        "missing",
        ProductPatch {
          name: Some("nope".to_string()),
          ..ProductPatch::default()
        },
      )
      .await;
    assert!(result.is_err());

    // Snapshot unchanged and still served from cache.
    assert_eq!(provider.products(&viewer)[0].name, before[0].name);
    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(provider.inner.source.fetches(), 1);

    let n = notifications.recv().await.unwrap();
    assert_eq!(n.severity, Severity::Error);
  }

  #[tokio::test]
  async fn update_order_patches_status_in_place() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");

    provider.fetch_snapshot(false).await.unwrap();
    provider
      .update_order(
        "2",
        OrderPatch {
          status: Some("completed".to_string()),
          ..OrderPatch::default()
        },
      )
      .await
      .unwrap();

    let order = provider.order_by_id("2").unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(provider.calculations(&viewer).total_revenue, 350.0);
  }

  #[tokio::test]
  async fn update_variant_stock_patches_nested_row() {
    let provider = provider_with(seeded_source(), 300);

    provider.fetch_snapshot(false).await.unwrap();
    provider.update_variant_stock("v1", 42, 5).await.unwrap();

    let product = provider.product_by_id("p1").unwrap();
    assert_eq!(product.variants[0].stock_quantity, 42);
    assert_eq!(product.variants[0].reserved_quantity, 5);
  }

  #[tokio::test]
  async fn reads_before_first_fetch_return_empty_shape() {
    let provider = provider_with(MockSource::new(), 300);
    let viewer = Viewer::admin("boss");

    assert!(provider.products(&viewer).is_empty());
    assert!(provider.orders(&viewer).is_empty());
    assert!(provider.is_loading());
    assert!(provider.error().is_none());
    assert_eq!(provider.calculations(&viewer).total_orders, 0);
  }

  #[tokio::test]
  async fn calculations_scope_to_the_viewer() {
    let source = seeded_source();
    {
      let mut orders = source.orders.lock().unwrap();
      orders[0].created_by = Some("u2".to_string());
    }
    let provider = provider_with(source, 300);

    provider.fetch_snapshot(false).await.unwrap();

    let admin = provider.calculations(&Viewer::admin("boss"));
    assert_eq!(admin.total_orders, 3);
    assert_eq!(admin.total_revenue, 300.0);

    // u1 no longer sees order "1" (100.0, created by u2).
    let mine = provider.calculations(&Viewer::new("u1", Role::SalesEmployee));
    assert_eq!(mine.total_orders, 2);
    assert_eq!(mine.total_revenue, 200.0);
  }

  #[tokio::test]
  async fn calculations_are_memoized_per_version() {
    let provider = provider_with(seeded_source(), 300);
    let viewer = Viewer::admin("boss");

    provider.fetch_snapshot(false).await.unwrap();
    let first = provider.calculations(&viewer);
    let second = provider.calculations(&viewer);
    assert!(Arc::ptr_eq(&first, &second), "memo missed on same version");

    provider
      .update_order(
        "2",
        OrderPatch {
          status: Some("completed".to_string()),
          ..OrderPatch::default()
        },
      )
      .await
      .unwrap();

    let third = provider.calculations(&viewer);
    assert!(!Arc::ptr_eq(&first, &third), "memo survived a version bump");
  }

  #[tokio::test]
  async fn watch_channel_reports_version_bumps() {
    let provider = provider_with(seeded_source(), 300);
    let rx = provider.subscribe();
    assert_eq!(*rx.borrow(), 0);

    provider.fetch_snapshot(false).await.unwrap();
    assert_eq!(*rx.borrow(), 1);

    provider
      .update_product("p1", ProductPatch::default())
      .await
      .unwrap();
    assert_eq!(*rx.borrow(), 2);
  }
}
