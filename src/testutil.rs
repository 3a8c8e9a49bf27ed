//! Shared fixtures for unit tests: canned rows and an in-memory data
//! source with call counters.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config::{CacheConfig, Config, RealtimeConfig, StatsConfig, StoreConfig};
use crate::store::{
  Customer, CustomerPatch, DataSource, Department, NewCustomer, NewOrder, NewProduct, Order,
  OrderStatus, Product, ProductPatch, ProfitRecord, ProfitStatus, Variant,
};
use crate::store::{Category, Color, OrderPatch, Size};

pub fn test_config(ttl_secs: u64) -> Config {
  Config {
    store: StoreConfig {
      url: "https://acme.example.co".to_string(),
      schema: "public".to_string(),
    },
    cache: CacheConfig { ttl_secs },
    stats: StatsConfig::default(),
    realtime: RealtimeConfig::default(),
  }
}

pub fn ts(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap())
}

pub fn variant(id: &str, stock: i64, cost_price: f64) -> Variant {
  Variant {
    id: id.to_string(),
    product_id: String::new(),
    color_id: None,
    color: Some("black".to_string()),
    size_id: None,
    size: Some("M".to_string()),
    stock_quantity: stock,
    reserved_quantity: 0,
    cost_price,
    sale_price: cost_price * 2.0,
    is_active: true,
  }
}

pub fn product(id: &str, variants: Vec<Variant>) -> Product {
  Product {
    id: id.to_string(),
    name: format!("Product {}", id),
    base_price: 10.0,
    cost_price: 5.0,
    category_id: None,
    category_name: None,
    is_active: true,
    created_by: Some("u1".to_string()),
    created_at: ts("2024-06-01T00:00:00Z"),
    updated_at: ts("2024-06-01T00:00:00Z"),
    variants,
  }
}

pub fn order(id: &str, status: OrderStatus, final_amount: f64) -> Order {
  Order {
    id: id.to_string(),
    order_number: format!("ORD-{}", id),
    customer_id: None,
    customer_name: None,
    customer_phone: None,
    status,
    subtotal: final_amount,
    discount: 0.0,
    final_amount,
    created_by: Some("u1".to_string()),
    assigned_to: None,
    created_at: ts("2024-06-01T00:00:00Z"),
    updated_at: ts("2024-06-01T00:00:00Z"),
    items: Vec::new(),
  }
}

pub fn customer(id: &str, name: &str) -> Customer {
  Customer {
    id: id.to_string(),
    name: name.to_string(),
    phone: None,
    email: None,
    address: None,
    total_orders: 0,
    total_spent: 0.0,
    created_by: Some("u1".to_string()),
    created_at: ts("2024-06-01T00:00:00Z"),
  }
}

pub fn profit(id: &str, status: ProfitStatus, amount: f64) -> ProfitRecord {
  ProfitRecord {
    id: id.to_string(),
    order_id: None,
    order_number: None,
    employee_id: Some("u1".to_string()),
    employee_name: None,
    profit_amount: amount,
    employee_share: amount / 2.0,
    manager_share: amount / 2.0,
    status,
    settled_at: None,
    created_at: ts("2024-06-01T00:00:00Z"),
  }
}

/// In-memory data source. Returns clones of the configured rows, counts
/// every bulk read, and can be told to fail one table's query.
#[derive(Default)]
pub struct MockSource {
  pub products: Mutex<Vec<Product>>,
  pub orders: Mutex<Vec<Order>>,
  pub customers: Mutex<Vec<Customer>>,
  pub profits: Mutex<Vec<ProfitRecord>>,
  pub fetch_calls: AtomicUsize,
  pub fail_orders: AtomicBool,
}

impl MockSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_orders(orders: Vec<Order>) -> Self {
    let source = Self::default();
    *source.orders.lock().unwrap() = orders;
    source
  }

  pub fn fetches(&self) -> usize {
    self.fetch_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl DataSource for MockSource {
  async fn departments(&self) -> Result<Vec<Department>> {
    Ok(Vec::new())
  }

  async fn categories(&self) -> Result<Vec<Category>> {
    Ok(Vec::new())
  }

  async fn colors(&self) -> Result<Vec<Color>> {
    Ok(Vec::new())
  }

  async fn sizes(&self) -> Result<Vec<Size>> {
    Ok(Vec::new())
  }

  async fn products(&self) -> Result<Vec<Product>> {
    // One counter tick per bulk fetch; the other table reads ride along.
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.products.lock().unwrap().clone())
  }

  async fn customers(&self) -> Result<Vec<Customer>> {
    Ok(self.customers.lock().unwrap().clone())
  }

  async fn orders(&self) -> Result<Vec<Order>> {
    if self.fail_orders.load(Ordering::SeqCst) {
      return Err(eyre!("orders request failed with 500: simulated outage"));
    }
    Ok(self.orders.lock().unwrap().clone())
  }

  async fn profits(&self) -> Result<Vec<ProfitRecord>> {
    Ok(self.profits.lock().unwrap().clone())
  }

  async fn insert_product(&self, new: &NewProduct) -> Result<Product> {
    let mut created = product("created", Vec::new());
    created.name = new.name.clone();
    created.base_price = new.base_price;
    created.cost_price = new.cost_price;
    created.created_by = new.created_by.clone();
    Ok(created)
  }

  async fn update_product(&self, id: &str, _patch: &ProductPatch) -> Result<()> {
    if id == "missing" {
      return Err(eyre!("products request failed with 404: row not found"));
    }
    Ok(())
  }

  async fn insert_order(&self, new: &NewOrder) -> Result<Order> {
    let mut created = order("created", OrderStatus::parse(&new.status), new.final_amount);
    created.order_number = new.order_number.clone();
    created.created_by = new.created_by.clone();
    Ok(created)
  }

  async fn update_order(&self, id: &str, _patch: &OrderPatch) -> Result<()> {
    if id == "missing" {
      return Err(eyre!("orders request failed with 404: row not found"));
    }
    Ok(())
  }

  async fn insert_customer(&self, new: &NewCustomer) -> Result<Customer> {
    Ok(customer("created", &new.name))
  }

  async fn update_customer(&self, id: &str, _patch: &CustomerPatch) -> Result<()> {
    if id == "missing" {
      return Err(eyre!("customers request failed with 404: row not found"));
    }
    Ok(())
  }

  async fn update_variant_stock(
    &self,
    _variant_id: &str,
    _stock_quantity: i64,
    _reserved_quantity: i64,
  ) -> Result<()> {
    Ok(())
  }
}
