//! Remote store access: domain types, wire row shapes, and the HTTP client
//! for the hosted table API.

pub mod api_types;
mod client;
pub mod types;

pub use client::Client;
pub use types::{
  Category, Color, Customer, CustomerPatch, Department, NewCustomer, NewOrder, NewProduct, Order,
  OrderItem, OrderPatch, OrderStatus, Product, ProductPatch, Profile, ProfitRecord, ProfitStatus,
  Size, Snapshot, Variant,
};

use async_trait::async_trait;
use color_eyre::Result;

/// The read/write surface the provider needs from the remote store.
///
/// `Client` is the production implementation; tests substitute an
/// in-memory source so cache behavior can be exercised without a network.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
  async fn departments(&self) -> Result<Vec<Department>>;
  async fn categories(&self) -> Result<Vec<Category>>;
  async fn colors(&self) -> Result<Vec<Color>>;
  async fn sizes(&self) -> Result<Vec<Size>>;
  async fn products(&self) -> Result<Vec<Product>>;
  async fn customers(&self) -> Result<Vec<Customer>>;
  async fn orders(&self) -> Result<Vec<Order>>;
  async fn profits(&self) -> Result<Vec<ProfitRecord>>;

  async fn insert_product(&self, new: &NewProduct) -> Result<Product>;
  async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<()>;
  async fn insert_order(&self, new: &NewOrder) -> Result<Order>;
  async fn update_order(&self, id: &str, patch: &OrderPatch) -> Result<()>;
  async fn insert_customer(&self, new: &NewCustomer) -> Result<Customer>;
  async fn update_customer(&self, id: &str, patch: &CustomerPatch) -> Result<()>;
  async fn update_variant_stock(
    &self,
    variant_id: &str,
    stock_quantity: i64,
    reserved_quantity: i64,
  ) -> Result<()>;
}
