use chrono::{DateTime, Utc};
use serde::Serialize;

/// Order lifecycle states as stored remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
  Pending,
  Shipped,
  Delivered,
  Completed,
  Cancelled,
  Returned,
}

impl OrderStatus {
  /// Parse the remote string representation. Unknown values map to
  /// `Pending` so a new remote status never breaks snapshot assembly.
  pub fn parse(s: &str) -> Self {
    match s {
      "shipped" => Self::Shipped,
      "delivered" => Self::Delivered,
      "completed" => Self::Completed,
      "cancelled" => Self::Cancelled,
      "returned" => Self::Returned,
      _ => Self::Pending,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Shipped => "shipped",
      Self::Delivered => "delivered",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
      Self::Returned => "returned",
    }
  }

  /// Statuses that count towards realized revenue.
  pub fn is_revenue(&self) -> bool {
    matches!(self, Self::Completed | Self::Delivered)
  }
}

/// Settlement state of a profit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfitStatus {
  Pending,
  Completed,
}

impl ProfitStatus {
  pub fn parse(s: &str) -> Self {
    match s {
      "completed" => Self::Completed,
      _ => Self::Pending,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Completed => "completed",
    }
  }
}

/// A sellable product with its nested variants.
#[derive(Debug, Clone)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub base_price: f64,
  pub cost_price: f64,
  pub category_id: Option<String>,
  /// Category name from the embedded relation, when selected.
  pub category_name: Option<String>,
  pub is_active: bool,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub variants: Vec<Variant>,
}

/// A concrete color/size combination of a product.
#[derive(Debug, Clone)]
pub struct Variant {
  pub id: String,
  pub product_id: String,
  pub color_id: Option<String>,
  pub color: Option<String>,
  pub size_id: Option<String>,
  pub size: Option<String>,
  /// On-hand quantity. Non-negativity is enforced remotely.
  pub stock_quantity: i64,
  /// Quantity held for unfinalized orders; never exceeds stock remotely.
  pub reserved_quantity: i64,
  pub cost_price: f64,
  pub sale_price: f64,
  pub is_active: bool,
}

impl Variant {
  /// Stock available for new orders.
  pub fn available(&self) -> i64 {
    self.stock_quantity - self.reserved_quantity
  }
}

/// An order with its line items frozen at time of sale.
#[derive(Debug, Clone)]
pub struct Order {
  pub id: String,
  pub order_number: String,
  pub customer_id: Option<String>,
  pub customer_name: Option<String>,
  pub customer_phone: Option<String>,
  pub status: OrderStatus,
  pub subtotal: f64,
  pub discount: f64,
  pub final_amount: f64,
  pub created_by: Option<String>,
  pub assigned_to: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub items: Vec<OrderItem>,
}

/// One line of an order. Prices are snapshots, not live variant prices.
#[derive(Debug, Clone)]
pub struct OrderItem {
  pub id: String,
  pub order_id: String,
  pub variant_id: Option<String>,
  pub product_name: Option<String>,
  pub quantity: i64,
  pub unit_price: f64,
  pub total_price: f64,
}

#[derive(Debug, Clone)]
pub struct Customer {
  pub id: String,
  pub name: String,
  pub phone: Option<String>,
  pub email: Option<String>,
  pub address: Option<String>,
  /// Aggregate counters maintained by the remote side.
  pub total_orders: i64,
  pub total_spent: f64,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Per-order profit split between employee and manager shares.
#[derive(Debug, Clone)]
pub struct ProfitRecord {
  pub id: String,
  pub order_id: Option<String>,
  pub order_number: Option<String>,
  pub employee_id: Option<String>,
  pub employee_name: Option<String>,
  pub profit_amount: f64,
  pub employee_share: f64,
  pub manager_share: f64,
  pub status: ProfitStatus,
  pub settled_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

/// Reference data rows share one shape: id, name, display order.
#[derive(Debug, Clone)]
pub struct Department {
  pub id: String,
  pub name: String,
  pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct Category {
  pub id: String,
  pub name: String,
  pub department_id: Option<String>,
  pub department_name: Option<String>,
  pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct Color {
  pub id: String,
  pub name: String,
  pub hex_code: Option<String>,
  pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct Size {
  pub id: String,
  pub name: String,
  pub display_order: i64,
}

/// A dashboard user's profile row.
#[derive(Debug, Clone)]
pub struct Profile {
  pub id: String,
  pub full_name: String,
  pub role: crate::access::Role,
  pub is_active: bool,
  pub employee_code: Option<String>,
}

// ============================================================================
// Write payloads
// ============================================================================
//
// Patch types serialize only the fields being changed; `None` fields are
// omitted from the request body entirely, matching partial-update semantics
// of the table API.

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cost_price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

impl ProductPatch {
  /// Apply this patch to a cached row, mirroring what the remote update did.
  pub fn apply(&self, product: &mut Product) {
    if let Some(name) = &self.name {
      product.name = name.clone();
    }
    if let Some(base_price) = self.base_price {
      product.base_price = base_price;
    }
    if let Some(cost_price) = self.cost_price {
      product.cost_price = cost_price;
    }
    if let Some(category_id) = &self.category_id {
      product.category_id = Some(category_id.clone());
    }
    if let Some(is_active) = self.is_active {
      product.is_active = is_active;
    }
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub final_amount: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assigned_to: Option<String>,
}

impl OrderPatch {
  pub fn apply(&self, order: &mut Order) {
    if let Some(status) = &self.status {
      order.status = OrderStatus::parse(status);
    }
    if let Some(discount) = self.discount {
      order.discount = discount;
    }
    if let Some(final_amount) = self.final_amount {
      order.final_amount = final_amount;
    }
    if let Some(assigned_to) = &self.assigned_to {
      order.assigned_to = Some(assigned_to.clone());
    }
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CustomerPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
}

impl CustomerPatch {
  pub fn apply(&self, customer: &mut Customer) {
    if let Some(name) = &self.name {
      customer.name = name.clone();
    }
    if let Some(phone) = &self.phone {
      customer.phone = Some(phone.clone());
    }
    if let Some(email) = &self.email {
      customer.email = Some(email.clone());
    }
    if let Some(address) = &self.address {
      customer.address = Some(address.clone());
    }
  }
}

/// Insert payload for a product row. Variants are created separately by
/// warehouse flows; a freshly inserted product starts with none.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
  pub name: String,
  pub base_price: f64,
  pub cost_price: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category_id: Option<String>,
  pub is_active: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
  pub order_number: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub customer_id: Option<String>,
  pub status: String,
  pub subtotal: f64,
  pub discount: f64,
  pub final_amount: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCustomer {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}

// ============================================================================
// Snapshot
// ============================================================================

/// One normalized copy of every entity collection, fetched in bulk.
///
/// A snapshot is a disposable projection of the remote store: it is
/// regenerated wholesale on refresh and never treated as authoritative
/// for any invariant.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub departments: Vec<Department>,
  pub categories: Vec<Category>,
  pub colors: Vec<Color>,
  pub sizes: Vec<Size>,
  pub products: Vec<Product>,
  pub customers: Vec<Customer>,
  pub orders: Vec<Order>,
  pub profits: Vec<ProfitRecord>,
  /// When this snapshot was assembled.
  pub fetched_at: Option<DateTime<Utc>>,
  /// Monotonic publish version; newer snapshots always carry a higher one.
  pub version: u64,
}
