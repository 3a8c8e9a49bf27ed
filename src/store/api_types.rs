//! Serde-deserializable row types matching the remote table API.
//!
//! These are separate from domain types so that wire quirks (embedded
//! relation objects, nullable columns, missing timestamps) stay out of the
//! shapes the rest of the crate works with.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::types::{
  Category, Color, Customer, Department, Order, OrderItem, OrderStatus, Product, Profile,
  ProfitRecord, ProfitStatus, Size, Variant,
};
use crate::access::Role;

/// Re-serialize a value through JSON to convert between compatible shapes.
/// Used to decode change-event payload records into typed rows.
pub fn reserialize<T: DeserializeOwned>(value: impl Serialize) -> serde_json::Result<T> {
  serde_json::from_value(serde_json::to_value(value)?)
}

fn epoch() -> DateTime<Utc> {
  DateTime::<Utc>::UNIX_EPOCH
}

// ============================================================================
// Embedded relation fragments
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NameRef {
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRef {
  #[serde(default)]
  pub name: String,
  pub departments: Option<NameRef>,
}

#[derive(Debug, Deserialize)]
pub struct ColorRef {
  #[serde(default)]
  pub name: String,
  pub hex_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SizeRef {
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerRef {
  #[serde(default)]
  pub name: String,
  pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderRef {
  #[serde(default)]
  pub order_number: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRef {
  #[serde(default)]
  pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct VariantProductRef {
  pub products: Option<NameRef>,
}

// ============================================================================
// Reference data rows
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DepartmentRow {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub display_order: i64,
}

impl DepartmentRow {
  pub fn into_domain(self) -> Department {
    Department {
      id: self.id,
      name: self.name,
      display_order: self.display_order,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRow {
  pub id: String,
  pub name: String,
  pub department_id: Option<String>,
  #[serde(default)]
  pub display_order: i64,
  pub departments: Option<NameRef>,
}

impl CategoryRow {
  pub fn into_domain(self) -> Category {
    Category {
      id: self.id,
      name: self.name,
      department_id: self.department_id,
      department_name: self.departments.map(|d| d.name),
      display_order: self.display_order,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ColorRow {
  pub id: String,
  pub name: String,
  pub hex_code: Option<String>,
  #[serde(default)]
  pub display_order: i64,
}

impl ColorRow {
  pub fn into_domain(self) -> Color {
    Color {
      id: self.id,
      name: self.name,
      hex_code: self.hex_code,
      display_order: self.display_order,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct SizeRow {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub display_order: i64,
}

impl SizeRow {
  pub fn into_domain(self) -> Size {
    Size {
      id: self.id,
      name: self.name,
      display_order: self.display_order,
    }
  }
}

// ============================================================================
// Product rows
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VariantRow {
  pub id: String,
  #[serde(default)]
  pub product_id: String,
  pub color_id: Option<String>,
  pub size_id: Option<String>,
  #[serde(default)]
  pub stock_quantity: i64,
  #[serde(default)]
  pub reserved_quantity: i64,
  #[serde(default)]
  pub cost_price: f64,
  #[serde(default)]
  pub sale_price: f64,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub colors: Option<ColorRef>,
  pub sizes: Option<SizeRef>,
}

fn default_true() -> bool {
  true
}

impl VariantRow {
  pub fn into_domain(self) -> Variant {
    Variant {
      id: self.id,
      product_id: self.product_id,
      color_id: self.color_id,
      color: self.colors.map(|c| c.name),
      size_id: self.size_id,
      size: self.sizes.map(|s| s.name),
      stock_quantity: self.stock_quantity,
      reserved_quantity: self.reserved_quantity,
      cost_price: self.cost_price,
      sale_price: self.sale_price,
      is_active: self.is_active,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ProductRow {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub base_price: f64,
  #[serde(default)]
  pub cost_price: f64,
  pub category_id: Option<String>,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub created_by: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  pub categories: Option<CategoryRef>,
  #[serde(default)]
  pub product_variants: Vec<VariantRow>,
}

impl ProductRow {
  pub fn into_domain(self) -> Product {
    Product {
      id: self.id,
      name: self.name,
      base_price: self.base_price,
      cost_price: self.cost_price,
      category_id: self.category_id,
      category_name: self.categories.map(|c| c.name),
      is_active: self.is_active,
      created_by: self.created_by,
      created_at: self.created_at.unwrap_or_else(epoch),
      updated_at: self.updated_at.unwrap_or_else(epoch),
      variants: self
        .product_variants
        .into_iter()
        .map(VariantRow::into_domain)
        .collect(),
    }
  }
}

// ============================================================================
// Order rows
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderItemRow {
  pub id: String,
  #[serde(default)]
  pub order_id: String,
  pub variant_id: Option<String>,
  #[serde(default)]
  pub quantity: i64,
  #[serde(default)]
  pub unit_price: f64,
  #[serde(default)]
  pub total_price: f64,
  pub product_variants: Option<VariantProductRef>,
}

impl OrderItemRow {
  pub fn into_domain(self) -> OrderItem {
    OrderItem {
      id: self.id,
      order_id: self.order_id,
      variant_id: self.variant_id,
      product_name: self
        .product_variants
        .and_then(|v| v.products)
        .map(|p| p.name),
      quantity: self.quantity,
      unit_price: self.unit_price,
      total_price: self.total_price,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct OrderRow {
  pub id: String,
  #[serde(default)]
  pub order_number: String,
  pub customer_id: Option<String>,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub subtotal: f64,
  #[serde(default)]
  pub discount: f64,
  #[serde(default)]
  pub final_amount: f64,
  pub created_by: Option<String>,
  pub assigned_to: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub order_items: Vec<OrderItemRow>,
  pub customers: Option<CustomerRef>,
}

impl OrderRow {
  pub fn into_domain(self) -> Order {
    let (customer_name, customer_phone) = match self.customers {
      Some(c) => (Some(c.name), c.phone),
      None => (None, None),
    };
    Order {
      id: self.id,
      order_number: self.order_number,
      customer_id: self.customer_id,
      customer_name,
      customer_phone,
      status: OrderStatus::parse(&self.status),
      subtotal: self.subtotal,
      discount: self.discount,
      final_amount: self.final_amount,
      created_by: self.created_by,
      assigned_to: self.assigned_to,
      created_at: self.created_at.unwrap_or_else(epoch),
      updated_at: self.updated_at.unwrap_or_else(epoch),
      items: self
        .order_items
        .into_iter()
        .map(OrderItemRow::into_domain)
        .collect(),
    }
  }
}

// ============================================================================
// Customer / profit / profile rows
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CustomerRow {
  pub id: String,
  pub name: String,
  pub phone: Option<String>,
  pub email: Option<String>,
  pub address: Option<String>,
  #[serde(default)]
  pub total_orders: i64,
  #[serde(default)]
  pub total_spent: f64,
  pub created_by: Option<String>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
}

impl CustomerRow {
  pub fn into_domain(self) -> Customer {
    Customer {
      id: self.id,
      name: self.name,
      phone: self.phone,
      email: self.email,
      address: self.address,
      total_orders: self.total_orders,
      total_spent: self.total_spent,
      created_by: self.created_by,
      created_at: self.created_at.unwrap_or_else(epoch),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ProfitRow {
  pub id: String,
  pub order_id: Option<String>,
  pub employee_id: Option<String>,
  #[serde(default)]
  pub profit_amount: f64,
  #[serde(default)]
  pub employee_share: f64,
  #[serde(default)]
  pub manager_share: f64,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub settled_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub created_at: Option<DateTime<Utc>>,
  pub orders: Option<OrderRef>,
  pub profiles: Option<ProfileRef>,
}

impl ProfitRow {
  pub fn into_domain(self) -> ProfitRecord {
    ProfitRecord {
      id: self.id,
      order_id: self.order_id,
      order_number: self.orders.map(|o| o.order_number),
      employee_id: self.employee_id,
      employee_name: self.profiles.map(|p| p.full_name),
      profit_amount: self.profit_amount,
      employee_share: self.employee_share,
      manager_share: self.manager_share,
      status: ProfitStatus::parse(&self.status),
      settled_at: self.settled_at,
      created_at: self.created_at.unwrap_or_else(epoch),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ProfileRow {
  pub id: String,
  #[serde(default)]
  pub full_name: String,
  #[serde(default)]
  pub role: String,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub employee_code: Option<String>,
}

impl ProfileRow {
  pub fn into_domain(self) -> Profile {
    Profile {
      id: self.id,
      full_name: self.full_name,
      role: Role::parse(&self.role),
      is_active: self.is_active,
      employee_code: self.employee_code,
    }
  }
}
