//! Aggregate statistics derived from a snapshot.
//!
//! Everything here is a pure function of a snapshot plus the stats
//! configuration: no network, no mutation, same input same output. The
//! provider memoizes results per snapshot version.

use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

use crate::config::StatsConfig;
use crate::store::{Customer, OrderStatus, Product, ProfitStatus, Snapshot};

/// Summary numbers every dashboard screen reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
  pub total_products: usize,
  pub active_products: usize,
  pub total_variants: usize,
  pub total_orders: usize,
  pub pending_orders: usize,
  pub completed_orders: usize,
  pub cancelled_orders: usize,
  pub total_customers: usize,
  /// Products with some variant's stock below the configured threshold.
  pub low_stock_products: usize,
  /// Products with no stock left in any variant.
  pub out_of_stock_products: usize,
  pub total_revenue: f64,
  pub pending_revenue: f64,
  pub average_order_value: f64,
  pub total_profit: f64,
  pub pending_profit: f64,
  /// Sum of variant stock valued at cost price.
  pub inventory_value: f64,
  pub today_orders: usize,
  pub today_revenue: f64,
  pub month_revenue: f64,
  pub month_profit: f64,
}

/// Derive totals from a snapshot against the current wall clock.
pub fn compute(snapshot: &Snapshot, config: &StatsConfig) -> Totals {
  compute_at(snapshot, config, Utc::now())
}

/// Same derivation with an explicit "now", so time windows are testable.
pub fn compute_at(snapshot: &Snapshot, config: &StatsConfig, now: DateTime<Utc>) -> Totals {
  let offset = config.time_basis.fixed_offset();
  let today = now.with_timezone(&offset).date_naive();

  let same_day = |ts: DateTime<Utc>| ts.with_timezone(&offset).date_naive() == today;
  let same_month = |ts: DateTime<Utc>| {
    let local = ts.with_timezone(&offset).date_naive();
    local.year() == today.year() && local.month() == today.month()
  };

  let orders = &snapshot.orders;
  let products = &snapshot.products;
  let profits = &snapshot.profits;

  let total_revenue: f64 = orders
    .iter()
    .filter(|o| o.status.is_revenue())
    .map(|o| o.final_amount)
    .sum();
  let pending_revenue: f64 = orders
    .iter()
    .filter(|o| o.status == OrderStatus::Pending)
    .map(|o| o.final_amount)
    .sum();
  let order_amount_sum: f64 = orders.iter().map(|o| o.final_amount).sum();

  let completed_profits: f64 = profits
    .iter()
    .filter(|p| p.status == ProfitStatus::Completed)
    .map(|p| p.profit_amount)
    .sum();
  let pending_profits: f64 = profits
    .iter()
    .filter(|p| p.status == ProfitStatus::Pending)
    .map(|p| p.profit_amount)
    .sum();

  Totals {
    total_products: products.len(),
    active_products: products.iter().filter(|p| p.is_active).count(),
    total_variants: products.iter().map(|p| p.variants.len()).sum(),
    total_orders: orders.len(),
    pending_orders: orders
      .iter()
      .filter(|o| o.status == OrderStatus::Pending)
      .count(),
    completed_orders: orders.iter().filter(|o| o.status.is_revenue()).count(),
    cancelled_orders: orders
      .iter()
      .filter(|o| o.status == OrderStatus::Cancelled)
      .count(),
    total_customers: snapshot.customers.len(),
    low_stock_products: products
      .iter()
      .filter(|p| is_low_stock(p, config.low_stock_threshold))
      .count(),
    out_of_stock_products: products
      .iter()
      .filter(|p| p.variants.iter().all(|v| v.stock_quantity <= 0))
      .count(),
    total_revenue,
    pending_revenue,
    average_order_value: if orders.is_empty() {
      0.0
    } else {
      order_amount_sum / orders.len() as f64
    },
    total_profit: completed_profits,
    pending_profit: pending_profits,
    inventory_value: products
      .iter()
      .flat_map(|p| &p.variants)
      .map(|v| v.stock_quantity as f64 * v.cost_price)
      .sum(),
    today_orders: orders.iter().filter(|o| same_day(o.created_at)).count(),
    today_revenue: orders
      .iter()
      .filter(|o| o.status.is_revenue() && same_day(o.created_at))
      .map(|o| o.final_amount)
      .sum(),
    month_revenue: orders
      .iter()
      .filter(|o| o.status.is_revenue() && same_month(o.created_at))
      .map(|o| o.final_amount)
      .sum(),
    month_profit: profits
      .iter()
      .filter(|p| {
        p.status == ProfitStatus::Completed && same_month(p.created_at)
      })
      .map(|p| p.profit_amount)
      .sum(),
  }
}

fn is_low_stock(product: &Product, threshold: i64) -> bool {
  product.variants.iter().any(|v| v.stock_quantity < threshold)
}

/// A product ranked by units sold across all order items.
#[derive(Debug, Clone)]
pub struct ProductSales {
  pub product: Product,
  pub units_sold: i64,
}

/// Rank products by quantity sold, descending.
pub fn top_products(snapshot: &Snapshot, limit: usize) -> Vec<ProductSales> {
  // Order items reference variants; map them back to their product.
  let variant_to_product: HashMap<&str, &str> = snapshot
    .products
    .iter()
    .flat_map(|p| p.variants.iter().map(move |v| (v.id.as_str(), p.id.as_str())))
    .collect();

  let mut sold: HashMap<&str, i64> = HashMap::new();
  for order in &snapshot.orders {
    for item in &order.items {
      let Some(variant_id) = item.variant_id.as_deref() else {
        continue;
      };
      if let Some(product_id) = variant_to_product.get(variant_id) {
        *sold.entry(product_id).or_insert(0) += item.quantity;
      }
    }
  }

  let mut ranked: Vec<ProductSales> = snapshot
    .products
    .iter()
    .filter_map(|p| {
      sold.get(p.id.as_str()).map(|&units_sold| ProductSales {
        product: p.clone(),
        units_sold,
      })
    })
    .collect();

  ranked.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
  ranked.truncate(limit);
  ranked
}

/// A customer ranked by total order value.
#[derive(Debug, Clone)]
pub struct CustomerSpend {
  pub customer: Customer,
  pub total: f64,
}

/// Rank customers by the value of their orders, descending.
pub fn top_customers(snapshot: &Snapshot, limit: usize) -> Vec<CustomerSpend> {
  let mut spent: HashMap<&str, f64> = HashMap::new();
  for order in &snapshot.orders {
    if let Some(customer_id) = order.customer_id.as_deref() {
      *spent.entry(customer_id).or_insert(0.0) += order.final_amount;
    }
  }

  let mut ranked: Vec<CustomerSpend> = snapshot
    .customers
    .iter()
    .filter_map(|c| {
      spent.get(c.id.as_str()).map(|&total| CustomerSpend {
        customer: c.clone(),
        total,
      })
    })
    .collect();

  ranked.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
  ranked.truncate(limit);
  ranked
}
