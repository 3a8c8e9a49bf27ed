//! Role-based read scoping.
//!
//! Every consumer-facing read is filtered exactly once, here, at the
//! cache-read boundary. Screens never re-implement visibility rules.

use crate::store::{Customer, Order, Product, ProfitRecord};

/// Dashboard roles as stored on the remote profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Admin,
  DepartmentManager,
  Employee,
  SalesEmployee,
  WarehouseEmployee,
  Cashier,
}

impl Role {
  /// Parse the remote string representation. Unknown roles get the most
  /// restricted scope.
  pub fn parse(s: &str) -> Self {
    match s {
      "admin" => Self::Admin,
      "department_manager" => Self::DepartmentManager,
      "sales_employee" => Self::SalesEmployee,
      "warehouse_employee" => Self::WarehouseEmployee,
      "cashier" => Self::Cashier,
      _ => Self::Employee,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::DepartmentManager => "department_manager",
      Self::Employee => "employee",
      Self::SalesEmployee => "sales_employee",
      Self::WarehouseEmployee => "warehouse_employee",
      Self::Cashier => "cashier",
    }
  }

  pub fn has(&self, permission: Permission) -> bool {
    use Permission::*;
    match self {
      Self::Admin => true,
      Self::DepartmentManager => matches!(
        permission,
        ManageProducts | ManageOrders | ManageInventory | ViewReports
      ),
      Self::SalesEmployee | Self::Cashier => matches!(permission, ManageOrders),
      Self::WarehouseEmployee => matches!(permission, ManageInventory),
      Self::Employee => false,
    }
  }
}

/// Actions a role may perform beyond reading its own rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  ManageProducts,
  ManageOrders,
  ManageInventory,
  ViewReports,
  ManageEmployees,
  ViewFinances,
}

/// The identity a read accessor is scoped by.
#[derive(Debug, Clone)]
pub struct Viewer {
  pub user_id: String,
  pub role: Role,
}

impl Viewer {
  pub fn new(user_id: impl Into<String>, role: Role) -> Self {
    Self {
      user_id: user_id.into(),
      role,
    }
  }

  /// A viewer with the unrestricted scope.
  pub fn admin(user_id: impl Into<String>) -> Self {
    Self::new(user_id, Role::Admin)
  }

  /// Admins see every row; everyone else sees rows they created or were
  /// assigned.
  pub fn can_view_all(&self) -> bool {
    self.role == Role::Admin
  }

  pub fn has(&self, permission: Permission) -> bool {
    self.role.has(permission)
  }
}

fn owned_by(created_by: &Option<String>, viewer: &Viewer) -> bool {
  created_by.as_deref() == Some(viewer.user_id.as_str())
}

pub fn scope_products(products: &[Product], viewer: &Viewer) -> Vec<Product> {
  if viewer.can_view_all() {
    return products.to_vec();
  }
  products
    .iter()
    .filter(|p| owned_by(&p.created_by, viewer))
    .cloned()
    .collect()
}

pub fn scope_orders(orders: &[Order], viewer: &Viewer) -> Vec<Order> {
  if viewer.can_view_all() {
    return orders.to_vec();
  }
  orders
    .iter()
    .filter(|o| {
      owned_by(&o.created_by, viewer)
        || o.assigned_to.as_deref() == Some(viewer.user_id.as_str())
    })
    .cloned()
    .collect()
}

pub fn scope_customers(customers: &[Customer], viewer: &Viewer) -> Vec<Customer> {
  if viewer.can_view_all() {
    return customers.to_vec();
  }
  customers
    .iter()
    .filter(|c| owned_by(&c.created_by, viewer))
    .cloned()
    .collect()
}

pub fn scope_profits(profits: &[ProfitRecord], viewer: &Viewer) -> Vec<ProfitRecord> {
  if viewer.can_view_all() {
    return profits.to_vec();
  }
  profits
    .iter()
    .filter(|p| p.employee_id.as_deref() == Some(viewer.user_id.as_str()))
    .cloned()
    .collect()
}
