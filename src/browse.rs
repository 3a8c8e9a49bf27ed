//! List browsing helpers: text search, sorting and pagination over entity
//! slices. Pure data shaping shared by every list screen; no state, no
//! network.

use crate::store::{Customer, Order, Product, ProfitRecord};

/// Entities expose the fields free-text search runs over.
pub trait Searchable {
  fn search_text(&self) -> Vec<&str>;
}

impl Searchable for Product {
  fn search_text(&self) -> Vec<&str> {
    let mut fields = vec![self.name.as_str()];
    if let Some(category) = &self.category_name {
      fields.push(category);
    }
    fields
  }
}

impl Searchable for Order {
  fn search_text(&self) -> Vec<&str> {
    let mut fields = vec![self.order_number.as_str()];
    if let Some(name) = &self.customer_name {
      fields.push(name);
    }
    if let Some(phone) = &self.customer_phone {
      fields.push(phone);
    }
    fields
  }
}

impl Searchable for Customer {
  fn search_text(&self) -> Vec<&str> {
    let mut fields = vec![self.name.as_str()];
    for field in [&self.phone, &self.email, &self.address] {
      if let Some(value) = field {
        fields.push(value);
      }
    }
    fields
  }
}

impl Searchable for ProfitRecord {
  fn search_text(&self) -> Vec<&str> {
    let mut fields = Vec::new();
    if let Some(order_number) = &self.order_number {
      fields.push(order_number.as_str());
    }
    if let Some(employee) = &self.employee_name {
      fields.push(employee);
    }
    fields
  }
}

/// Keep items whose searchable text contains the query, case-insensitive.
/// An empty query keeps everything.
pub fn search<T: Searchable>(items: Vec<T>, query: &str) -> Vec<T> {
  let query = query.trim().to_lowercase();
  if query.is_empty() {
    return items;
  }
  items
    .into_iter()
    .filter(|item| {
      item
        .search_text()
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    })
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
  Ascending,
  Descending,
}

/// Sort items by an extracted key.
pub fn sort_by<T, K: Ord>(items: &mut [T], order: SortOrder, key: impl Fn(&T) -> K) {
  items.sort_by(|a, b| {
    let ordering = key(a).cmp(&key(b));
    match order {
      SortOrder::Ascending => ordering,
      SortOrder::Descending => ordering.reverse(),
    }
  });
}

/// One page of a longer list, with enough bookkeeping for pager widgets.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// 1-based page number actually served (requests are clamped).
  pub page: usize,
  pub total_pages: usize,
  pub total_items: usize,
  pub per_page: usize,
}

/// Slice one page out of a list. Page numbers are 1-based and clamped to
/// the valid range; `per_page` of zero falls back to 20.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
  let per_page = if per_page == 0 { 20 } else { per_page };
  let total_items = items.len();
  let total_pages = total_items.div_ceil(per_page).max(1);
  let page = page.clamp(1, total_pages);

  let start = (page - 1) * per_page;
  let items: Vec<T> = items
    .into_iter()
    .skip(start)
    .take(per_page)
    .collect();

  Page {
    items,
    page,
    total_pages,
    total_items,
    per_page,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::OrderStatus;
  use crate::testutil::{customer, order};

  #[test]
  fn search_matches_any_field_case_insensitively() {
    let mut with_customer = order("1", OrderStatus::Pending, 10.0);
    with_customer.customer_name = Some("Ada Lovelace".to_string());
    let plain = order("2", OrderStatus::Pending, 10.0);

    let found = search(vec![with_customer.clone(), plain.clone()], "lovelace");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "1");

    // Order number matches too.
    let found = search(vec![with_customer, plain], "ord-2");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "2");
  }

  #[test]
  fn empty_query_keeps_everything() {
    let customers = vec![customer("c1", "Ada"), customer("c2", "Grace")];
    assert_eq!(search(customers, "  ").len(), 2);
  }

  #[test]
  fn sort_by_orders_both_directions() {
    let mut items = vec![
      customer("c2", "Grace"),
      customer("c1", "Ada"),
      customer("c3", "Linus"),
    ];

    sort_by(&mut items, SortOrder::Ascending, |c| c.name.clone());
    assert_eq!(items[0].name, "Ada");

    sort_by(&mut items, SortOrder::Descending, |c| c.name.clone());
    assert_eq!(items[0].name, "Linus");
  }

  #[test]
  fn paginate_slices_and_clamps() {
    let items: Vec<i32> = (1..=45).collect();

    let page = paginate(items.clone(), 2, 20);
    assert_eq!(page.items.first(), Some(&21));
    assert_eq!(page.items.len(), 20);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 45);

    // Past-the-end requests serve the last page.
    let page = paginate(items.clone(), 99, 20);
    assert_eq!(page.page, 3);
    assert_eq!(page.items.len(), 5);

    // Page zero clamps up to the first page.
    let page = paginate(items, 0, 20);
    assert_eq!(page.page, 1);
  }

  #[test]
  fn paginate_handles_empty_lists() {
    let page = paginate(Vec::<i32>::new(), 1, 20);
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.page, 1);
  }
}
