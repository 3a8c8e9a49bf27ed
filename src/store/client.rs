use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::api_types::{
  CategoryRow, ColorRow, CustomerRow, DepartmentRow, OrderRow, ProductRow, ProfileRow, ProfitRow,
  SizeRow,
};
use super::types::{
  Category, Color, Customer, CustomerPatch, Department, NewCustomer, NewOrder, NewProduct, Order,
  OrderPatch, Product, Profile, ProductPatch, ProfitRecord, Size,
};
use super::DataSource;

/// Column lists for reads with embedded relations. Writes that return a
/// representation reuse the same list so inserted rows come back in the
/// shape the snapshot holds.
const CATEGORY_COLUMNS: &str = "*,departments(name)";
const PRODUCT_COLUMNS: &str =
  "*,categories(name,departments(name)),product_variants(*,colors(name,hex_code),sizes(name,display_order))";
const ORDER_COLUMNS: &str = "*,order_items(*,product_variants(products(name))),customers(name,phone)";
const PROFIT_COLUMNS: &str = "*,orders(order_number),profiles(full_name)";

/// HTTP client for the hosted table API.
///
/// Reads are table-scoped GETs with `select`/`order`/filter query
/// parameters and embedded-relation expansion; writes are single-row
/// PATCH/POST calls. Authentication is the API key, sent both as the
/// `apikey` header and as a bearer token.
#[derive(Clone)]
pub struct Client {
  http: reqwest::Client,
  base: Url,
  api_key: String,
  schema: String,
}

impl Client {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::api_key()?;
    Self::with_key(config, api_key)
  }

  /// Build a client with an explicit key instead of reading the environment.
  pub fn with_key(config: &Config, api_key: String) -> Result<Self> {
    let base = Url::parse(&config.store.url)
      .map_err(|e| eyre!("Invalid store URL {}: {}", config.store.url, e))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      api_key,
      schema: config.store.schema.clone(),
    })
  }

  /// The websocket endpoint of the change-notification channel.
  pub fn realtime_url(&self) -> Result<Url> {
    let mut url = self
      .base
      .join("realtime/v1/websocket")
      .map_err(|e| eyre!("Failed to build realtime URL: {}", e))?;

    let scheme = match url.scheme() {
      "https" => "wss",
      "http" => "ws",
      other => return Err(eyre!("Unsupported store URL scheme: {}", other)),
    };
    url
      .set_scheme(scheme)
      .map_err(|_| eyre!("Failed to set websocket scheme"))?;

    url
      .query_pairs_mut()
      .append_pair("apikey", &self.api_key)
      .append_pair("vsn", "1.0.0");

    Ok(url)
  }

  fn table_url(&self, table: &str) -> Result<Url> {
    self
      .base
      .join(&format!("rest/v1/{}", table))
      .map_err(|e| eyre!("Failed to build URL for table {}: {}", table, e))
  }

  async fn check(response: reqwest::Response, table: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(eyre!("{} request failed with {}: {}", table, status, body))
  }

  /// Fetch rows from one table with the given column selection, ordering
  /// and filters (filter values use the API's `op.value` syntax).
  async fn select<T: DeserializeOwned>(
    &self,
    table: &str,
    columns: &str,
    order: Option<&str>,
    filters: &[(&str, &str)],
  ) -> Result<Vec<T>> {
    let mut url = self.table_url(table)?;
    {
      let mut pairs = url.query_pairs_mut();
      pairs.append_pair("select", columns);
      if let Some(order) = order {
        pairs.append_pair("order", order);
      }
      for (column, expr) in filters {
        pairs.append_pair(column, expr);
      }
    }

    debug!(table, "fetching rows");

    let response = self
      .http
      .get(url)
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .header("Accept-Profile", &self.schema)
      .send()
      .await
      .map_err(|e| eyre!("Failed to query {}: {}", table, e))?;

    let response = Self::check(response, table).await?;

    response
      .json::<Vec<T>>()
      .await
      .map_err(|e| eyre!("Failed to parse {} rows: {}", table, e))
  }

  /// Apply a partial update to a single row by id.
  async fn patch_row<B: Serialize + ?Sized>(&self, table: &str, id: &str, body: &B) -> Result<()> {
    let mut url = self.table_url(table)?;
    url
      .query_pairs_mut()
      .append_pair("id", &format!("eq.{}", id));

    debug!(table, id, "updating row");

    let response = self
      .http
      .patch(url)
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .header("Content-Profile", &self.schema)
      .header("Prefer", "return=minimal")
      .json(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to update {}: {}", table, e))?;

    Self::check(response, table).await.map(|_| ())
  }

  /// Insert a single row and return the created row expanded with the
  /// given column selection.
  async fn insert_row<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    table: &str,
    columns: &str,
    body: &B,
  ) -> Result<T> {
    let mut url = self.table_url(table)?;
    url.query_pairs_mut().append_pair("select", columns);

    debug!(table, "inserting row");

    let response = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .bearer_auth(&self.api_key)
      .header("Content-Profile", &self.schema)
      .header("Prefer", "return=representation")
      .json(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to insert into {}: {}", table, e))?;

    let response = Self::check(response, table).await?;

    let mut rows: Vec<T> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse inserted {} row: {}", table, e))?;

    rows
      .pop()
      .ok_or_else(|| eyre!("{} insert returned no row", table))
  }

  /// Look up one user profile, for scoping reads by the viewer's role.
  pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
    let rows: Vec<ProfileRow> = self
      .select("profiles", "*", None, &[("id", &format!("eq.{}", user_id))])
      .await?;

    Ok(rows.into_iter().next().map(ProfileRow::into_domain))
  }
}

#[async_trait]
impl DataSource for Client {
  async fn departments(&self) -> Result<Vec<Department>> {
    let rows: Vec<DepartmentRow> = self
      .select("departments", "*", Some("display_order.asc"), &[])
      .await?;
    Ok(rows.into_iter().map(DepartmentRow::into_domain).collect())
  }

  async fn categories(&self) -> Result<Vec<Category>> {
    let rows: Vec<CategoryRow> = self
      .select("categories", CATEGORY_COLUMNS, Some("display_order.asc"), &[])
      .await?;
    Ok(rows.into_iter().map(CategoryRow::into_domain).collect())
  }

  async fn colors(&self) -> Result<Vec<Color>> {
    let rows: Vec<ColorRow> = self
      .select("colors", "*", Some("display_order.asc"), &[])
      .await?;
    Ok(rows.into_iter().map(ColorRow::into_domain).collect())
  }

  async fn sizes(&self) -> Result<Vec<Size>> {
    let rows: Vec<SizeRow> = self
      .select("sizes", "*", Some("display_order.asc"), &[])
      .await?;
    Ok(rows.into_iter().map(SizeRow::into_domain).collect())
  }

  async fn products(&self) -> Result<Vec<Product>> {
    let rows: Vec<ProductRow> = self
      .select("products", PRODUCT_COLUMNS, None, &[("is_active", "eq.true")])
      .await?;
    Ok(rows.into_iter().map(ProductRow::into_domain).collect())
  }

  async fn customers(&self) -> Result<Vec<Customer>> {
    let rows: Vec<CustomerRow> = self
      .select("customers", "*", Some("created_at.desc"), &[])
      .await?;
    Ok(rows.into_iter().map(CustomerRow::into_domain).collect())
  }

  async fn orders(&self) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = self
      .select("orders", ORDER_COLUMNS, Some("created_at.desc"), &[])
      .await?;
    Ok(rows.into_iter().map(OrderRow::into_domain).collect())
  }

  async fn profits(&self) -> Result<Vec<ProfitRecord>> {
    let rows: Vec<ProfitRow> = self.select("profits", PROFIT_COLUMNS, None, &[]).await?;
    Ok(rows.into_iter().map(ProfitRow::into_domain).collect())
  }

  async fn insert_product(&self, new: &NewProduct) -> Result<Product> {
    let row: ProductRow = self.insert_row("products", PRODUCT_COLUMNS, new).await?;
    Ok(row.into_domain())
  }

  async fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<()> {
    self.patch_row("products", id, patch).await
  }

  async fn insert_order(&self, new: &NewOrder) -> Result<Order> {
    let row: OrderRow = self.insert_row("orders", ORDER_COLUMNS, new).await?;
    Ok(row.into_domain())
  }

  async fn update_order(&self, id: &str, patch: &OrderPatch) -> Result<()> {
    self.patch_row("orders", id, patch).await
  }

  async fn insert_customer(&self, new: &NewCustomer) -> Result<Customer> {
    let row: CustomerRow = self.insert_row("customers", "*", new).await?;
    Ok(row.into_domain())
  }

  async fn update_customer(&self, id: &str, patch: &CustomerPatch) -> Result<()> {
    self.patch_row("customers", id, patch).await
  }

  async fn update_variant_stock(
    &self,
    variant_id: &str,
    stock_quantity: i64,
    reserved_quantity: i64,
  ) -> Result<()> {
    #[derive(Serialize)]
    struct StockPatch {
      stock_quantity: i64,
      reserved_quantity: i64,
    }

    self
      .patch_row(
        "product_variants",
        variant_id,
        &StockPatch {
          stock_quantity,
          reserved_quantity,
        },
      )
      .await
  }
}
