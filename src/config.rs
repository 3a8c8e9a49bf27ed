use chrono::FixedOffset;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub store: StoreConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub stats: StatsConfig,
  #[serde(default)]
  pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Base URL of the hosted table API, e.g. "https://acme.example.co".
  pub url: String,
  /// Postgres schema the table endpoints live in.
  #[serde(default = "default_schema")]
  pub schema: String,
}

fn default_schema() -> String {
  "public".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a cached snapshot is served without refetching.
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
  300
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

/// Which clock the today/this-month aggregate windows are cut against.
///
/// The remote store timestamps rows in UTC; dashboards in other timezones
/// opt into a fixed offset explicitly rather than inheriting whatever the
/// host's local zone happens to be.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
  #[default]
  Utc,
  /// Fixed offset from UTC in whole hours, e.g. 3 for UTC+3.
  #[serde(untagged)]
  OffsetHours(i32),
}

impl TimeBasis {
  pub fn fixed_offset(&self) -> FixedOffset {
    let hours = match self {
      TimeBasis::Utc => 0,
      TimeBasis::OffsetHours(h) => *h,
    };
    // Out-of-range offsets fall back to UTC rather than panicking.
    FixedOffset::east_opt(hours * 3600)
      .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is always valid"))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
  /// A product is low-stock when some variant's stock falls below this.
  #[serde(default = "default_low_stock")]
  pub low_stock_threshold: i64,
  #[serde(default)]
  pub time_basis: TimeBasis,
}

fn default_low_stock() -> i64 {
  5
}

impl Default for StatsConfig {
  fn default() -> Self {
    Self {
      low_stock_threshold: default_low_stock(),
      time_basis: TimeBasis::Utc,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Tables whose change events drive cache reconciliation.
  #[serde(default = "default_tables")]
  pub tables: Vec<String>,
}

fn default_true() -> bool {
  true
}

fn default_tables() -> Vec<String> {
  vec![
    "products".to_string(),
    "orders".to_string(),
    "customers".to_string(),
  ]
}

impl Default for RealtimeConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      tables: default_tables(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storeroom.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storeroom/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/storeroom/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("storeroom.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storeroom").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the store API key from environment variables.
  ///
  /// Checks STOREROOM_API_KEY first, then STORE_API_KEY as fallback.
  /// The key never lives in the config file.
  pub fn api_key() -> Result<String> {
    std::env::var("STOREROOM_API_KEY")
      .or_else(|_| std::env::var("STORE_API_KEY"))
      .map_err(|_| {
        eyre!(
          "Store API key not found. Set STOREROOM_API_KEY or STORE_API_KEY environment variable."
        )
      })
  }
}
