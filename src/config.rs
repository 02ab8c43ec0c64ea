//! Application configuration.
//!
//! Values load with priority: config.toml > .env / environment > defaults.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Get the full server bind address
pub fn server_bind_addr() -> String {
  format!("{}:{}", SERVER_ADDR, SERVER_PORT)
}

// ==================== Quiz Configuration ====================

/// Number of distractor choices per quiz question
pub const DISTRACTOR_COUNT: usize = 3;

/// Default number of questions when the request does not say
pub const DEFAULT_QUESTIONS: usize = 8;

/// Upper bound on questions per quiz request
pub const MAX_QUESTIONS: usize = 30;

// ==================== Meaning Batch Limits ====================

/// Max terms resolved per /admin/meanings process call
pub const MEANINGS_MAX_PER_REQUEST: usize = 120;

/// Time box per /admin/meanings process call
pub const MEANINGS_MAX_DURATION_MS: u64 = 15_000;

// ==================== Persistence ====================

/// Statements per storage batch when bulk-inserting occurrences
pub const DB_BATCH_SIZE: usize = 100;

// ==================== Translation Configuration ====================

/// Rolling window over which the provider character quota applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaPeriod {
  Day,
  Month,
}

impl QuotaPeriod {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "day" => Some(Self::Day),
      "month" => Some(Self::Month),
      _ => None,
    }
  }

  /// Key identifying the current period, UTC: `YYYY-MM-DD` or `YYYY-MM`
  pub fn key(&self, now: chrono::DateTime<chrono::Utc>) -> String {
    match self {
      Self::Day => now.format("%Y-%m-%d").to_string(),
      Self::Month => now.format("%Y-%m").to_string(),
    }
  }
}

#[derive(Debug, Clone)]
pub struct TranslationConfig {
  /// Provider selector: "google" or "static" (tests/offline). None disables
  /// meaning resolution entirely.
  pub provider: Option<String>,
  pub api_key: Option<String>,
  pub source_lang: String,
  pub target_lang: String,
  /// Hard character quota per period
  pub char_limit: i64,
  pub quota_period: QuotaPeriod,
  /// Provider list price, for /admin/meanings stats estimates
  pub cost_per_million_usd: f64,
  /// Count the example sentence toward the estimated cost of a term
  pub include_sentence_in_cost: bool,
}

impl Default for TranslationConfig {
  fn default() -> Self {
    Self {
      provider: None,
      api_key: None,
      source_lang: "en".to_string(),
      target_lang: "bn".to_string(),
      char_limit: 10_000,
      quota_period: QuotaPeriod::Day,
      cost_per_million_usd: 20.0,
      include_sentence_in_cost: false,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub database_path: PathBuf,
  /// Root directory for the filesystem object store (raw subtitle uploads)
  pub storage_dir: PathBuf,
  pub translation: TranslationConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      database_path: PathBuf::from("data/subvocab.db"),
      storage_dir: PathBuf::from("data/subtitles"),
      translation: TranslationConfig::default(),
    }
  }
}

// ==================== config.toml structure ====================

#[derive(Debug, Deserialize)]
struct ConfigFile {
  database: Option<DatabaseSection>,
  storage: Option<StorageSection>,
  translation: Option<TranslationSection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
  path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageSection {
  dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslationSection {
  provider: Option<String>,
  source_lang: Option<String>,
  target_lang: Option<String>,
  char_limit: Option<i64>,
  quota_period: Option<QuotaPeriod>,
  cost_per_million_usd: Option<f64>,
  include_sentence_in_cost: Option<bool>,
}

/// Load configuration with priority: config.toml > environment > defaults
pub fn load() -> AppConfig {
  let _ = dotenvy::dotenv();

  let mut config = AppConfig::default();

  if let Ok(path) = std::env::var("DATABASE_PATH") {
    config.database_path = PathBuf::from(path);
  }
  if let Ok(dir) = std::env::var("STORAGE_DIR") {
    config.storage_dir = PathBuf::from(dir);
  }
  if let Ok(provider) = std::env::var("TRANSLATION_PROVIDER") {
    config.translation.provider = Some(provider);
  }
  if let Ok(limit) = std::env::var("TRANSLATION_CHAR_LIMIT") {
    if let Ok(parsed) = limit.parse() {
      config.translation.char_limit = parsed;
    }
  }
  if let Ok(period) = std::env::var("TRANSLATION_QUOTA_PERIOD") {
    if let Some(parsed) = QuotaPeriod::from_str(&period) {
      config.translation.quota_period = parsed;
    }
  }
  config.translation.api_key = std::env::var("GOOGLE_TRANSLATE_API_KEY").ok();

  if let Ok(contents) = std::fs::read_to_string("config.toml") {
    match toml::from_str::<ConfigFile>(&contents) {
      Ok(file) => apply_config_file(&mut config, file),
      Err(e) => tracing::warn!("Ignoring malformed config.toml: {}", e),
    }
  }

  config
}

fn apply_config_file(config: &mut AppConfig, file: ConfigFile) {
  if let Some(db) = file.database {
    if let Some(path) = db.path {
      config.database_path = PathBuf::from(path);
    }
  }
  if let Some(storage) = file.storage {
    if let Some(dir) = storage.dir {
      config.storage_dir = PathBuf::from(dir);
    }
  }
  if let Some(tr) = file.translation {
    if tr.provider.is_some() {
      config.translation.provider = tr.provider;
    }
    if let Some(lang) = tr.source_lang {
      config.translation.source_lang = lang;
    }
    if let Some(lang) = tr.target_lang {
      config.translation.target_lang = lang;
    }
    if let Some(limit) = tr.char_limit {
      config.translation.char_limit = limit;
    }
    if let Some(period) = tr.quota_period {
      config.translation.quota_period = period;
    }
    if let Some(cost) = tr.cost_per_million_usd {
      config.translation.cost_per_million_usd = cost;
    }
    if let Some(flag) = tr.include_sentence_in_cost {
      config.translation.include_sentence_in_cost = flag;
    }
  }
}
