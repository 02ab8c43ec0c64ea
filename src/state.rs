//! Application state passed to all handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::nlp::SharedTokenizer;
use crate::storage::SharedObjectStore;
use crate::translate::TranslationProvider;

#[derive(Clone)]
pub struct AppState {
  pub db: DbPool,
  /// Raw subtitle object storage
  pub store: SharedObjectStore,
  pub tokenizer: SharedTokenizer,
  /// None when no translation provider is configured; meaning resolution
  /// then fails with NotConfigured instead of reaching the network.
  pub translator: Option<Arc<TranslationProvider>>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  pub fn new(
    db: DbPool,
    store: SharedObjectStore,
    tokenizer: SharedTokenizer,
    translator: Option<TranslationProvider>,
    config: AppConfig,
  ) -> Self {
    Self {
      db,
      store,
      tokenizer,
      translator: translator.map(Arc::new),
      config: Arc::new(config),
    }
  }
}
