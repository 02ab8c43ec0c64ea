use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subvocab::nlp::HeuristicTokenizer;
use subvocab::storage::FsObjectStore;
use subvocab::translate::TranslationProvider;
use subvocab::{config, db, handlers, state::AppState};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subvocab=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = config::load();

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");
  let store = Arc::new(FsObjectStore::new(&config.storage_dir));
  let tokenizer = Arc::new(HeuristicTokenizer::new());

  let translator = TranslationProvider::from_config(&config.translation);
  match &translator {
    Some(provider) => tracing::info!("translation provider: {}", provider.name()),
    None => tracing::warn!("no translation provider configured; meaning resolution disabled"),
  }

  let state = AppState::new(pool, store, tokenizer, translator, config);
  let app = handlers::build_router(state);

  let bind_addr = config::server_bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", config::SERVER_PORT);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
