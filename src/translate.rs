//! Translation providers.
//!
//! One enum-dispatched provider interface; configuration picks the concrete
//! implementation at startup. `Google` talks to the Cloud Translation v2
//! endpoint; `Static` is a deterministic in-memory provider for tests and
//! offline development.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::config::TranslationConfig;

#[derive(Debug, Error)]
pub enum TranslateError {
  #[error("translation API key is not set")]
  MissingApiKey,

  #[error("translation request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("translation request failed with status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("translation response did not include translated text")]
  MalformedResponse,
}

pub enum TranslationProvider {
  Google(GoogleTranslator),
  Static(StaticTranslator),
}

impl TranslationProvider {
  /// Build the configured provider, if any
  pub fn from_config(config: &TranslationConfig) -> Option<Self> {
    match config.provider.as_deref() {
      Some("google") => Some(Self::Google(GoogleTranslator::new(
        config.api_key.clone(),
        &config.source_lang,
        &config.target_lang,
      ))),
      Some("static") => Some(Self::Static(StaticTranslator::default())),
      _ => None,
    }
  }

  /// Name used as the usage-counter key, stable across restarts
  pub fn name(&self) -> &'static str {
    match self {
      Self::Google(_) => "google-translate",
      Self::Static(_) => "static",
    }
  }

  pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
    match self {
      Self::Google(google) => google.translate(text).await,
      Self::Static(fixed) => fixed.translate(text),
    }
  }
}

// ==================== Google Cloud Translation ====================

const GOOGLE_TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

pub struct GoogleTranslator {
  client: reqwest::Client,
  api_key: Option<String>,
  source_lang: String,
  target_lang: String,
}

impl GoogleTranslator {
  pub fn new(api_key: Option<String>, source_lang: &str, target_lang: &str) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_key,
      source_lang: source_lang.to_string(),
      target_lang: target_lang.to_string(),
    }
  }

  pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
    let api_key = self
      .api_key
      .as_deref()
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .ok_or(TranslateError::MissingApiKey)?;

    let url = format!("{}?key={}", GOOGLE_TRANSLATE_URL, api_key);
    let response = self
      .client
      .post(&url)
      .form(&[
        ("q", text),
        ("source", self.source_lang.as_str()),
        ("target", self.target_lang.as_str()),
        ("format", "text"),
      ])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(TranslateError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let payload: Value = response.json().await?;
    if let Some(message) = payload["error"]["message"].as_str() {
      return Err(TranslateError::Status {
        status: status.as_u16(),
        body: message.to_string(),
      });
    }

    let translated = payload["data"]["translations"][0]["translatedText"]
      .as_str()
      .filter(|t| !t.is_empty())
      .ok_or(TranslateError::MalformedResponse)?;

    // The API escapes entities even with format=text
    Ok(html_escape::decode_html_entities(translated).to_string())
  }
}

// ==================== Static provider ====================

/// Deterministic lookup-table provider. Counts calls so tests can assert
/// the cache-hit path never reaches the provider.
#[derive(Default)]
pub struct StaticTranslator {
  entries: HashMap<String, String>,
  calls: AtomicU64,
}

impl StaticTranslator {
  pub fn with_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
    Self {
      entries: entries.into_iter().collect(),
      calls: AtomicU64::new(0),
    }
  }

  pub fn calls(&self) -> u64 {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn translate(&self, text: &str) -> Result<String, TranslateError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    match self.entries.get(text) {
      Some(meaning) => Ok(meaning.clone()),
      None => Ok(format!("অর্থ:{}", text)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::TranslationConfig;

  #[test]
  fn test_from_config_selects_provider() {
    let mut config = TranslationConfig::default();
    assert!(TranslationProvider::from_config(&config).is_none());

    config.provider = Some("static".to_string());
    let provider = TranslationProvider::from_config(&config).unwrap();
    assert_eq!(provider.name(), "static");

    config.provider = Some("google".to_string());
    let provider = TranslationProvider::from_config(&config).unwrap();
    assert_eq!(provider.name(), "google-translate");
  }

  #[tokio::test]
  async fn test_google_without_key_fails_before_any_request() {
    let google = GoogleTranslator::new(None, "en", "bn");
    assert!(matches!(
      google.translate("hello").await,
      Err(TranslateError::MissingApiKey)
    ));

    let blank = GoogleTranslator::new(Some("   ".into()), "en", "bn");
    assert!(matches!(
      blank.translate("hello").await,
      Err(TranslateError::MissingApiKey)
    ));
  }

  #[test]
  fn test_static_provider_counts_calls() {
    let fixed = StaticTranslator::with_entries([("cat".to_string(), "বিড়াল".to_string())]);
    assert_eq!(fixed.translate("cat").unwrap(), "বিড়াল");
    assert_eq!(fixed.translate("dog").unwrap(), "অর্থ:dog");
    assert_eq!(fixed.calls(), 2);
  }
}
