//! Meaning resolution: cache lookup, quota accounting, provider calls,
//! sanitization and corruption detection.
//!
//! Resolution order per term: translation cache first, then the configured
//! provider behind the atomic quota counter. Every resolved meaning also
//! lands in the canonical vocabulary table so quiz building never needs the
//! cache.

use chrono::Utc;
use unicode_normalization::UnicodeNormalization;

use crate::config::TranslationConfig;
use crate::db::vocabulary::{
  get_cached_translation, set_cached_translation, try_consume_quota, upsert_vocabulary_entry,
  MeaningCandidate, QuotaOutcome,
};
use crate::db::{self, DbPool};
use crate::domain::VocabExample;
use crate::error::{AppError, AppResult};
use crate::translate::{TranslateError, TranslationProvider};

/// Normalize a provider response for storage. NFC-normalizes, drops the BOM,
/// replacement characters and other control codes, collapses whitespace runs
/// and trims. Idempotent: sanitize(sanitize(x)) == sanitize(x).
pub fn sanitize(raw: &str) -> String {
  // control chars that are whitespace (tab, newline) collapse to spaces below
  let normalized: String = raw
    .nfc()
    .filter(|&c| {
      c != '\u{FEFF}' && c != '\u{FFFD}' && (!c.is_control() || c.is_whitespace())
    })
    .collect();

  let mut out = String::with_capacity(normalized.len());
  let mut pending_space = false;
  for c in normalized.chars() {
    if c.is_whitespace() {
      pending_space = !out.is_empty();
    } else {
      if pending_space {
        out.push(' ');
        pending_space = false;
      }
      out.push(c);
    }
  }
  out
}

/// A response is corrupt when the provider emitted replacement characters,
/// or when nothing alphabetic survives sanitization.
pub fn is_corrupt(raw: &str, sanitized: &str) -> bool {
  raw.contains('\u{FFFD}') || !sanitized.chars().any(|c| c.is_alphabetic())
}

/// Characters billed for one term. The provider bills per source character;
/// the example sentence only counts when configured to be sent along.
pub fn estimated_cost_chars(candidate: &MeaningCandidate, include_sentence: bool) -> i64 {
  let mut cost = candidate.term.chars().count() as i64;
  if include_sentence {
    cost += candidate.sentence.chars().count() as i64;
  }
  cost
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeaningSource {
  Cache,
  Api,
}

#[derive(Debug, Clone)]
pub struct MeaningOutcome {
  pub meaning: String,
  pub source: MeaningSource,
  pub is_corrupt: bool,
}

fn example_from_candidate(candidate: &MeaningCandidate) -> VocabExample {
  VocabExample {
    surface_term: candidate.term.clone(),
    lemma: candidate.lemma.clone(),
    pos: candidate.pos.clone(),
    sentence: candidate.sentence.clone(),
  }
}

fn provider_error(e: TranslateError) -> AppError {
  match e {
    TranslateError::MissingApiKey => AppError::NotConfigured("translation provider"),
    other => AppError::Provider(other.to_string()),
  }
}

/// Resolve one term's meaning.
///
/// Cache hits copy the cached meaning into the vocabulary table and never
/// touch the quota or the provider. Misses consume quota for the whole
/// estimated cost up front, call the provider, retry once on a corrupt
/// response, then persist both the cache row and the vocabulary entry.
///
/// The lock is never held across a provider call.
pub async fn resolve_meaning(
  pool: &DbPool,
  provider: &TranslationProvider,
  config: &TranslationConfig,
  candidate: &MeaningCandidate,
) -> AppResult<MeaningOutcome> {
  let example = example_from_candidate(candidate);
  let cache_key = example.cache_key();

  {
    let conn = db::try_lock(pool)?;
    if let Some(cached) = get_cached_translation(&conn, &cache_key)? {
      // sanitize is idempotent; this also repairs pre-sanitization rows
      let cached = sanitize(&cached);
      upsert_vocabulary_entry(&conn, &example, &cached, false)?;
      return Ok(MeaningOutcome {
        meaning: cached,
        source: MeaningSource::Cache,
        is_corrupt: false,
      });
    }
  }

  let cost = estimated_cost_chars(candidate, config.include_sentence_in_cost);
  let period_key = config.quota_period.key(Utc::now());
  {
    let conn = db::try_lock(pool)?;
    match try_consume_quota(&conn, &period_key, provider.name(), cost, config.char_limit)? {
      QuotaOutcome::Allowed => {}
      QuotaOutcome::Exceeded { used } => {
        return Err(AppError::QuotaExceeded {
          used,
          limit: config.char_limit,
        });
      }
    }
  }

  let raw = provider
    .translate(&example.surface_term)
    .await
    .map_err(provider_error)?;
  let mut meaning = sanitize(&raw);
  let mut corrupt = is_corrupt(&raw, &meaning);

  // One retry on a corrupt response; quota was already charged for the term
  if corrupt {
    if let Ok(retry_raw) = provider.translate(&example.surface_term).await {
      let retried = sanitize(&retry_raw);
      if !is_corrupt(&retry_raw, &retried) {
        meaning = retried;
        corrupt = false;
      }
    }
  }

  {
    let conn = db::try_lock(pool)?;
    set_cached_translation(&conn, &cache_key, &meaning)?;
    upsert_vocabulary_entry(&conn, &example, &meaning, corrupt)?;
  }

  Ok(MeaningOutcome {
    meaning,
    source: MeaningSource::Api,
    is_corrupt: corrupt,
  })
}
