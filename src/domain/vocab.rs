use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an uploaded subtitle file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
  Queued,
  Processed,
  Failed,
}

impl ProcessingStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "queued" => Some(Self::Queued),
      "processed" => Some(Self::Processed),
      "failed" => Some(Self::Failed),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Queued => "queued",
      Self::Processed => "processed",
      Self::Failed => "failed",
    }
  }
}

/// One subtitle upload per (content_id, episode_id); re-upload replaces it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleFile {
  pub content_id: String,
  pub episode_id: String,
  pub storage_key: String,
  pub file_name: String,
  pub file_type: String,
  pub status: ProcessingStatus,
  pub uploaded_at: DateTime<Utc>,
  pub processed_at: Option<DateTime<Utc>>,
  pub sentence_count: i64,
  pub term_count: i64,
}

/// One concrete appearance of a term in one sentence of one episode.
/// Term and lemma are always lowercase; sentence_index is monotonic
/// within an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabOccurrence {
  pub term: String,
  pub lemma: String,
  pub pos: String,
  pub sentence: String,
  pub sentence_index: usize,
}

/// First-seen representative sentence for a distinct (term, pos) pair,
/// used to seed meaning resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabExample {
  pub surface_term: String,
  pub lemma: String,
  pub pos: String,
  pub sentence: String,
}

impl VocabExample {
  /// Cache key shared with the translation cache: `term::pos`, lowercase
  pub fn cache_key(&self) -> String {
    build_cache_key(&self.surface_term, &self.pos)
  }
}

pub fn build_cache_key(surface_term: &str, pos: &str) -> String {
  format!("{}::{}", surface_term.to_lowercase(), pos.to_lowercase())
}

/// Canonical cross-episode vocabulary entry, one per (surface_term, pos)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
  pub surface_term: String,
  pub lemma: String,
  pub pos: String,
  pub example_sentence: String,
  pub meaning: Option<String>,
  pub is_corrupt: bool,
}
