//! Per-user learning state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mastery status for a lemma (global) or a term (episode-scoped).
/// "New" is implicit absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnStatus {
  Learned,
  Weak,
}

impl LearnStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "learned" => Some(Self::Learned),
      "weak" => Some(Self::Weak),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Learned => "learned",
      Self::Weak => "weak",
    }
  }
}

/// Per-user, per-episode quiz history for one term
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizStat {
  pub term: String,
  pub seen_count: i64,
  pub correct_count: i64,
  pub wrong_count: i64,
  pub last_seen_at: DateTime<Utc>,
}
