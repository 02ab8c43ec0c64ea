//! Admin meaning-resolution endpoint.
//!
//! `action: "stats"` reports how much of the episode's vocabulary already
//! has a meaning and what resolving the rest would cost. `action:
//! "process"` resolves missing meanings until the batch is done or a count
//! or time box is hit; callers poll it until `completed` is true. A quota
//! refusal ends the batch early; per-term provider failures are counted and
//! skipped so one bad term never wedges the episode.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::auth::CurrentUser;
use crate::config::{MEANINGS_MAX_DURATION_MS, MEANINGS_MAX_PER_REQUEST};
use crate::db;
use crate::db::vocabulary::meaning_candidates;
use crate::error::{AppError, AppResult};
use crate::meaning::{estimated_cost_chars, resolve_meaning, MeaningSource};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeaningsRequest {
  pub content_id: String,
  pub episode_id: String,
  pub action: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeaningsResponse {
  pub total_terms: usize,
  pub existing_count: usize,
  pub missing_count: usize,
  pub estimated_chars: i64,
  pub estimated_cost_usd: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub processed_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skipped_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failed_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub remaining_count: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed: Option<bool>,
}

pub async fn meanings(
  user: CurrentUser,
  State(state): State<AppState>,
  Json(request): Json<MeaningsRequest>,
) -> AppResult<Json<MeaningsResponse>> {
  user.require_admin()?;
  if request.content_id.trim().is_empty() || request.episode_id.trim().is_empty() {
    return Err(AppError::Validation("contentId and episodeId are required".into()));
  }

  let candidates = {
    let conn = db::try_lock(&state.db)?;
    meaning_candidates(&conn, &request.content_id, &request.episode_id)?
  };

  let translation = &state.config.translation;
  let missing: Vec<_> = candidates.iter().filter(|c| !c.has_meaning()).cloned().collect();
  let estimated_chars: i64 = missing
    .iter()
    .map(|c| estimated_cost_chars(c, translation.include_sentence_in_cost))
    .sum();

  let mut response = MeaningsResponse {
    total_terms: candidates.len(),
    existing_count: candidates.len() - missing.len(),
    missing_count: missing.len(),
    estimated_chars,
    estimated_cost_usd: estimated_chars as f64 / 1_000_000.0 * translation.cost_per_million_usd,
    processed_count: None,
    skipped_count: None,
    failed_count: None,
    remaining_count: None,
    completed: None,
  };

  match request.action.as_str() {
    "stats" => Ok(Json(response)),
    "process" => {
      let provider = state
        .translator
        .as_deref()
        .ok_or(AppError::NotConfigured("translation provider"))?;

      let deadline = Instant::now() + Duration::from_millis(MEANINGS_MAX_DURATION_MS);
      let mut processed = 0usize;
      let mut skipped = 0usize;
      let mut failed = 0usize;
      let mut attempted = 0usize;
      let mut quota_hit = false;

      for candidate in &missing {
        if attempted >= MEANINGS_MAX_PER_REQUEST || Instant::now() >= deadline {
          break;
        }
        attempted += 1;

        match resolve_meaning(&state.db, provider, translation, candidate).await {
          Ok(outcome) => match outcome.source {
            MeaningSource::Api => processed += 1,
            MeaningSource::Cache => skipped += 1,
          },
          Err(AppError::QuotaExceeded { used, limit }) => {
            tracing::warn!(used, limit, "translation quota exhausted, stopping batch");
            quota_hit = true;
            break;
          }
          Err(e) => {
            tracing::warn!(term = %candidate.term, "meaning resolution failed: {}", e);
            failed += 1;
          }
        }
      }

      let remaining = missing.len() - processed - skipped;
      response.processed_count = Some(processed);
      response.skipped_count = Some(skipped);
      response.failed_count = Some(failed);
      response.remaining_count = Some(remaining);
      response.completed = Some(remaining == 0 && !quota_hit);
      Ok(Json(response))
    }
    other => Err(AppError::Validation(format!(
      "unknown action: {:?} (expected \"stats\" or \"process\")",
      other
    ))),
  }
}
