//! Admin vocabulary corrections.
//!
//! `action: "update"` overrides a term's meaning for one episode and counts
//! as human sign-off, so corrupt flags are cleared. `action: "resolve"`
//! clears the corrupt flags without changing the meaning. `action:
//! "delete"` removes an extraction mistake from the episode.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::db::{self, vocabulary};
use crate::domain::VocabularyEntry;
use crate::error::{AppError, AppResult};
use crate::meaning::sanitize;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabAdminRequest {
  pub content_id: String,
  pub episode_id: String,
  pub term: String,
  pub action: String,
  #[serde(default)]
  pub meaning: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabAdminResponse {
  pub ok: bool,
  pub occurrences_changed: usize,
  /// Canonical entries for the term after the mutation, one per pos variant
  pub entries: Vec<VocabularyEntry>,
}

pub async fn correct_vocab(
  user: CurrentUser,
  State(state): State<AppState>,
  Json(request): Json<VocabAdminRequest>,
) -> AppResult<Json<VocabAdminResponse>> {
  user.require_admin()?;
  if request.content_id.trim().is_empty()
    || request.episode_id.trim().is_empty()
    || request.term.trim().is_empty()
  {
    return Err(AppError::Validation(
      "contentId, episodeId and term are required".into(),
    ));
  }
  // occurrence terms are stored lowercase
  let term = request.term.trim().to_lowercase();

  let conn = db::try_lock(&state.db)?;
  let changed = match request.action.as_str() {
    "update" => {
      let meaning = request
        .meaning
        .as_deref()
        .map(sanitize)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::Validation("update requires a non-empty meaning".into()))?;

      let changed = vocabulary::set_occurrence_meaning_override(
        &conn,
        &request.content_id,
        &request.episode_id,
        &term,
        Some(&meaning),
      )?;
      // A human-supplied meaning confirms the term is fine
      vocabulary::set_occurrence_corrupt_override(
        &conn,
        &request.content_id,
        &request.episode_id,
        &term,
        false,
      )?;
      vocabulary::clear_vocabulary_corrupt(&conn, &term)?;
      changed
    }
    "resolve" => {
      let changed = vocabulary::set_occurrence_corrupt_override(
        &conn,
        &request.content_id,
        &request.episode_id,
        &term,
        false,
      )?;
      vocabulary::clear_vocabulary_corrupt(&conn, &term)?;
      changed
    }
    "delete" => {
      vocabulary::delete_term_occurrences(&conn, &request.content_id, &request.episode_id, &term)?
    }
    other => {
      return Err(AppError::Validation(format!(
        "unknown action: {:?} (expected \"update\", \"resolve\" or \"delete\")",
        other
      )));
    }
  };

  if changed == 0 {
    return Err(AppError::NotFound(format!(
      "term {:?} has no occurrences in this episode",
      term
    )));
  }

  let entries = vocabulary::vocabulary_entries(&conn, &term)?;
  Ok(Json(VocabAdminResponse {
    ok: true,
    occurrences_changed: changed,
    entries,
  }))
}
