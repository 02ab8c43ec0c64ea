//! Admin pack deletion: removes an episode's occurrences, file row and the
//! stored raw subtitle object.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::db::{self, subtitles, LogOnError};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePackRequest {
  pub content_id: String,
  pub episode_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePackResponse {
  pub ok: bool,
  pub deleted: bool,
}

pub async fn delete_pack(
  user: CurrentUser,
  State(state): State<AppState>,
  Json(request): Json<DeletePackRequest>,
) -> AppResult<Json<DeletePackResponse>> {
  user.require_admin()?;
  if request.content_id.trim().is_empty() || request.episode_id.trim().is_empty() {
    return Err(AppError::Validation("contentId and episodeId are required".into()));
  }

  let storage_key = {
    let conn = db::try_lock(&state.db)?;
    subtitles::delete_pack(&conn, &request.content_id, &request.episode_id)?
  };

  let deleted = storage_key.is_some();
  if let Some(key) = storage_key {
    // The rows are already gone; a stale object is only wasted space
    state.store.delete(&key).log_warn("deleting stored subtitle object");
  }

  Ok(Json(DeletePackResponse { ok: true, deleted }))
}
