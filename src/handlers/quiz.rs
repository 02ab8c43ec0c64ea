//! Quiz endpoints: question set generation and answer submission.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::db::vocabulary::{get_answer_row, quiz_candidates, repeat_counts};
use crate::db::{self, progress};
use crate::error::{AppError, AppResult};
use crate::quiz::{build_candidates, build_questions, resolve_question_count, sample_questions, QuizQuestion};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
  pub content_id: String,
  pub episode_id: String,
  pub count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
  pub questions: Vec<QuizQuestion>,
  pub total_available: usize,
}

pub async fn start_quiz(
  user: CurrentUser,
  State(state): State<AppState>,
  Json(request): Json<QuizRequest>,
) -> AppResult<Json<QuizResponse>> {
  if request.content_id.trim().is_empty() || request.episode_id.trim().is_empty() {
    return Err(AppError::Validation("contentId and episodeId are required".into()));
  }

  let (rows, repeats, weak, learned) = {
    let conn = db::try_lock(&state.db)?;
    (
      quiz_candidates(&conn, &request.content_id, &request.episode_id)?,
      repeat_counts(&conn, &request.content_id, &request.episode_id)?,
      progress::weak_terms(&conn, &user.user_id, &request.content_id, &request.episode_id)?,
      progress::learned_lemmas(&conn, &user.user_id)?,
    )
  };

  let candidates = build_candidates(rows, &repeats, &weak, &learned);
  let total_available = candidates.len();
  let n = resolve_question_count(request.count);

  let mut rng = rand::rng();
  let picked = sample_questions(&mut rng, candidates.clone(), n);
  let questions = build_questions(&mut rng, &picked, &candidates);

  Ok(Json(QuizResponse {
    questions,
    total_available,
  }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
  pub content_id: String,
  pub episode_id: String,
  pub term: String,
  pub selected_meaning: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
  pub correct: bool,
  pub correct_meaning: String,
  pub status_applied: String,
  pub seen_count: i64,
}

pub async fn submit_answer(
  user: CurrentUser,
  State(state): State<AppState>,
  Json(request): Json<AnswerRequest>,
) -> AppResult<Json<AnswerResponse>> {
  if request.content_id.trim().is_empty()
    || request.episode_id.trim().is_empty()
    || request.term.trim().is_empty()
  {
    return Err(AppError::Validation(
      "contentId, episodeId and term are required".into(),
    ));
  }

  let conn = db::try_lock(&state.db)?;
  let row = get_answer_row(&conn, &request.content_id, &request.episode_id, &request.term)?
    .ok_or_else(|| AppError::NotFound(format!("term not found in episode: {}", request.term)))?;

  let correct_meaning = row
    .meaning
    .as_deref()
    .map(str::trim)
    .filter(|m| !m.is_empty())
    .ok_or_else(|| AppError::NotFound(format!("no meaning recorded for term: {}", request.term)))?
    .to_string();

  let correct = request.selected_meaning.trim() == correct_meaning;
  let status = progress::record_answer(
    &conn,
    &user.user_id,
    &request.content_id,
    &request.episode_id,
    &request.term,
    &row.lemma,
    correct,
  )?;

  let seen = progress::get_quiz_stat(
    &conn,
    &user.user_id,
    &request.content_id,
    &request.episode_id,
    &request.term,
  )?
  .map(|stat| stat.seen_count)
  .unwrap_or(0);

  Ok(Json(AnswerResponse {
    correct,
    correct_meaning,
    status_applied: status.as_str().to_string(),
    seen_count: seen,
  }))
}
