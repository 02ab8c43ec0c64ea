//! HTTP surface.

pub mod meanings;
pub mod pack;
pub mod quiz;
pub mod upload;
pub mod vocab;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/subtitles/upload", post(upload::upload_subtitle))
    .route("/admin/meanings", post(meanings::meanings))
    .route("/admin/pack/delete", post(pack::delete_pack))
    .route("/admin/vocab", post(vocab::correct_vocab))
    .route("/vocab/quiz", post(quiz::start_quiz))
    .route("/vocab/quiz/answer", post(quiz::submit_answer))
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
