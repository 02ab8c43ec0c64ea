//! Subtitle ingestion pipeline.
//!
//! One run per (content_id, episode_id): fetch the raw object, split
//! sentences, extract vocabulary, replace the episode's occurrence rows.
//! Every write is an upsert or a clear-then-insert, so re-running the same
//! file (upload retry, queue redelivery) converges on the same state.

use crate::db::{self, subtitles, DbPool, LogOnError};
use crate::domain::{ProcessingStatus, SubtitleFile};
use crate::error::{AppError, AppResult};
use crate::nlp::Tokenizer;
use crate::storage::ObjectStore;
use crate::subtitles::{extract_vocabulary, sentences_from_subtitle_text};

#[derive(Debug, Clone, Copy)]
pub struct PipelineReport {
  pub sentence_count: usize,
  pub term_count: usize,
  pub occurrence_count: usize,
}

/// Process one stored subtitle file. On success the file row is marked
/// processed with its counts; on any failure it is marked failed and the
/// error propagates (re-upload is the recovery path).
pub fn run(
  pool: &DbPool,
  store: &dyn ObjectStore,
  tokenizer: &dyn Tokenizer,
  file: &SubtitleFile,
) -> AppResult<PipelineReport> {
  match run_inner(pool, store, tokenizer, file) {
    Ok(report) => {
      tracing::info!(
        content_id = %file.content_id,
        episode_id = %file.episode_id,
        sentences = report.sentence_count,
        terms = report.term_count,
        occurrences = report.occurrence_count,
        "subtitle processed"
      );
      Ok(report)
    }
    Err(e) => {
      if let Ok(conn) = db::try_lock(pool) {
        subtitles::set_file_status(
          &conn,
          &file.content_id,
          &file.episode_id,
          ProcessingStatus::Failed,
          0,
          0,
        )
        .log_warn("marking subtitle file failed");
      }
      Err(e)
    }
  }
}

fn run_inner(
  pool: &DbPool,
  store: &dyn ObjectStore,
  tokenizer: &dyn Tokenizer,
  file: &SubtitleFile,
) -> AppResult<PipelineReport> {
  let bytes = store
    .get(&file.storage_key)?
    .ok_or_else(|| AppError::Pipeline(format!("stored object missing: {}", file.storage_key)))?;
  let text = String::from_utf8_lossy(&bytes);

  let sentences = sentences_from_subtitle_text(&text);
  let extracted = extract_vocabulary(&sentences, tokenizer);

  let mut conn = db::try_lock(pool)?;
  subtitles::upsert_subtitle_file(&conn, file)?;
  subtitles::clear_occurrences(&conn, &file.content_id, &file.episode_id)?;
  subtitles::touch_vocab_terms(&conn, &extracted.terms)?;
  subtitles::insert_occurrences(
    &mut conn,
    &file.content_id,
    &file.episode_id,
    &extracted.occurrences,
  )?;
  subtitles::set_file_status(
    &conn,
    &file.content_id,
    &file.episode_id,
    ProcessingStatus::Processed,
    sentences.len() as i64,
    extracted.terms.len() as i64,
  )?;

  Ok(PipelineReport {
    sentence_count: sentences.len(),
    term_count: extracted.terms.len(),
    occurrence_count: extracted.occurrences.len(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::run_migrations;
  use crate::nlp::HeuristicTokenizer;
  use crate::storage::FsObjectStore;
  use chrono::Utc;
  use rusqlite::Connection;
  use std::sync::{Arc, Mutex};
  use tempfile::TempDir;

  const VTT: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:03.000\nHello there. The dogs ran fast.\n\n2\n00:00:04.000 --> 00:00:06.000\nThey were running again.\n";

  fn test_pool() -> DbPool {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    Arc::new(Mutex::new(conn))
  }

  fn file_row(key: &str) -> SubtitleFile {
    SubtitleFile {
      content_id: "show1".into(),
      episode_id: "ep1".into(),
      storage_key: key.into(),
      file_name: "ep1.vtt".into(),
      file_type: "text/vtt".into(),
      status: ProcessingStatus::Queued,
      uploaded_at: Utc::now(),
      processed_at: None,
      sentence_count: 0,
      term_count: 0,
    }
  }

  #[test]
  fn test_run_extracts_and_marks_processed() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());
    store.put("subtitles/show1/ep1.vtt", VTT.as_bytes()).unwrap();

    let pool = test_pool();
    let report = run(
      &pool,
      &store,
      &HeuristicTokenizer::new(),
      &file_row("subtitles/show1/ep1.vtt"),
    )
    .unwrap();

    assert_eq!(report.sentence_count, 3);
    assert!(report.term_count > 0);

    let conn = db::try_lock(&pool).unwrap();
    let file = subtitles::get_subtitle_file(&conn, "show1", "ep1").unwrap().unwrap();
    assert_eq!(file.status, ProcessingStatus::Processed);
    assert_eq!(file.sentence_count, 3);
  }

  #[test]
  fn test_rerun_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());
    store.put("subtitles/show1/ep1.vtt", VTT.as_bytes()).unwrap();

    let pool = test_pool();
    let file = file_row("subtitles/show1/ep1.vtt");
    let tokenizer = HeuristicTokenizer::new();

    let first = run(&pool, &store, &tokenizer, &file).unwrap();
    let second = run(&pool, &store, &tokenizer, &file).unwrap();
    assert_eq!(first.occurrence_count, second.occurrence_count);

    let conn = db::try_lock(&pool).unwrap();
    let occurrences = subtitles::count_occurrences(&conn, "show1", "ep1").unwrap();
    assert_eq!(occurrences, second.occurrence_count as i64);

    let files: i64 = conn
      .query_row("SELECT COUNT(*) FROM subtitle_files", [], |row| row.get(0))
      .unwrap();
    assert_eq!(files, 1);
  }

  #[test]
  fn test_missing_object_marks_failed() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());

    let pool = test_pool();
    let file = file_row("subtitles/show1/ep1.vtt");
    {
      let conn = db::try_lock(&pool).unwrap();
      subtitles::upsert_subtitle_file(&conn, &file).unwrap();
    }

    let result = run(&pool, &store, &HeuristicTokenizer::new(), &file);
    assert!(matches!(result, Err(AppError::Pipeline(_))));

    let conn = db::try_lock(&pool).unwrap();
    let stored = subtitles::get_subtitle_file(&conn, "show1", "ep1").unwrap().unwrap();
    assert_eq!(stored.status, ProcessingStatus::Failed);
  }
}
