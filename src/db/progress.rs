//! Per-user learning state: global lemma mastery, episode-scoped weak
//! words, and quiz statistics.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use std::collections::HashSet;

use crate::domain::{LearnStatus, QuizStat};

/// Terms the user answered wrong in this episode and has not yet recovered
pub fn weak_terms(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
) -> Result<HashSet<String>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT term FROM word_status
    WHERE user_id = ?1 AND content_id = ?2 AND episode_id = ?3 AND status = 'weak'
    "#,
  )?;
  let terms = stmt
    .query_map(params![user_id, content_id, episode_id], |row| row.get(0))?
    .collect::<Result<HashSet<String>>>()?;
  Ok(terms)
}

/// Lemmas the user has mastered anywhere in the catalog
pub fn learned_lemmas(conn: &Connection, user_id: &str) -> Result<HashSet<String>> {
  let mut stmt = conn.prepare(
    "SELECT lemma FROM user_lemma_status WHERE user_id = ?1 AND status = 'learned'",
  )?;
  let lemmas = stmt
    .query_map(params![user_id], |row| row.get(0))?
    .collect::<Result<HashSet<String>>>()?;
  Ok(lemmas)
}

/// Quiz history for one term of this user and episode
pub fn get_quiz_stat(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
  term: &str,
) -> Result<Option<QuizStat>> {
  conn
    .query_row(
      r#"
      SELECT term, seen_count, correct_count, wrong_count, last_seen_at
      FROM user_quiz_stats
      WHERE user_id = ?1 AND content_id = ?2 AND episode_id = ?3 AND term = ?4
      "#,
      params![user_id, content_id, episode_id, term],
      |row| {
        let last_seen: String = row.get(4)?;
        Ok(QuizStat {
          term: row.get(0)?,
          seen_count: row.get(1)?,
          correct_count: row.get(2)?,
          wrong_count: row.get(3)?,
          last_seen_at: DateTime::parse_from_rfc3339(&last_seen)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        })
      },
    )
    .map(Some)
    .or_else(|e| match e {
      rusqlite::Error::QueryReturnedNoRows => Ok(None),
      other => Err(other),
    })
}

fn mark_lemma_learned(conn: &Connection, user_id: &str, lemma: &str) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO user_lemma_status (user_id, lemma, status, updated_at)
    VALUES (?1, ?2, 'learned', ?3)
    ON CONFLICT(user_id, lemma) DO UPDATE SET
      status = 'learned',
      updated_at = excluded.updated_at
    "#,
    params![user_id, lemma, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

fn clear_weak_word(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
  term: &str,
) -> Result<()> {
  conn.execute(
    r#"
    DELETE FROM word_status
    WHERE user_id = ?1 AND content_id = ?2 AND episode_id = ?3 AND term = ?4
      AND status = 'weak'
    "#,
    params![user_id, content_id, episode_id, term],
  )?;
  Ok(())
}

fn mark_word_weak(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
  term: &str,
) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO word_status (user_id, content_id, episode_id, term, status, updated_at)
    VALUES (?1, ?2, ?3, ?4, 'weak', ?5)
    ON CONFLICT(user_id, content_id, episode_id, term) DO UPDATE SET
      status = 'weak',
      updated_at = excluded.updated_at
    "#,
    params![user_id, content_id, episode_id, term, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

/// Atomic upsert of the per-term quiz statistic row
fn bump_quiz_stat(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
  term: &str,
  correct: bool,
) -> Result<()> {
  let (correct_inc, wrong_inc) = if correct { (1, 0) } else { (0, 1) };
  conn.execute(
    r#"
    INSERT INTO user_quiz_stats (
      user_id, content_id, episode_id, term,
      seen_count, correct_count, wrong_count, last_seen_at
    ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7)
    ON CONFLICT(user_id, content_id, episode_id, term) DO UPDATE SET
      seen_count = seen_count + 1,
      correct_count = correct_count + ?5,
      wrong_count = wrong_count + ?6,
      last_seen_at = ?7
    "#,
    params![
      user_id,
      content_id,
      episode_id,
      term,
      correct_inc,
      wrong_inc,
      Utc::now().to_rfc3339()
    ],
  )?;
  Ok(())
}

/// Apply a quiz answer. Correct answers promote the lemma to learned
/// globally and clear the episode-scoped weak mark; wrong answers set it.
/// Statistics always increment. Returns the status applied.
pub fn record_answer(
  conn: &Connection,
  user_id: &str,
  content_id: &str,
  episode_id: &str,
  term: &str,
  lemma: &str,
  correct: bool,
) -> Result<LearnStatus> {
  let status = if correct {
    mark_lemma_learned(conn, user_id, lemma)?;
    clear_weak_word(conn, user_id, content_id, episode_id, term)?;
    LearnStatus::Learned
  } else {
    mark_word_weak(conn, user_id, content_id, episode_id, term)?;
    LearnStatus::Weak
  };
  bump_quiz_stat(conn, user_id, content_id, episode_id, term, correct)?;
  Ok(status)
}
