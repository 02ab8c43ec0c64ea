//! Subtitle file status and occurrence persistence.
//!
//! Everything here is an upsert keyed on (content_id, episode_id) so queue
//! retries and re-uploads stay idempotent.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};

use crate::config::DB_BATCH_SIZE;
use crate::domain::{ProcessingStatus, SubtitleFile, VocabOccurrence};

/// Upsert the file row; re-upload replaces the stored key and resets status
pub fn upsert_subtitle_file(conn: &Connection, file: &SubtitleFile) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO subtitle_files (
      content_id, episode_id, storage_key, file_name, file_type,
      status, uploaded_at, processed_at, sentence_count, term_count
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(content_id, episode_id) DO UPDATE SET
      storage_key = excluded.storage_key,
      file_name = excluded.file_name,
      file_type = excluded.file_type,
      status = excluded.status,
      uploaded_at = excluded.uploaded_at,
      processed_at = excluded.processed_at,
      sentence_count = excluded.sentence_count,
      term_count = excluded.term_count
    "#,
    params![
      file.content_id,
      file.episode_id,
      file.storage_key,
      file.file_name,
      file.file_type,
      file.status.as_str(),
      file.uploaded_at.to_rfc3339(),
      file.processed_at.map(|t| t.to_rfc3339()),
      file.sentence_count,
      file.term_count,
    ],
  )?;
  Ok(())
}

pub fn set_file_status(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
  status: ProcessingStatus,
  sentence_count: i64,
  term_count: i64,
) -> Result<()> {
  let processed_at = match status {
    ProcessingStatus::Processed => Some(Utc::now().to_rfc3339()),
    _ => None,
  };
  conn.execute(
    r#"
    UPDATE subtitle_files
    SET status = ?3, processed_at = ?4, sentence_count = ?5, term_count = ?6
    WHERE content_id = ?1 AND episode_id = ?2
    "#,
    params![
      content_id,
      episode_id,
      status.as_str(),
      processed_at,
      sentence_count,
      term_count
    ],
  )?;
  Ok(())
}

pub fn get_subtitle_file(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
) -> Result<Option<SubtitleFile>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT content_id, episode_id, storage_key, file_name, file_type,
           status, uploaded_at, processed_at, sentence_count, term_count
    FROM subtitle_files
    WHERE content_id = ?1 AND episode_id = ?2
    "#,
  )?;

  let mut rows = stmt.query(params![content_id, episode_id])?;
  if let Some(row) = rows.next()? {
    let status_str: String = row.get(5)?;
    let uploaded_at: String = row.get(6)?;
    let processed_at: Option<String> = row.get(7)?;
    Ok(Some(SubtitleFile {
      content_id: row.get(0)?,
      episode_id: row.get(1)?,
      storage_key: row.get(2)?,
      file_name: row.get(3)?,
      file_type: row.get(4)?,
      status: ProcessingStatus::from_str(&status_str).unwrap_or(ProcessingStatus::Queued),
      uploaded_at: parse_timestamp(&uploaded_at),
      processed_at: processed_at.as_deref().map(parse_timestamp_str),
      sentence_count: row.get(8)?,
      term_count: row.get(9)?,
    }))
  } else {
    Ok(None)
  }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
  parse_timestamp_str(value)
}

fn parse_timestamp_str(value: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(value)
    .map(|dt| dt.with_timezone(&Utc))
    .unwrap_or_else(|_| Utc::now())
}

/// Remove all occurrences for an episode. Run before re-inserting so a
/// re-upload never double-counts terms.
pub fn clear_occurrences(conn: &Connection, content_id: &str, episode_id: &str) -> Result<usize> {
  conn.execute(
    "DELETE FROM vocab_occurrences WHERE content_id = ?1 AND episode_id = ?2",
    params![content_id, episode_id],
  )
}

/// Insert-or-touch one vocab_terms row per distinct term
pub fn touch_vocab_terms<'a>(
  conn: &Connection,
  terms: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  let mut stmt = conn.prepare(
    r#"
    INSERT INTO vocab_terms (term, created_at, updated_at)
    VALUES (?1, ?2, ?2)
    ON CONFLICT(term) DO UPDATE SET updated_at = excluded.updated_at
    "#,
  )?;
  for term in terms {
    stmt.execute(params![term, now])?;
  }
  Ok(())
}

/// Bulk-insert occurrences in fixed-size chunks. Each chunk commits as one
/// transaction; a chunk failure aborts the job and the caller marks the
/// file failed.
pub fn insert_occurrences(
  conn: &mut Connection,
  content_id: &str,
  episode_id: &str,
  occurrences: &[VocabOccurrence],
) -> Result<()> {
  let now = Utc::now().to_rfc3339();

  for chunk in occurrences.chunks(DB_BATCH_SIZE) {
    let tx = conn.transaction()?;
    {
      let mut stmt = tx.prepare(
        r#"
        INSERT INTO vocab_occurrences (
          term, lemma, pos, content_id, episode_id, sentence, sentence_index, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
      )?;
      for occ in chunk {
        stmt.execute(params![
          occ.term,
          occ.lemma,
          occ.pos,
          content_id,
          episode_id,
          occ.sentence,
          occ.sentence_index as i64,
          now,
        ])?;
      }
    }
    tx.commit()?;
  }

  Ok(())
}

pub fn count_occurrences(conn: &Connection, content_id: &str, episode_id: &str) -> Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM vocab_occurrences WHERE content_id = ?1 AND episode_id = ?2",
    params![content_id, episode_id],
    |row| row.get(0),
  )
}

/// Delete an episode's pack: occurrences plus the file row. Returns the
/// storage key so the caller can remove the raw object too.
pub fn delete_pack(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
) -> Result<Option<String>> {
  let key: Option<String> = conn
    .query_row(
      "SELECT storage_key FROM subtitle_files WHERE content_id = ?1 AND episode_id = ?2",
      params![content_id, episode_id],
      |row| row.get(0),
    )
    .map(Some)
    .or_else(|e| match e {
      rusqlite::Error::QueryReturnedNoRows => Ok(None),
      other => Err(other),
    })?;

  clear_occurrences(conn, content_id, episode_id)?;
  conn.execute(
    "DELETE FROM subtitle_files WHERE content_id = ?1 AND episode_id = ?2",
    params![content_id, episode_id],
  )?;

  Ok(key)
}
