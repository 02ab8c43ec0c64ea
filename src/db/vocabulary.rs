//! Canonical vocabulary, translation cache, and usage counter persistence.

use chrono::Utc;
use rusqlite::{params, Connection, Result};
use std::collections::HashMap;

use crate::domain::{VocabExample, VocabularyEntry};

// ==================== Translation cache ====================

pub fn get_cached_translation(conn: &Connection, cache_key: &str) -> Result<Option<String>> {
  conn
    .query_row(
      "SELECT meaning FROM translation_cache WHERE cache_key = ?1",
      params![cache_key],
      |row| row.get(0),
    )
    .map(Some)
    .or_else(|e| match e {
      rusqlite::Error::QueryReturnedNoRows => Ok(None),
      other => Err(other),
    })
}

pub fn set_cached_translation(conn: &Connection, cache_key: &str, meaning: &str) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO translation_cache (cache_key, meaning, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(cache_key) DO UPDATE SET
      meaning = excluded.meaning,
      updated_at = excluded.updated_at
    "#,
    params![cache_key, meaning, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

// ==================== Canonical vocabulary ====================

/// Last-write-wins upsert keyed (surface_term, pos). Sanitized meanings are
/// interchangeable, so concurrent writers converge without locking.
pub fn upsert_vocabulary_entry(
  conn: &Connection,
  example: &VocabExample,
  meaning: &str,
  is_corrupt: bool,
) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO vocabulary (surface_term, lemma, pos, example_sentence, meaning, is_corrupt, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(surface_term, pos) DO UPDATE SET
      lemma = excluded.lemma,
      example_sentence = excluded.example_sentence,
      meaning = excluded.meaning,
      is_corrupt = excluded.is_corrupt,
      updated_at = excluded.updated_at
    "#,
    params![
      example.surface_term,
      example.lemma,
      example.pos,
      example.sentence,
      meaning,
      is_corrupt as i64,
      Utc::now().to_rfc3339(),
    ],
  )?;
  Ok(())
}

/// Flag every occurrence of a term in an episode as corrupt (admin review
/// surface picks these up)
pub fn set_occurrence_corrupt_override(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
  term: &str,
  is_corrupt: bool,
) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE vocab_occurrences
    SET is_corrupt_override = ?4
    WHERE content_id = ?1 AND episode_id = ?2 AND term = ?3
    "#,
    params![content_id, episode_id, term, is_corrupt as i64],
  )
}

/// Admin meaning correction for every occurrence of a term in an episode.
/// The override wins over the canonical entry when quizzes and answers
/// read the term; None clears it.
pub fn set_occurrence_meaning_override(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
  term: &str,
  meaning: Option<&str>,
) -> Result<usize> {
  conn.execute(
    r#"
    UPDATE vocab_occurrences
    SET meaning_override = ?4
    WHERE content_id = ?1 AND episode_id = ?2 AND term = ?3
    "#,
    params![content_id, episode_id, term, meaning],
  )
}

/// Human sign-off: clears the corrupt flag on every pos variant of a term
pub fn clear_vocabulary_corrupt(conn: &Connection, surface_term: &str) -> Result<usize> {
  conn.execute(
    "UPDATE vocabulary SET is_corrupt = 0, updated_at = ?2 WHERE surface_term = ?1",
    params![surface_term, Utc::now().to_rfc3339()],
  )
}

/// Removes an extraction mistake from one episode. The canonical vocabulary
/// row stays; other episodes may still carry the term.
pub fn delete_term_occurrences(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
  term: &str,
) -> Result<usize> {
  conn.execute(
    "DELETE FROM vocab_occurrences WHERE content_id = ?1 AND episode_id = ?2 AND term = ?3",
    params![content_id, episode_id, term],
  )
}

/// Canonical entries for a surface term, one per pos variant
pub fn vocabulary_entries(conn: &Connection, surface_term: &str) -> Result<Vec<VocabularyEntry>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT surface_term, lemma, pos, example_sentence, meaning, is_corrupt
    FROM vocabulary
    WHERE surface_term = ?1
    ORDER BY pos ASC
    "#,
  )?;

  let entries = stmt
    .query_map(params![surface_term], |row| {
      let corrupt: i64 = row.get(5)?;
      Ok(VocabularyEntry {
        surface_term: row.get(0)?,
        lemma: row.get(1)?,
        pos: row.get(2)?,
        example_sentence: row.get(3)?,
        meaning: row.get(4)?,
        is_corrupt: corrupt != 0,
      })
    })?
    .collect::<Result<Vec<_>>>()?;

  Ok(entries)
}

// ==================== Usage counter ====================

#[derive(Debug, PartialEq, Eq)]
pub enum QuotaOutcome {
  Allowed,
  Exceeded { used: i64 },
}

/// Atomic check-and-increment of the period usage counter. One conditional
/// upsert statement: either the whole cost fits under the limit and is
/// recorded, or nothing changes. Never a separate read-then-write.
pub fn try_consume_quota(
  conn: &Connection,
  period_key: &str,
  provider: &str,
  cost: i64,
  limit: i64,
) -> Result<QuotaOutcome> {
  let now = Utc::now().to_rfc3339();
  let changed = conn.execute(
    r#"
    INSERT INTO translation_usage (period_key, provider, char_count, updated_at)
    SELECT ?1, ?2, ?3, ?4 WHERE ?3 <= ?5
    ON CONFLICT(period_key, provider) DO UPDATE SET
      char_count = char_count + ?3,
      updated_at = ?4
    WHERE char_count + ?3 <= ?5
    "#,
    params![period_key, provider, cost, now, limit],
  )?;

  if changed > 0 {
    Ok(QuotaOutcome::Allowed)
  } else {
    let used = get_usage(conn, period_key, provider)?;
    Ok(QuotaOutcome::Exceeded { used })
  }
}

pub fn get_usage(conn: &Connection, period_key: &str, provider: &str) -> Result<i64> {
  conn
    .query_row(
      "SELECT char_count FROM translation_usage WHERE period_key = ?1 AND provider = ?2",
      params![period_key, provider],
      |row| row.get(0),
    )
    .or_else(|e| match e {
      rusqlite::Error::QueryReturnedNoRows => Ok(0),
      other => Err(other),
    })
}

// ==================== Episode candidate queries ====================

/// One distinct term of an episode with its resolution state, for the
/// admin meanings job
#[derive(Debug, Clone)]
pub struct MeaningCandidate {
  pub term: String,
  pub lemma: String,
  pub pos: String,
  pub sentence: String,
  pub cached_meaning: Option<String>,
  pub vocab_meaning: Option<String>,
}

impl MeaningCandidate {
  pub fn has_meaning(&self) -> bool {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    filled(&self.cached_meaning) || filled(&self.vocab_meaning)
  }
}

pub fn meaning_candidates(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
) -> Result<Vec<MeaningCandidate>> {
  let mut stmt = conn.prepare(
    r#"
    WITH candidates AS (
      SELECT
        o.term AS term,
        COALESCE(MAX(o.lemma), o.term) AS lemma,
        COALESCE(MAX(o.pos), 'unknown') AS pos,
        MIN(o.sentence) AS sentence,
        LOWER(o.term) || '::' || LOWER(COALESCE(MAX(o.pos), 'unknown')) AS cache_key
      FROM vocab_occurrences o
      WHERE o.content_id = ?1 AND o.episode_id = ?2
      GROUP BY o.term
    )
    SELECT c.term, c.lemma, c.pos, c.sentence, tc.meaning, v.meaning
    FROM candidates c
    LEFT JOIN translation_cache tc ON tc.cache_key = c.cache_key
    LEFT JOIN vocabulary v ON v.surface_term = c.term AND v.pos = c.pos
    ORDER BY c.term ASC
    "#,
  )?;

  let candidates = stmt
    .query_map(params![content_id, episode_id], |row| {
      Ok(MeaningCandidate {
        term: row.get(0)?,
        lemma: row.get(1)?,
        pos: row.get(2)?,
        sentence: row.get(3)?,
        cached_meaning: row.get(4)?,
        vocab_meaning: row.get(5)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;

  Ok(candidates)
}

/// One distinct term of an episode with its display meaning (occurrence
/// override wins over the canonical entry), for quiz building
#[derive(Debug, Clone)]
pub struct QuizCandidateRow {
  pub term: String,
  pub lemma: String,
  pub pos: String,
  pub meaning: Option<String>,
  pub is_corrupt: bool,
}

pub fn quiz_candidates(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
) -> Result<Vec<QuizCandidateRow>> {
  // Join on (term, pos) and group by term alone: vocabulary is keyed
  // (surface_term, pos), so a bare term join would emit one row per pos
  // variant and duplicate the term in a question set.
  let mut stmt = conn.prepare(
    r#"
    SELECT
      o.term,
      COALESCE(MAX(o.lemma), MAX(v.lemma), o.term) AS lemma,
      COALESCE(MAX(o.pos), MAX(v.pos), 'unknown') AS pos,
      COALESCE(MAX(o.meaning_override), MAX(v.meaning)) AS meaning,
      COALESCE(MAX(o.is_corrupt_override), MAX(v.is_corrupt), 0) AS is_corrupt
    FROM vocab_occurrences o
    LEFT JOIN vocabulary v ON v.surface_term = o.term AND v.pos = o.pos
    WHERE o.content_id = ?1 AND o.episode_id = ?2
    GROUP BY o.term
    ORDER BY o.term ASC
    "#,
  )?;

  let rows = stmt
    .query_map(params![content_id, episode_id], |row| {
      let corrupt: i64 = row.get(4)?;
      Ok(QuizCandidateRow {
        term: row.get(0)?,
        lemma: row.get(1)?,
        pos: row.get(2)?,
        meaning: row.get(3)?,
        is_corrupt: corrupt != 0,
      })
    })?
    .collect::<Result<Vec<_>>>()?;

  Ok(rows)
}

/// Number of distinct episodes in the whole catalog containing each of the
/// episode's terms
pub fn repeat_counts(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
) -> Result<HashMap<String, i64>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT o2.term, COUNT(DISTINCT o2.content_id || char(31) || o2.episode_id)
    FROM vocab_occurrences o2
    WHERE o2.term IN (
      SELECT DISTINCT term FROM vocab_occurrences
      WHERE content_id = ?1 AND episode_id = ?2
    )
    GROUP BY o2.term
    "#,
  )?;

  let mut counts = HashMap::new();
  let rows = stmt.query_map(params![content_id, episode_id], |row| {
    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
  })?;
  for row in rows {
    let (term, count) = row?;
    counts.insert(term, count);
  }
  Ok(counts)
}

/// Authoritative answer data for one term of an episode
#[derive(Debug, Clone)]
pub struct AnswerRow {
  pub meaning: Option<String>,
  pub lemma: String,
  pub is_corrupt: bool,
}

pub fn get_answer_row(
  conn: &Connection,
  content_id: &str,
  episode_id: &str,
  term: &str,
) -> Result<Option<AnswerRow>> {
  conn
    .query_row(
      r#"
      SELECT
        COALESCE(MAX(o.meaning_override), MAX(v.meaning)) AS meaning,
        COALESCE(MAX(o.lemma), MAX(v.lemma), o.term) AS lemma,
        COALESCE(MAX(o.is_corrupt_override), MAX(v.is_corrupt), 0) AS is_corrupt
      FROM vocab_occurrences o
      LEFT JOIN vocabulary v ON v.surface_term = o.term AND v.pos = o.pos
      WHERE o.content_id = ?1 AND o.episode_id = ?2 AND o.term = ?3
      GROUP BY o.term
      "#,
      params![content_id, episode_id, term],
      |row| {
        let corrupt: i64 = row.get(2)?;
        Ok(AnswerRow {
          meaning: row.get(0)?,
          lemma: row.get(1)?,
          is_corrupt: corrupt != 0,
        })
      },
    )
    .map(Some)
    .or_else(|e| match e {
      rusqlite::Error::QueryReturnedNoRows => Ok(None),
      other => Err(other),
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::schema::run_migrations;
  use crate::db::subtitles::insert_occurrences;
  use crate::domain::VocabOccurrence;

  fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    conn
  }

  fn example(term: &str, pos: &str) -> VocabExample {
    VocabExample {
      surface_term: term.into(),
      lemma: term.into(),
      pos: pos.into(),
      sentence: format!("Example with {}.", term),
    }
  }

  fn occurrence(term: &str, index: usize) -> VocabOccurrence {
    VocabOccurrence {
      term: term.into(),
      lemma: term.into(),
      pos: "noun".into(),
      sentence: format!("Sentence with {}.", term),
      sentence_index: index,
    }
  }

  #[test]
  fn test_translation_cache_roundtrip() {
    let conn = test_conn();
    assert_eq!(get_cached_translation(&conn, "cat::noun").unwrap(), None);

    set_cached_translation(&conn, "cat::noun", "বিড়াল").unwrap();
    assert_eq!(
      get_cached_translation(&conn, "cat::noun").unwrap().as_deref(),
      Some("বিড়াল")
    );

    // Upsert overwrites
    set_cached_translation(&conn, "cat::noun", "বেড়াল").unwrap();
    assert_eq!(
      get_cached_translation(&conn, "cat::noun").unwrap().as_deref(),
      Some("বেড়াল")
    );
  }

  #[test]
  fn test_vocabulary_upsert_one_row_per_term_pos() {
    let conn = test_conn();
    upsert_vocabulary_entry(&conn, &example("cat", "noun"), "বিড়াল", false).unwrap();
    upsert_vocabulary_entry(&conn, &example("cat", "noun"), "বেড়াল", true).unwrap();

    let (count, corrupt): (i64, i64) = conn
      .query_row(
        "SELECT COUNT(*), MAX(is_corrupt) FROM vocabulary WHERE surface_term = 'cat'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .unwrap();
    assert_eq!(count, 1);
    assert_eq!(corrupt, 1);
  }

  #[test]
  fn test_quota_allows_until_limit() {
    let conn = test_conn();
    assert_eq!(
      try_consume_quota(&conn, "2026-02", "google", 95, 100).unwrap(),
      QuotaOutcome::Allowed
    );
    assert_eq!(get_usage(&conn, "2026-02", "google").unwrap(), 95);

    // 10 more would exceed 100: refused, usage unchanged
    assert_eq!(
      try_consume_quota(&conn, "2026-02", "google", 10, 100).unwrap(),
      QuotaOutcome::Exceeded { used: 95 }
    );
    assert_eq!(get_usage(&conn, "2026-02", "google").unwrap(), 95);

    // Exactly filling the limit is allowed
    assert_eq!(
      try_consume_quota(&conn, "2026-02", "google", 5, 100).unwrap(),
      QuotaOutcome::Allowed
    );
    assert_eq!(get_usage(&conn, "2026-02", "google").unwrap(), 100);
  }

  #[test]
  fn test_quota_refuses_first_call_over_limit() {
    let conn = test_conn();
    assert_eq!(
      try_consume_quota(&conn, "2026-02-01", "google", 200, 100).unwrap(),
      QuotaOutcome::Exceeded { used: 0 }
    );
    assert_eq!(get_usage(&conn, "2026-02-01", "google").unwrap(), 0);
  }

  #[test]
  fn test_quota_new_period_starts_fresh() {
    let conn = test_conn();
    try_consume_quota(&conn, "2026-02-01", "google", 100, 100).unwrap();
    assert_eq!(
      try_consume_quota(&conn, "2026-02-02", "google", 100, 100).unwrap(),
      QuotaOutcome::Allowed
    );
  }

  #[test]
  fn test_meaning_candidates_join_cache_and_vocabulary() {
    let mut conn = test_conn();
    insert_occurrences(
      &mut conn,
      "show1",
      "ep1",
      &[occurrence("cat", 0), occurrence("dog", 1)],
    )
    .unwrap();
    set_cached_translation(&conn, "cat::noun", "বিড়াল").unwrap();

    let candidates = meaning_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].has_meaning()); // cat, via cache
    assert!(!candidates[1].has_meaning()); // dog, unresolved
  }

  #[test]
  fn test_quiz_candidates_prefer_occurrence_override() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("cat", 0)]).unwrap();
    upsert_vocabulary_entry(&conn, &example("cat", "noun"), "বিড়াল", false).unwrap();
    conn
      .execute(
        "UPDATE vocab_occurrences SET meaning_override = 'মার্জার' WHERE term = 'cat'",
        [],
      )
      .unwrap();

    let rows = quiz_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].meaning.as_deref(), Some("মার্জার"));
  }

  #[test]
  fn test_quiz_candidates_one_row_per_term_across_pos_variants() {
    let mut conn = test_conn();
    // "watch" occurs as a noun here, but another episode resolved it as a
    // verb too, so the vocabulary table carries two pos variants
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("watch", 0)]).unwrap();
    upsert_vocabulary_entry(&conn, &example("watch", "noun"), "ঘড়ি", false).unwrap();
    upsert_vocabulary_entry(&conn, &example("watch", "verb"), "দেখা", false).unwrap();

    let rows = quiz_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].term, "watch");
    // the variant matching the occurrence's pos wins
    assert_eq!(rows[0].meaning.as_deref(), Some("ঘড়ি"));
  }

  #[test]
  fn test_answer_row_matches_occurrence_pos_variant() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("watch", 0)]).unwrap();
    upsert_vocabulary_entry(&conn, &example("watch", "noun"), "ঘড়ি", false).unwrap();
    upsert_vocabulary_entry(&conn, &example("watch", "verb"), "দেখা", false).unwrap();

    let row = get_answer_row(&conn, "show1", "ep1", "watch").unwrap().unwrap();
    assert_eq!(row.meaning.as_deref(), Some("ঘড়ি"));
  }

  #[test]
  fn test_meaning_override_set_and_cleared() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("cat", 0)]).unwrap();
    upsert_vocabulary_entry(&conn, &example("cat", "noun"), "বিড়াল", false).unwrap();

    let changed =
      set_occurrence_meaning_override(&conn, "show1", "ep1", "cat", Some("মার্জার")).unwrap();
    assert_eq!(changed, 1);
    let rows = quiz_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(rows[0].meaning.as_deref(), Some("মার্জার"));

    set_occurrence_meaning_override(&conn, "show1", "ep1", "cat", None).unwrap();
    let rows = quiz_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(rows[0].meaning.as_deref(), Some("বিড়াল"));

    // unknown term touches nothing
    assert_eq!(
      set_occurrence_meaning_override(&conn, "show1", "ep1", "ghost", Some("ভূত")).unwrap(),
      0
    );
  }

  #[test]
  fn test_corruption_sign_off_clears_both_levels() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("cat", 0)]).unwrap();
    upsert_vocabulary_entry(&conn, &example("cat", "noun"), "??", true).unwrap();
    set_occurrence_corrupt_override(&conn, "show1", "ep1", "cat", true).unwrap();

    assert!(quiz_candidates(&conn, "show1", "ep1").unwrap()[0].is_corrupt);

    set_occurrence_corrupt_override(&conn, "show1", "ep1", "cat", false).unwrap();
    clear_vocabulary_corrupt(&conn, "cat").unwrap();

    assert!(!quiz_candidates(&conn, "show1", "ep1").unwrap()[0].is_corrupt);
    assert!(!vocabulary_entries(&conn, "cat").unwrap()[0].is_corrupt);
  }

  #[test]
  fn test_delete_term_occurrences_scoped_to_episode() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("cat", 0), occurrence("dog", 1)])
      .unwrap();
    insert_occurrences(&mut conn, "show1", "ep2", &[occurrence("cat", 0)]).unwrap();

    assert_eq!(delete_term_occurrences(&conn, "show1", "ep1", "cat").unwrap(), 1);
    let remaining = quiz_candidates(&conn, "show1", "ep1").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].term, "dog");
    // the other episode keeps its copy
    assert_eq!(quiz_candidates(&conn, "show1", "ep2").unwrap().len(), 1);
  }

  #[test]
  fn test_vocabulary_entries_lists_pos_variants() {
    let conn = test_conn();
    assert!(vocabulary_entries(&conn, "watch").unwrap().is_empty());

    upsert_vocabulary_entry(&conn, &example("watch", "verb"), "দেখা", false).unwrap();
    upsert_vocabulary_entry(&conn, &example("watch", "noun"), "ঘড়ি", true).unwrap();

    let entries = vocabulary_entries(&conn, "watch").unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].pos, "noun");
    assert!(entries[0].is_corrupt);
    assert_eq!(entries[1].meaning.as_deref(), Some("দেখা"));
  }

  #[test]
  fn test_repeat_counts_distinct_episodes() {
    let mut conn = test_conn();
    insert_occurrences(&mut conn, "show1", "ep1", &[occurrence("cat", 0)]).unwrap();
    insert_occurrences(&mut conn, "show1", "ep2", &[occurrence("cat", 0)]).unwrap();
    insert_occurrences(&mut conn, "show2", "ep1", &[occurrence("cat", 0), occurrence("dog", 1)]).unwrap();

    let counts = repeat_counts(&conn, "show1", "ep1").unwrap();
    assert_eq!(counts.get("cat"), Some(&3));
    // dog is not in show1/ep1, so it is not a key
    assert!(!counts.contains_key("dog"));
  }

  #[test]
  fn test_answer_row_missing_term() {
    let conn = test_conn();
    assert!(get_answer_row(&conn, "show1", "ep1", "ghost").unwrap().is_none());
  }
}
