use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS subtitle_files (
      content_id TEXT NOT NULL,
      episode_id TEXT NOT NULL,
      storage_key TEXT NOT NULL,
      file_name TEXT NOT NULL,
      file_type TEXT NOT NULL,
      status TEXT NOT NULL DEFAULT 'queued',
      uploaded_at TEXT NOT NULL,
      processed_at TEXT,
      sentence_count INTEGER NOT NULL DEFAULT 0,
      term_count INTEGER NOT NULL DEFAULT 0,
      PRIMARY KEY (content_id, episode_id)
    );

    CREATE TABLE IF NOT EXISTS vocab_terms (
      term TEXT PRIMARY KEY,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vocab_occurrences (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      term TEXT NOT NULL,
      lemma TEXT NOT NULL,
      pos TEXT NOT NULL,
      content_id TEXT NOT NULL,
      episode_id TEXT NOT NULL,
      sentence TEXT NOT NULL,
      sentence_index INTEGER NOT NULL,
      meaning_override TEXT,
      is_corrupt_override INTEGER,
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS vocabulary (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      surface_term TEXT NOT NULL,
      lemma TEXT NOT NULL,
      pos TEXT NOT NULL,
      example_sentence TEXT NOT NULL DEFAULT '',
      meaning TEXT,
      is_corrupt INTEGER NOT NULL DEFAULT 0,
      updated_at TEXT NOT NULL,
      UNIQUE (surface_term, pos)
    );

    CREATE TABLE IF NOT EXISTS translation_cache (
      cache_key TEXT PRIMARY KEY,
      meaning TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS translation_usage (
      period_key TEXT NOT NULL,
      provider TEXT NOT NULL,
      char_count INTEGER NOT NULL DEFAULT 0,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (period_key, provider)
    );

    CREATE TABLE IF NOT EXISTS user_lemma_status (
      user_id TEXT NOT NULL,
      lemma TEXT NOT NULL,
      status TEXT NOT NULL,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (user_id, lemma)
    );

    CREATE TABLE IF NOT EXISTS word_status (
      user_id TEXT NOT NULL,
      content_id TEXT NOT NULL,
      episode_id TEXT NOT NULL,
      term TEXT NOT NULL,
      status TEXT NOT NULL,
      updated_at TEXT NOT NULL,
      PRIMARY KEY (user_id, content_id, episode_id, term)
    );

    CREATE TABLE IF NOT EXISTS user_quiz_stats (
      user_id TEXT NOT NULL,
      content_id TEXT NOT NULL,
      episode_id TEXT NOT NULL,
      term TEXT NOT NULL,
      seen_count INTEGER NOT NULL DEFAULT 0,
      correct_count INTEGER NOT NULL DEFAULT 0,
      wrong_count INTEGER NOT NULL DEFAULT 0,
      last_seen_at TEXT NOT NULL,
      PRIMARY KEY (user_id, content_id, episode_id, term)
    );

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_occurrences_episode
      ON vocab_occurrences(content_id, episode_id);
    CREATE INDEX IF NOT EXISTS idx_occurrences_term ON vocab_occurrences(term);
    CREATE INDEX IF NOT EXISTS idx_vocabulary_term ON vocabulary(surface_term);
    CREATE INDEX IF NOT EXISTS idx_word_status_user
      ON word_status(user_id, content_id, episode_id);
    CREATE INDEX IF NOT EXISTS idx_quiz_stats_user
      ON user_quiz_stats(user_id, content_id, episode_id);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: per-occurrence admin overrides
  add_column_if_missing(conn, "vocab_occurrences", "meaning_override", "TEXT")?;
  add_column_if_missing(conn, "vocab_occurrences", "is_corrupt_override", "INTEGER")?;

  // Migration: corruption flag on canonical vocabulary
  add_column_if_missing(conn, "vocabulary", "is_corrupt", "INTEGER NOT NULL DEFAULT 0")?;

  Ok(())
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}
