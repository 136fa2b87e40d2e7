//! Schema for app.db with version-gated migrations.
//!
//! Each migration:
//! 1. Checks if the current schema version is less than the target version
//! 2. Runs its SQL
//! 3. Records the new version in the `db_version` table
//!
//! Migrations only run once; the version check makes `run_migrations`
//! idempotent.

use chrono::Utc;
use rusqlite::{params, Connection, Result};

/// Current schema version for app.db
/// Increment this when adding a new migration
pub const APP_DB_VERSION: i32 = 4;

/// Bring the schema up to `APP_DB_VERSION`
pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Bootstrap: ensure db_version table exists (needed to check version)
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS db_version (
      version INTEGER PRIMARY KEY,
      applied_at TEXT NOT NULL,
      description TEXT
    );
    "#,
  )?;

  let current_version = get_schema_version(conn)?;
  tracing::debug!("app.db schema version: {}", current_version);

  if current_version < 1 {
    migrate_v0_to_v1(conn)?;
  }
  if current_version < 2 {
    migrate_v1_to_v2(conn)?;
  }
  if current_version < 3 {
    migrate_v2_to_v3(conn)?;
  }
  if current_version < 4 {
    migrate_v3_to_v4(conn)?;
  }

  Ok(())
}

// ============================================================
// VERSION-GATED MIGRATIONS
// ============================================================

/// v0→v1: users and sessions
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v0→v1: Create users and sessions");

  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      username TEXT NOT NULL UNIQUE COLLATE NOCASE,
      role TEXT NOT NULL DEFAULT 'student',
      created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
      id TEXT PRIMARY KEY,
      user_id INTEGER NOT NULL,
      created_at TEXT NOT NULL,
      expires_at TEXT NOT NULL,
      last_access_at TEXT NOT NULL,
      FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
    CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
    "#,
  )?;

  record_version(conn, 1, "Create users and sessions")?;
  Ok(())
}

/// v1→v2: courses, lessons and quizzes
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v1→v2: Create course content tables");

  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS courses (
      id TEXT PRIMARY KEY,
      title TEXT NOT NULL,
      description TEXT,
      subject TEXT NOT NULL,
      teacher_id INTEGER NOT NULL,
      created_at TEXT NOT NULL,
      FOREIGN KEY (teacher_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS lessons (
      id TEXT PRIMARY KEY,
      course_id TEXT NOT NULL,
      title TEXT NOT NULL,
      position INTEGER NOT NULL,
      FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
    );

    -- Questions are stored as a JSON array; quizzes are immutable once published
    CREATE TABLE IF NOT EXISTS quizzes (
      id TEXT PRIMARY KEY,
      course_id TEXT NOT NULL,
      title TEXT NOT NULL,
      description TEXT,
      subject TEXT,
      questions TEXT NOT NULL,
      created_at TEXT NOT NULL,
      FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(course_id, position);
    CREATE INDEX IF NOT EXISTS idx_quizzes_course ON quizzes(course_id);
    "#,
  )?;

  record_version(conn, 2, "Create courses, lessons and quizzes")?;
  Ok(())
}

/// v2→v3: quiz results and per-course progress
fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v2→v3: Create results and progress tables");

  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS results (
      id TEXT PRIMARY KEY,
      student_id INTEGER NOT NULL,
      quiz_id TEXT NOT NULL,
      course_id TEXT NOT NULL,
      score INTEGER NOT NULL,
      total_questions INTEGER NOT NULL,
      questions TEXT NOT NULL,
      recommendations TEXT NOT NULL,
      submitted_at TEXT NOT NULL,
      timestamp_ms INTEGER NOT NULL,
      FOREIGN KEY (student_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS course_progress (
      student_id INTEGER NOT NULL,
      course_id TEXT NOT NULL,
      completed_lessons TEXT NOT NULL DEFAULT '[]',
      quiz_scores TEXT NOT NULL DEFAULT '[]',
      updated_at TEXT NOT NULL,
      PRIMARY KEY (student_id, course_id)
    );

    CREATE INDEX IF NOT EXISTS idx_results_student ON results(student_id, timestamp_ms);
    "#,
  )?;

  record_version(conn, 3, "Create results and course_progress")?;
  Ok(())
}

/// v3→v4: resource catalogue and lesson difficulty
fn migrate_v3_to_v4(conn: &Connection) -> Result<()> {
  tracing::info!("Running migration v3→v4: Add resource catalogue");

  add_column_if_missing(conn, "lessons", "difficulty", "TEXT")?;

  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS resources (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      title TEXT NOT NULL,
      subject TEXT NOT NULL,
      difficulty TEXT NOT NULL,
      kind TEXT NOT NULL,
      url TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_resources_subject ON resources(subject, difficulty);
    "#,
  )?;

  record_version(conn, 4, "Add resources and lesson difficulty")?;
  Ok(())
}

// ============================================================
// MIGRATION HELPERS
// ============================================================

/// Record a schema version after successful migration
fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
  let now = Utc::now().to_rfc3339();
  conn.execute(
    "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
    params![version, now, description],
  )?;
  tracing::info!("Recorded schema version {} - {}", version, description);
  Ok(())
}

/// Get current schema version (0 if no versions recorded)
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
  conn.query_row(
    "SELECT COALESCE(MAX(version), 0) FROM db_version",
    [],
    |row| row.get(0),
  )
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
