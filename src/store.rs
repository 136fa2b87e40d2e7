//! Persistence ports used by quiz sessions, and their SQLite adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::{self, try_lock, DbLockError, DbPool};
use crate::domain::{Quiz, QuizResult, Resource};

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("Database unavailable")]
  LockPoisoned,

  #[error("Stored data is corrupt: {0}")]
  Corrupt(String),
}

impl From<DbLockError> for StoreError {
  fn from(_: DbLockError) -> Self {
    Self::LockPoisoned
  }
}

/// Undecodable column data is reported as corruption rather than a query failure
fn classify(err: rusqlite::Error) -> StoreError {
  match err {
    rusqlite::Error::FromSqlConversionFailure(column, _, e) => {
      StoreError::Corrupt(format!("column {}: {}", column, e))
    }
    other => StoreError::Database(other),
  }
}

#[async_trait]
pub trait QuizStore: Send + Sync {
  async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
  /// Persist a result and return its id. Saving an already stored result
  /// leaves the stored copy in place.
  async fn save_result(&self, result: &QuizResult) -> Result<String, StoreError>;
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
  async fn resources_for(&self, subject: &str) -> Result<Vec<Resource>, StoreError>;
}

/// All three ports over the shared application database
#[derive(Clone)]
pub struct SqliteStore {
  db: DbPool,
}

impl SqliteStore {
  pub fn new(db: DbPool) -> Self {
    Self { db }
  }
}

#[async_trait]
impl QuizStore for SqliteStore {
  async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
    let conn = try_lock(&self.db)?;
    db::get_quiz(&conn, quiz_id).map_err(classify)
  }
}

#[async_trait]
impl ResultStore for SqliteStore {
  async fn save_result(&self, result: &QuizResult) -> Result<String, StoreError> {
    let conn = try_lock(&self.db)?;
    if !db::insert_result(&conn, result)? {
      tracing::debug!("Result {} already stored", result.id);
    }
    Ok(result.id.clone())
  }
}

#[async_trait]
impl ResourceStore for SqliteStore {
  async fn resources_for(&self, subject: &str) -> Result<Vec<Resource>, StoreError> {
    let conn = try_lock(&self.db)?;
    db::resources_for_subject(&conn, subject).map_err(classify)
  }
}
