//! In-memory storage for quiz attempts.
//!
//! Attempts are keyed by a random attempt id and owned by the user who
//! started them. They expire after a period of inactivity.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::QuizSession;
use crate::config;

/// An attempt shared between concurrent requests. The lock is never held
/// across an await.
pub type SharedSession = Arc<Mutex<QuizSession>>;

/// Attempt entry with last access time for expiration
struct AttemptEntry {
  owner_id: i64,
  session: SharedSession,
  last_access: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct AttemptStore {
  attempts: Arc<Mutex<HashMap<String, AttemptEntry>>>,
}

impl AttemptStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a new attempt and return its id
  pub fn insert(&self, session: QuizSession) -> String {
    let attempt_id = generate_attempt_id();
    let owner_id = session.user().user_id;
    let mut attempts = self.lock();

    // Clean up expired attempts occasionally (~10% chance)
    if rand::random::<u8>() < config::ATTEMPT_CLEANUP_THRESHOLD {
      cleanup_expired(&mut attempts);
    }

    attempts.insert(
      attempt_id.clone(),
      AttemptEntry {
        owner_id,
        session: Arc::new(Mutex::new(session)),
        last_access: Utc::now(),
      },
    );
    attempt_id
  }

  /// Get an attempt owned by `user_id`. Attempts of other users are
  /// reported as missing.
  pub fn get(&self, attempt_id: &str, user_id: i64) -> Option<SharedSession> {
    let mut attempts = self.lock();
    let entry = attempts.get_mut(attempt_id)?;
    if entry.owner_id != user_id {
      return None;
    }
    entry.last_access = Utc::now();
    Some(entry.session.clone())
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AttemptEntry>> {
    // Entries stay consistent even if a holder panicked
    self.attempts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

/// Clean up expired attempts
fn cleanup_expired(attempts: &mut HashMap<String, AttemptEntry>) {
  let expiry = Utc::now() - Duration::hours(config::ATTEMPT_EXPIRY_HOURS);
  attempts.retain(|_, entry| entry.last_access > expiry);
}

/// Generate a new attempt ID
pub fn generate_attempt_id() -> String {
  use rand::Rng;
  let mut rng = rand::rng();
  (0..32)
    .map(|_| {
      let idx = rng.random_range(0..36);
      if idx < 10 {
        (b'0' + idx) as char
      } else {
        (b'a' + idx - 10) as char
      }
    })
    .collect()
}
