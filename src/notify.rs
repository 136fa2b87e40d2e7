//! Progress events published after quizzes are graded and saved.
//!
//! Producers get a `ProgressEvents` handle at construction; anything that
//! cares about progress subscribes to the same handle. Broadcast subscribers
//! may lag and miss events, so the progress recorder gets its own unbounded
//! feed of saved results instead.

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::config;
use crate::db::{self, try_lock, DbPool, LogOnError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
  QuizGraded {
    student_id: i64,
    quiz_id: String,
    score: u8,
  },
  ResultSaved {
    result_id: String,
    student_id: i64,
    course_id: String,
    quiz_id: String,
    score: u8,
  },
}

#[derive(Clone)]
pub struct ProgressEvents {
  sender: broadcast::Sender<ProgressEvent>,
  recorder: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressEvents {
  pub fn new() -> Self {
    let (sender, _) = broadcast::channel(config::EVENT_CHANNEL_CAPACITY);
    Self { sender, recorder: None }
  }

  /// Events plus the receiving end of the recorder feed, for `record_progress`
  pub fn with_recorder() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (recorder, saved) = mpsc::unbounded_channel();
    let events = Self {
      recorder: Some(recorder),
      ..Self::new()
    };
    (events, saved)
  }

  /// Publish to current subscribers. Having none is fine.
  pub fn publish(&self, event: ProgressEvent) {
    if let (Some(recorder), ProgressEvent::ResultSaved { result_id, .. }) = (&self.recorder, &event) {
      if recorder.send(event.clone()).is_err() {
        tracing::warn!("Progress recorder is gone; result {} not recorded", result_id);
      }
    }
    let delivered = self.sender.send(event).unwrap_or(0);
    tracing::debug!("Progress event delivered to {} subscriber(s)", delivered);
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
    self.sender.subscribe()
  }
}

impl Default for ProgressEvents {
  fn default() -> Self {
    Self::new()
  }
}

/// Record saved quiz scores into course progress until every sender is dropped
pub async fn record_progress(mut saved: mpsc::UnboundedReceiver<ProgressEvent>, db: DbPool) {
  while let Some(event) = saved.recv().await {
    let ProgressEvent::ResultSaved {
      student_id,
      course_id,
      score,
      ..
    } = event
    else {
      continue;
    };
    let Some(conn) = try_lock(&db).log_warn("Progress recorder") else {
      continue;
    };
    db::record_quiz_score(&conn, student_id, &course_id, score)
      .log_warn("Failed to record quiz score");
  }
}
