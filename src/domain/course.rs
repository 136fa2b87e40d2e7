use serde::{Deserialize, Serialize};

use super::result::Difficulty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub subject: String,
  pub teacher_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
  pub id: String,
  pub course_id: String,
  pub title: String,
  /// Position within the course (0-based)
  pub position: i64,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
}

/// A student's progress in one course
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
  pub completed_lessons: Vec<String>,
  pub quiz_scores: Vec<u8>,
}

impl CourseProgress {
  /// Mean quiz score, 0.0 with no scores
  pub fn average_score(&self) -> f64 {
    if self.quiz_scores.is_empty() {
      return 0.0;
    }
    let total: u32 = self.quiz_scores.iter().map(|&s| s as u32).sum();
    total as f64 / self.quiz_scores.len() as f64
  }
}
