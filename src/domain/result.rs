use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::Question;

/// Which path produced a grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSource {
  /// Deterministic local grader
  Local,
  /// Hosted AI grading service
  Ai,
}

/// One question after grading. Created once at submission, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedQuestion {
  #[serde(flatten)]
  pub question: Question,
  pub student_answer: String,
  /// 0..=100
  pub score: u8,
  pub feedback: String,
  #[serde(default)]
  pub strengths: Option<String>,
  #[serde(default)]
  pub improvements: Option<String>,
  pub graded_by: GradeSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
}

impl Priority {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::High => "high",
      Self::Medium => "medium",
      Self::Low => "low",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "high" => Some(Self::High),
      "medium" => Some(Self::Medium),
      "low" => Some(Self::Low),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
  /// remedial, practice, advanced, study, resource, next, ...
  pub kind: String,
  pub title: String,
  pub description: String,
  pub priority: Priority,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  pub ai_generated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "easy",
      Self::Medium => "medium",
      Self::Hard => "hard",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }
}

/// Study resource from the catalogue (video, worksheet, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
  pub id: i64,
  pub title: String,
  pub subject: String,
  pub difficulty: Difficulty,
  pub kind: String,
  pub url: String,
}

/// Final record of one quiz attempt. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
  pub id: String,
  pub student_id: i64,
  pub quiz_id: String,
  pub course_id: String,
  pub score: u8,
  pub total_questions: usize,
  pub questions: Vec<GradedQuestion>,
  pub submitted_at: DateTime<Utc>,
  /// Milliseconds since the epoch, for sorting
  pub timestamp_ms: i64,
  pub date: String,
  pub time: String,
  pub recommendations: Vec<String>,
}

impl QuizResult {
  /// Assemble a result stamped with `submitted_at`
  pub fn new(
    student_id: i64,
    quiz_id: &str,
    course_id: &str,
    score: u8,
    questions: Vec<GradedQuestion>,
    recommendations: &[Recommendation],
    submitted_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: uuid::Uuid::new_v4().to_string(),
      student_id,
      quiz_id: quiz_id.to_string(),
      course_id: course_id.to_string(),
      score,
      total_questions: questions.len(),
      questions,
      submitted_at,
      timestamp_ms: submitted_at.timestamp_millis(),
      date: submitted_at.format("%Y-%m-%d").to_string(),
      time: submitted_at.format("%H:%M:%S").to_string(),
      recommendations: recommendations.iter().map(|r| r.title.clone()).collect(),
    }
  }
}
