//! Rule-based recommendations and learning-path guidance.
//!
//! Used as the fallback when AI recommendations are unavailable, and for
//! next-lesson guidance from course progress.

use serde::Serialize;

use crate::domain::{CourseProgress, Difficulty, Lesson, Priority, Recommendation, Resource};

/// Catalogue resources suggested alongside the tier recommendation
const MAX_RESOURCE_SUGGESTIONS: usize = 3;

/// Performance tier derived from a quiz score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
  Remedial,
  Practice,
  Advanced,
}

impl ScoreTier {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Remedial => "remedial",
      Self::Practice => "practice",
      Self::Advanced => "advanced",
    }
  }

  /// Resource difficulty that suits a student in this tier
  pub fn resource_difficulty(&self) -> Difficulty {
    match self {
      Self::Remedial => Difficulty::Easy,
      Self::Practice => Difficulty::Medium,
      Self::Advanced => Difficulty::Hard,
    }
  }
}

/// <50 remedial, 50-79 practice, 80+ advanced
pub fn score_tier(score: u8) -> ScoreTier {
  match score {
    0..=49 => ScoreTier::Remedial,
    50..=79 => ScoreTier::Practice,
    _ => ScoreTier::Advanced,
  }
}

/// Recommendations from the score tier alone, plus matching resources from
/// the catalogue for the quiz subject.
pub fn fallback_recommendations(score: u8, subject: &str, resources: &[Resource]) -> Vec<Recommendation> {
  let tier = score_tier(score);

  let (title, description, priority) = match tier {
    ScoreTier::Remedial => (
      "Review Basic Concepts",
      "Focus on fundamental concepts before moving forward",
      Priority::High,
    ),
    ScoreTier::Practice => (
      "Practice More Problems",
      "Try additional practice problems to strengthen your understanding",
      Priority::Medium,
    ),
    ScoreTier::Advanced => (
      "Challenge Yourself",
      "You're ready for more advanced topics!",
      Priority::Low,
    ),
  };

  let mut recommendations = vec![Recommendation {
    kind: tier.as_str().to_string(),
    title: title.to_string(),
    description: description.to_string(),
    priority,
    url: None,
    ai_generated: false,
  }];

  let difficulty = tier.resource_difficulty();
  let resource_priority = if tier == ScoreTier::Remedial {
    Priority::High
  } else {
    Priority::Medium
  };

  recommendations.extend(
    resources
      .iter()
      .filter(|r| r.subject == subject && r.difficulty == difficulty)
      .take(MAX_RESOURCE_SUGGESTIONS)
      .map(|r| Recommendation {
        kind: "resource".to_string(),
        title: r.title.clone(),
        description: format!("Recommended {} for {} level", r.kind, r.difficulty.as_str()),
        priority: resource_priority,
        url: Some(r.url.clone()),
        ai_generated: false,
      }),
  );

  recommendations
}

// ==================== Learning path ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
  Beginner,
  Remedial,
  Standard,
  Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningPath {
  pub path: PathKind,
  pub next_lesson: Option<Lesson>,
  pub message: String,
}

/// Suggest the next lesson from a student's progress.
///
/// Lessons are considered in course order; weak averages steer toward an
/// easy pending lesson and strong averages toward a hard one.
pub fn learning_path(progress: &CourseProgress, lessons: &[Lesson]) -> LearningPath {
  let mut pending: Vec<&Lesson> = lessons
    .iter()
    .filter(|l| !progress.completed_lessons.contains(&l.id))
    .collect();
  pending.sort_by_key(|l| l.position);

  let first = pending.first().map(|l| (*l).clone());
  let with_difficulty = |difficulty: Difficulty| {
    pending
      .iter()
      .find(|l| l.difficulty == Some(difficulty))
      .map(|l| (*l).clone())
      .or_else(|| first.clone())
  };

  if progress.completed_lessons.is_empty() {
    return LearningPath {
      path: PathKind::Beginner,
      next_lesson: first,
      message: "Welcome! Start with the first lesson to begin your learning journey.".to_string(),
    };
  }

  let average = progress.average_score();
  if average < 60.0 {
    LearningPath {
      path: PathKind::Remedial,
      next_lesson: with_difficulty(Difficulty::Easy),
      message: "Consider reviewing previous lessons before continuing.".to_string(),
    }
  } else if average < 80.0 {
    LearningPath {
      path: PathKind::Standard,
      next_lesson: first,
      message: "Great progress! Continue with the next lesson.".to_string(),
    }
  } else {
    LearningPath {
      path: PathKind::Advanced,
      next_lesson: with_difficulty(Difficulty::Hard),
      message: "Excellent work! You're ready for more challenging content.".to_string(),
    }
  }
}
