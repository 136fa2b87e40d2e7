//! Deterministic grading for quiz answers.
//!
//! Objective questions (multiple choice, true/false) are always graded here.
//! Short answers are normally graded by the AI service; this module is the
//! local fallback used whenever that service fails, times out, or returns
//! something unusable. Every function is pure and always produces a grade.

pub mod similarity;

use serde::{Deserialize, Serialize};

use crate::domain::{option_index, Question, QuestionKind};

pub use similarity::{jaccard_similarity, normalize, similarity_score, word_set};

/// Score and feedback for a single answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
  /// 0..=100
  pub score: u8,
  pub feedback: String,
  pub strengths: Option<String>,
  pub improvements: Option<String>,
}

impl Grade {
  fn new(score: u8, feedback: impl Into<String>, strengths: &str, improvements: &str) -> Self {
    Self {
      score,
      feedback: feedback.into(),
      strengths: Some(strengths.to_string()),
      improvements: Some(improvements.to_string()),
    }
  }
}

// ============================================================================
// Question grading
// ============================================================================

/// Grade an answer without any remote service.
///
/// Short answers go through the word-overlap heuristic, so this doubles as
/// the fallback for AI grading.
pub fn grade_objective(question: &Question, student_answer: &str) -> Grade {
  match &question.kind {
    QuestionKind::MultipleChoice {
      options,
      correct_option,
    } => grade_multiple_choice(options, correct_option, student_answer),
    QuestionKind::TrueFalse { correct_answer } => grade_true_false(correct_answer, student_answer),
    QuestionKind::ShortAnswer {
      reference_answer, ..
    } => grade_short_answer(reference_answer, student_answer),
  }
}

/// Exact, case-sensitive comparison of option letters
fn grade_multiple_choice(options: &[String], correct_option: &str, student_answer: &str) -> Grade {
  if student_answer == correct_option {
    return Grade::new(
      100,
      "Correct! Great job!",
      "You selected the right answer!",
      "Keep up the excellent work!",
    );
  }

  let correct_text = option_index(correct_option).and_then(|i| options.get(i));
  let feedback = match correct_text {
    Some(text) => format!("Incorrect. The correct answer is: {} ({})", correct_option, text),
    None => format!("Incorrect. The correct answer is: {}", correct_option),
  };
  Grade::new(
    0,
    feedback,
    "You attempted the question.",
    "Review the lesson material and try again.",
  )
}

/// Case-insensitive comparison of "true"/"false"
fn grade_true_false(correct_answer: &str, student_answer: &str) -> Grade {
  if normalize(student_answer) == normalize(correct_answer) {
    Grade::new(
      100,
      "Correct! Well done!",
      "You understood the concept correctly!",
      "Excellent understanding!",
    )
  } else {
    Grade::new(
      0,
      format!("Incorrect. The correct answer is: {}", correct_answer),
      "You made an attempt.",
      "Please review the lesson content.",
    )
  }
}

/// Exact match short-circuits to 100; otherwise score by word overlap
pub fn grade_short_answer(reference_answer: &str, student_answer: &str) -> Grade {
  let student = normalize(student_answer);
  if !student.is_empty() && student == normalize(reference_answer) {
    return Grade::new(
      100,
      "Perfect answer!",
      "Excellent understanding of the concept.",
      "Keep up the great work!",
    );
  }

  let score = similarity_score(&student, reference_answer);
  let (feedback, strengths, improvements) = match score {
    80.. => (
      "Great answer! You covered most of the key points.",
      "Good understanding of the main concepts.",
      "Consider adding more specific details.",
    ),
    60..=79 => (
      "Good attempt! Consider including more key concepts.",
      "You're on the right track.",
      "Review the lesson material for more details.",
    ),
    40..=59 => (
      "You're on the right track. Review the material and try again.",
      "You attempted to answer the question.",
      "Please review the lesson material thoroughly.",
    ),
    _ => (
      "Please review the lesson material and try again.",
      "You submitted an answer.",
      "Study the lesson content and try again.",
    ),
  };
  Grade::new(score, feedback, strengths, improvements)
}

// ============================================================================
// Aggregation
// ============================================================================

/// Overall quiz score: the mean of question scores, rounded half up.
/// `None` for an empty list.
pub fn aggregate_score(scores: &[u8]) -> Option<u8> {
  if scores.is_empty() {
    return None;
  }
  let total: u32 = scores.iter().map(|&s| s as u32).sum();
  Some((total as f64 / scores.len() as f64).round() as u8)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mcq() -> Question {
    Question::multiple_choice("q1", "What is 5 + 3?", &["6", "7", "8", "9"], "C")
  }

  fn tf(answer: bool) -> Question {
    Question::true_false("q2", "Zero is a natural number.", answer)
  }

  fn short(reference: &str) -> Question {
    Question::short_answer("q3", "Explain.", reference, &[])
  }

  // Multiple choice

  #[test]
  fn test_mcq_correct_letter() {
    let grade = grade_objective(&mcq(), "C");
    assert_eq!(grade.score, 100);
    assert_eq!(grade.feedback, "Correct! Great job!");
  }

  #[test]
  fn test_mcq_is_case_sensitive() {
    assert_eq!(grade_objective(&mcq(), "c").score, 0);
    assert_eq!(grade_objective(&mcq(), " C").score, 0);
  }

  #[test]
  fn test_mcq_only_exact_letter_scores() {
    for letter in ["A", "B", "D", "", "8"] {
      assert_eq!(grade_objective(&mcq(), letter).score, 0, "{letter:?}");
    }
  }

  #[test]
  fn test_mcq_wrong_names_correct_option() {
    let grade = grade_objective(&mcq(), "A");
    assert_eq!(grade.feedback, "Incorrect. The correct answer is: C (8)");
  }

  // True / false

  #[test]
  fn test_true_false_case_insensitive() {
    let q = tf(true);
    for answer in ["True", "true", "TRUE", " true "] {
      assert_eq!(grade_objective(&q, answer).score, 100, "{answer:?}");
    }
    assert_eq!(grade_objective(&q, "false").score, 0);
  }

  #[test]
  fn test_true_false_wrong_feedback() {
    let grade = grade_objective(&tf(false), "true");
    assert_eq!(grade.score, 0);
    assert_eq!(grade.feedback, "Incorrect. The correct answer is: false");
  }

  // Short answer

  #[test]
  fn test_short_answer_exact_match_short_circuits() {
    let grade = grade_objective(&short("Repeated addition"), "  repeated ADDITION ");
    assert_eq!(grade.score, 100);
    assert_eq!(grade.feedback, "Perfect answer!");
  }

  #[test]
  fn test_short_answer_self_similarity_is_full_marks() {
    let text = "machine learning is a subset of ai";
    assert_eq!(grade_short_answer(text, text).score, 100);
    assert_eq!(grade_short_answer(text, text).feedback, "Perfect answer!");
  }

  #[test]
  fn test_short_answer_empty_answer_is_defined() {
    let grade = grade_objective(&short("repeated addition"), "");
    assert_eq!(grade.score, 0);
    assert_eq!(grade.feedback, "Please review the lesson material and try again.");
  }

  #[test]
  fn test_short_answer_empty_reference_and_answer() {
    let grade = grade_short_answer("", "");
    assert_eq!(grade.score, 0);
  }

  #[test]
  fn test_short_answer_bands() {
    // 4 of 5 words shared = 80
    let high = grade_short_answer("a b c d e", "a b c d");
    assert_eq!(high.score, 80);
    assert!(high.feedback.starts_with("Great answer!"));

    // 2 of 3 = 67
    let good = grade_short_answer("a b c", "a b");
    assert_eq!(good.score, 67);
    assert!(good.feedback.starts_with("Good attempt!"));

    // 1 of 2 = 50
    let mid = grade_short_answer("a b", "a");
    assert_eq!(mid.score, 50);
    assert!(mid.feedback.starts_with("You're on the right track."));

    // 1 of 3 = 33
    let low = grade_short_answer("a b", "b c");
    assert_eq!(low.score, 33);
    assert!(low.feedback.starts_with("Please review"));
  }

  #[test]
  fn test_short_answer_scenario_score() {
    let grade = grade_short_answer(
      "machine learning is a subset of ai",
      "ai is used to build machines",
    );
    assert_eq!(grade.score, 18);
    assert!(grade.score < 100);
  }

  #[test]
  fn test_grades_always_carry_feedback() {
    let questions = [mcq(), tf(true), short("x y")];
    for q in &questions {
      for answer in ["", "x", "TRUE", "C"] {
        let grade = grade_objective(q, answer);
        assert!(grade.score <= 100);
        assert!(!grade.feedback.is_empty());
        assert!(grade.strengths.is_some());
        assert!(grade.improvements.is_some());
      }
    }
  }

  // Aggregation

  #[test]
  fn test_aggregate_mean_rounded() {
    assert_eq!(aggregate_score(&[100, 0, 50]), Some(50));
    assert_eq!(aggregate_score(&[0, 100, 18]), Some(39));
    assert_eq!(aggregate_score(&[100, 0]), Some(50));
    // 50.5 rounds up
    assert_eq!(aggregate_score(&[100, 1]), Some(51));
    assert_eq!(aggregate_score(&[100]), Some(100));
  }

  #[test]
  fn test_aggregate_empty() {
    assert_eq!(aggregate_score(&[]), None);
  }
}
