//! Validation of quiz definitions before they are published.
//!
//! Quizzes are immutable once stored, so everything grading relies on is
//! checked up front:
//! - title present, at least one question, unique question ids
//! - multiple choice: at least two options, correct letter names one of them
//! - true/false: correct answer is "true" or "false"
//! - short answer: non-empty reference answer

use std::collections::HashSet;

use crate::domain::{option_index, QuestionKind, Quiz};

/// All problems found in `quiz`; empty when it can be published
pub fn validate_quiz(quiz: &Quiz) -> Vec<String> {
  let mut problems = Vec::new();

  if quiz.title.trim().is_empty() {
    problems.push("Quiz title is required".to_string());
  }
  if quiz.course_id.trim().is_empty() {
    problems.push("Course is required".to_string());
  }
  if quiz.questions.is_empty() {
    problems.push("Quiz needs at least one question".to_string());
  }

  let mut seen = HashSet::new();
  for (i, question) in quiz.questions.iter().enumerate() {
    let label = format!("Question {}", i + 1);

    if question.id.trim().is_empty() {
      problems.push(format!("{}: id is required", label));
    } else if !seen.insert(question.id.as_str()) {
      problems.push(format!("{}: duplicate id '{}'", label, question.id));
    }
    if question.prompt.trim().is_empty() {
      problems.push(format!("{}: prompt is required", label));
    }

    match &question.kind {
      QuestionKind::MultipleChoice {
        options,
        correct_option,
      } => {
        if options.len() < 2 {
          problems.push(format!("{}: needs at least two options", label));
        }
        if options.iter().any(|o| o.trim().is_empty()) {
          problems.push(format!("{}: options cannot be blank", label));
        }
        match option_index(correct_option) {
          Some(index) if index < options.len() => {}
          _ => problems.push(format!(
            "{}: correct option '{}' is not one of the options",
            label, correct_option
          )),
        }
      }
      QuestionKind::TrueFalse { correct_answer } => {
        if correct_answer != "true" && correct_answer != "false" {
          problems.push(format!("{}: answer must be 'true' or 'false'", label));
        }
      }
      QuestionKind::ShortAnswer {
        reference_answer, ..
      } => {
        if reference_answer.trim().is_empty() {
          problems.push(format!("{}: reference answer is required", label));
        }
      }
    }
  }

  problems
}
