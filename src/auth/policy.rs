//! The single role gate for quiz actions.

use thiserror::Error;

use crate::domain::{Role, UserContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  /// Start and submit a quiz attempt
  TakeQuiz,
  /// See a quiz with its answers, without grading
  PreviewQuiz,
  /// Create quizzes
  ManageQuizzes,
  /// Create courses and their lessons
  ManageCourses,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Forbidden(pub &'static str);

pub fn authorize(user: &UserContext, action: Action) -> Result<(), Forbidden> {
  match (action, user.role) {
    (Action::TakeQuiz, Role::Student) => Ok(()),
    (Action::TakeQuiz, Role::Teacher) => Err(Forbidden(
      "Teachers cannot take quizzes. Use the preview mode from the course page.",
    )),
    (Action::PreviewQuiz | Action::ManageQuizzes | Action::ManageCourses, Role::Teacher) => Ok(()),
    (Action::PreviewQuiz, Role::Student) => Err(Forbidden("Only teachers can preview quizzes.")),
    (Action::ManageQuizzes, Role::Student) => Err(Forbidden("Only teachers can manage quizzes.")),
    (Action::ManageCourses, Role::Student) => Err(Forbidden("Only teachers can manage courses.")),
  }
}
