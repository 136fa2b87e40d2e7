//! Quiz attempt state machine.
//!
//! An attempt moves `Active → Submitting → Graded`. Answers and navigation
//! only change while `Active`; `begin_submit` is the single gate into
//! `Submitting`, so a double submit can never grade or persist twice.

pub mod attempts;
pub mod submit;

use serde::Serialize;
use thiserror::Error;

use crate::auth::policy::{self, Action, Forbidden};
use crate::domain::{AnswerMap, QuestionView, Quiz, QuizResult, Recommendation, UserContext};
use crate::store::{QuizStore, StoreError};

pub use attempts::{generate_attempt_id, AttemptStore, SharedSession};
pub use submit::{grade_all, retry_save, submit, Persistence, Services, SubmitGuard, SubmitOutcome};

/// Errors that prevent an attempt from starting
#[derive(Error, Debug)]
pub enum SessionError {
  #[error("Quiz not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Forbidden(#[from] Forbidden),

  #[error("Quiz has no questions")]
  EmptyQuiz,

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Errors from changing an attempt in the wrong phase
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
  #[error("Quiz is already being submitted")]
  AlreadySubmitting,

  #[error("Quiz has already been graded")]
  AlreadyGraded,

  #[error("Quiz can no longer be changed")]
  NotActive,

  #[error("Quiz has not been graded yet")]
  NotGraded,

  #[error("Result has already been saved")]
  AlreadySaved,

  #[error("Unknown question: {0}")]
  UnknownQuestion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Active,
  Submitting,
  Graded,
}

/// Grading output kept on the attempt once it reaches `Graded`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedAttempt {
  pub result: QuizResult,
  pub recommendations: Vec<Recommendation>,
  /// Id returned by the result store, once the result is persisted
  pub saved_id: Option<String>,
}

/// What `begin_submit` hands to grading: an immutable copy of the attempt
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
  pub quiz: Quiz,
  pub user: UserContext,
  pub answers: AnswerMap,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
  quiz: Quiz,
  user: UserContext,
  answers: AnswerMap,
  current_index: usize,
  phase: Phase,
  graded: Option<GradedAttempt>,
}

impl QuizSession {
  /// Load a quiz and open an attempt on it for `user`
  pub async fn start(
    quizzes: &dyn QuizStore,
    user: &UserContext,
    quiz_id: &str,
  ) -> Result<Self, SessionError> {
    policy::authorize(user, Action::TakeQuiz)?;

    let quiz = quizzes
      .get_quiz(quiz_id)
      .await?
      .ok_or_else(|| SessionError::NotFound(quiz_id.to_string()))?;

    Self::from_quiz(quiz, user)
  }

  pub fn from_quiz(quiz: Quiz, user: &UserContext) -> Result<Self, SessionError> {
    if quiz.questions.is_empty() {
      return Err(SessionError::EmptyQuiz);
    }

    Ok(Self {
      answers: AnswerMap::for_questions(&quiz.questions),
      quiz,
      user: user.clone(),
      current_index: 0,
      phase: Phase::Active,
      graded: None,
    })
  }

  pub fn quiz(&self) -> &Quiz {
    &self.quiz
  }

  pub fn user(&self) -> &UserContext {
    &self.user
  }

  pub fn answers(&self) -> &AnswerMap {
    &self.answers
  }

  pub fn current_index(&self) -> usize {
    self.current_index
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn graded(&self) -> Option<&GradedAttempt> {
    self.graded.as_ref()
  }

  fn ensure_active(&self) -> Result<(), SubmitError> {
    match self.phase {
      Phase::Active => Ok(()),
      _ => Err(SubmitError::NotActive),
    }
  }

  /// Record an answer. Any string is accepted, including empty.
  pub fn set_answer(&mut self, question_id: &str, value: impl Into<String>) -> Result<(), SubmitError> {
    self.ensure_active()?;
    if self.answers.set(question_id, value.into()) {
      Ok(())
    } else {
      Err(SubmitError::UnknownQuestion(question_id.to_string()))
    }
  }

  /// Move forward; stays put on the last question
  pub fn next(&mut self) -> Result<(), SubmitError> {
    self.ensure_active()?;
    if self.current_index + 1 < self.quiz.questions.len() {
      self.current_index += 1;
    }
    Ok(())
  }

  /// Move back; stays put on the first question
  pub fn previous(&mut self) -> Result<(), SubmitError> {
    self.ensure_active()?;
    self.current_index = self.current_index.saturating_sub(1);
    Ok(())
  }

  /// Jump to a question; out-of-range indexes are ignored
  pub fn jump_to(&mut self, index: usize) -> Result<(), SubmitError> {
    self.ensure_active()?;
    if index < self.quiz.questions.len() {
      self.current_index = index;
    }
    Ok(())
  }

  /// Enter `Submitting`. Only the first caller gets a snapshot.
  pub fn begin_submit(&mut self) -> Result<SubmissionSnapshot, SubmitError> {
    match self.phase {
      Phase::Active => {
        self.phase = Phase::Submitting;
        Ok(SubmissionSnapshot {
          quiz: self.quiz.clone(),
          user: self.user.clone(),
          answers: self.answers.clone(),
        })
      }
      Phase::Submitting => Err(SubmitError::AlreadySubmitting),
      Phase::Graded => Err(SubmitError::AlreadyGraded),
    }
  }

  /// Back to `Active` after an abandoned submission
  pub(crate) fn abandon_submit(&mut self) {
    if self.phase == Phase::Submitting {
      self.phase = Phase::Active;
    }
  }

  pub(crate) fn complete_submit(&mut self, graded: GradedAttempt) {
    self.phase = Phase::Graded;
    self.graded = Some(graded);
  }

  /// Mark the graded result as persisted. Returns false if it already was.
  pub(crate) fn mark_saved(&mut self, result_id: &str) -> bool {
    match self.graded.as_mut() {
      Some(graded) if graded.saved_id.is_none() => {
        graded.saved_id = Some(result_id.to_string());
        true
      }
      _ => false,
    }
  }

  /// Student-facing state of the attempt
  pub fn view(&self) -> SessionView {
    let current = &self.quiz.questions[self.current_index];
    SessionView {
      quiz_id: self.quiz.id.clone(),
      quiz_title: self.quiz.title.clone(),
      phase: self.phase,
      current_index: self.current_index,
      total_questions: self.quiz.questions.len(),
      answered: self.answers.answered_count(),
      question: QuestionView::from_question(current, self.current_index),
      current_answer: self.answers.answer_for(&current.id).to_string(),
      graded: self.graded.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
  pub quiz_id: String,
  pub quiz_title: String,
  pub phase: Phase,
  pub current_index: usize,
  pub total_questions: usize,
  pub answered: usize,
  pub question: QuestionView,
  pub current_answer: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub graded: Option<GradedAttempt>,
}


#[cfg(test)]
mod tests {
  use super::test_support::*;
  use super::*;

  fn session() -> QuizSession {
    QuizSession::from_quiz(three_question_quiz(), &student()).unwrap()
  }

  #[tokio::test]
  async fn test_start_builds_empty_answer_map() {
    let quizzes = MemoryQuizzes::with(three_question_quiz());
    let session = QuizSession::start(&quizzes, &student(), "quiz-1").await.unwrap();

    assert_eq!(session.phase(), Phase::Active);
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.answers().len(), 3);
    assert!(session.answers().as_map().values().all(String::is_empty));
  }

  #[tokio::test]
  async fn test_start_errors() {
    let quizzes = MemoryQuizzes::with(three_question_quiz());

    assert!(matches!(
      QuizSession::start(&quizzes, &student(), "nope").await,
      Err(SessionError::NotFound(id)) if id == "nope"
    ));
    assert!(matches!(
      QuizSession::start(&quizzes, &teacher(), "quiz-1").await,
      Err(SessionError::Forbidden(_))
    ));

    let mut empty = three_question_quiz();
    empty.id = "empty".into();
    empty.questions.clear();
    let quizzes = MemoryQuizzes::with(empty);
    assert!(matches!(
      QuizSession::start(&quizzes, &student(), "empty").await,
      Err(SessionError::EmptyQuiz)
    ));
  }

  #[test]
  fn test_navigation_clamps_at_ends() {
    let mut s = session();
    s.previous().unwrap();
    assert_eq!(s.current_index(), 0);

    s.next().unwrap();
    s.next().unwrap();
    assert_eq!(s.current_index(), 2);
    s.next().unwrap();
    assert_eq!(s.current_index(), 2);
  }

  #[test]
  fn test_jump_out_of_range_is_noop() {
    let mut s = session();
    s.jump_to(2).unwrap();
    assert_eq!(s.current_index(), 2);
    s.jump_to(3).unwrap();
    s.jump_to(usize::MAX).unwrap();
    assert_eq!(s.current_index(), 2);
  }

  #[test]
  fn test_navigation_ignores_answers() {
    let mut answered = session();
    answered.set_answer("q2", "true").unwrap();
    let mut blank = session();

    for s in [&mut answered, &mut blank] {
      s.next().unwrap();
      s.next().unwrap();
      s.previous().unwrap();
    }
    assert_eq!(answered.current_index(), blank.current_index());
  }

  #[test]
  fn test_set_answer_rejects_unknown_question() {
    let mut s = session();
    s.set_answer("q1", "C").unwrap();
    s.set_answer("q1", "").unwrap();
    assert_eq!(
      s.set_answer("q9", "x"),
      Err(SubmitError::UnknownQuestion("q9".into()))
    );
    assert_eq!(s.answers().len(), 3);
  }

  #[test]
  fn test_begin_submit_only_once() {
    let mut s = session();
    s.set_answer("q1", "C").unwrap();
    let snapshot = s.begin_submit().unwrap();
    assert_eq!(snapshot.answers.answer_for("q1"), "C");

    assert_eq!(s.begin_submit().unwrap_err(), SubmitError::AlreadySubmitting);
    assert_eq!(s.set_answer("q1", "A"), Err(SubmitError::NotActive));
    assert_eq!(s.next(), Err(SubmitError::NotActive));

    s.abandon_submit();
    assert_eq!(s.phase(), Phase::Active);
    s.set_answer("q1", "A").unwrap();
  }

  #[test]
  fn test_view_hides_answers() {
    let s = session();
    let json = serde_json::to_value(s.view()).unwrap();
    assert_eq!(json["question"]["number"], 1);
    assert_eq!(json["question"]["options"][2], "8");
    assert!(json["question"].get("correct_option").is_none());
    assert!(json.get("graded").is_none());
  }
}
