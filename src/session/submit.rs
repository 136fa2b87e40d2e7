//! Submission: grade every question, aggregate, recommend, persist.
//!
//! Grading fans out one future per question and fans back in with
//! `join_all`, which keeps quiz order no matter which call finishes first.
//! AI calls are bounded by a timeout and fall back to local logic on any
//! failure, so once submission starts every question ends up graded.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;

use super::{GradedAttempt, QuizSession, SharedSession, SubmissionSnapshot, SubmitError};
use crate::ai::{with_timeout, AiGrader, AiRecommender, FreeTextRequest, RecommendationRequest};
use crate::db::LogOnError;
use crate::domain::{
  AnswerMap, GradeSource, GradedQuestion, Question, QuestionKind, Quiz, QuizResult, Recommendation,
};
use crate::grading::{self, aggregate_score};
use crate::notify::{ProgressEvent, ProgressEvents};
use crate::recommend::fallback_recommendations;
use crate::store::{QuizStore, ResourceStore, ResultStore};

/// Collaborators an attempt needs, handed in at construction
#[derive(Clone)]
pub struct Services {
  pub quizzes: Arc<dyn QuizStore>,
  pub results: Arc<dyn ResultStore>,
  pub resources: Arc<dyn ResourceStore>,
  pub grader: Arc<dyn AiGrader>,
  pub recommender: Arc<dyn AiRecommender>,
  pub events: ProgressEvents,
  /// Upper bound for each AI call
  pub ai_timeout: Duration,
}

/// Whether the computed result reached the result store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Persistence {
  Saved { result_id: String },
  Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
  pub result: QuizResult,
  pub recommendations: Vec<Recommendation>,
  pub persistence: Persistence,
}

impl SubmitOutcome {
  pub fn is_saved(&self) -> bool {
    matches!(self.persistence, Persistence::Saved { .. })
  }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, QuizSession> {
  session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds an attempt in `Submitting`. Dropping it before `complete` (the
/// request went away mid-grading) reopens the attempt, and nothing is
/// persisted.
pub struct SubmitGuard {
  session: SharedSession,
  armed: bool,
}

impl SubmitGuard {
  pub fn begin(session: &SharedSession) -> Result<(Self, SubmissionSnapshot), SubmitError> {
    let snapshot = lock(session).begin_submit()?;
    let guard = Self {
      session: session.clone(),
      armed: true,
    };
    Ok((guard, snapshot))
  }

  pub fn complete(mut self, graded: GradedAttempt) {
    lock(&self.session).complete_submit(graded);
    self.armed = false;
  }
}

impl Drop for SubmitGuard {
  fn drop(&mut self) {
    if self.armed {
      tracing::info!("Submission abandoned, attempt reopened");
      lock(&self.session).abandon_submit();
    }
  }
}

/// Grade all questions concurrently. The returned list is in quiz order.
pub async fn grade_all(
  quiz: &Quiz,
  answers: &AnswerMap,
  grader: &dyn AiGrader,
  limit: Duration,
) -> Vec<GradedQuestion> {
  let pending = quiz
    .questions
    .iter()
    .map(|question| grade_question(question, answers.answer_for(&question.id), grader, limit));
  join_all(pending).await
}

async fn grade_question(
  question: &Question,
  answer: &str,
  grader: &dyn AiGrader,
  limit: Duration,
) -> GradedQuestion {
  let (grade, graded_by) = match &question.kind {
    // Blank answers score 0 locally; no point asking the AI
    QuestionKind::ShortAnswer {
      reference_answer,
      keywords,
    } if !answer.trim().is_empty() => {
      let request = FreeTextRequest {
        question: &question.prompt,
        reference_answer,
        student_answer: answer,
        keywords,
      };
      match with_timeout(limit, grader.grade_free_text(&request)).await {
        Ok(grade) => (grade, GradeSource::Ai),
        Err(e) => {
          tracing::warn!("AI grading failed for {}, grading locally: {}", question.id, e);
          (grading::grade_objective(question, answer), GradeSource::Local)
        }
      }
    }
    _ => (grading::grade_objective(question, answer), GradeSource::Local),
  };

  GradedQuestion {
    question: question.clone(),
    student_answer: answer.to_string(),
    score: grade.score,
    feedback: grade.feedback,
    strengths: grade.strengths,
    improvements: grade.improvements,
    graded_by,
  }
}

/// AI recommendations, or the score-tier fallback when they are unavailable
async fn recommend(services: &Services, snapshot: &SubmissionSnapshot, score: u8) -> Vec<Recommendation> {
  let subject = snapshot.quiz.subject_or_general();
  let request = RecommendationRequest {
    score,
    subject,
    answers: snapshot.answers.as_map(),
    context: &snapshot.quiz.title,
  };

  match with_timeout(services.ai_timeout, services.recommender.recommend(&request)).await {
    Ok(recommendations) if !recommendations.is_empty() => return recommendations,
    Ok(_) => tracing::warn!("AI returned no recommendations, using fallback"),
    Err(e) => tracing::warn!("AI recommendations failed, using fallback: {}", e),
  }

  let resources = services
    .resources
    .resources_for(subject)
    .await
    .log_warn_default("Failed to load resources for recommendations");
  fallback_recommendations(score, subject, &resources)
}

/// Write the result and record it on the attempt. Only the first successful
/// save of a result publishes `ResultSaved`.
async fn persist(session: &SharedSession, services: &Services, result: &QuizResult) -> Persistence {
  match services.results.save_result(result).await {
    Ok(result_id) => {
      let first_save = lock(session).mark_saved(&result_id);
      if first_save {
        services.events.publish(ProgressEvent::ResultSaved {
          result_id: result_id.clone(),
          student_id: result.student_id,
          course_id: result.course_id.clone(),
          quiz_id: result.quiz_id.clone(),
          score: result.score,
        });
      }
      Persistence::Saved { result_id }
    }
    Err(e) => {
      tracing::warn!("Failed to save result {}: {}", result.id, e);
      Persistence::Failed {
        reason: e.to_string(),
      }
    }
  }
}

/// Grade and persist an attempt.
///
/// A failed save still leaves the attempt `Graded` with its result; use
/// `retry_save` to try the write again.
pub async fn submit(session: &SharedSession, services: &Services) -> Result<SubmitOutcome, SubmitError> {
  let (guard, snapshot) = SubmitGuard::begin(session)?;

  let questions = grade_all(
    &snapshot.quiz,
    &snapshot.answers,
    services.grader.as_ref(),
    services.ai_timeout,
  )
  .await;
  let scores: Vec<u8> = questions.iter().map(|q| q.score).collect();
  // Attempts never start on an empty quiz
  let score = aggregate_score(&scores).unwrap_or(0);

  services.events.publish(ProgressEvent::QuizGraded {
    student_id: snapshot.user.user_id,
    quiz_id: snapshot.quiz.id.clone(),
    score,
  });

  let recommendations = recommend(services, &snapshot, score).await;
  let result = QuizResult::new(
    snapshot.user.user_id,
    &snapshot.quiz.id,
    &snapshot.quiz.course_id,
    score,
    questions,
    &recommendations,
    Utc::now(),
  );

  guard.complete(GradedAttempt {
    result: result.clone(),
    recommendations: recommendations.clone(),
    saved_id: None,
  });
  tracing::info!(
    "Graded quiz {} for user {}: {}%",
    result.quiz_id,
    result.student_id,
    result.score
  );

  let persistence = persist(session, services, &result).await;
  Ok(SubmitOutcome {
    result,
    recommendations,
    persistence,
  })
}

/// Manually retry persisting a graded attempt whose save failed
pub async fn retry_save(session: &SharedSession, services: &Services) -> Result<SubmitOutcome, SubmitError> {
  let graded = {
    let session = lock(session);
    let graded = session.graded().cloned().ok_or(SubmitError::NotGraded)?;
    if graded.saved_id.is_some() {
      return Err(SubmitError::AlreadySaved);
    }
    graded
  };

  let persistence = persist(session, services, &graded.result).await;
  Ok(SubmitOutcome {
    result: graded.result,
    recommendations: graded.recommendations,
    persistence,
  })
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::Mutex;

  use super::*;
  use crate::ai::{AiError, Offline};
  use crate::domain::{Difficulty, Priority, Resource};
  use crate::grading::Grade;
  use crate::session::test_support::*;
  use crate::session::Phase;
  use crate::store::StoreError;

  // ==================== Mock collaborators ====================

  /// Grades every free-text answer with a fixed score after a delay
  struct FixedGrader {
    score: u8,
    delay: Duration,
    calls: AtomicUsize,
  }

  impl FixedGrader {
    fn new(score: u8, delay: Duration) -> Self {
      Self {
        score,
        delay,
        calls: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl AiGrader for FixedGrader {
    async fn grade_free_text(&self, _request: &FreeTextRequest<'_>) -> Result<Grade, AiError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      Ok(Grade {
        score: self.score,
        feedback: "AI feedback".into(),
        strengths: Some("AI strengths".into()),
        improvements: None,
      })
    }
  }

  struct FailingGrader;

  #[async_trait]
  impl AiGrader for FailingGrader {
    async fn grade_free_text(&self, _request: &FreeTextRequest<'_>) -> Result<Grade, AiError> {
      Err(AiError::Status {
        status: 500,
        message: "upstream exploded".into(),
      })
    }
  }

  struct FixedRecommender;

  #[async_trait]
  impl AiRecommender for FixedRecommender {
    async fn recommend(
      &self,
      _request: &RecommendationRequest<'_>,
    ) -> Result<Vec<Recommendation>, AiError> {
      Ok(vec![Recommendation {
        kind: "standard".into(),
        title: "Learning Path: Standard".into(),
        description: "Keep going".into(),
        priority: Priority::High,
        url: None,
        ai_generated: true,
      }])
    }
  }

  #[derive(Default)]
  struct MemoryResults {
    saved: Mutex<Vec<QuizResult>>,
    fail: AtomicBool,
  }

  #[async_trait]
  impl ResultStore for MemoryResults {
    async fn save_result(&self, result: &QuizResult) -> Result<String, StoreError> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(StoreError::LockPoisoned);
      }
      let mut saved = self.saved.lock().unwrap();
      if !saved.iter().any(|r| r.id == result.id) {
        saved.push(result.clone());
      }
      Ok(result.id.clone())
    }
  }

  struct MemoryResources(Vec<Resource>);

  #[async_trait]
  impl ResourceStore for MemoryResources {
    async fn resources_for(&self, subject: &str) -> Result<Vec<Resource>, StoreError> {
      Ok(self.0.iter().filter(|r| r.subject == subject).cloned().collect())
    }
  }

  struct Harness {
    services: Services,
    results: Arc<MemoryResults>,
  }

  fn harness(grader: Arc<dyn AiGrader>, recommender: Arc<dyn AiRecommender>) -> Harness {
    let results = Arc::new(MemoryResults::default());
    let resources = MemoryResources(vec![Resource {
      id: 1,
      title: "Khan Academy Math Basics".into(),
      subject: "math".into(),
      difficulty: Difficulty::Easy,
      kind: "video".into(),
      url: "https://www.khanacademy.org/math/arithmetic".into(),
    }]);
    let services = Services {
      quizzes: Arc::new(MemoryQuizzes::with(three_question_quiz())),
      results: results.clone(),
      resources: Arc::new(resources),
      grader,
      recommender,
      events: ProgressEvents::new(),
      ai_timeout: Duration::from_millis(200),
    };
    Harness { services, results }
  }

  fn offline() -> Harness {
    harness(Arc::new(Offline), Arc::new(Offline))
  }

  fn shared(quiz: Quiz) -> SharedSession {
    Arc::new(Mutex::new(QuizSession::from_quiz(quiz, &student()).unwrap()))
  }

  /// The mixed quiz with answers ["A", "false", "ai is used to build machines"]
  fn scenario_session() -> SharedSession {
    let mut quiz = three_question_quiz();
    quiz.questions[0] = Question::multiple_choice("q1", "Pick", &["x", "y", "z"], "B");
    quiz.questions[2] = Question::short_answer("q3", "What is ML?", "machine learning is a subset of ai", &[]);
    let session = shared(quiz);
    {
      let mut s = session.lock().unwrap();
      s.set_answer("q1", "A").unwrap();
      s.set_answer("q2", "false").unwrap();
      s.set_answer("q3", "ai is used to build machines").unwrap();
    }
    session
  }

  // ==================== Tests ====================

  #[tokio::test]
  async fn test_scenario_scores_and_aggregate() {
    let h = offline();
    let outcome = submit(&scenario_session(), &h.services).await.unwrap();

    let scores: Vec<u8> = outcome.result.questions.iter().map(|q| q.score).collect();
    assert_eq!(scores, vec![0, 100, 18]);
    assert_eq!(outcome.result.score, 39);
    assert_eq!(outcome.result.total_questions, 3);
    assert!(outcome.is_saved());
  }

  #[tokio::test]
  async fn test_results_keep_quiz_order() {
    // AI answers slowly, objective questions instantly
    let h = harness(
      Arc::new(FixedGrader::new(70, Duration::from_millis(30))),
      Arc::new(Offline),
    );
    let session = shared(three_question_quiz());
    session.lock().unwrap().set_answer("q3", "adding groups").unwrap();

    let outcome = submit(&session, &h.services).await.unwrap();
    let ids: Vec<&str> = outcome.result.questions.iter().map(|q| q.question.id.as_str()).collect();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
    assert_eq!(outcome.result.questions[2].score, 70);
    assert_eq!(outcome.result.questions[2].graded_by, GradeSource::Ai);
  }

  #[tokio::test]
  async fn test_ai_failure_falls_back_without_aborting() {
    let h = harness(Arc::new(FailingGrader), Arc::new(Offline));
    let outcome = submit(&scenario_session(), &h.services).await.unwrap();

    assert_eq!(outcome.result.questions.len(), 3);
    let short = &outcome.result.questions[2];
    assert_eq!(short.graded_by, GradeSource::Local);
    assert_eq!(short.score, 18);
    assert_eq!(outcome.result.questions[1].score, 100);
  }

  #[tokio::test]
  async fn test_ai_timeout_falls_back() {
    let grader = Arc::new(FixedGrader::new(95, Duration::from_secs(30)));
    let mut h = harness(grader.clone(), Arc::new(Offline));
    h.services.ai_timeout = Duration::from_millis(20);

    let outcome = submit(&scenario_session(), &h.services).await.unwrap();
    assert_eq!(grader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.result.questions[2].score, 18);
    assert_eq!(outcome.result.questions[2].graded_by, GradeSource::Local);
  }

  #[tokio::test]
  async fn test_blank_short_answer_skips_ai() {
    let grader = Arc::new(FixedGrader::new(95, Duration::ZERO));
    let h = harness(grader.clone(), Arc::new(Offline));

    let outcome = submit(&shared(three_question_quiz()), &h.services).await.unwrap();
    assert_eq!(grader.calls.load(Ordering::SeqCst), 0);
    assert!(outcome.result.questions.iter().all(|q| q.score == 0));
    assert_eq!(outcome.result.score, 0);
  }

  #[tokio::test]
  async fn test_fallback_recommendations_use_score_tier() {
    let h = offline();
    let outcome = submit(&shared(three_question_quiz()), &h.services).await.unwrap();

    let titles: Vec<&str> = outcome.recommendations.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Review Basic Concepts", "Khan Academy Math Basics"]);
    assert_eq!(
      outcome.result.recommendations,
      vec!["Review Basic Concepts".to_string(), "Khan Academy Math Basics".to_string()]
    );
  }

  #[tokio::test]
  async fn test_ai_recommendations_used_when_available() {
    let h = harness(Arc::new(Offline), Arc::new(FixedRecommender));
    let outcome = submit(&scenario_session(), &h.services).await.unwrap();
    assert_eq!(outcome.recommendations.len(), 1);
    assert!(outcome.recommendations[0].ai_generated);
  }

  #[tokio::test]
  async fn test_concurrent_double_submit_saves_once() {
    let h = harness(
      Arc::new(FixedGrader::new(50, Duration::from_millis(20))),
      Arc::new(Offline),
    );
    let session = scenario_session();

    let (first, second) = tokio::join!(submit(&session, &h.services), submit(&session, &h.services));

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), SubmitError::AlreadySubmitting);
    assert_eq!(h.results.saved.lock().unwrap().len(), 1);

    assert_eq!(
      submit(&session, &h.services).await.unwrap_err(),
      SubmitError::AlreadyGraded
    );
    assert_eq!(h.results.saved.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_persistence_failure_keeps_result() {
    let h = offline();
    h.results.fail.store(true, Ordering::SeqCst);
    let mut events = h.services.events.subscribe();
    let session = scenario_session();

    let outcome = submit(&session, &h.services).await.unwrap();
    assert!(matches!(outcome.persistence, Persistence::Failed { .. }));
    assert_eq!(outcome.result.score, 39);
    {
      let s = session.lock().unwrap();
      assert_eq!(s.phase(), Phase::Graded);
      assert_eq!(s.graded().unwrap().result, outcome.result);
    }

    // Manual retry writes the same result once
    h.results.fail.store(false, Ordering::SeqCst);
    let retried = retry_save(&session, &h.services).await.unwrap();
    assert_eq!(
      retried.persistence,
      Persistence::Saved {
        result_id: outcome.result.id.clone()
      }
    );
    assert_eq!(
      retry_save(&session, &h.services).await.unwrap_err(),
      SubmitError::AlreadySaved
    );
    assert_eq!(h.results.saved.lock().unwrap().len(), 1);

    assert!(matches!(events.recv().await.unwrap(), ProgressEvent::QuizGraded { score: 39, .. }));
    assert!(matches!(events.recv().await.unwrap(), ProgressEvent::ResultSaved { score: 39, .. }));
  }

  #[tokio::test]
  async fn test_retry_before_grading_is_rejected() {
    let h = offline();
    assert_eq!(
      retry_save(&scenario_session(), &h.services).await.unwrap_err(),
      SubmitError::NotGraded
    );
  }

  #[tokio::test]
  async fn test_abandoned_submission_reopens_attempt() {
    let h = harness(
      Arc::new(FixedGrader::new(80, Duration::from_secs(30))),
      Arc::new(Offline),
    );
    let session = scenario_session();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), submit(&session, &h.services)).await;
    assert!(abandoned.is_err());

    assert_eq!(session.lock().unwrap().phase(), Phase::Active);
    assert!(h.results.saved.lock().unwrap().is_empty());
    session.lock().unwrap().set_answer("q1", "B").unwrap();
  }
}
