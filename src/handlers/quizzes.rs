//! Quiz authoring and preview (teachers), quiz listing (everyone).

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use serde::{Deserialize, Serialize};

use super::courses::owned_course;
use super::{ApiError, JsonBody};
use crate::auth::{authorize, Action, AuthContext};
use crate::db::{self, try_lock};
use crate::domain::{Question, Quiz};
use crate::state::AppState;
use crate::validation::validate_quiz;

#[derive(Debug, Deserialize)]
pub struct CreateQuiz {
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub course_id: String,
  /// Defaults to the course subject
  #[serde(default)]
  pub subject: Option<String>,
  pub questions: Vec<Question>,
}

/// Quiz listing entry, without questions
#[derive(Debug, Serialize)]
pub struct QuizSummary {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub question_count: usize,
  /// Results the caller already has for this quiz
  pub attempts: i64,
}

pub async fn create_quiz(
  State(state): State<AppState>,
  auth: AuthContext,
  JsonBody(form): JsonBody<CreateQuiz>,
) -> Result<(StatusCode, Json<Quiz>), ApiError> {
  authorize(&auth.user, Action::ManageQuizzes)?;

  let conn = try_lock(&state.db)?;

  let course = owned_course(&conn, &form.course_id, &auth.user)?;

  let quiz = Quiz {
    id: form.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    title: form.title.trim().to_string(),
    description: form.description.filter(|d| !d.trim().is_empty()),
    course_id: course.id,
    subject: form.subject.or(Some(course.subject)),
    questions: form.questions,
  };

  let problems = validate_quiz(&quiz);
  if !problems.is_empty() {
    return Err(ApiError::BadRequest(problems.join("; ")));
  }
  if db::quiz_exists(&conn, &quiz.id)? {
    return Err(ApiError::Conflict(format!("Quiz already exists: {}", quiz.id)));
  }

  db::insert_quiz(&conn, &quiz)?;
  tracing::info!(
    "User {} created quiz {} with {} question(s)",
    auth.user.username,
    quiz.id,
    quiz.questions.len()
  );
  Ok((StatusCode::CREATED, Json(quiz)))
}

/// Full quiz including answers, for teachers
pub async fn preview_quiz(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(quiz_id): Path<String>,
) -> Result<Json<Quiz>, ApiError> {
  authorize(&auth.user, Action::PreviewQuiz)?;

  let conn = try_lock(&state.db)?;
  let quiz = db::get_quiz(&conn, &quiz_id)?
    .ok_or_else(|| ApiError::NotFound(format!("Quiz not found: {}", quiz_id)))?;
  Ok(Json(quiz))
}

pub async fn list_course_quizzes(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<String>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, &course_id)?.is_none() {
    return Err(ApiError::NotFound(format!("Course not found: {}", course_id)));
  }

  let mut summaries = Vec::new();
  for quiz in db::list_quizzes_for_course(&conn, &course_id)? {
    summaries.push(QuizSummary {
      attempts: db::count_results_for_quiz(&conn, auth.user.user_id, &quiz.id)?,
      question_count: quiz.questions.len(),
      id: quiz.id,
      title: quiz.title,
      description: quiz.description,
    });
  }
  Ok(Json(summaries))
}
