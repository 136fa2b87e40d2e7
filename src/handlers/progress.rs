use axum::{
  extract::{Path, State},
  Json,
};
use serde::Deserialize;

use super::{ApiError, QueryParams};
use crate::auth::AuthContext;
use crate::db::{self, try_lock};
use crate::domain::{CourseProgress, Difficulty, QuizResult, Resource};
use crate::recommend::{self, LearningPath};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
  pub subject: String,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
}

/// The caller's quiz results, newest first
pub async fn list_results(
  State(state): State<AppState>,
  auth: AuthContext,
) -> Result<Json<Vec<QuizResult>>, ApiError> {
  let conn = try_lock(&state.db)?;
  let results = db::list_results_for_student(&conn, auth.user.user_id)?;
  Ok(Json(results))
}

/// One result, visible to the student who earned it and to the teacher of
/// its course
pub async fn get_result(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(result_id): Path<String>,
) -> Result<Json<QuizResult>, ApiError> {
  let not_found = || ApiError::NotFound(format!("Result not found: {}", result_id));

  let conn = try_lock(&state.db)?;
  let result = db::get_result(&conn, &result_id)?.ok_or_else(not_found)?;

  let is_owner = result.student_id == auth.user.user_id;
  let teaches_course = db::get_course(&conn, &result.course_id)?
    .is_some_and(|course| course.teacher_id == auth.user.user_id);
  if !is_owner && !teaches_course {
    return Err(not_found());
  }
  Ok(Json(result))
}

pub async fn course_progress(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<String>,
) -> Result<Json<CourseProgress>, ApiError> {
  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, &course_id)?.is_none() {
    return Err(ApiError::NotFound(format!("Course not found: {}", course_id)));
  }
  Ok(Json(db::get_course_progress(&conn, auth.user.user_id, &course_id)?))
}

pub async fn learning_path(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<String>,
) -> Result<Json<LearningPath>, ApiError> {
  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, &course_id)?.is_none() {
    return Err(ApiError::NotFound(format!("Course not found: {}", course_id)));
  }

  let progress = db::get_course_progress(&conn, auth.user.user_id, &course_id)?;
  let lessons = db::list_lessons(&conn, &course_id)?;
  Ok(Json(recommend::learning_path(&progress, &lessons)))
}

pub async fn complete_lesson(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(lesson_id): Path<String>,
) -> Result<Json<CourseProgress>, ApiError> {
  let conn = try_lock(&state.db)?;
  let lesson = db::get_lesson(&conn, &lesson_id)?
    .ok_or_else(|| ApiError::NotFound(format!("Lesson not found: {}", lesson_id)))?;

  let progress = db::mark_lesson_complete(&conn, auth.user.user_id, &lesson.course_id, &lesson.id)?;
  Ok(Json(progress))
}

/// Study resources for a subject, optionally narrowed to one difficulty
pub async fn list_resources(
  State(state): State<AppState>,
  _auth: AuthContext,
  QueryParams(query): QueryParams<ResourceQuery>,
) -> Result<Json<Vec<Resource>>, ApiError> {
  let conn = try_lock(&state.db)?;
  let resources = db::resources_for_subject(&conn, &query.subject.to_lowercase())?
    .into_iter()
    .filter(|r| query.difficulty.is_none_or(|d| r.difficulty == d))
    .collect();
  Ok(Json(resources))
}
