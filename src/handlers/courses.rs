//! Course and lesson authoring (teachers), course listing (everyone).

use axum::{
  extract::{Path, State},
  http::StatusCode,
  Json,
};
use rusqlite::Connection;
use serde::Deserialize;

use super::{ApiError, JsonBody};
use crate::auth::{authorize, Action, AuthContext};
use crate::db::{self, try_lock};
use crate::domain::{Course, Difficulty, Lesson, Role, UserContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLesson {
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub difficulty: Option<Difficulty>,
}

/// Id from the request, or a fresh one when absent or blank
fn id_or_new(id: Option<String>) -> String {
  id.map(|id| id.trim().to_string())
    .filter(|id| !id.is_empty())
    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// A course the caller owns
pub(super) fn owned_course(conn: &Connection, course_id: &str, user: &UserContext) -> Result<Course, ApiError> {
  let course = db::get_course(conn, course_id)?
    .ok_or_else(|| ApiError::NotFound(format!("Course not found: {}", course_id)))?;
  if course.teacher_id != user.user_id {
    return Err(ApiError::Forbidden(
      "You can only change your own courses.".to_string(),
    ));
  }
  Ok(course)
}

pub async fn create_course(
  State(state): State<AppState>,
  auth: AuthContext,
  JsonBody(form): JsonBody<CreateCourse>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
  authorize(&auth.user, Action::ManageCourses)?;

  let course = Course {
    id: id_or_new(form.id),
    title: form.title.trim().to_string(),
    description: form.description.filter(|d| !d.trim().is_empty()),
    subject: form.subject.trim().to_lowercase(),
    teacher_id: auth.user.user_id,
  };

  let mut problems = Vec::new();
  if course.title.is_empty() {
    problems.push("Course title is required");
  }
  if course.subject.is_empty() {
    problems.push("Course subject is required");
  }
  if !problems.is_empty() {
    return Err(ApiError::BadRequest(problems.join("; ")));
  }

  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, &course.id)?.is_some() {
    return Err(ApiError::Conflict(format!("Course already exists: {}", course.id)));
  }

  db::insert_course(&conn, &course)?;
  tracing::info!("User {} created course {}", auth.user.username, course.id);
  Ok((StatusCode::CREATED, Json(course)))
}

/// Teachers see the courses they own; students see every course
pub async fn list_courses(
  State(state): State<AppState>,
  auth: AuthContext,
) -> Result<Json<Vec<Course>>, ApiError> {
  let conn = try_lock(&state.db)?;
  let courses = match auth.user.role {
    Role::Teacher => db::list_courses_for_teacher(&conn, auth.user.user_id)?,
    Role::Student => db::list_courses(&conn)?,
  };
  Ok(Json(courses))
}

pub async fn get_course(
  State(state): State<AppState>,
  _auth: AuthContext,
  Path(course_id): Path<String>,
) -> Result<Json<Course>, ApiError> {
  let conn = try_lock(&state.db)?;
  let course = db::get_course(&conn, &course_id)?
    .ok_or_else(|| ApiError::NotFound(format!("Course not found: {}", course_id)))?;
  Ok(Json(course))
}

/// Append a lesson to the end of a course
pub async fn create_lesson(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(course_id): Path<String>,
  JsonBody(form): JsonBody<CreateLesson>,
) -> Result<(StatusCode, Json<Lesson>), ApiError> {
  authorize(&auth.user, Action::ManageCourses)?;

  let title = form.title.trim().to_string();
  if title.is_empty() {
    return Err(ApiError::BadRequest("Lesson title is required".to_string()));
  }

  let conn = try_lock(&state.db)?;
  let course = owned_course(&conn, &course_id, &auth.user)?;

  let lesson = Lesson {
    id: id_or_new(form.id),
    course_id: course.id,
    title,
    position: db::next_lesson_position(&conn, &course_id)?,
    difficulty: form.difficulty,
  };
  if db::get_lesson(&conn, &lesson.id)?.is_some() {
    return Err(ApiError::Conflict(format!("Lesson already exists: {}", lesson.id)));
  }

  db::insert_lesson(&conn, &lesson)?;
  tracing::info!(
    "User {} added lesson {} to course {} at position {}",
    auth.user.username,
    lesson.id,
    lesson.course_id,
    lesson.position
  );
  Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn list_course_lessons(
  State(state): State<AppState>,
  _auth: AuthContext,
  Path(course_id): Path<String>,
) -> Result<Json<Vec<Lesson>>, ApiError> {
  let conn = try_lock(&state.db)?;
  if db::get_course(&conn, &course_id)?.is_none() {
    return Err(ApiError::NotFound(format!("Course not found: {}", course_id)));
  }
  Ok(Json(db::list_lessons(&conn, &course_id)?))
}
