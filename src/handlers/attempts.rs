//! Quiz attempts: start, answer, navigate, submit.

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, JsonBody};
use crate::auth::AuthContext;
use crate::session::{self, QuizSession, SessionView, SharedSession, SubmitError, SubmitOutcome};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AttemptView {
  pub attempt_id: String,
  #[serde(flatten)]
  pub session: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct AnswerForm {
  pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct JumpForm {
  /// Any integer; indexes outside the quiz leave the position unchanged
  pub index: i64,
}

fn find_attempt(state: &AppState, attempt_id: &str, auth: &AuthContext) -> Result<SharedSession, ApiError> {
  state
    .attempts
    .get(attempt_id, auth.user.user_id)
    .ok_or_else(|| ApiError::NotFound(format!("Attempt not found: {}", attempt_id)))
}

/// Apply a change to an attempt and return its new view
fn update_attempt<F>(
  state: &AppState,
  attempt_id: &str,
  auth: &AuthContext,
  change: F,
) -> Result<Json<AttemptView>, ApiError>
where
  F: FnOnce(&mut QuizSession) -> Result<(), SubmitError>,
{
  let shared = find_attempt(state, attempt_id, auth)?;
  let mut session = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
  change(&mut session)?;
  Ok(Json(AttemptView {
    attempt_id: attempt_id.to_string(),
    session: session.view(),
  }))
}

/// Outcome of a submit or save: 200 when persisted, 502 with the computed
/// result when the save failed
fn outcome_response(outcome: SubmitOutcome) -> Response {
  let status = if outcome.is_saved() {
    StatusCode::OK
  } else {
    StatusCode::BAD_GATEWAY
  };
  (status, Json(outcome)).into_response()
}

pub async fn start_attempt(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(quiz_id): Path<String>,
) -> Result<(StatusCode, Json<AttemptView>), ApiError> {
  let session = QuizSession::start(state.services.quizzes.as_ref(), &auth.user, &quiz_id).await?;
  let view = session.view();
  let attempt_id = state.attempts.insert(session);

  tracing::info!(
    "User {} started attempt {} on quiz {}",
    auth.user.username,
    attempt_id,
    quiz_id
  );
  Ok((StatusCode::CREATED, Json(AttemptView { attempt_id, session: view })))
}

pub async fn get_attempt(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
) -> Result<Json<AttemptView>, ApiError> {
  update_attempt(&state, &attempt_id, &auth, |_| Ok(()))
}

pub async fn set_answer(
  State(state): State<AppState>,
  auth: AuthContext,
  Path((attempt_id, question_id)): Path<(String, String)>,
  JsonBody(form): JsonBody<AnswerForm>,
) -> Result<Json<AttemptView>, ApiError> {
  update_attempt(&state, &attempt_id, &auth, |s| s.set_answer(&question_id, form.answer))
}

pub async fn next_question(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
) -> Result<Json<AttemptView>, ApiError> {
  update_attempt(&state, &attempt_id, &auth, QuizSession::next)
}

pub async fn previous_question(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
) -> Result<Json<AttemptView>, ApiError> {
  update_attempt(&state, &attempt_id, &auth, QuizSession::previous)
}

pub async fn jump_to_question(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
  JsonBody(form): JsonBody<JumpForm>,
) -> Result<Json<AttemptView>, ApiError> {
  // Negative indexes are out of range like any other
  let index = usize::try_from(form.index).unwrap_or(usize::MAX);
  update_attempt(&state, &attempt_id, &auth, |s| s.jump_to(index))
}

pub async fn submit_attempt(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
) -> Result<Response, ApiError> {
  let shared = find_attempt(&state, &attempt_id, &auth)?;
  let outcome = session::submit(&shared, &state.services).await?;
  Ok(outcome_response(outcome))
}

pub async fn retry_save_attempt(
  State(state): State<AppState>,
  auth: AuthContext,
  Path(attempt_id): Path<String>,
) -> Result<Response, ApiError> {
  let shared = find_attempt(&state, &attempt_id, &auth)?;
  let outcome = session::retry_save(&shared, &state.services).await?;
  Ok(outcome_response(outcome))
}
