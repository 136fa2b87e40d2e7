//! JSON API handlers.

pub mod attempts;
pub mod courses;
pub mod progress;
pub mod quizzes;

use axum::{
  extract::{
    rejection::{JsonRejection, QueryRejection},
    FromRequest, FromRequestParts, Query,
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::Forbidden;
use crate::db::DbLockError;
use crate::session::{SessionError, SubmitError};
use crate::store::StoreError;

pub use attempts::{
  get_attempt, jump_to_question, next_question, previous_question, retry_save_attempt,
  set_answer, start_attempt, submit_attempt,
};
pub use courses::{create_course, create_lesson, get_course, list_course_lessons, list_courses};
pub use progress::{
  complete_lesson, course_progress, get_result, learning_path, list_resources, list_results,
};
pub use quizzes::{create_quiz, list_course_quizzes, preview_quiz};

/// JSON request body whose rejections use the `{"error": ...}` shape
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string whose rejections use the `{"error": ...}` shape
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Error returned by handlers, rendered as `{"error": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unprocessable(String),

  #[error("Internal error")]
  Internal,
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
  }
}

impl From<Forbidden> for ApiError {
  fn from(err: Forbidden) -> Self {
    Self::Forbidden(err.to_string())
  }
}

impl From<SessionError> for ApiError {
  fn from(err: SessionError) -> Self {
    match err {
      SessionError::NotFound(_) => Self::NotFound(err.to_string()),
      SessionError::Forbidden(forbidden) => forbidden.into(),
      SessionError::EmptyQuiz => Self::Unprocessable(err.to_string()),
      SessionError::Store(store) => store.into(),
    }
  }
}

impl From<SubmitError> for ApiError {
  fn from(err: SubmitError) -> Self {
    match err {
      SubmitError::UnknownQuestion(_) => Self::NotFound(err.to_string()),
      _ => Self::Conflict(err.to_string()),
    }
  }
}

impl From<StoreError> for ApiError {
  fn from(err: StoreError) -> Self {
    tracing::error!("Store error: {}", err);
    Self::Internal
  }
}

impl From<rusqlite::Error> for ApiError {
  fn from(err: rusqlite::Error) -> Self {
    tracing::error!("Database error: {}", err);
    Self::Internal
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    match rejection {
      JsonRejection::JsonDataError(_) => Self::Unprocessable(rejection.body_text()),
      _ => Self::BadRequest(rejection.body_text()),
    }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<DbLockError> for ApiError {
  fn from(_: DbLockError) -> Self {
    Self::Internal
  }
}
