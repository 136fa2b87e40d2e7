pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod grading;
pub mod handlers;
pub mod notify;
pub mod paths;
pub mod recommend;
pub mod session;
pub mod state;
pub mod store;
pub mod validation;

#[cfg(test)]
pub mod testing;

use axum::{
  routing::{get, post, put},
  Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router with all API routes
pub fn app(state: AppState) -> Router {
  Router::new()
    // Quizzes
    .route("/quizzes", post(handlers::create_quiz))
    .route("/quizzes/{quiz_id}/preview", get(handlers::preview_quiz))
    .route("/quizzes/{quiz_id}/attempts", post(handlers::start_attempt))
    // Attempts
    .route("/attempts/{attempt_id}", get(handlers::get_attempt))
    .route(
      "/attempts/{attempt_id}/answers/{question_id}",
      put(handlers::set_answer),
    )
    .route("/attempts/{attempt_id}/next", post(handlers::next_question))
    .route("/attempts/{attempt_id}/previous", post(handlers::previous_question))
    .route("/attempts/{attempt_id}/jump", post(handlers::jump_to_question))
    .route("/attempts/{attempt_id}/submit", post(handlers::submit_attempt))
    .route("/attempts/{attempt_id}/save", post(handlers::retry_save_attempt))
    // Courses
    .route(
      "/courses",
      get(handlers::list_courses).post(handlers::create_course),
    )
    .route("/courses/{course_id}", get(handlers::get_course))
    .route(
      "/courses/{course_id}/lessons",
      get(handlers::list_course_lessons).post(handlers::create_lesson),
    )
    .route("/courses/{course_id}/quizzes", get(handlers::list_course_quizzes))
    // Progress
    .route("/results", get(handlers::list_results))
    .route("/results/{result_id}", get(handlers::get_result))
    .route("/courses/{course_id}/progress", get(handlers::course_progress))
    .route("/courses/{course_id}/learning-path", get(handlers::learning_path))
    .route("/lessons/{lesson_id}/complete", post(handlers::complete_lesson))
    .route("/resources", get(handlers::list_resources))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
