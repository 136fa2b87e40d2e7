//! Authentication extractor.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::db as auth_db;
use crate::db::try_lock;
use crate::domain::UserContext;
use crate::state::AppState;

pub const SESSION_COOKIE_NAME: &str = "lms_session";

/// Authenticated request context.
/// Add this as a handler parameter to require authentication.
/// Rejects with 401 if there is no valid session.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: UserContext,
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Extract cookies (infallible)
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Not signed in"))?;

        // Get session cookie
        let session_id = jar
            .get(SESSION_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Not signed in"))?;

        // Validate session
        let conn = try_lock(&state.db)
            .map_err(|_| reject(StatusCode::INTERNAL_SERVER_ERROR, "Database error"))?;

        let user = auth_db::get_session_user(&conn, &session_id)
            .map_err(|e| {
                tracing::error!("Session lookup failed: {}", e);
                reject(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            })?
            .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Session expired"))?;

        Ok(AuthContext { user })
    }
}
