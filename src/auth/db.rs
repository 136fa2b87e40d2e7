//! User and session lookups (users, sessions tables).
//!
//! Accounts and sessions are provisioned by the identity provider; this
//! module only stores them and resolves a session id to the user behind it.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{Role, UserContext};

/// Create a new user, returns the user ID
pub fn create_user(conn: &Connection, username: &str, role: Role) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, role, created_at) VALUES (?1, ?2, ?3)",
        params![username, role.as_str(), now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get user by username
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserContext>> {
    conn.query_row(
        "SELECT id, username, role FROM users WHERE username = ?1",
        params![username],
        row_to_user,
    )
    .optional()
}

/// Create a new session
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    session_id: &str,
    duration_hours: i64,
) -> Result<()> {
    let now = Utc::now();
    let expires = now + Duration::hours(duration_hours);
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at, last_access_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session_id,
            user_id,
            now.to_rfc3339(),
            expires.to_rfc3339(),
            now.to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Validate session and get the user behind it
pub fn get_session_user(conn: &Connection, session_id: &str) -> Result<Option<UserContext>> {
    let now = Utc::now().to_rfc3339();
    let user = conn
        .query_row(
            r#"
        SELECT u.id, u.username, u.role
        FROM sessions s
        JOIN users u ON s.user_id = u.id
        WHERE s.id = ?1 AND s.expires_at > ?2
    "#,
            params![session_id, now],
            row_to_user,
        )
        .optional()?;

    if user.is_some() {
        // Update last access time
        let _ = conn.execute(
            "UPDATE sessions SET last_access_at = ?1 WHERE id = ?2",
            params![now, session_id],
        );
    }
    Ok(user)
}

/// Cleanup expired sessions, returns count of deleted sessions
pub fn cleanup_expired_sessions(conn: &Connection) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let count = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", params![now])?;
    Ok(count)
}

fn row_to_user(row: &rusqlite::Row) -> Result<UserContext> {
    let role: String = row.get(2)?;
    Ok(UserContext {
        user_id: row.get(0)?,
        username: row.get(1)?,
        // Unknown roles get the least privileged one
        role: Role::from_str(&role).unwrap_or(Role::Student),
    })
}
