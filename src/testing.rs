//! Test utilities for database setup.
//!
//! Reuses the authoritative schema initialization so tests never carry
//! their own copy of the schema.

use rusqlite::Connection;
use std::sync::MutexGuard;
use tempfile::TempDir;

use crate::auth::db as auth_db;
use crate::db::{self, DbPool};
use crate::domain::{Course, Role};

/// Test environment with a migrated app.db in a temporary directory.
///
/// Comes with one student, one teacher and one course owned by the
/// teacher, so foreign keys can be satisfied without extra setup.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub db: DbPool,
    pub student_id: i64,
    pub teacher_id: i64,
    pub course_id: String,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let pool = db::init_db(&temp.path().join("app.db"))?;

        let (student_id, teacher_id, course_id) = {
            let conn = pool.lock().map_err(|_| rusqlite::Error::InvalidQuery)?;
            let student_id = auth_db::create_user(&conn, "test_student", Role::Student)?;
            let teacher_id = auth_db::create_user(&conn, "test_teacher", Role::Teacher)?;
            let course = Course {
                id: "course-test".to_string(),
                title: "Test Course".to_string(),
                description: None,
                subject: "math".to_string(),
                teacher_id,
            };
            db::insert_course(&conn, &course)?;
            (student_id, teacher_id, course.id)
        };

        Ok(Self {
            temp,
            db: pool,
            student_id,
            teacher_id,
            course_id,
        })
    }

    /// Lock the shared connection
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().expect("test database lock poisoned")
    }
}
