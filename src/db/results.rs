//! Quiz result storage. Results are written once and never updated.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{from_json_column, to_json_column};
use crate::domain::QuizResult;

/// Store a result. Returns false when a result with the same id was
/// already stored, leaving the existing row untouched.
pub fn insert_result(conn: &Connection, result: &QuizResult) -> Result<bool> {
    let written = conn.execute(
        r#"
    INSERT OR IGNORE INTO results (id, student_id, quiz_id, course_id, score, total_questions,
                                   questions, recommendations, submitted_at, timestamp_ms)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    "#,
        params![
            result.id,
            result.student_id,
            result.quiz_id,
            result.course_id,
            result.score,
            result.total_questions as i64,
            to_json_column(&result.questions)?,
            to_json_column(&result.recommendations)?,
            result.submitted_at.to_rfc3339(),
            result.timestamp_ms,
        ],
    )?;
    Ok(written == 1)
}

pub fn get_result(conn: &Connection, result_id: &str) -> Result<Option<QuizResult>> {
    conn.query_row(
        r#"
    SELECT id, student_id, quiz_id, course_id, score, total_questions,
           questions, recommendations, submitted_at, timestamp_ms
    FROM results WHERE id = ?1
    "#,
        params![result_id],
        row_to_result,
    )
    .optional()
}

/// All results of a student, newest first
pub fn list_results_for_student(conn: &Connection, student_id: i64) -> Result<Vec<QuizResult>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, student_id, quiz_id, course_id, score, total_questions,
           questions, recommendations, submitted_at, timestamp_ms
    FROM results
    WHERE student_id = ?1
    ORDER BY timestamp_ms DESC
    "#,
    )?;
    let results = stmt
        .query_map(params![student_id], row_to_result)?
        .collect::<Result<Vec<_>>>()?;
    Ok(results)
}

pub fn count_results_for_quiz(conn: &Connection, student_id: i64, quiz_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM results WHERE student_id = ?1 AND quiz_id = ?2",
        params![student_id, quiz_id],
        |row| row.get(0),
    )
}

fn row_to_result(row: &rusqlite::Row) -> Result<QuizResult> {
    let total_questions: i64 = row.get(5)?;
    let questions: String = row.get(6)?;
    let recommendations: String = row.get(7)?;
    let submitted_at_str: String = row.get(8)?;

    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(QuizResult {
        id: row.get(0)?,
        student_id: row.get(1)?,
        quiz_id: row.get(2)?,
        course_id: row.get(3)?,
        score: row.get(4)?,
        total_questions: total_questions as usize,
        questions: from_json_column(&questions, 6)?,
        submitted_at,
        timestamp_ms: row.get(9)?,
        date: submitted_at.format("%Y-%m-%d").to_string(),
        time: submitted_at.format("%H:%M:%S").to_string(),
        recommendations: from_json_column(&recommendations, 7)?,
    })
}
