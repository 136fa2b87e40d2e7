//! Per-student course progress: completed lessons and quiz scores.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{from_json_column, to_json_column};
use crate::domain::CourseProgress;

/// Progress of a student in a course (empty if nothing recorded yet)
pub fn get_course_progress(conn: &Connection, student_id: i64, course_id: &str) -> Result<CourseProgress> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT completed_lessons, quiz_scores FROM course_progress WHERE student_id = ?1 AND course_id = ?2",
            params![student_id, course_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((lessons, scores)) => Ok(CourseProgress {
            completed_lessons: from_json_column(&lessons, 0)?,
            quiz_scores: from_json_column(&scores, 1)?,
        }),
        None => Ok(CourseProgress::default()),
    }
}

fn save_course_progress(
    conn: &Connection,
    student_id: i64,
    course_id: &str,
    progress: &CourseProgress,
) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO course_progress (student_id, course_id, completed_lessons, quiz_scores, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(student_id, course_id) DO UPDATE SET
      completed_lessons = excluded.completed_lessons,
      quiz_scores = excluded.quiz_scores,
      updated_at = excluded.updated_at
    "#,
        params![
            student_id,
            course_id,
            to_json_column(&progress.completed_lessons)?,
            to_json_column(&progress.quiz_scores)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Append a quiz score to the student's course progress
pub fn record_quiz_score(conn: &Connection, student_id: i64, course_id: &str, score: u8) -> Result<CourseProgress> {
    let mut progress = get_course_progress(conn, student_id, course_id)?;
    progress.quiz_scores.push(score);
    save_course_progress(conn, student_id, course_id, &progress)?;
    Ok(progress)
}

/// Mark a lesson complete. Completing the same lesson again is a no-op.
pub fn mark_lesson_complete(
    conn: &Connection,
    student_id: i64,
    course_id: &str,
    lesson_id: &str,
) -> Result<CourseProgress> {
    let mut progress = get_course_progress(conn, student_id, course_id)?;
    if !progress.completed_lessons.iter().any(|l| l == lesson_id) {
        progress.completed_lessons.push(lesson_id.to_string());
        save_course_progress(conn, student_id, course_id, &progress)?;
    }
    Ok(progress)
}
