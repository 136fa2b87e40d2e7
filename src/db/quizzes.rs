//! Quiz storage. Questions live in a JSON column.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

use super::{from_json_column, to_json_column};
use crate::domain::Quiz;

pub fn insert_quiz(conn: &Connection, quiz: &Quiz) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO quizzes (id, course_id, title, description, subject, questions, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    "#,
        params![
            quiz.id,
            quiz.course_id,
            quiz.title,
            quiz.description,
            quiz.subject,
            to_json_column(&quiz.questions)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_quiz(conn: &Connection, quiz_id: &str) -> Result<Option<Quiz>> {
    conn.query_row(
        r#"
    SELECT id, course_id, title, description, subject, questions
    FROM quizzes WHERE id = ?1
    "#,
        params![quiz_id],
        row_to_quiz,
    )
    .optional()
}

pub fn list_quizzes_for_course(conn: &Connection, course_id: &str) -> Result<Vec<Quiz>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, course_id, title, description, subject, questions
    FROM quizzes
    WHERE course_id = ?1
    ORDER BY created_at ASC, id ASC
    "#,
    )?;
    let quizzes = stmt
        .query_map(params![course_id], row_to_quiz)?
        .collect::<Result<Vec<_>>>()?;
    Ok(quizzes)
}

pub fn quiz_exists(conn: &Connection, quiz_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM quizzes WHERE id = ?1",
        params![quiz_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn row_to_quiz(row: &rusqlite::Row) -> Result<Quiz> {
    let questions: String = row.get(5)?;
    Ok(Quiz {
        id: row.get(0)?,
        course_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        subject: row.get(4)?,
        questions: from_json_column(&questions, 5)?,
    })
}
