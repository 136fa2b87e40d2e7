//! Course and lesson storage

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

use crate::domain::{Course, Difficulty, Lesson};

pub fn insert_course(conn: &Connection, course: &Course) -> Result<()> {
    conn.execute(
        r#"
    INSERT INTO courses (id, title, description, subject, teacher_id, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
        params![
            course.id,
            course.title,
            course.description,
            course.subject,
            course.teacher_id,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_course(conn: &Connection, course_id: &str) -> Result<Option<Course>> {
    conn.query_row(
        "SELECT id, title, description, subject, teacher_id FROM courses WHERE id = ?1",
        params![course_id],
        row_to_course,
    )
    .optional()
}

/// Every course, oldest first
pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, title, description, subject, teacher_id
    FROM courses
    ORDER BY created_at ASC, id ASC
    "#,
    )?;
    let courses = stmt
        .query_map([], row_to_course)?
        .collect::<Result<Vec<_>>>()?;
    Ok(courses)
}

/// Courses owned by one teacher, oldest first
pub fn list_courses_for_teacher(conn: &Connection, teacher_id: i64) -> Result<Vec<Course>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, title, description, subject, teacher_id
    FROM courses
    WHERE teacher_id = ?1
    ORDER BY created_at ASC, id ASC
    "#,
    )?;
    let courses = stmt
        .query_map(params![teacher_id], row_to_course)?
        .collect::<Result<Vec<_>>>()?;
    Ok(courses)
}

pub fn insert_lesson(conn: &Connection, lesson: &Lesson) -> Result<()> {
    conn.execute(
        "INSERT INTO lessons (id, course_id, title, position, difficulty) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            lesson.id,
            lesson.course_id,
            lesson.title,
            lesson.position,
            lesson.difficulty.map(|d| d.as_str()),
        ],
    )?;
    Ok(())
}

pub fn get_lesson(conn: &Connection, lesson_id: &str) -> Result<Option<Lesson>> {
    conn.query_row(
        "SELECT id, course_id, title, position, difficulty FROM lessons WHERE id = ?1",
        params![lesson_id],
        row_to_lesson,
    )
    .optional()
}

/// Lessons of a course in course order
pub fn list_lessons(conn: &Connection, course_id: &str) -> Result<Vec<Lesson>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, course_id, title, position, difficulty
    FROM lessons
    WHERE course_id = ?1
    ORDER BY position ASC
    "#,
    )?;
    let lessons = stmt
        .query_map(params![course_id], row_to_lesson)?
        .collect::<Result<Vec<_>>>()?;
    Ok(lessons)
}

/// Position for a lesson appended to the end of a course
pub fn next_lesson_position(conn: &Connection, course_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM lessons WHERE course_id = ?1",
        params![course_id],
        |row| row.get(0),
    )
}

fn row_to_course(row: &rusqlite::Row) -> Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        subject: row.get(3)?,
        teacher_id: row.get(4)?,
    })
}

fn row_to_lesson(row: &rusqlite::Row) -> Result<Lesson> {
    let difficulty: Option<String> = row.get(4)?;
    Ok(Lesson {
        id: row.get(0)?,
        course_id: row.get(1)?,
        title: row.get(2)?,
        position: row.get(3)?,
        difficulty: difficulty.as_deref().and_then(Difficulty::from_str),
    })
}
