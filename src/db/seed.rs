//! Demo data: one course with lessons and a quiz, the resource catalogue,
//! and a student and teacher with ready-made sessions.

use rusqlite::{Connection, Result};

use super::{courses, quizzes, resources};
use crate::auth::db as auth_db;
use crate::domain::{Course, Difficulty, Lesson, Question, Quiz, Role};

pub const DEMO_COURSE_ID: &str = "demo-math";
pub const DEMO_QUIZ_ID: &str = "demo-math-quiz";
pub const DEMO_STUDENT_SESSION: &str = "demo-student-session";
pub const DEMO_TEACHER_SESSION: &str = "demo-teacher-session";

/// Demo sessions stay valid for a year
const DEMO_SESSION_HOURS: i64 = 24 * 365;

const RESOURCES: [(&str, &str, Difficulty, &str, &str); 10] = [
    ("Khan Academy Math Basics", "math", Difficulty::Easy, "video", "https://www.khanacademy.org/math/arithmetic"),
    ("Math Worksheets - Addition & Subtraction", "math", Difficulty::Easy, "worksheet", "https://www.math-drills.com/addition.shtml"),
    ("Algebra Fundamentals", "math", Difficulty::Medium, "video", "https://www.khanacademy.org/math/algebra"),
    ("Advanced Calculus", "math", Difficulty::Hard, "video", "https://www.khanacademy.org/math/calculus-1"),
    ("Basic Science Concepts", "science", Difficulty::Easy, "video", "https://www.khanacademy.org/science/biology"),
    ("Chemistry Lab Worksheets", "science", Difficulty::Medium, "worksheet", "https://www.chem4kids.com/files/atom_intro.html"),
    ("Physics Problem Sets", "science", Difficulty::Hard, "worksheet", "https://www.physicsclassroom.com/class"),
    ("Grammar Basics", "english", Difficulty::Easy, "video", "https://www.khanacademy.org/humanities/grammar"),
    ("Creative Writing Prompts", "english", Difficulty::Medium, "worksheet", "https://www.creativewritingprompts.com/"),
    ("Advanced Literature Analysis", "english", Difficulty::Hard, "video", "https://www.khanacademy.org/humanities/art-history"),
];

/// The "Math Basics Quiz" used by the demo course
pub fn demo_quiz() -> Quiz {
    Quiz {
        id: DEMO_QUIZ_ID.to_string(),
        title: "Math Basics Quiz".to_string(),
        description: Some("Test your understanding of basic mathematical concepts".to_string()),
        course_id: DEMO_COURSE_ID.to_string(),
        subject: Some("math".to_string()),
        questions: vec![
            Question::multiple_choice("q1", "What is 5 + 3?", &["6", "7", "8", "9"], "C"),
            Question::true_false("q2", "Zero is a natural number.", false),
            Question::short_answer(
                "q3",
                "Explain what multiplication means in your own words.",
                "Multiplication is repeated addition or finding the total of equal groups.",
                &["repeated", "addition", "equal", "groups", "total"],
            ),
            Question::multiple_choice(
                "q4",
                "Which of the following is an integer?",
                &["1/2", "3.14", "-5", "√2"],
                "C",
            ),
            Question::true_false("q5", "All whole numbers are natural numbers.", false),
        ],
    }
}

/// Seed demo data. Does nothing if the demo course already exists.
pub fn seed_demo_data(conn: &Connection) -> Result<()> {
    if courses::get_course(conn, DEMO_COURSE_ID)?.is_some() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;

    if resources::resource_count(&tx)? == 0 {
        for (title, subject, difficulty, kind, url) in RESOURCES {
            resources::insert_resource(&tx, title, subject, difficulty, kind, url)?;
        }
    }

    let teacher_id = match auth_db::get_user_by_username(&tx, "demo_teacher")? {
        Some(user) => user.user_id,
        None => auth_db::create_user(&tx, "demo_teacher", Role::Teacher)?,
    };
    let student_id = match auth_db::get_user_by_username(&tx, "demo_student")? {
        Some(user) => user.user_id,
        None => auth_db::create_user(&tx, "demo_student", Role::Student)?,
    };

    courses::insert_course(
        &tx,
        &Course {
            id: DEMO_COURSE_ID.to_string(),
            title: "Introduction to Mathematics".to_string(),
            description: Some(
                "A comprehensive introduction to basic mathematical concepts including arithmetic, algebra, and geometry."
                    .to_string(),
            ),
            subject: "math".to_string(),
            teacher_id,
        },
    )?;

    let lessons = [
        ("lesson-1", "Introduction to Numbers", Difficulty::Easy),
        ("lesson-2", "Basic Addition and Subtraction", Difficulty::Easy),
        ("lesson-3", "Multiplication Tables", Difficulty::Medium),
    ];
    for (position, (id, title, difficulty)) in lessons.into_iter().enumerate() {
        courses::insert_lesson(
            &tx,
            &Lesson {
                id: id.to_string(),
                course_id: DEMO_COURSE_ID.to_string(),
                title: title.to_string(),
                position: position as i64,
                difficulty: Some(difficulty),
            },
        )?;
    }

    quizzes::insert_quiz(&tx, &demo_quiz())?;

    auth_db::create_session(&tx, student_id, DEMO_STUDENT_SESSION, DEMO_SESSION_HOURS)?;
    auth_db::create_session(&tx, teacher_id, DEMO_TEACHER_SESSION, DEMO_SESSION_HOURS)?;

    tx.commit()?;
    tracing::info!(
        "Seeded demo data (student session: {}, teacher session: {})",
        DEMO_STUDENT_SESSION,
        DEMO_TEACHER_SESSION
    );
    Ok(())
}
