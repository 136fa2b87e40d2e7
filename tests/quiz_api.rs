//! End-to-end tests of the JSON API over a seeded database, with AI offline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use lms_quiz::ai::Offline;
use lms_quiz::db::{self, seed};
use lms_quiz::domain::{QuizResult, Role};
use lms_quiz::notify::ProgressEvents;
use lms_quiz::session::{AttemptStore, Services};
use lms_quiz::state::AppState;
use lms_quiz::store::{ResultStore, SqliteStore, StoreError};
use lms_quiz::{app, auth};

struct Harness {
  server: TestServer,
  state: AppState,
  _temp: TempDir,
}

fn harness() -> Harness {
  let temp = TempDir::new().unwrap();
  let pool = db::init_db(&temp.path().join("app.db")).unwrap();
  {
    let conn = pool.lock().unwrap();
    db::seed_demo_data(&conn).unwrap();
  }

  let state = AppState::new(
    pool,
    Arc::new(Offline),
    Duration::from_secs(1),
    ProgressEvents::new(),
  );
  let server = TestServer::new(app(state.clone())).unwrap();
  Harness {
    server,
    state,
    _temp: temp,
  }
}

fn session_cookie(session_id: &str) -> HeaderValue {
  HeaderValue::from_str(&format!("{}={}", auth::SESSION_COOKIE_NAME, session_id)).unwrap()
}

/// Sign in a second teacher who owns nothing
fn other_teacher(h: &Harness) -> HeaderValue {
  let conn = h.state.db.lock().unwrap();
  let user_id = auth::db::create_user(&conn, "other_teacher", Role::Teacher).unwrap();
  auth::db::create_session(&conn, user_id, "other-teacher-session", 1).unwrap();
  session_cookie("other-teacher-session")
}

fn student() -> HeaderValue {
  session_cookie(seed::DEMO_STUDENT_SESSION)
}

fn teacher() -> HeaderValue {
  session_cookie(seed::DEMO_TEACHER_SESSION)
}

async fn start_demo_attempt(server: &TestServer) -> String {
  let response = server
    .post(&format!("/quizzes/{}/attempts", seed::DEMO_QUIZ_ID))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::CREATED);
  let body: Value = response.json();
  body["attempt_id"].as_str().unwrap().to_string()
}

async fn answer(server: &TestServer, attempt_id: &str, question_id: &str, value: &str) -> Value {
  let response = server
    .put(&format!("/attempts/{}/answers/{}", attempt_id, question_id))
    .add_header(header::COOKIE, student())
    .json(&json!({ "answer": value }))
    .await;
  response.assert_status_ok();
  response.json()
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
  let h = harness();

  let response = h.server.get("/results").await;
  response.assert_status(StatusCode::UNAUTHORIZED);

  let response = h
    .server
    .get("/results")
    .add_header(header::COOKIE, session_cookie("no-such-session"))
    .await;
  response.assert_status(StatusCode::UNAUTHORIZED);
  let body: Value = response.json();
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_teacher_cannot_take_quiz() {
  let h = harness();

  let response = h
    .server
    .post(&format!("/quizzes/{}/attempts", seed::DEMO_QUIZ_ID))
    .add_header(header::COOKIE, teacher())
    .await;
  response.assert_status(StatusCode::FORBIDDEN);
  let body: Value = response.json();
  assert_eq!(
    body["error"],
    "Teachers cannot take quizzes. Use the preview mode from the course page."
  );
}

#[tokio::test]
async fn test_unknown_quiz_is_not_found() {
  let h = harness();

  let response = h
    .server
    .post("/quizzes/missing/attempts")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attempt_navigation() {
  let h = harness();
  let attempt_id = start_demo_attempt(&h.server).await;

  let response = h
    .server
    .get(&format!("/attempts/{}", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let view: Value = response.json();
  assert_eq!(view["phase"], "active");
  assert_eq!(view["current_index"], 0);
  assert_eq!(view["total_questions"], 5);

  let view: Value = h
    .server
    .post(&format!("/attempts/{}/next", attempt_id))
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(view["current_index"], 1);

  let view: Value = h
    .server
    .post(&format!("/attempts/{}/jump", attempt_id))
    .add_header(header::COOKIE, student())
    .json(&json!({ "index": 4 }))
    .await
    .json();
  assert_eq!(view["current_index"], 4);

  let view: Value = h
    .server
    .post(&format!("/attempts/{}/previous", attempt_id))
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(view["current_index"], 3);

  let view = answer(&h.server, &attempt_id, "q1", "C").await;
  assert_eq!(view["answered"], 1);

  let response = h
    .server
    .put(&format!("/attempts/{}/answers/nope", attempt_id))
    .add_header(header::COOKIE, student())
    .json(&json!({ "answer": "x" }))
    .await;
  response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attempt_is_private_to_its_owner() {
  let h = harness();
  let attempt_id = start_demo_attempt(&h.server).await;

  let response = h
    .server
    .get(&format!("/attempts/{}", attempt_id))
    .add_header(header::COOKIE, teacher())
    .await;
  response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_grades_and_saves() {
  let h = harness();
  let attempt_id = start_demo_attempt(&h.server).await;

  answer(&h.server, &attempt_id, "q1", "C").await;
  answer(&h.server, &attempt_id, "q2", "False").await;
  answer(&h.server, &attempt_id, "q4", "A").await;
  answer(&h.server, &attempt_id, "q5", "false").await;

  let response = h
    .server
    .post(&format!("/attempts/{}/submit", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let outcome: Value = response.json();

  // 100, 100, 0 (blank), 0, 100
  assert_eq!(outcome["result"]["score"], 60);
  assert_eq!(outcome["result"]["total_questions"], 5);
  assert_eq!(outcome["persistence"]["status"], "saved");
  assert!(!outcome["recommendations"].as_array().unwrap().is_empty());

  let questions = outcome["result"]["questions"].as_array().unwrap();
  let ids: Vec<&str> = questions
    .iter()
    .map(|q| q["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, ["q1", "q2", "q3", "q4", "q5"]);

  // Graded attempts cannot be submitted or edited again
  let response = h
    .server
    .post(&format!("/attempts/{}/submit", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::CONFLICT);

  let response = h
    .server
    .put(&format!("/attempts/{}/answers/q1", attempt_id))
    .add_header(header::COOKIE, student())
    .json(&json!({ "answer": "A" }))
    .await;
  response.assert_status(StatusCode::CONFLICT);

  let response = h
    .server
    .post(&format!("/attempts/{}/save", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::CONFLICT);

  let summaries: Vec<Value> = h
    .server
    .get(&format!("/courses/{}/quizzes", seed::DEMO_COURSE_ID))
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(summaries[0]["attempts"], 1);

  let result_path = format!("/results/{}", outcome["result"]["id"].as_str().unwrap());
  let response = h.server.get(&result_path).add_header(header::COOKIE, student()).await;
  response.assert_status_ok();
  let stored: Value = response.json();
  assert_eq!(stored["score"], 60);

  // The course teacher can read it too, other teachers cannot
  h.server
    .get(&result_path)
    .add_header(header::COOKIE, teacher())
    .await
    .assert_status_ok();
  let outsider = other_teacher(&h);
  h.server
    .get(&result_path)
    .add_header(header::COOKIE, outsider)
    .await
    .assert_status(StatusCode::NOT_FOUND);

  let conn = h.state.db.lock().unwrap();
  let student_id = auth::db::get_user_by_username(&conn, "demo_student")
    .unwrap()
    .unwrap()
    .user_id;
  assert_eq!(db::count_results_for_quiz(&conn, student_id, seed::DEMO_QUIZ_ID).unwrap(), 1);
}

#[tokio::test]
async fn test_save_before_submit_conflicts() {
  let h = harness();
  let attempt_id = start_demo_attempt(&h.server).await;

  let response = h
    .server
    .post(&format!("/attempts/{}/save", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_results_are_newest_first() {
  let h = harness();

  for first_answer in ["A", "C"] {
    let attempt_id = start_demo_attempt(&h.server).await;
    answer(&h.server, &attempt_id, "q1", first_answer).await;
    h.server
      .post(&format!("/attempts/{}/submit", attempt_id))
      .add_header(header::COOKIE, student())
      .await
      .assert_status_ok();
    tokio::time::sleep(Duration::from_millis(5)).await;
  }

  let response = h
    .server
    .get("/results")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let results: Vec<Value> = response.json();
  assert_eq!(results.len(), 2);
  assert_eq!(results[0]["questions"][0]["student_answer"], "C");
  assert_eq!(results[1]["questions"][0]["student_answer"], "A");

  // Results are private to the student
  let results: Vec<Value> = h
    .server
    .get("/results")
    .add_header(header::COOKIE, teacher())
    .await
    .json();
  assert!(results.is_empty());
}

#[tokio::test]
async fn test_preview_is_for_teachers() {
  let h = harness();
  let path = format!("/quizzes/{}/preview", seed::DEMO_QUIZ_ID);

  let response = h.server.get(&path).add_header(header::COOKIE, teacher()).await;
  response.assert_status_ok();
  let quiz: Value = response.json();
  assert_eq!(quiz["title"], "Math Basics Quiz");
  assert_eq!(quiz["questions"].as_array().unwrap().len(), 5);

  let response = h.server.get(&path).add_header(header::COOKIE, student()).await;
  response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_quiz() {
  let h = harness();
  let body = json!({
    "id": "fractions",
    "title": "Fractions",
    "course_id": seed::DEMO_COURSE_ID,
    "questions": [
      {
        "id": "f1",
        "prompt": "Is 1/2 bigger than 1/3?",
        "type": "true_false",
        "correct_answer": "true"
      }
    ]
  });

  let response = h
    .server
    .post("/quizzes")
    .add_header(header::COOKIE, student())
    .json(&body)
    .await;
  response.assert_status(StatusCode::FORBIDDEN);

  let response = h
    .server
    .post("/quizzes")
    .add_header(header::COOKIE, teacher())
    .json(&body)
    .await;
  response.assert_status(StatusCode::CREATED);
  let quiz: Value = response.json();
  assert_eq!(quiz["subject"], "math");

  let response = h
    .server
    .post("/quizzes")
    .add_header(header::COOKIE, teacher())
    .json(&body)
    .await;
  response.assert_status(StatusCode::CONFLICT);

  let summaries: Vec<Value> = h
    .server
    .get(&format!("/courses/{}/quizzes", seed::DEMO_COURSE_ID))
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(summaries.len(), 2);
}

#[tokio::test]
async fn test_create_quiz_reports_every_problem() {
  let h = harness();

  let response = h
    .server
    .post("/quizzes")
    .add_header(header::COOKIE, teacher())
    .json(&json!({
      "title": " ",
      "course_id": seed::DEMO_COURSE_ID,
      "questions": []
    }))
    .await;
  response.assert_status(StatusCode::BAD_REQUEST);
  let body: Value = response.json();
  assert_eq!(
    body["error"],
    "Quiz title is required; Quiz needs at least one question"
  );
}

#[tokio::test]
async fn test_learning_path_follows_progress() {
  let h = harness();
  let path = format!("/courses/{}/learning-path", seed::DEMO_COURSE_ID);

  let guidance: Value = h.server.get(&path).add_header(header::COOKIE, student()).await.json();
  assert_eq!(guidance["path"], "beginner");
  assert_eq!(guidance["next_lesson"]["id"], "lesson-1");

  let response = h
    .server
    .post("/lessons/lesson-1/complete")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let progress: Value = response.json();
  assert_eq!(progress["completed_lessons"], json!(["lesson-1"]));

  let response = h
    .server
    .get("/courses/missing/learning-path")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::NOT_FOUND);

  let response = h
    .server
    .post("/lessons/missing/complete")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_jump_out_of_range_keeps_position() {
  let h = harness();
  let attempt_id = start_demo_attempt(&h.server).await;
  let path = format!("/attempts/{}/jump", attempt_id);

  h.server
    .post(&path)
    .add_header(header::COOKIE, student())
    .json(&json!({ "index": 2 }))
    .await
    .assert_status_ok();

  for index in [-1, 5, i64::MAX] {
    let response = h
      .server
      .post(&path)
      .add_header(header::COOKIE, student())
      .json(&json!({ "index": index }))
      .await;
    response.assert_status_ok();
    let view: Value = response.json();
    assert_eq!(view["current_index"], 2);
  }

  let response = h
    .server
    .post(&path)
    .add_header(header::COOKIE, student())
    .json(&json!({ "index": "two" }))
    .await;
  response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
  let body: Value = response.json();
  assert!(body["error"].is_string());
}

/// Result store that refuses to save while `failing` is set
struct FlakyResults {
  inner: SqliteStore,
  failing: AtomicBool,
}

#[async_trait]
impl ResultStore for FlakyResults {
  async fn save_result(&self, result: &QuizResult) -> Result<String, StoreError> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(StoreError::LockPoisoned);
    }
    self.inner.save_result(result).await
  }
}

#[tokio::test]
async fn test_failed_save_returns_result_and_can_be_retried() {
  let h = harness();
  let store = Arc::new(SqliteStore::new(h.state.db.clone()));
  let results = Arc::new(FlakyResults {
    inner: SqliteStore::new(h.state.db.clone()),
    failing: AtomicBool::new(true),
  });
  let state = AppState {
    db: h.state.db.clone(),
    attempts: AttemptStore::new(),
    services: Services {
      quizzes: store.clone(),
      results: results.clone(),
      resources: store,
      grader: Arc::new(Offline),
      recommender: Arc::new(Offline),
      events: ProgressEvents::new(),
      ai_timeout: Duration::from_secs(1),
    },
  };
  let server = TestServer::new(app(state)).unwrap();

  let attempt_id = start_demo_attempt(&server).await;
  answer(&server, &attempt_id, "q1", "C").await;

  let response = server
    .post(&format!("/attempts/{}/submit", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::BAD_GATEWAY);
  let outcome: Value = response.json();
  assert_eq!(outcome["result"]["score"], 20);
  assert_eq!(outcome["persistence"]["status"], "failed");
  assert!(outcome["persistence"]["reason"].is_string());

  let results_list: Vec<Value> = server
    .get("/results")
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert!(results_list.is_empty());

  results.failing.store(false, Ordering::SeqCst);
  let response = server
    .post(&format!("/attempts/{}/save", attempt_id))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let saved: Value = response.json();
  assert_eq!(saved["persistence"]["status"], "saved");
  assert_eq!(saved["result"]["id"], outcome["result"]["id"]);

  let results_list: Vec<Value> = server
    .get("/results")
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(results_list.len(), 1);
  assert_eq!(results_list[0]["score"], 20);
}

#[tokio::test]
async fn test_teacher_creates_course_and_lessons() {
  let h = harness();
  let course = json!({
    "id": "geometry",
    "title": "Geometry",
    "description": "Shapes and angles",
    "subject": " Math "
  });

  let response = h
    .server
    .post("/courses")
    .add_header(header::COOKIE, student())
    .json(&course)
    .await;
  response.assert_status(StatusCode::FORBIDDEN);

  let response = h
    .server
    .post("/courses")
    .add_header(header::COOKIE, teacher())
    .json(&course)
    .await;
  response.assert_status(StatusCode::CREATED);
  let created: Value = response.json();
  assert_eq!(created["id"], "geometry");
  assert_eq!(created["subject"], "math");

  h.server
    .post("/courses")
    .add_header(header::COOKIE, teacher())
    .json(&course)
    .await
    .assert_status(StatusCode::CONFLICT);

  let response = h
    .server
    .post("/courses")
    .add_header(header::COOKIE, teacher())
    .json(&json!({ "title": "", "subject": " " }))
    .await;
  response.assert_status(StatusCode::BAD_REQUEST);
  let body: Value = response.json();
  assert_eq!(body["error"], "Course title is required; Course subject is required");

  for (title, position) in [("Triangles", 0), ("Circles", 1)] {
    let response = h
      .server
      .post("/courses/geometry/lessons")
      .add_header(header::COOKIE, teacher())
      .json(&json!({ "title": title, "difficulty": "easy" }))
      .await;
    response.assert_status(StatusCode::CREATED);
    let lesson: Value = response.json();
    assert_eq!(lesson["position"], position);
    assert_eq!(lesson["course_id"], "geometry");
  }

  let response = h
    .server
    .post("/courses/geometry/lessons")
    .add_header(header::COOKIE, teacher())
    .json(&json!({ "title": "  " }))
    .await;
  response.assert_status(StatusCode::BAD_REQUEST);

  let outsider = other_teacher(&h);
  h.server
    .post("/courses/geometry/lessons")
    .add_header(header::COOKIE, outsider.clone())
    .json(&json!({ "title": "Squares" }))
    .await
    .assert_status(StatusCode::FORBIDDEN);
  h.server
    .post("/courses/missing/lessons")
    .add_header(header::COOKIE, teacher())
    .json(&json!({ "title": "Squares" }))
    .await
    .assert_status(StatusCode::NOT_FOUND);

  let lessons: Vec<Value> = h
    .server
    .get("/courses/geometry/lessons")
    .add_header(header::COOKIE, student())
    .await
    .json();
  let titles: Vec<&str> = lessons.iter().map(|l| l["title"].as_str().unwrap()).collect();
  assert_eq!(titles, ["Triangles", "Circles"]);

  // A quiz can now be attached to the new course, by its owner only
  let quiz = json!({
    "title": "Angles",
    "course_id": "geometry",
    "questions": [
      { "id": "a1", "prompt": "A right angle is 90 degrees", "type": "true_false", "correct_answer": "true" }
    ]
  });
  h.server
    .post("/quizzes")
    .add_header(header::COOKIE, outsider)
    .json(&quiz)
    .await
    .assert_status(StatusCode::FORBIDDEN);
  h.server
    .post("/quizzes")
    .add_header(header::COOKIE, teacher())
    .json(&quiz)
    .await
    .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_course_listing_depends_on_role() {
  let h = harness();
  let outsider = other_teacher(&h);
  h.server
    .post("/courses")
    .add_header(header::COOKIE, outsider.clone())
    .json(&json!({ "id": "zoology", "title": "Zoology", "subject": "science" }))
    .await
    .assert_status(StatusCode::CREATED);

  let ids = |courses: Vec<Value>| -> Vec<String> {
    courses.iter().map(|c| c["id"].as_str().unwrap().to_string()).collect()
  };

  let mine: Vec<Value> = h.server.get("/courses").add_header(header::COOKIE, teacher()).await.json();
  assert_eq!(ids(mine), [seed::DEMO_COURSE_ID]);

  let theirs: Vec<Value> = h.server.get("/courses").add_header(header::COOKIE, outsider).await.json();
  assert_eq!(ids(theirs), ["zoology"]);

  let all: Vec<Value> = h.server.get("/courses").add_header(header::COOKIE, student()).await.json();
  assert_eq!(ids(all), [seed::DEMO_COURSE_ID, "zoology"]);

  let response = h
    .server
    .get(&format!("/courses/{}", seed::DEMO_COURSE_ID))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let course: Value = response.json();
  assert_eq!(course["subject"], "math");

  h.server
    .get("/courses/missing")
    .add_header(header::COOKIE, student())
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_course_progress_and_resources() {
  let h = harness();

  h.server
    .post("/lessons/lesson-2/complete")
    .add_header(header::COOKIE, student())
    .await
    .assert_status_ok();

  let response = h
    .server
    .get(&format!("/courses/{}/progress", seed::DEMO_COURSE_ID))
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status_ok();
  let progress: Value = response.json();
  assert_eq!(progress["completed_lessons"], json!(["lesson-2"]));

  h.server
    .get("/courses/missing/progress")
    .add_header(header::COOKIE, student())
    .await
    .assert_status(StatusCode::NOT_FOUND);

  let easy: Vec<Value> = h
    .server
    .get("/resources?subject=Math&difficulty=easy")
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(easy.len(), 2);
  assert!(easy.iter().all(|r| r["difficulty"] == "easy"));

  let all: Vec<Value> = h
    .server
    .get("/resources?subject=math")
    .add_header(header::COOKIE, student())
    .await
    .json();
  assert_eq!(all.len(), 4);

  let response = h
    .server
    .get("/resources")
    .add_header(header::COOKIE, student())
    .await;
  response.assert_status(StatusCode::BAD_REQUEST);
  let body: Value = response.json();
  assert!(body["error"].is_string());
}
