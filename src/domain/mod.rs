pub mod course;
pub mod quiz;
pub mod result;
pub mod user;

pub use course::{Course, CourseProgress, Lesson};
pub use quiz::{option_index, AnswerMap, Question, QuestionKind, QuestionView, Quiz};
pub use result::{
  Difficulty, GradeSource, GradedQuestion, Priority, QuizResult, Recommendation, Resource,
};
pub use user::{Role, UserContext};
