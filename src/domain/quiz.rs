use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Question payload keyed by question type.
/// Serialized with a `type` tag so stored quizzes read as
/// `{"type": "multiple_choice", "options": [...], "correct_option": "B"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice {
    options: Vec<String>,
    /// Letter of the correct option ("A" is the first option)
    correct_option: String,
  },
  TrueFalse {
    /// "true" or "false"
    correct_answer: String,
  },
  ShortAnswer {
    reference_answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keywords: Vec<String>,
  },
}

impl QuestionKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::MultipleChoice { .. } => "multiple_choice",
      Self::TrueFalse { .. } => "true_false",
      Self::ShortAnswer { .. } => "short_answer",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  #[serde(flatten)]
  pub kind: QuestionKind,
}

impl Question {
  pub fn multiple_choice(id: &str, prompt: &str, options: &[&str], correct_option: &str) -> Self {
    Self {
      id: id.to_string(),
      prompt: prompt.to_string(),
      kind: QuestionKind::MultipleChoice {
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_option: correct_option.to_string(),
      },
    }
  }

  pub fn true_false(id: &str, prompt: &str, correct_answer: bool) -> Self {
    Self {
      id: id.to_string(),
      prompt: prompt.to_string(),
      kind: QuestionKind::TrueFalse {
        correct_answer: correct_answer.to_string(),
      },
    }
  }

  pub fn short_answer(id: &str, prompt: &str, reference_answer: &str, keywords: &[&str]) -> Self {
    Self {
      id: id.to_string(),
      prompt: prompt.to_string(),
      kind: QuestionKind::ShortAnswer {
        reference_answer: reference_answer.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
      },
    }
  }
}

/// Index of the option labelled `letter` ("A" → 0)
pub fn option_index(letter: &str) -> Option<usize> {
  let mut chars = letter.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) if c.is_ascii_uppercase() => Some((c as u8 - b'A') as usize),
    _ => None,
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub course_id: String,
  #[serde(default)]
  pub subject: Option<String>,
  pub questions: Vec<Question>,
}

impl Quiz {
  /// Subject used for recommendations ("general" when unset)
  pub fn subject_or_general(&self) -> &str {
    self.subject.as_deref().unwrap_or("general")
  }
}

/// Student-facing question, without the correct answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
  pub id: String,
  pub number: usize,
  #[serde(rename = "type")]
  pub kind: String,
  pub prompt: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
}

impl QuestionView {
  pub fn from_question(question: &Question, index: usize) -> Self {
    let options = match &question.kind {
      QuestionKind::MultipleChoice { options, .. } => options.clone(),
      _ => Vec::new(),
    };
    Self {
      id: question.id.clone(),
      number: index + 1,
      kind: question.kind.as_str().to_string(),
      prompt: question.prompt.clone(),
      options,
    }
  }
}

/// Current response per question. Holds exactly one entry per quiz question
/// for its whole lifetime; an empty string means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(HashMap<String, String>);

impl AnswerMap {
  pub fn for_questions(questions: &[Question]) -> Self {
    Self(
      questions
        .iter()
        .map(|q| (q.id.clone(), String::new()))
        .collect(),
    )
  }

  /// Overwrite the answer for a known question. Unknown ids are refused so
  /// the map never gains keys.
  pub fn set(&mut self, question_id: &str, value: String) -> bool {
    match self.0.get_mut(question_id) {
      Some(slot) => {
        *slot = value;
        true
      }
      None => false,
    }
  }

  pub fn get(&self, question_id: &str) -> Option<&str> {
    self.0.get(question_id).map(String::as_str)
  }

  /// Answer for a question, empty when missing
  pub fn answer_for(&self, question_id: &str) -> &str {
    self.get(question_id).unwrap_or("")
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn answered_count(&self) -> usize {
    self.0.values().filter(|v| !v.is_empty()).count()
  }

  pub fn as_map(&self) -> &HashMap<String, String> {
    &self.0
  }
}
