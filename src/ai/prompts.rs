//! Prompt construction and response parsing for the AI service.
//!
//! The model is asked to answer in JSON. Responses are accepted only when
//! they parse into the expected shape; anything else is an `AiError::Parse`
//! and the caller falls back to local logic.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::{AiError, FreeTextRequest, RecommendationRequest};
use crate::domain::{Priority, Recommendation};
use crate::grading::Grade;

// ============================================================================
// Prompts
// ============================================================================

pub fn grading_prompt(request: &FreeTextRequest<'_>) -> String {
  let key_concepts = if request.keywords.is_empty() {
    String::new()
  } else {
    format!("Key Concepts: {}\n", request.keywords.join(", "))
  };

  format!(
    r#"You are an AI tutor grading a student's answer. Please provide a fair and constructive assessment.

Question: "{question}"
Correct Answer: "{reference}"
{key_concepts}Student Answer: "{student}"

Please provide:
1. A score from 0-100
2. Constructive feedback
3. What the student did well
4. What they could improve

Respond in JSON format:
{{
  "score": number,
  "feedback": "string",
  "strengths": "string",
  "improvements": "string"
}}
"#,
    question = request.question,
    reference = request.reference_answer,
    student = request.student_answer,
  )
}

pub fn recommendation_prompt(request: &RecommendationRequest<'_>) -> String {
  // Sorted so the prompt is stable for a given attempt
  let answers: BTreeMap<&String, &String> = request.answers.iter().collect();
  let answers_json = serde_json::to_string(&answers).unwrap_or_else(|_| "{}".to_string());

  format!(
    r#"You are an AI learning assistant creating personalized recommendations for a K-12 student.

Student Performance:
- Quiz Score: {score}%
- Subject: {subject}
- Student Answers: {answers_json}
- Course Content: {context}

Based on this performance, provide:
1. Learning path recommendation (remedial, standard, or advanced)
2. Specific study suggestions
3. Recommended resources
4. Motivational message

Respond in JSON format:
{{
  "learningPath": "remedial|standard|advanced",
  "studySuggestions": ["suggestion1", "suggestion2", "suggestion3"],
  "recommendedResources": ["resource1", "resource2"],
  "motivationalMessage": "string",
  "nextSteps": "string"
}}
"#,
    score = request.score,
    subject = request.subject,
    context = request.context,
  )
}

// ============================================================================
// Response parsing
// ============================================================================

/// Slice from the first `{` to the last `}`, dropping code fences or prose
/// the model put around the JSON.
pub fn extract_json_object(text: &str) -> Option<&str> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  (start < end).then(|| &text[start..=end])
}

#[derive(Debug, Deserialize)]
struct RawGrade {
  score: f64,
  feedback: String,
  #[serde(default)]
  strengths: Option<String>,
  #[serde(default)]
  improvements: Option<String>,
}

/// Parse a grading response into a `Grade`
pub fn parse_grade(content: &str) -> Result<Grade, AiError> {
  let json = extract_json_object(content)
    .ok_or_else(|| AiError::Parse("no JSON object in grading response".into()))?;
  let raw: RawGrade =
    serde_json::from_str(json).map_err(|e| AiError::Parse(format!("grading response: {}", e)))?;

  if !raw.score.is_finite() || !(0.0..=100.0).contains(&raw.score) {
    return Err(AiError::Parse(format!("score out of range: {}", raw.score)));
  }
  if raw.feedback.trim().is_empty() {
    return Err(AiError::Parse("empty feedback".into()));
  }

  Ok(Grade {
    score: raw.score.round() as u8,
    feedback: raw.feedback,
    strengths: raw.strengths.filter(|s| !s.trim().is_empty()),
    improvements: raw.improvements.filter(|s| !s.trim().is_empty()),
  })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecommendations {
  learning_path: String,
  #[serde(default)]
  study_suggestions: Vec<String>,
  #[serde(default)]
  recommended_resources: Vec<String>,
  #[serde(default)]
  motivational_message: String,
  #[serde(default)]
  next_steps: String,
}

const LEARNING_PATHS: [&str; 3] = ["remedial", "standard", "advanced"];

/// Parse a recommendation response into the list shown after a quiz:
/// learning path, study tips, resources, then next steps.
pub fn parse_recommendations(content: &str, subject: &str) -> Result<Vec<Recommendation>, AiError> {
  let json = extract_json_object(content)
    .ok_or_else(|| AiError::Parse("no JSON object in recommendation response".into()))?;
  let raw: RawRecommendations = serde_json::from_str(json)
    .map_err(|e| AiError::Parse(format!("recommendation response: {}", e)))?;

  let path = raw.learning_path.trim().to_lowercase();
  if !LEARNING_PATHS.contains(&path.as_str()) {
    return Err(AiError::Parse(format!("unknown learning path: {}", raw.learning_path)));
  }

  let mut recommendations = vec![ai_recommendation(
    &path,
    format!("Learning Path: {}", capitalize(&path)),
    raw.motivational_message,
    Priority::High,
  )];

  for (i, suggestion) in raw.study_suggestions.into_iter().enumerate() {
    recommendations.push(ai_recommendation(
      "study",
      format!("Study Tip {}", i + 1),
      suggestion,
      Priority::Medium,
    ));
  }

  for resource in raw.recommended_resources {
    recommendations.push(ai_recommendation(
      "resource",
      resource,
      format!("AI-recommended resource for {}", subject),
      Priority::Medium,
    ));
  }

  if !raw.next_steps.trim().is_empty() {
    recommendations.push(ai_recommendation(
      "next",
      "Next Steps".to_string(),
      raw.next_steps,
      Priority::High,
    ));
  }

  Ok(recommendations)
}

fn ai_recommendation(kind: &str, title: String, description: String, priority: Priority) -> Recommendation {
  Recommendation {
    kind: kind.to_string(),
    title,
    description,
    priority,
    url: None,
    ai_generated: true,
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}
