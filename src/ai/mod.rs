//! Ports to the hosted AI service used for free-text grading and
//! personalized recommendations.
//!
//! Both features are enhancements: every caller pairs them with a local
//! fallback, so an `AiError` is logged and absorbed, never shown to users.

pub mod client;
pub mod prompts;

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::domain::Recommendation;
use crate::grading::Grade;

pub use client::ChatCompletionsClient;

#[derive(Error, Debug)]
pub enum AiError {
  #[error("AI service is not configured")]
  NotConfigured,

  #[error("AI request timed out after {0:?}")]
  Timeout(Duration),

  #[error("AI request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("AI service returned status {status}: {message}")]
  Status { status: u16, message: String },

  #[error("Failed to parse AI response: {0}")]
  Parse(String),
}

/// A free-text answer to be judged against the reference answer
#[derive(Debug, Clone)]
pub struct FreeTextRequest<'a> {
  pub question: &'a str,
  pub reference_answer: &'a str,
  pub student_answer: &'a str,
  pub keywords: &'a [String],
}

/// Context for personalized recommendations after a quiz
#[derive(Debug, Clone)]
pub struct RecommendationRequest<'a> {
  pub score: u8,
  pub subject: &'a str,
  pub answers: &'a HashMap<String, String>,
  /// Free-form description of what was studied (quiz title)
  pub context: &'a str,
}

#[async_trait]
pub trait AiGrader: Send + Sync {
  async fn grade_free_text(&self, request: &FreeTextRequest<'_>) -> Result<Grade, AiError>;
}

#[async_trait]
pub trait AiRecommender: Send + Sync {
  async fn recommend(
    &self,
    request: &RecommendationRequest<'_>,
  ) -> Result<Vec<Recommendation>, AiError>;
}

/// Bound an AI call in time. Running out of time is reported as
/// `AiError::Timeout`, which callers handle like any other failure.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, AiError>
where
  F: Future<Output = Result<T, AiError>>,
{
  match tokio::time::timeout(limit, call).await {
    Ok(result) => result,
    Err(_) => Err(AiError::Timeout(limit)),
  }
}

/// Stand-in used when AI features are disabled; every call fails fast so the
/// local fallbacks take over.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl AiGrader for Offline {
  async fn grade_free_text(&self, _request: &FreeTextRequest<'_>) -> Result<Grade, AiError> {
    Err(AiError::NotConfigured)
  }
}

#[async_trait]
impl AiRecommender for Offline {
  async fn recommend(
    &self,
    _request: &RecommendationRequest<'_>,
  ) -> Result<Vec<Recommendation>, AiError> {
    Err(AiError::NotConfigured)
  }
}
