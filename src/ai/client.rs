//! OpenAI-compatible chat-completions adapter implementing the AI ports.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::prompts::{grading_prompt, parse_grade, parse_recommendations, recommendation_prompt};
use super::{AiError, AiGrader, AiRecommender, FreeTextRequest, RecommendationRequest};
use crate::config::AiConfig;
use crate::domain::Recommendation;
use crate::grading::Grade;

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  #[serde(default)]
  content: Option<String>,
}

/// Sampling settings per request kind
struct Sampling {
  temperature: f32,
  max_tokens: u32,
}

const GRADING: Sampling = Sampling {
  temperature: 0.3,
  max_tokens: 300,
};

const RECOMMENDING: Sampling = Sampling {
  temperature: 0.7,
  max_tokens: 400,
};

#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
  client: Client,
  endpoint: String,
  model: String,
  api_key: Option<String>,
}

impl ChatCompletionsClient {
  pub fn new(config: &AiConfig) -> Result<Self, AiError> {
    let client = Client::builder()
      .timeout(config.timeout())
      .connect_timeout(Duration::from_secs(10))
      .build()?;

    Ok(Self {
      client,
      endpoint: config.endpoint.clone(),
      model: config.model.clone(),
      api_key: config.api_key.clone(),
    })
  }

  /// Send a single-message completion and return the reply text
  async fn complete(&self, prompt: String, sampling: &Sampling) -> Result<String, AiError> {
    let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;

    let body = serde_json::json!({
      "model": self.model,
      "messages": [{ "role": "user", "content": prompt }],
      "temperature": sampling.temperature,
      "max_tokens": sampling.max_tokens,
    });

    let response = self
      .client
      .post(&self.endpoint)
      .bearer_auth(api_key)
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(AiError::Status {
        status: status.as_u16(),
        message,
      });
    }

    let chat: ChatResponse = response.json().await?;
    let content = chat
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| AiError::Parse("response has no message content".into()))?;

    debug!("AI response ({} chars)", content.len());
    Ok(content)
  }
}

#[async_trait]
impl AiGrader for ChatCompletionsClient {
  async fn grade_free_text(&self, request: &FreeTextRequest<'_>) -> Result<Grade, AiError> {
    let content = self.complete(grading_prompt(request), &GRADING).await?;
    parse_grade(&content)
  }
}

#[async_trait]
impl AiRecommender for ChatCompletionsClient {
  async fn recommend(
    &self,
    request: &RecommendationRequest<'_>,
  ) -> Result<Vec<Recommendation>, AiError> {
    let content = self
      .complete(recommendation_prompt(request), &RECOMMENDING)
      .await?;
    parse_recommendations(&content, request.subject)
  }
}
