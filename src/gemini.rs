//! Minimal Gemini client for structured canvas generation.
//!
//! We only call generateContent, always with a JSON response schema attached.
//! Calls are instrumented and log model names and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use crate::error::CanvasError;
use crate::prompt::GenerationRequest;

/// Boundary to the generation backend. The service logic only sees this
/// trait, so tests drive it with a scripted fake instead of the network.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Run one generation and return the raw response text. Decoding the text
  /// into a document is the parser's job, not the client's.
  async fn generate(&self, request: &GenerationRequest) -> Result<String, CanvasError>;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  #[instrument(level = "info", skip(self, request), fields(model = %self.model, instruction_len = request.instruction.len()))]
  async fn generate_content(&self, request: &GenerationRequest) -> Result<String, CanvasError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      contents: vec![ContentReq {
        role: "user".into(),
        parts: vec![PartReq { text: request.instruction.clone() }],
      }],
      generation_config: GenerationConfig {
        response_mime_type: "application/json".into(),
        response_schema: request.response_schema.clone(),
        temperature: request.temperature,
      },
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "educanvas-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await
      .map_err(|e| CanvasError::Unavailable(format!("generation backend unreachable: {e}")))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      return Err(CanvasError::Unavailable(format!("Gemini HTTP {status}: {msg}")));
    }

    let body: GenerateContentResponse = res.json().await
      .map_err(|e| CanvasError::Unavailable(format!("unreadable Gemini response: {e}")))?;
    if let Some(usage) = &body.usage_metadata {
      info!(
        prompt_tokens = ?usage.prompt_token_count,
        candidate_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }

    let text: String = body
      .candidates
      .into_iter()
      .next()
      .map(|c| {
        c.content
          .parts
          .into_iter()
          .filter_map(|p| p.text)
          .collect::<Vec<_>>()
          .join("")
      })
      .unwrap_or_default();

    if text.trim().is_empty() {
      return Err(CanvasError::Unavailable("empty generation response".into()));
    }
    Ok(text)
  }
}

#[async_trait]
impl TextGenerator for Gemini {
  async fn generate(&self, request: &GenerationRequest) -> Result<String, CanvasError> {
    self.generate_content(request).await
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<ContentReq>,
  generation_config: GenerationConfig,
}
#[derive(Serialize)]
struct ContentReq { role: String, parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  response_mime_type: String,
  response_schema: Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { content: ContentResp }
#[derive(Deserialize)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
