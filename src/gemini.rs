//! Minimal Gemini client for our use-cases.
//!
//! We only call models/{model}:generateContent and expect either plain text
//! or a JSON payload embedded in the reply. Calls are instrumented and log
//! model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, info, error};

use crate::config::Prompts;
use crate::domain::{GenerateRequest, PassageChunk};
use crate::util::{fill_template, trunc_for_log};

/// Temperature for exercise generation; low keeps the JSON shape stable.
const GENERATE_TEMPERATURE: f32 = 0.3;

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GOOGLE_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GOOGLE_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash-exp".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Plain-text generation. Used for explanations and as the transport
  /// under `generate_json`.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_content(&self, prompt: &str, temperature: Option<f32>) -> Result<String, String> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      contents: vec![ContentReq { parts: vec![PartReq { text: prompt.to_string() }] }],
      generation_config: temperature.map(|t| GenerationConfig { temperature: t }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "learncoach-content/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or_else(|| body);
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidate_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = body.candidates.get(0)
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect::<Vec<_>>().join(""))
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Generation where the reply is expected to carry a JSON payload, possibly
  /// wrapped in a code fence or prose. Extraction failures surface as Err so
  /// callers can fall through to the next strategy.
  async fn generate_json(&self, prompt: &str) -> Result<Value, String> {
    let text = self.generate_content(prompt, Some(GENERATE_TEMPERATURE)).await?;
    let block = extract_json_block(&text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str(&block).map_err(|e| {
      error!(raw = %trunc_for_log(&block, 400), "Gemini reply was not valid JSON");
      format!("JSON parse error: {}", e)
    })
  }

  // --- High-level helpers (domain-specialized) ---

  /// Ask the model for `req.n` exercise items grounded in `contexts`.
  /// Returns the raw JSON payload; normalization happens in the generator.
  #[instrument(
    level = "info",
    skip(self, prompts, req, contexts),
    fields(topic = %req.topic, n = req.n, model = %self.model, contexts = contexts.len())
  )]
  pub async fn generate_items(
    &self,
    prompts: &Prompts,
    req: &GenerateRequest,
    contexts: &[PassageChunk],
  ) -> Result<Value, String> {
    let ctx_block = context_block(contexts, ContextMarker::Paren);
    let user = fill_template(
      &prompts.generate_user_template,
      &[
        ("contexts", &ctx_block),
        ("topic", &req.topic),
        ("n", &req.n.to_string()),
        ("difficulty", &req.difficulty.to_string()),
        ("format", req.format.as_str()),
      ],
    );
    let prompt = format!("{}\n\n{}", prompts.generate_system, user);

    let start = std::time::Instant::now();
    let result = self.generate_json(&prompt).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(_) => info!(?elapsed, "Model returned an exercise payload"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during exercise generation"),
    }
    result
  }

  /// Step-by-step explanation of `problem` grounded in `contexts`.
  #[instrument(level = "info", skip(self, prompts, problem, contexts), fields(problem_len = problem.len(), contexts = contexts.len()))]
  pub async fn explain(
    &self,
    prompts: &Prompts,
    problem: &str,
    contexts: &[PassageChunk],
  ) -> Result<String, String> {
    let ctx_block = context_block(contexts, ContextMarker::Bracket);
    let user = fill_template(
      &prompts.explain_user_template,
      &[("contexts", &ctx_block), ("problem", problem.trim())],
    );
    let prompt = format!("{}\n\n{}", prompts.explain_system, user);
    self.generate_content(&prompt, None).await
  }
}

/// Per-chunk marker style inside prompt context blocks.
#[derive(Clone, Copy)]
pub enum ContextMarker {
  /// `- (3) preview`, used in generation prompts.
  Paren,
  /// `- [3] preview`, used in explanation prompts.
  Bracket,
}

/// Render context chunks as prompt lines, one per chunk.
pub fn context_block(contexts: &[PassageChunk], marker: ContextMarker) -> String {
  if contexts.is_empty() {
    return "(no context)".to_string();
  }
  contexts
    .iter()
    .map(|c| match marker {
      ContextMarker::Paren => format!("- ({}) {}", c.chunk_index, c.preview),
      ContextMarker::Bracket => format!("- [{}] {}", c.chunk_index, c.preview),
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Pull the JSON payload out of a model reply: a ```json fence wins, then
/// the widest bracketed array, then the widest braced object.
pub fn extract_json_block(text: &str) -> Option<String> {
  let t = text.trim();
  if t.is_empty() {
    return None;
  }
  for (i, _) in t.match_indices("```") {
    let after = &t[i + 3..];
    if let Some(tag) = after.get(..4) {
      if tag.eq_ignore_ascii_case("json") {
        let body = &after[4..];
        if let Some(end) = body.find("```") {
          return Some(body[..end].trim().to_string());
        }
      }
    }
  }
  for (open, close) in [('[', ']'), ('{', '}')] {
    if let (Some(start), Some(end)) = (t.find(open), t.rfind(close)) {
      if start < end {
        return Some(t[start..=end].trim().to_string());
      }
    }
  }
  None
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<ContentReq>,
  #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
  generation_config: Option<GenerationConfig>,
}
#[derive(Serialize)]
struct ContentReq { parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
struct GenerationConfig { temperature: f32 }

#[derive(Deserialize)]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default, rename = "usageMetadata")] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { content: Option<ContentResp> }
#[derive(Deserialize)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
struct UsageMetadata {
  #[serde(default, rename = "promptTokenCount")] prompt_token_count: Option<u32>,
  #[serde(default, rename = "candidatesTokenCount")] candidates_token_count: Option<u32>,
  #[serde(default, rename = "totalTokenCount")] total_token_count: Option<u32>,
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
