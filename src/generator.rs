//! Exercise generation: an ordered strategy chain over the local question
//! bank, Gemini enrichment, and a deterministic fallback.
//!
//! Each strategy either yields a full result or nothing; the first success
//! wins and stamps its provenance into `used_model`. The fallback cannot
//! fail, so every request produces exactly `n` items.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::artifacts;
use crate::config::Prompts;
use crate::curriculum;
use crate::domain::{ExerciseItem, GenerateRequest, PassageChunk, QuestionKind};
use crate::gemini::Gemini;
use crate::sampler;

/// Provenance tag for locally sampled exercises.
pub const ARTIFACTS_TAG: &str = "artifacts";
/// Provenance tag for the deterministic template items.
pub const FALLBACK_TAG: &str = "fallback";

/// Options per enrichment item are capped at this many entries.
const MAX_OPTIONS: usize = 6;

/// Generation strategies, in the order they are attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
  Artifacts,
  Enrichment,
  Fallback,
}

pub const STRATEGY_ORDER: [Strategy; 3] = [Strategy::Artifacts, Strategy::Enrichment, Strategy::Fallback];

/// Run the strategy chain for `req`. `contexts` were retrieved by the
/// caller and are attached to the result regardless of which strategy wins.
/// Returns the items plus the provenance tag for `used_model`.
pub async fn generate(
  req: &GenerateRequest,
  contexts: &[PassageChunk],
  gemini: Option<&Gemini>,
  prompts: &Prompts,
  question_bank_root: &Path,
) -> (Vec<ExerciseItem>, String) {
  for strategy in STRATEGY_ORDER {
    let outcome = match strategy {
      Strategy::Artifacts => from_artifacts(req, question_bank_root),
      Strategy::Enrichment => from_enrichment(req, contexts, gemini, prompts).await,
      Strategy::Fallback => Some((fallback_items(req), FALLBACK_TAG.to_string())),
    };
    if let Some((items, used_model)) = outcome {
      info!(
        target: "content",
        topic = %req.topic,
        requested = req.n,
        produced = items.len(),
        %used_model,
        ?strategy,
        "Generated exercise items"
      );
      return (items, used_model);
    }
  }
  // Not reached: the fallback strategy always yields items.
  (fallback_items(req), FALLBACK_TAG.to_string())
}

/// Sample from the local question bank. Nothing to offer when the topic has
/// no artifact coverage or its files hold no answerable questions.
fn from_artifacts(req: &GenerateRequest, bank_root: &Path) -> Option<(Vec<ExerciseItem>, String)> {
  let files = match artifacts::find_topic_files(&req.topic, bank_root) {
    Some(f) => f,
    None => {
      debug!(target: "content", topic = %req.topic, "No artifact coverage for topic");
      return None;
    }
  };
  let pool = artifacts::load_questions(&files);
  if pool.is_empty() {
    debug!(target: "content", topic = %req.topic, files = files.len(), "Artifact files held no usable questions");
    return None;
  }
  let items = sampler::sample(&pool, req.n, req.difficulty, req.format);
  if items.is_empty() {
    return None;
  }
  Some((items, ARTIFACTS_TAG.to_string()))
}

/// Ask Gemini for items. Any failure (client absent, call error, unusable
/// payload) yields None so the chain falls through.
async fn from_enrichment(
  req: &GenerateRequest,
  contexts: &[PassageChunk],
  gemini: Option<&Gemini>,
  prompts: &Prompts,
) -> Option<(Vec<ExerciseItem>, String)> {
  let client = gemini?;
  let raw = match client.generate_items(prompts, req, contexts).await {
    Ok(v) => v,
    Err(e) => {
      warn!(target: "content", topic = %req.topic, error = %e, "Enrichment failed; falling through");
      return None;
    }
  };
  let items = normalize_items(&raw, req);
  if items.is_empty() {
    warn!(target: "content", topic = %req.topic, "Enrichment payload held no usable items");
    return None;
  }
  Some((items, client.model.clone()))
}

/// Normalize a model payload into at most `req.n` exercise items.
///
/// A lone object counts as a one-element array. Per item: the question text
/// may live under "question", "q", or "text"; unknown types read as open;
/// difficulty outside 1-5 falls back to the requested one; options beyond
/// six are dropped; a correct_index that does not resolve into the kept
/// options is dropped rather than kept stale.
pub fn normalize_items(raw: &Value, req: &GenerateRequest) -> Vec<ExerciseItem> {
  let singleton;
  let entries: &[Value] = match raw {
    Value::Array(a) => a.as_slice(),
    Value::Object(_) => {
      singleton = [raw.clone()];
      &singleton
    }
    _ => return Vec::new(),
  };

  let mut items = Vec::new();
  for entry in entries {
    if items.len() >= req.n {
      break;
    }
    let obj = match entry.as_object() {
      Some(o) => o,
      None => continue,
    };
    let question = ["question", "q", "text"]
      .iter()
      .find_map(|k| obj.get(*k).and_then(Value::as_str))
      .map(str::trim)
      .unwrap_or("");
    if question.is_empty() {
      continue;
    }

    let kind = match obj.get("type").and_then(Value::as_str).map(str::to_lowercase).as_deref() {
      Some("mcq") => QuestionKind::Mcq,
      Some(_) => QuestionKind::Open,
      None => req.format.item_kind(),
    };

    let difficulty = obj
      .get("difficulty")
      .and_then(Value::as_u64)
      .filter(|d| (1..=5).contains(d))
      .map(|d| d as u8)
      .unwrap_or(req.difficulty);

    let mut options: Option<Vec<String>> = None;
    let mut correct_index: Option<usize> = None;
    if kind == QuestionKind::Mcq {
      options = ["options", "choices"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
        .map(|a| {
          a.iter()
            .filter_map(Value::as_str)
            .take(MAX_OPTIONS)
            .map(str::to_string)
            .collect::<Vec<String>>()
        })
        .filter(|o| !o.is_empty());
      if let Some(opts) = &options {
        correct_index = obj
          .get("correct_index")
          .and_then(Value::as_u64)
          .map(|i| i as usize)
          .filter(|i| *i < opts.len());
      }
    }

    let solution = ["solution", "answer"]
      .iter()
      .find_map(|k| obj.get(*k).and_then(Value::as_str))
      .map(str::to_string);

    items.push(ExerciseItem {
      question: question.to_string(),
      kind,
      difficulty,
      options,
      correct_index,
      solution,
    });
  }
  items
}

/// Deterministic template items; always exactly `req.n` of them.
pub fn fallback_items(req: &GenerateRequest) -> Vec<ExerciseItem> {
  (0..req.n)
    .map(|i| curriculum::fallback_exercise(&req.topic, i, req.difficulty, req.format))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ExerciseFormat;
  use serde_json::json;

  fn req(topic: &str, n: usize, format: ExerciseFormat) -> GenerateRequest {
    GenerateRequest { topic: topic.to_string(), n, difficulty: 3, format, top_k: 4 }
  }

  #[tokio::test]
  async fn chain_lands_on_fallback_without_bank_or_client() {
    let dir = tempfile::tempdir().expect("tempdir");
    let r = req("Vectơ", 4, ExerciseFormat::Mcq);
    let prompts = Prompts::default();
    let (items, used_model) = generate(&r, &[], None, &prompts, dir.path()).await;
    assert_eq!(used_model, FALLBACK_TAG);
    assert_eq!(items.len(), 4);
    for it in &items {
      assert_eq!(it.kind, QuestionKind::Mcq);
      assert_eq!(it.correct_index, Some(0));
    }
  }

  #[tokio::test]
  async fn chain_prefers_artifacts_when_the_bank_covers_the_topic() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
      dir.path().join("chuong_4.json"),
      serde_json::to_string(&json!([
        {"text": "q1", "answer_type": "mcq", "options": ["a", "b"], "answer": {"correct": "A"}},
        {"text": "q2", "answer_type": "mcq", "options": ["a", "b"], "answer": {"correct": "B"}}
      ]))
      .expect("json"),
    )
    .expect("write");
    let r = req("Vectơ", 2, ExerciseFormat::Mcq);
    let prompts = Prompts::default();
    let (items, used_model) = generate(&r, &[], None, &prompts, dir.path()).await;
    assert_eq!(used_model, ARTIFACTS_TAG);
    assert_eq!(items.len(), 2);
  }

  #[test]
  fn normalize_wraps_single_objects_and_caps_count() {
    let r = req("Elip", 1, ExerciseFormat::Open);
    let one = normalize_items(&json!({"question": "chỉ một câu"}), &r);
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].kind, QuestionKind::Open);

    let many = normalize_items(
      &json!([{"q": "a"}, {"text": "b"}, {"question": "c"}]),
      &r,
    );
    assert_eq!(many.len(), 1);
  }

  #[test]
  fn normalize_repairs_malformed_fields() {
    let r = req("Elip", 5, ExerciseFormat::Mcq);
    let raw = json!([
      {
        "question": "câu mcq",
        "type": "MCQ",
        "difficulty": 9,
        "options": ["1", "2", "3", "4", "5", "6", "7", "8"],
        "correct_index": 7
      },
      {"question": "kiểu lạ", "type": "essay"},
      {"question": "  ", "type": "open"},
      {"question": "không type"}
    ]);
    let items = normalize_items(&raw, &r);
    assert_eq!(items.len(), 3);

    // Option list capped at six; the now-dangling correct_index is dropped.
    let mcq = &items[0];
    assert_eq!(mcq.kind, QuestionKind::Mcq);
    assert_eq!(mcq.difficulty, 3);
    assert_eq!(mcq.options.as_ref().expect("options").len(), 6);
    assert_eq!(mcq.correct_index, None);

    assert_eq!(items[1].kind, QuestionKind::Open);
    // Missing type under an mcq request reads as mcq.
    assert_eq!(items[2].kind, QuestionKind::Mcq);
  }

  #[test]
  fn normalize_rejects_non_collection_payloads() {
    let r = req("Elip", 3, ExerciseFormat::Open);
    assert!(normalize_items(&json!("text"), &r).is_empty());
    assert!(normalize_items(&json!(42), &r).is_empty());
    assert!(normalize_items(&json!([]), &r).is_empty());
  }

  #[test]
  fn fallback_always_fills_the_request() {
    let r = req("Hệ thức lượng giác", 7, ExerciseFormat::Open);
    let items = fallback_items(&r);
    assert_eq!(items.len(), 7);
    assert!(items.iter().all(|it| it.kind == QuestionKind::Open && it.options.is_none()));
    assert!(items[6].question.contains("Bài 7"));
  }
}
