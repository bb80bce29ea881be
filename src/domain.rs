//! Domain models used by the pipeline: question records, exercise items/sets,
//! passage chunks, and generation requests.

use serde::{Deserialize, Serialize};

/// How a question expects to be answered.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Free-form written answer, no answer key.
  Open,
  /// Multiple choice with an answer key (`options` + `correct_index`).
  Mcq,
}
impl Default for QuestionKind {
  fn default() -> Self { QuestionKind::Open }
}

/// Requested exercise format. `Mixed` keeps both kinds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseFormat {
  Open,
  Mcq,
  Mixed,
}
impl Default for ExerciseFormat {
  fn default() -> Self { ExerciseFormat::Mcq }
}

impl ExerciseFormat {
  pub fn as_str(self) -> &'static str {
    match self {
      ExerciseFormat::Open => "open",
      ExerciseFormat::Mcq => "mcq",
      ExerciseFormat::Mixed => "mixed",
    }
  }

  /// Which question kind a single item defaults to under this format.
  /// `Mixed` leans open: only an explicit mcq tag makes an mcq item.
  pub fn item_kind(self) -> QuestionKind {
    match self {
      ExerciseFormat::Mcq => QuestionKind::Mcq,
      ExerciseFormat::Open | ExerciseFormat::Mixed => QuestionKind::Open,
    }
  }

  pub fn keeps(self, kind: QuestionKind) -> bool {
    match self {
      ExerciseFormat::Mixed => true,
      ExerciseFormat::Mcq => kind == QuestionKind::Mcq,
      ExerciseFormat::Open => kind == QuestionKind::Open,
    }
  }
}

/// Canonical question validated at the ingestion boundary.
///
/// Invariant for `kind = Mcq`: at least two non-empty options and
/// `correct_index` resolving inside `options`. Loaders enforce this once;
/// samplers and evaluators never re-check.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionRecord {
  pub text: String,
  pub kind: QuestionKind,
  /// 1 (very easy) ..= 5 (very hard).
  pub difficulty: u8,
  #[serde(default)] pub options: Vec<String>,
  #[serde(default)] pub correct_index: Option<usize>,
  #[serde(default)] pub explanation: String,
  #[serde(default)] pub solution_steps: Vec<String>,
  #[serde(default)] pub key_concepts: Vec<String>,
}

/// One exercise as handed to the client, produced fresh per sampling call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseItem {
  pub question: String,
  #[serde(rename = "type")]
  pub kind: QuestionKind,
  pub difficulty: u8,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_index: Option<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub solution: Option<String>,
}

/// A generated batch of exercises, persisted as an immutable document.
/// `used_model` records provenance: "artifacts", a model id, or "fallback".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseSet {
  pub id: String,
  pub user_id: i64,
  pub topic: String,
  pub difficulty: u8,
  pub format: ExerciseFormat,
  pub items: Vec<ExerciseItem>,
  #[serde(default)] pub contexts: Vec<PassageChunk>,
  pub used_model: String,
  pub created_at: String,
}

/// One retrievable text chunk from a chunk manifest. Immutable once indexed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassageChunk {
  /// `"<source>#c<chunk_index>"`, unique within one index build.
  pub id: String,
  /// Path of the manifest file the chunk came from.
  pub source: String,
  pub chunk_index: i64,
  pub text: String,
  /// Whitespace-collapsed head of `text`, for prompts and logs.
  pub preview: String,
}

/// Parameters for one exercise-generation call.
#[derive(Clone, Debug, Deserialize)]
pub struct GenerateRequest {
  pub topic: String,
  /// How many items to produce (the fallback strategy guarantees exactly this many).
  #[serde(default = "default_n")]
  pub n: usize,
  #[serde(default = "default_difficulty")]
  pub difficulty: u8,
  #[serde(default)]
  pub format: ExerciseFormat,
  /// How many passage chunks to retrieve as context.
  #[serde(default = "default_top_k")]
  pub top_k: usize,
}

fn default_n() -> usize { 5 }
fn default_difficulty() -> u8 { 3 }
fn default_top_k() -> usize { 4 }

impl GenerateRequest {
  pub fn new(topic: &str) -> Self {
    Self {
      topic: topic.to_string(),
      n: default_n(),
      difficulty: default_difficulty(),
      format: ExerciseFormat::default(),
      top_k: default_top_k(),
    }
  }
}
