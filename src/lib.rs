//! LearnCoach · Math 10 Content Pipeline
//!
//! - Keyword retrieval over chunked lesson artifacts
//! - Exercise generation: question bank, then Gemini, then deterministic fallback
//! - Placement tests with server-held answer keys and scoring
//! - Per-student mastery ledgers and phased learning plans
//!
//! Important env variables:
//!   ARTIFACTS_ROOT    : chunk-manifest root (default "artifacts/json")
//!   QUESTION_BANK_ROOT  : per-chapter question files (default "artifacts/production")
//!   DATA_ROOT      : per-user exercise-set documents (default ".data")
//!   GOOGLE_API_KEY    : enables Gemini integration if present
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL     : default "gemini-2.0-flash-exp"
//!   CONTENT_CONFIG_PATH  : path to TOML config (prompts + retention)
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

pub mod telemetry;
pub mod util;
pub mod domain;
pub mod config;
pub mod curriculum;
pub mod state;
pub mod retriever;
pub mod artifacts;
pub mod sampler;
pub mod gemini;
pub mod generator;
pub mod sets;
pub mod placement;
pub mod plan;

pub use domain::{
  ExerciseFormat, ExerciseItem, ExerciseSet, GenerateRequest, PassageChunk, QuestionKind,
  QuestionRecord,
};
pub use state::AppState;
