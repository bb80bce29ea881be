//! Loading pipeline configuration (prompts + retention) from TOML, and
//! filesystem roots from the environment.
//!
//! See `ContentConfig` and `Prompts` for the expected TOML schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, error};

/// Filesystem roots the pipeline reads and writes. Relative paths are
/// resolved against the process working directory.
#[derive(Clone, Debug)]
pub struct Settings {
  /// Walked recursively for `chunks.json` manifests.
  pub artifacts_root: PathBuf,
  /// Holds the per-chapter question files (`chuong_*.json`).
  pub question_bank_root: PathBuf,
  /// Per-user exercise-set documents land under here.
  pub data_root: PathBuf,
}

impl Settings {
  /// Reads ARTIFACTS_ROOT / QUESTION_BANK_ROOT / DATA_ROOT, with defaults
  /// matching the repository layout.
  pub fn from_env() -> Self {
    Self {
      artifacts_root: env_path("ARTIFACTS_ROOT", "artifacts/json"),
      question_bank_root: env_path("QUESTION_BANK_ROOT", "artifacts/production"),
      data_root: env_path("DATA_ROOT", ".data"),
    }
  }
}

fn env_path(key: &str, default: &str) -> PathBuf {
  std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub retention: RetentionCfg,
}

/// Retention section accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct RetentionCfg {
  /// Hours a generated placement test stays submittable.
  /// Absent = keep answer keys until explicitly purged.
  #[serde(default)]
  pub answer_key_ttl_hours: Option<u64>,
}

impl RetentionCfg {
  pub fn policy(&self) -> RetentionPolicy {
    match self.answer_key_ttl_hours {
      Some(hours) => RetentionPolicy::ExpireAfter(Duration::from_secs(hours * 3600)),
      None => RetentionPolicy::RetainUntilPurged,
    }
  }
}

/// How long the server keeps placement answer keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetentionPolicy {
  /// Keep entries until an explicit purge (re-submission stays possible).
  RetainUntilPurged,
  /// Entries older than the TTL are rejected and dropped at lookup time.
  ExpireAfter(Duration),
}

impl Default for RetentionPolicy {
  fn default() -> Self { RetentionPolicy::RetainUntilPurged }
}

/// Prompts used by the Gemini client. Defaults target Vietnamese grade-10
/// math; override them in TOML if you need to tune tone/structure.
/// Templates use `{placeholder}` substitution, see `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Exercise generation
  pub generate_system: String,
  pub generate_user_template: String,
  // Step-by-step explanation
  pub explain_system: String,
  pub explain_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generate_system: "Bạn là trợ lý tạo bài tập Toán 10. Dựa vào bối cảnh dưới đây, sinh bài tập phù hợp năng lực.\nXuất ra JSON THUẦN (không có giải thích), là một mảng các object.\nMỗi object có các field: question (string), type (\"open\"|\"mcq\"), difficulty (1..5),\noptions (array<string>, optional, chỉ khi type=mcq), correct_index (int, optional), solution (string, optional).".into(),
      generate_user_template: "Bối cảnh:\n{contexts}\n\nYêu cầu đầu ra:\nChủ đề: {topic}\nSố lượng: {n}\nĐộ khó (1-5): {difficulty}\nĐịnh dạng: {format}\nCâu hỏi ngắn gọn, rõ ràng, tiếng Việt. Nếu mcq, mỗi câu 3-5 lựa chọn.".into(),
      explain_system: "Bạn là trợ lý Toán 10 nói tiếng Việt. Dựa vào bối cảnh (context) sau, giải thích bài toán từng bước,\nngắn gọn, súc tích, không lan man. Nếu bối cảnh không đủ, ghi rõ giả định hợp lý trước khi giải.\nCuối cùng tóm tắt lời giải ngắn gọn.".into(),
      explain_user_template: "Bối cảnh:\n{contexts}\n\nĐề bài:\n{problem}".into(),
    }
  }
}

/// Attempt to load `ContentConfig` from CONTENT_CONFIG_PATH. On any
/// parsing/IO error, returns None and the defaults stay in effect.
pub fn load_content_config_from_env() -> Option<ContentConfig> {
  let path = std::env::var("CONTENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<ContentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "learncoach_content", %path, "Loaded content config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "learncoach_content", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "learncoach_content", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn retention_defaults_to_retain_until_purged() {
    let cfg = ContentConfig::default();
    assert_eq!(cfg.retention.policy(), RetentionPolicy::RetainUntilPurged);
  }

  #[test]
  fn retention_ttl_parses_from_toml() {
    let cfg: ContentConfig = toml::from_str(
      "[retention]\nanswer_key_ttl_hours = 2\n",
    )
    .expect("toml");
    assert_eq!(
      cfg.retention.policy(),
      RetentionPolicy::ExpireAfter(Duration::from_secs(2 * 3600))
    );
  }

  #[test]
  fn prompt_overrides_keep_other_defaults() {
    let cfg: ContentConfig = toml::from_str(
      "[prompts]\ngenerate_system = \"sys\"\ngenerate_user_template = \"user {topic}\"\nexplain_system = \"ex\"\nexplain_user_template = \"{problem}\"\n",
    )
    .expect("toml");
    assert_eq!(cfg.prompts.generate_system, "sys");
    assert!(cfg.prompts.generate_user_template.contains("{topic}"));
    assert_eq!(cfg.retention.policy(), RetentionPolicy::RetainUntilPurged);
  }
}
