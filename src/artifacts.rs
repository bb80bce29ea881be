//! Question pools loaded from per-topic artifact files.
//!
//! Parsing is skip-and-continue at both levels: a file that is not a JSON
//! array is skipped whole, and each item either becomes a `QuestionRecord`
//! or a `SkipReason`. Only answerable multiple-choice items survive into
//! the pool, so downstream sampling never re-validates.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::curriculum::{self, difficulty_from_label};
use crate::domain::{QuestionKind, QuestionRecord};

/// Why an artifact item was left out of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
  NotAnObject,
  TheoryItem,
  EmptyText,
  NotMcq,
  MissingAnswer,
  BadCorrectLetter,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      SkipReason::NotAnObject => "not an object",
      SkipReason::TheoryItem => "theory item",
      SkipReason::EmptyText => "empty question text",
      SkipReason::NotMcq => "not an answerable mcq",
      SkipReason::MissingAnswer => "missing answer block",
      SkipReason::BadCorrectLetter => "unresolvable correct letter",
    };
    f.write_str(s)
  }
}

/// Resolve `topic` to existing question files under `base`.
///
/// Exact table match first; otherwise a case-insensitive substring match in
/// either direction. Returns None when no mapping yields a file on disk.
pub fn find_topic_files(topic: &str, base: &Path) -> Option<Vec<PathBuf>> {
  if let Some((_, files)) = curriculum::TOPIC_FILES.iter().find(|(t, _)| *t == topic) {
    let found = existing(files, base);
    if !found.is_empty() {
      return Some(found);
    }
  }
  let needle = topic.to_lowercase();
  for (mapped, files) in curriculum::TOPIC_FILES {
    let mapped_lower = mapped.to_lowercase();
    if needle.contains(&mapped_lower) || mapped_lower.contains(&needle) {
      let found = existing(files, base);
      if !found.is_empty() {
        return Some(found);
      }
    }
  }
  None
}

fn existing(files: &[&str], base: &Path) -> Vec<PathBuf> {
  files
    .iter()
    .map(|f| base.join(f))
    .filter(|p| p.is_file())
    .collect()
}

/// Load the answerable question pool from `paths`. Unreadable or non-array
/// files are skipped whole; per-item skips are tallied per file.
pub fn load_questions(paths: &[PathBuf]) -> Vec<QuestionRecord> {
  let mut pool = Vec::new();
  for path in paths {
    let raw = match std::fs::read_to_string(path) {
      Ok(s) => s,
      Err(e) => {
        warn!(target: "content", path = %path.display(), error = %e, "Skipping unreadable question file");
        continue;
      }
    };
    let value: Value = match serde_json::from_str(&raw) {
      Ok(v) => v,
      Err(e) => {
        warn!(target: "content", path = %path.display(), error = %e, "Skipping malformed question file");
        continue;
      }
    };
    let items = match value.as_array() {
      Some(a) => a,
      None => {
        warn!(target: "content", path = %path.display(), "Skipping question file: top level is not an array");
        continue;
      }
    };
    let mut kept = 0usize;
    let mut skipped = 0usize;
    for item in items {
      match parse_item(item) {
        Ok(q) => {
          pool.push(q);
          kept += 1;
        }
        Err(reason) => {
          skipped += 1;
          debug!(target: "content", path = %path.display(), %reason, "Skipped artifact item");
        }
      }
    }
    debug!(target: "content", path = %path.display(), kept, skipped, "Loaded question file");
  }
  pool
}

/// Validate one artifact item into a `QuestionRecord`.
///
/// Requirements: an object tagged as exercise content (not "theory") with
/// non-empty text, an mcq answer block, at least two non-empty string
/// options, and a single correct letter A-H resolving inside the options.
pub fn parse_item(item: &Value) -> Result<QuestionRecord, SkipReason> {
  let obj = item.as_object().ok_or(SkipReason::NotAnObject)?;
  if obj.get("type").and_then(Value::as_str) == Some("theory") {
    return Err(SkipReason::TheoryItem);
  }
  let text = obj.get("text").and_then(Value::as_str).unwrap_or("").trim();
  if text.is_empty() {
    return Err(SkipReason::EmptyText);
  }

  let options: Vec<String> = match obj.get("options").and_then(Value::as_array) {
    Some(a) => a
      .iter()
      .map(|o| o.as_str().map(|s| s.trim().to_string()))
      .collect::<Option<Vec<String>>>()
      .unwrap_or_default(),
    None => Vec::new(),
  };
  let answer_type = obj.get("answer_type").and_then(Value::as_str).unwrap_or("");
  let valid_mcq = answer_type == "mcq" && options.len() >= 2 && options.iter().all(|o| !o.is_empty());
  if !valid_mcq {
    return Err(SkipReason::NotMcq);
  }

  let answer = match obj.get("answer") {
    Some(Value::Object(a)) => a,
    _ => return Err(SkipReason::MissingAnswer),
  };

  // Numeric difficulty wins over the textual label.
  let difficulty = answer
    .get("difficulty_number")
    .and_then(Value::as_i64)
    .filter(|d| (1..=5).contains(d))
    .map(|d| d as u8)
    .unwrap_or_else(|| {
      difficulty_from_label(answer.get("difficulty_level").and_then(Value::as_str).unwrap_or("medium"))
    });

  let correct_index = answer
    .get("correct")
    .and_then(Value::as_str)
    .map(str::trim)
    .and_then(letter_to_index)
    .filter(|i| *i < options.len())
    .ok_or(SkipReason::BadCorrectLetter)?;

  Ok(QuestionRecord {
    text: text.to_string(),
    kind: QuestionKind::Mcq,
    difficulty,
    options,
    correct_index: Some(correct_index),
    explanation: answer
      .get("explanation")
      .and_then(Value::as_str)
      .unwrap_or("")
      .to_string(),
    solution_steps: string_list(answer.get("solution_steps")),
    key_concepts: string_list(answer.get("key_concepts")),
  })
}

/// "A" -> 0 .. "H" -> 7; anything else (including multi-char) is None.
pub fn letter_to_index(letter: &str) -> Option<usize> {
  let mut chars = letter.chars();
  match (chars.next(), chars.next()) {
    (Some(c), None) => {
      let u = c.to_ascii_uppercase();
      if ('A'..='H').contains(&u) {
        Some(u as usize - 'A' as usize)
      } else {
        None
      }
    }
    _ => None,
  }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
  value
    .and_then(Value::as_array)
    .map(|a| {
      a.iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default()
}
