//! Persisted exercise-set documents: one pretty-printed JSON file per set,
//! under `<data_root>/<user_id>/exercises/`.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ExerciseFormat, ExerciseSet};

/// Creation stamp (compact UTC) and set id derived from it.
/// The stamp doubles as the newest-first sort key in listings.
pub fn stamp_and_id() -> (String, String) {
  let created_at = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
  let suffix = Uuid::new_v4().simple().to_string();
  let id = format!("ex_{}_{}", created_at, &suffix[..8]);
  (created_at, id)
}

/// Summary row for listing a user's sets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetSummary {
  pub id: String,
  pub topic: String,
  pub difficulty: u8,
  pub format: ExerciseFormat,
  pub items: usize,
  pub used_model: String,
  pub created_at: String,
  pub path: String,
}

/// Filesystem-backed store for exercise-set documents. Documents are
/// written once and never mutated.
#[derive(Clone, Debug)]
pub struct SetStore {
  data_root: PathBuf,
}

impl SetStore {
  pub fn new(data_root: PathBuf) -> Self {
    Self { data_root }
  }

  fn user_dir(&self, user_id: i64) -> PathBuf {
    self.data_root.join(user_id.to_string()).join("exercises")
  }

  /// Persist `set` as `<set_id>.json`, creating directories as needed.
  pub fn save(&self, set: &ExerciseSet) -> Result<PathBuf, String> {
    let dir = self.user_dir(set.user_id);
    std::fs::create_dir_all(&dir).map_err(|e| format!("create {}: {}", dir.display(), e))?;
    let path = dir.join(format!("{}.json", set.id));
    let body = serde_json::to_string_pretty(set).map_err(|e| e.to_string())?;
    std::fs::write(&path, body).map_err(|e| format!("write {}: {}", path.display(), e))?;
    info!(target: "content", set_id = %set.id, user_id = set.user_id, path = %path.display(), "Saved exercise set");
    Ok(path)
  }

  /// Summaries of the user's sets, newest first. Unreadable documents are
  /// skipped with a warning; a user with no directory simply has none.
  pub fn list(&self, user_id: i64) -> Vec<SetSummary> {
    let dir = self.user_dir(user_id);
    let entries = match std::fs::read_dir(&dir) {
      Ok(e) => e,
      Err(_) => return Vec::new(),
    };
    let mut rows = Vec::new();
    for entry in entries.flatten() {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      match read_set(&path) {
        Some(set) => rows.push(SetSummary {
          id: set.id,
          topic: set.topic,
          difficulty: set.difficulty,
          format: set.format,
          items: set.items.len(),
          used_model: set.used_model,
          created_at: set.created_at,
          path: path.display().to_string(),
        }),
        None => warn!(target: "content", path = %path.display(), "Skipping unreadable exercise set"),
      }
    }
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    rows
  }

  /// Load one full document; None when absent or unreadable.
  pub fn load(&self, user_id: i64, set_id: &str) -> Option<ExerciseSet> {
    let path = self.user_dir(user_id).join(format!("{}.json", set_id));
    if !path.is_file() {
      return None;
    }
    let set = read_set(&path);
    if set.is_none() {
      warn!(target: "content", path = %path.display(), "Exercise set exists but is unreadable");
    }
    set
  }
}

fn read_set(path: &std::path::Path) -> Option<ExerciseSet> {
  let raw = std::fs::read_to_string(path).ok()?;
  serde_json::from_str(&raw).ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ExerciseItem, QuestionKind};

  fn set(id: &str, created_at: &str, user_id: i64) -> ExerciseSet {
    ExerciseSet {
      id: id.to_string(),
      user_id,
      topic: "Vectơ".into(),
      difficulty: 3,
      format: ExerciseFormat::Mcq,
      items: vec![ExerciseItem {
        question: "q".into(),
        kind: QuestionKind::Mcq,
        difficulty: 3,
        options: Some(vec!["a".into(), "b".into()]),
        correct_index: Some(1),
        solution: None,
      }],
      contexts: Vec::new(),
      used_model: "artifacts".into(),
      created_at: created_at.to_string(),
    }
  }

  #[test]
  fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SetStore::new(dir.path().to_path_buf());
    let s = set("ex_20240101T000000Z_aabbccdd", "20240101T000000Z", 7);
    let path = store.save(&s).expect("save");
    assert!(path.ends_with("7/exercises/ex_20240101T000000Z_aabbccdd.json"));

    let loaded = store.load(7, &s.id).expect("load");
    assert_eq!(loaded.topic, "Vectơ");
    assert_eq!(loaded.items.len(), 1);
    assert!(store.load(7, "ex_missing").is_none());
    assert!(store.load(8, &s.id).is_none());
  }

  #[test]
  fn list_is_newest_first_and_skips_garbage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SetStore::new(dir.path().to_path_buf());
    store.save(&set("ex_20240101T000000Z_old", "20240101T000000Z", 1)).expect("save");
    store.save(&set("ex_20250101T000000Z_new", "20250101T000000Z", 1)).expect("save");
    std::fs::write(dir.path().join("1/exercises/broken.json"), "{").expect("write");
    std::fs::write(dir.path().join("1/exercises/notes.txt"), "x").expect("write");

    let rows = store.list(1);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "ex_20250101T000000Z_new");
    assert_eq!(rows[1].id, "ex_20240101T000000Z_old");
    assert_eq!(rows[0].items, 1);

    assert!(store.list(99).is_empty());
  }

  #[test]
  fn ids_carry_stamp_and_random_suffix() {
    let (created_at, id) = stamp_and_id();
    assert!(id.starts_with(&format!("ex_{}_", created_at)));
    assert_eq!(id.len(), "ex_".len() + created_at.len() + 1 + 8);
    let (_, other) = stamp_and_id();
    assert_ne!(id, other);
  }
}
