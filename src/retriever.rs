//! Keyword passage retrieval over chunk manifests.
//!
//! The corpus is small and locally resident, so matching is a term-frequency
//! heuristic plus a literal-phrase bonus, normalized against passage length.
//! No vector index, no IDF: scores only rank passages within one query and
//! are not comparable across queries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::domain::PassageChunk;
use crate::util::collapse_ws;

/// Filename consumed while walking the artifacts root.
const CHUNK_MANIFEST: &str = "chunks.json";

/// Preview length cap, in characters.
const PREVIEW_CHARS: usize = 280;

/// Weight added when the whole query appears verbatim in the passage.
const PHRASE_BONUS: f32 = 5.0;

/// Lowercased word tokens: splits on any run of non-word characters
/// (word = alphanumeric or `_`), empty tokens dropped.
pub fn tokenize(text: &str) -> Vec<String> {
  text
    .to_lowercase()
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

/// Relevance of `passage` for `query`. Returns 0.0 whenever either side
/// yields no tokens; strictly positive scores mean at least one term hit
/// or a verbatim phrase match.
pub fn score(query: &str, passage: &str) -> f32 {
  if query.is_empty() || passage.is_empty() {
    return 0.0;
  }
  let q = query.trim().to_lowercase();
  let t = passage.to_lowercase();
  let q_tokens = tokenize(&q);
  if q_tokens.is_empty() {
    return 0.0;
  }
  let t_tokens = tokenize(&t);
  if t_tokens.is_empty() {
    return 0.0;
  }
  let mut freq: HashMap<&str, usize> = HashMap::new();
  for tok in &t_tokens {
    *freq.entry(tok.as_str()).or_insert(0) += 1;
  }
  let mut total = 0.0f32;
  for tok in &q_tokens {
    total += freq.get(tok.as_str()).copied().unwrap_or(0) as f32;
  }
  if t.contains(&q) {
    total += PHRASE_BONUS;
  }
  let norm = (t.chars().count() as f32).sqrt() / 20.0;
  total / norm.max(1.0)
}

/// Snapshot statistics for observability endpoints and logs.
#[derive(Clone, Debug, Serialize)]
pub struct IndexStats {
  pub root: Option<String>,
  pub chunk_count: usize,
}

/// Row shape inside a chunk manifest.
#[derive(Deserialize)]
struct ChunkRow {
  chunk_index: i64,
  #[serde(default)]
  text: String,
}

struct IndexInner {
  root: Option<PathBuf>,
  chunks: Arc<Vec<PassageChunk>>,
}

/// In-memory passage index with build-or-reuse caching.
///
/// The mutex is held across the whole stale-check-and-rebuild sequence so
/// two concurrent callers cannot both rebuild or observe a half-built
/// index. Readers scan an `Arc` snapshot lock-free; a rebuild that lands
/// mid-scan is invisible to in-flight queries.
pub struct PassageIndex {
  inner: Mutex<IndexInner>,
}

impl Default for PassageIndex {
  fn default() -> Self { Self::new() }
}

impl PassageIndex {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(IndexInner { root: None, chunks: Arc::new(Vec::new()) }),
    }
  }

  /// Build or reuse the index for `root`. Rebuilds only when the root
  /// differs from the cached one (including the first call); manifest
  /// edits under an unchanged root are NOT picked up.
  pub async fn ensure(&self, root: &Path) -> Arc<Vec<PassageChunk>> {
    let mut inner = self.inner.lock().await;
    if inner.root.as_deref() != Some(root) {
      let chunks = build_index(root);
      info!(target: "content", root = %root.display(), chunks = chunks.len(), "Passage index rebuilt");
      inner.chunks = Arc::new(chunks);
      inner.root = Some(root.to_path_buf());
    }
    inner.chunks.clone()
  }

  /// Top `top_k` chunks for `query`, strictly positive scores only,
  /// descending; ties keep index (discovery) order. `top_k` is taken
  /// as given: 0 yields an empty result.
  pub async fn retrieve(&self, query: &str, top_k: usize, root: &Path) -> Vec<PassageChunk> {
    let snapshot = self.ensure(root).await;
    let mut scored: Vec<(f32, &PassageChunk)> = Vec::new();
    for chunk in snapshot.iter() {
      let s = score(query, &chunk.text);
      if s > 0.0 {
        scored.push((s, chunk));
      }
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(top_k).map(|(_, c)| c.clone()).collect()
  }

  pub async fn stats(&self) -> IndexStats {
    let inner = self.inner.lock().await;
    IndexStats {
      root: inner.root.as_ref().map(|p| p.display().to_string()),
      chunk_count: inner.chunks.len(),
    }
  }
}

/// Walk `root` for chunk manifests and flatten them into passage chunks.
/// Unreadable or non-array manifests are logged and skipped; chunks with
/// empty text are dropped.
fn build_index(root: &Path) -> Vec<PassageChunk> {
  let mut chunks = Vec::new();
  for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
    let path = entry.path();
    if !entry.file_type().is_file() || entry.file_name() != CHUNK_MANIFEST {
      continue;
    }
    let raw = match std::fs::read_to_string(path) {
      Ok(s) => s,
      Err(e) => {
        warn!(target: "content", path = %path.display(), error = %e, "Skipping unreadable chunk manifest");
        continue;
      }
    };
    let rows: Vec<ChunkRow> = match serde_json::from_str(&raw) {
      Ok(r) => r,
      Err(e) => {
        warn!(target: "content", path = %path.display(), error = %e, "Skipping malformed chunk manifest");
        continue;
      }
    };
    let source = path.display().to_string();
    for row in rows {
      if row.text.is_empty() {
        continue;
      }
      let head: String = row.text.chars().take(PREVIEW_CHARS).collect();
      chunks.push(PassageChunk {
        id: format!("{}#c{}", source, row.chunk_index),
        source: source.clone(),
        chunk_index: row.chunk_index,
        preview: collapse_ws(&head),
        text: row.text,
      });
    }
  }
  chunks
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn write_manifest(dir: &Path, rel: &str, rows: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, rows).expect("write manifest");
  }

  #[test]
  fn tokenize_lowercases_and_splits_punctuation() {
    assert_eq!(tokenize("Định lý Côsin!"), vec!["định", "lý", "côsin"]);
    assert_eq!(tokenize("a_b c-d"), vec!["a_b", "c", "d"]);
    assert!(tokenize("!!! ...").is_empty());
  }

  #[test]
  fn phrase_match_outscores_unrelated_text() {
    let q = "định lý côsin";
    let hit = "Trong tam giác, định lý côsin cho phép tính cạnh thứ ba.";
    let miss = "Phương trình đường tròn tâm O bán kính R.";
    assert!(score(q, hit) > 0.0);
    assert_eq!(score(q, miss), 0.0);
    assert!(score(q, hit) > score(q, miss));
  }

  #[test]
  fn empty_or_punctuation_queries_score_zero() {
    assert_eq!(score("", "một đoạn văn"), 0.0);
    assert_eq!(score("?!", "một đoạn văn"), 0.0);
    assert_eq!(score("vectơ", ""), 0.0);
  }

  #[tokio::test]
  async fn retrieve_ranks_and_bounds_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_manifest(
      dir.path(),
      "a/chunks.json",
      r#"[
        {"chunk_index": 0, "text": "vectơ và tọa độ vectơ trong mặt phẳng, tổng và hiệu vectơ"},
        {"chunk_index": 1, "text": "mệnh đề và tập hợp"},
        {"chunk_index": 2, "text": "một vectơ đơn vị"},
        {"chunk_index": 3, "text": ""}
      ]"#,
    );
    let index = PassageIndex::new();
    let hits = index.retrieve("vectơ", 2, dir.path()).await;
    assert_eq!(hits.len(), 2);
    let s0 = score("vectơ", &hits[0].text);
    let s1 = score("vectơ", &hits[1].text);
    assert!(s0 >= s1 && s1 > 0.0);

    let none = index.retrieve("elip", 4, dir.path()).await;
    assert!(none.is_empty());

    let stats = index.stats().await;
    assert_eq!(stats.chunk_count, 3);
  }

  #[tokio::test]
  async fn index_is_cached_until_root_changes() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_manifest(dir.path(), "chunks.json", r#"[{"chunk_index": 0, "text": "tập hợp"}]"#);
    let index = PassageIndex::new();
    assert_eq!(index.ensure(dir.path()).await.len(), 1);

    // New manifest under the same root: the cached build stays in effect.
    write_manifest(dir.path(), "b/chunks.json", r#"[{"chunk_index": 0, "text": "mệnh đề"}]"#);
    assert_eq!(index.ensure(dir.path()).await.len(), 1);

    // A different root triggers a rebuild.
    let other = tempfile::tempdir().expect("tempdir");
    write_manifest(other.path(), "chunks.json", r#"[{"chunk_index": 0, "text": "elip"}, {"chunk_index": 1, "text": "đường tròn"}]"#);
    assert_eq!(index.ensure(other.path()).await.len(), 2);
    let stats = index.stats().await;
    assert_eq!(stats.chunk_count, 2);
  }

  #[tokio::test]
  async fn malformed_manifests_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_manifest(dir.path(), "bad/chunks.json", "{ not json");
    write_manifest(dir.path(), "obj/chunks.json", r#"{"chunk_index": 0, "text": "x"}"#);
    write_manifest(dir.path(), "ok/chunks.json", r#"[{"chunk_index": 7, "text": "giải tam giác"}]"#);
    let index = PassageIndex::new();
    let chunks = index.ensure(dir.path()).await;
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].id.ends_with("#c7"));
    assert_eq!(chunks[0].chunk_index, 7);
  }
}
