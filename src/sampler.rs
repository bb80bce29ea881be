//! Exercise sampling from a loaded question pool: format filtering, draw
//! policy, and solution-narrative assembly.

use rand::seq::SliceRandom;

use crate::domain::{ExerciseFormat, ExerciseItem, QuestionKind, QuestionRecord};

const STEPS_HEADER: &str = "\n\n📝 Các bước giải:";
const CONCEPTS_HEADER: &str = "\n\n💡 Khái niệm liên quan:";
const NO_SOLUTION: &str = "Chưa có lời giải chi tiết.";

/// Draw `n` exercises from `pool`.
///
/// The format filter falls back to the unfiltered pool when it matches
/// nothing, so a non-empty pool always yields items. Pools of at least `n`
/// candidates are drawn without replacement; smaller pools are drawn with
/// replacement to still deliver `n` items. The caller's `difficulty` is
/// stamped on every item regardless of the source record.
pub fn sample(pool: &[QuestionRecord], n: usize, difficulty: u8, format: ExerciseFormat) -> Vec<ExerciseItem> {
  if pool.is_empty() {
    return Vec::new();
  }
  let filtered: Vec<&QuestionRecord> = pool.iter().filter(|q| format.keeps(q.kind)).collect();
  let candidates: Vec<&QuestionRecord> = if filtered.is_empty() {
    pool.iter().collect()
  } else {
    filtered
  };

  let mut rng = rand::thread_rng();
  let picks: Vec<&QuestionRecord> = if candidates.len() >= n {
    candidates.choose_multiple(&mut rng, n).copied().collect()
  } else {
    (0..n)
      .filter_map(|_| candidates.choose(&mut rng).copied())
      .collect()
  };

  picks.into_iter().map(|q| render(q, difficulty)).collect()
}

/// Project one pool record into a client-facing exercise item.
pub fn render(q: &QuestionRecord, difficulty: u8) -> ExerciseItem {
  let (options, correct_index) = match q.kind {
    QuestionKind::Mcq => (Some(q.options.clone()), q.correct_index),
    QuestionKind::Open => (None, None),
  };
  ExerciseItem {
    question: q.text.clone(),
    kind: q.kind,
    difficulty,
    options,
    correct_index,
    solution: Some(assemble_solution(q)),
  }
}

/// Stitch explanation, numbered steps, and key concepts into one narrative.
/// Step numbers come from the stored position, so a blank step leaves a gap
/// instead of renumbering the rest.
pub fn assemble_solution(q: &QuestionRecord) -> String {
  let mut parts: Vec<String> = Vec::new();
  let explanation = q.explanation.trim();
  if !explanation.is_empty() {
    parts.push(explanation.to_string());
  }
  if !q.solution_steps.is_empty() {
    parts.push(STEPS_HEADER.to_string());
    for (i, step) in q.solution_steps.iter().enumerate() {
      if !step.trim().is_empty() {
        parts.push(format!("{}. {}", i + 1, step));
      }
    }
  }
  if !q.key_concepts.is_empty() {
    parts.push(CONCEPTS_HEADER.to_string());
    for concept in &q.key_concepts {
      if !concept.trim().is_empty() {
        parts.push(format!("• {}", concept));
      }
    }
  }
  if parts.is_empty() {
    NO_SOLUTION.to_string()
  } else {
    parts.join("\n")
  }
}
