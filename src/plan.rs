//! Per-chapter mastery ledger and learning-path seeding.
//!
//! Diagnostic outcomes (self-reported or produced by placement scoring)
//! upsert into a per-student ledger; the plan seeder turns ledger state
//! into a phased chapter order, weakest chapters first.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::curriculum;
use crate::util::round_to;

/// One diagnostic outcome for a chapter, as submitted by a caller.
#[derive(Clone, Debug, Deserialize)]
pub struct ChapterOutcome {
  pub chapter_id: u8,
  pub total_questions: usize,
  pub correct: usize,
}

impl ChapterOutcome {
  pub fn validate(&self) -> Result<(), OutcomeError> {
    if !curriculum::is_valid_chapter(self.chapter_id) {
      return Err(OutcomeError::InvalidChapter(self.chapter_id));
    }
    if self.correct > self.total_questions {
      return Err(OutcomeError::CorrectExceedsTotal {
        correct: self.correct,
        total: self.total_questions,
      });
    }
    Ok(())
  }
}

/// Validation failures for submitted outcomes. These are caller errors and
/// reject the whole submission; nothing is recorded on failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutcomeError {
  NoItems,
  InvalidChapter(u8),
  CorrectExceedsTotal { correct: usize, total: usize },
}

impl fmt::Display for OutcomeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutcomeError::NoItems => write!(f, "no items provided"),
      OutcomeError::InvalidChapter(id) => write!(f, "invalid chapter_id {}", id),
      OutcomeError::CorrectExceedsTotal { correct, total } => {
        write!(f, "correct ({}) cannot exceed total_questions ({})", correct, total)
      }
    }
  }
}

impl std::error::Error for OutcomeError {}

/// Stored mastery for one chapter of one student.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasteryRecord {
  pub chapter_id: u8,
  pub total_questions: usize,
  pub correct: usize,
  /// 0-100, two decimals; 0 when no questions were asked.
  pub percent: f64,
  pub updated_at: String,
}

/// One student's mastery records, keyed by chapter. Upserting the same
/// chapter replaces the row in place, so repeat diagnostics never grow the
/// ledger past one record per chapter.
#[derive(Clone, Debug, Default)]
pub struct MasteryLedger {
  records: Vec<MasteryRecord>,
}

impl MasteryLedger {
  pub fn upsert(&mut self, chapter_id: u8, total_questions: usize, correct: usize) -> &MasteryRecord {
    let percent = if total_questions == 0 {
      0.0
    } else {
      round_to(correct as f64 * 100.0 / total_questions as f64, 2)
    };
    let record = MasteryRecord {
      chapter_id,
      total_questions,
      correct,
      percent,
      updated_at: Utc::now().to_rfc3339(),
    };
    let idx = match self.records.iter().position(|r| r.chapter_id == chapter_id) {
      Some(i) => {
        self.records[i] = record;
        i
      }
      None => {
        self.records.push(record);
        self.records.len() - 1
      }
    };
    &self.records[idx]
  }

  pub fn records(&self) -> &[MasteryRecord] {
    &self.records
  }
}

/// Order chapters for study: highest priority (= 100 - mastery percent)
/// first, ties keeping record order. With no records, the curriculum
/// teaching order stands in.
pub fn prioritize(records: &[MasteryRecord]) -> Vec<u8> {
  if records.is_empty() {
    return curriculum::CHAPTERS.iter().map(|c| c.id).collect();
  }
  let mut ranked: Vec<(f64, u8)> = records.iter().map(|r| (100.0 - r.percent, r.chapter_id)).collect();
  ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
  ranked.into_iter().map(|(_, id)| id).collect()
}

/// Learning-path phases, in plan order.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Foundation,
  Focus,
  Review,
}

/// One entry of the seeded plan.
#[derive(Clone, Debug, Serialize)]
pub struct PlanItem {
  /// 1-based position in the plan.
  pub priority_rank: usize,
  pub phase: Phase,
  pub chapter_id: u8,
  pub chapter: String,
}

/// Turn a prioritized chapter order into a five-slot plan: two foundation
/// slots, two focus slots, one review slot. Fewer chapters fill fewer
/// slots; anything past five is not scheduled.
pub fn seed_plan(chapter_ids: &[u8]) -> Vec<PlanItem> {
  chapter_ids
    .iter()
    .take(5)
    .enumerate()
    .map(|(i, &chapter_id)| PlanItem {
      priority_rank: i + 1,
      phase: match i {
        0 | 1 => Phase::Foundation,
        2 | 3 => Phase::Focus,
        _ => Phase::Review,
      },
      chapter_id,
      chapter: curriculum::chapter_name(chapter_id).unwrap_or("").to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(chapter_id: u8, percent: f64) -> MasteryRecord {
    MasteryRecord {
      chapter_id,
      total_questions: 4,
      correct: 0,
      percent,
      updated_at: String::new(),
    }
  }

  #[test]
  fn outcome_validation_catches_caller_errors() {
    let bad_chapter = ChapterOutcome { chapter_id: 9, total_questions: 4, correct: 1 };
    assert_eq!(bad_chapter.validate(), Err(OutcomeError::InvalidChapter(9)));

    let bad_counts = ChapterOutcome { chapter_id: 2, total_questions: 3, correct: 4 };
    assert_eq!(
      bad_counts.validate(),
      Err(OutcomeError::CorrectExceedsTotal { correct: 4, total: 3 })
    );

    let ok = ChapterOutcome { chapter_id: 5, total_questions: 4, correct: 4 };
    assert!(ok.validate().is_ok());
  }

  #[test]
  fn upsert_replaces_instead_of_duplicating() {
    let mut ledger = MasteryLedger::default();
    ledger.upsert(3, 4, 1);
    assert_eq!(ledger.records()[0].percent, 25.0);

    ledger.upsert(3, 4, 3);
    assert_eq!(ledger.records().len(), 1);
    assert_eq!(ledger.records()[0].percent, 75.0);
    assert_eq!(ledger.records()[0].correct, 3);

    ledger.upsert(1, 0, 0);
    assert_eq!(ledger.records().len(), 2);
    assert_eq!(ledger.records()[1].percent, 0.0);
  }

  #[test]
  fn weakest_chapters_come_first_and_ties_stay_stable() {
    let records = vec![record(1, 80.0), record(2, 20.0), record(3, 50.0), record(4, 20.0)];
    assert_eq!(prioritize(&records), vec![2, 4, 3, 1]);
  }

  #[test]
  fn no_records_yields_teaching_order() {
    assert_eq!(prioritize(&[]), vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn plan_phases_follow_the_two_two_one_split() {
    let plan = seed_plan(&[4, 2, 1, 5, 3]);
    assert_eq!(plan.len(), 5);
    let phases: Vec<Phase> = plan.iter().map(|p| p.phase).collect();
    assert_eq!(
      phases,
      vec![Phase::Foundation, Phase::Foundation, Phase::Focus, Phase::Focus, Phase::Review]
    );
    assert_eq!(plan[0].chapter_id, 4);
    assert_eq!(plan[0].priority_rank, 1);
    assert_eq!(plan[4].priority_rank, 5);
    assert!(plan[0].chapter.contains("Vectơ"));
  }

  #[test]
  fn short_orders_degrade_gracefully() {
    let plan = seed_plan(&[2, 5, 1]);
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[2].phase, Phase::Focus);
  }
}
