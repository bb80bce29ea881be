//! Static curriculum tables: topic-to-file routing, the five-chapter
//! manifest, difficulty labels, and the last-resort exercise template.

use crate::domain::{ExerciseFormat, ExerciseItem, QuestionKind};

/// One curriculum chapter: numeric id, question file, display name.
#[derive(Clone, Copy, Debug)]
pub struct ChapterSpec {
  pub id: u8,
  pub file: &'static str,
  pub name: &'static str,
}

/// The grade-10 curriculum, in teaching order. Chapter ids are 1-based and
/// used as ledger keys; the files live under the question-bank root.
pub const CHAPTERS: [ChapterSpec; 5] = [
  ChapterSpec { id: 1, file: "chuong_1.json", name: "Chương I: Mệnh đề và Tập hợp" },
  ChapterSpec { id: 2, file: "chuong_2.json", name: "Chương II: Bất phương trình" },
  ChapterSpec { id: 3, file: "chuong_3.json", name: "Chương III: Góc lượng giác và Hệ thức lượng" },
  ChapterSpec { id: 4, file: "chuong_4.json", name: "Chương IV: Vectơ" },
  ChapterSpec { id: 5, file: "chuong_5.json", name: "Chương V: Phương trình đường thẳng và đường tròn" },
];

pub fn chapter_name(id: u8) -> Option<&'static str> {
  CHAPTERS.iter().find(|c| c.id == id).map(|c| c.name)
}

pub fn is_valid_chapter(id: u8) -> bool {
  CHAPTERS.iter().any(|c| c.id == id)
}

/// Curriculum topics and the question files that cover them. Lookup is
/// exact first, then case-insensitive substring both ways (so "Ôn tập
/// Chương IV" and "chương IV" both land on chapter 4).
pub const TOPIC_FILES: &[(&str, &[&str])] = &[
  // Chapter I: propositions and sets
  ("Mệnh đề", &["chuong_1.json"]),
  ("Mệnh đề – Tập hợp", &["chuong_1.json"]),
  ("Tập hợp", &["chuong_1.json"]),
  ("Tập hợp – Các phép toán", &["chuong_1.json"]),
  ("Ôn tập Chương I", &["chuong_1.json"]),
  // Chapter II: inequalities
  ("Bất phương trình", &["chuong_2.json"]),
  ("Hệ bất phương trình", &["chuong_2.json"]),
  ("Bất phương trình - Hệ bất phương trình", &["chuong_2.json"]),
  ("Ôn tập Chương II", &["chuong_2.json"]),
  // Chapter III: trigonometry
  ("Giá trị lượng giác", &["chuong_3.json"]),
  ("Góc lượng giác", &["chuong_3.json"]),
  ("Định lý côsin", &["chuong_3.json"]),
  ("Định lý sin", &["chuong_3.json"]),
  ("Giải tam giác", &["chuong_3.json"]),
  ("Hệ thức lượng giác", &["chuong_3.json"]),
  ("Ôn tập Chương III", &["chuong_3.json"]),
  // Chapter IV: vectors
  ("Khái niệm vectơ", &["chuong_4.json"]),
  ("Vectơ", &["chuong_4.json"]),
  ("Tổng và hiệu vectơ", &["chuong_4.json"]),
  ("Tích vectơ với số", &["chuong_4.json"]),
  ("Tích vô hướng", &["chuong_4.json"]),
  ("Tọa độ vectơ", &["chuong_4.json"]),
  ("Vectơ và ứng dụng", &["chuong_4.json"]),
  ("Ôn tập Chương IV", &["chuong_4.json"]),
  // Chapter V: lines, circles, conics
  ("Phương trình đường thẳng", &["chuong_5.json"]),
  ("Phương trình đường tròn", &["chuong_5.json"]),
  ("Đường thẳng", &["chuong_5.json"]),
  ("Đường tròn", &["chuong_5.json"]),
  ("Elip", &["chuong_5.json"]),
  ("Ôn tập Chương V", &["chuong_5.json"]),
  // Functions/graphs sit in chapter I material in this bank
  ("Hàm số – Đồ thị", &["chuong_1.json"]),
];

/// Numeric difficulty for a textual label. Unknown labels read as medium.
pub fn difficulty_from_label(label: &str) -> u8 {
  match label {
    "very_easy" => 1,
    "easy" => 2,
    "medium" => 3,
    "hard" => 4,
    "very_hard" => 5,
    _ => 3,
  }
}

/// Absolute last-resort exercise when neither artifacts nor enrichment
/// produced anything. `i` is zero-based; the visible number is `i + 1`.
pub fn fallback_exercise(topic: &str, i: usize, difficulty: u8, format: ExerciseFormat) -> ExerciseItem {
  let kind = format.item_kind();
  let (options, correct_index) = match kind {
    QuestionKind::Mcq => (
      Some(vec!["A".to_string(), "B".to_string(), "C".to_string(), "D".to_string()]),
      Some(0),
    ),
    QuestionKind::Open => (None, None),
  };
  ExerciseItem {
    question: format!(
      "[{}] Bài {}: Hãy trình bày/giải một bài ngắn phù hợp độ khó {}.",
      topic,
      i + 1,
      difficulty
    ),
    kind,
    difficulty,
    options,
    correct_index,
    solution: None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chapters_are_ordered_and_named() {
    assert_eq!(CHAPTERS.len(), 5);
    for (i, c) in CHAPTERS.iter().enumerate() {
      assert_eq!(c.id as usize, i + 1);
      assert!(c.name.starts_with("Chương"));
    }
    assert_eq!(chapter_name(4), Some("Chương IV: Vectơ"));
    assert_eq!(chapter_name(9), None);
    assert!(is_valid_chapter(1) && !is_valid_chapter(0));
  }

  #[test]
  fn difficulty_labels_map_to_scale() {
    assert_eq!(difficulty_from_label("very_easy"), 1);
    assert_eq!(difficulty_from_label("very_hard"), 5);
    assert_eq!(difficulty_from_label("nonsense"), 3);
  }

  #[test]
  fn fallback_mcq_has_answer_key() {
    let item = fallback_exercise("Vectơ", 0, 2, ExerciseFormat::Mcq);
    assert_eq!(item.kind, QuestionKind::Mcq);
    assert_eq!(item.correct_index, Some(0));
    assert_eq!(item.options.as_ref().map(Vec::len), Some(4));
    assert!(item.question.contains("Bài 1"));
    assert!(item.question.starts_with("[Vectơ]"));
  }

  #[test]
  fn fallback_mixed_degrades_to_open() {
    let item = fallback_exercise("Elip", 2, 4, ExerciseFormat::Mixed);
    assert_eq!(item.kind, QuestionKind::Open);
    assert!(item.options.is_none());
    assert!(item.question.contains("Bài 3"));
  }
}
