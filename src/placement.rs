//! Placement assessment: test generation across all chapters, the
//! server-held answer-key store, and submission scoring.
//!
//! Clients only ever see `PlacementTestOut` / `PlacementQuestionOut`
//! projections; answer keys stay on the server until evaluation.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifacts::letter_to_index;
use crate::config::RetentionPolicy;
use crate::curriculum::{self, ChapterSpec};
use crate::domain::QuestionKind;
use crate::util::{round_to, truncate_chars};

/// Questions drawn from each chapter file (when it has enough).
pub const QUESTIONS_PER_CHAPTER: usize = 4;

pub const TIME_LIMIT_MINUTES: u32 = 30;

/// Chapter score at or above this counts as a strength.
const STRENGTH_THRESHOLD: f64 = 70.0;
/// Chapter score below this counts as a weakness.
const WEAKNESS_THRESHOLD: f64 = 50.0;

/// How many incorrect answers are surfaced in the summary section.
const MAX_INCORRECT_SHOWN: usize = 5;

/// One placement question as held on the server: client-visible content
/// plus the answer key and review material.
#[derive(Clone, Debug)]
pub struct PlacementQuestion {
    pub id: String,
    pub question_number: usize,
    pub text: String,
    pub chapter_id: u8,
    pub chapter: String,
    pub options: Vec<String>,
    // Answer key; never part of the client projection.
    pub correct_letter: char,
    pub correct_index: usize,
    pub explanation: String,
    pub solution_steps: Vec<String>,
    pub key_concepts: Vec<String>,
}

impl PlacementQuestion {
    /// Strict client projection: no answer key, no review material.
    pub fn to_out(&self) -> PlacementQuestionOut {
        PlacementQuestionOut {
            id: self.id.clone(),
            question_number: self.question_number,
            text: self.text.clone(),
            kind: QuestionKind::Mcq,
            chapter: self.chapter.clone(),
            chapter_id: self.chapter_id,
            options: self.options.clone(),
        }
    }

    fn is_correct(&self, submitted: &str) -> bool {
        submitted.trim().to_uppercase() == self.correct_letter.to_string()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacementQuestionOut {
    pub id: String,
    pub question_number: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub chapter: String,
    pub chapter_id: u8,
    pub options: Vec<String>,
}

/// A generated test, as held on the server.
#[derive(Clone, Debug)]
pub struct PlacementTest {
    pub test_id: String,
    pub time_limit_minutes: u32,
    pub instructions: String,
    pub questions: Vec<PlacementQuestion>,
    pub generated_at: DateTime<Utc>,
}

impl PlacementTest {
    pub fn to_out(&self) -> PlacementTestOut {
        PlacementTestOut {
            test_id: self.test_id.clone(),
            num_questions: self.questions.len(),
            time_limit_minutes: self.time_limit_minutes,
            instructions: self.instructions.clone(),
            questions: self.questions.iter().map(PlacementQuestion::to_out).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacementTestOut {
    pub test_id: String,
    pub num_questions: usize,
    pub time_limit_minutes: u32,
    pub instructions: String,
    pub questions: Vec<PlacementQuestionOut>,
}

/// Build a placement test spanning every chapter: up to `quota` questions
/// drawn per chapter without replacement, shuffled across chapters, then
/// numbered `pt_q1..` in presentation order.
pub fn generate(bank_root: &std::path::Path, quota: usize) -> PlacementTest {
    let mut rng = rand::thread_rng();
    let mut questions: Vec<PlacementQuestion> = Vec::new();
    for spec in &curriculum::CHAPTERS {
        let eligible = eligible_questions(bank_root, spec);
        let picked: Vec<PlacementQuestion> = if eligible.len() > quota {
            eligible.choose_multiple(&mut rng, quota).cloned().collect()
        } else {
            eligible
        };
        debug!(target: "content", chapter_id = spec.id, picked = picked.len(), "Chapter questions drawn");
        questions.extend(picked);
    }

    questions.shuffle(&mut rng);
    for (i, q) in questions.iter_mut().enumerate() {
        q.id = format!("pt_q{}", i + 1);
        q.question_number = i + 1;
    }

    let test_id = format!(
        "placement_{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8]
    );
    let instructions = format!(
        "Bài kiểm tra đánh giá trình độ này gồm {} câu hỏi ({} câu mỗi chương) từ tất cả 5 chương Toán 10. \
         Hãy cố gắng trả lời các câu hỏi một cách chính xác nhất. \
         Kết quả sẽ giúp chúng tôi xác định điểm mạnh/yếu và đề xuất bài tập phù hợp.",
        questions.len(),
        quota
    );
    info!(target: "content", %test_id, questions = questions.len(), "Placement test generated");

    PlacementTest {
        test_id,
        time_limit_minutes: TIME_LIMIT_MINUTES,
        instructions,
        questions,
        generated_at: Utc::now(),
    }
}

/// Read one chapter file and keep only answerable multiple-choice items:
/// tagged "question", an mcq-style answer block, at least three string
/// options, and a correct letter resolving inside them. Everything else is
/// dropped; an unreadable file just contributes nothing.
fn eligible_questions(bank_root: &std::path::Path, spec: &ChapterSpec) -> Vec<PlacementQuestion> {
    let path = bank_root.join(spec.file);
    let raw = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            warn!(target: "content", path = %path.display(), error = %e, "Placement chapter file unavailable");
            return Vec::new();
        }
    };
    let value: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(target: "content", path = %path.display(), error = %e, "Placement chapter file malformed");
            return Vec::new();
        }
    };
    let items = match value.as_array() {
        Some(a) => a,
        None => return Vec::new(),
    };

    let mut out = Vec::new();
    for item in items {
        let obj = match item.as_object() {
            Some(o) => o,
            None => continue,
        };
        if obj.get("type").and_then(Value::as_str) != Some("question") {
            continue;
        }
        let answer = match obj.get("answer").and_then(Value::as_object) {
            Some(a) => a,
            None => continue,
        };
        let answer_type = obj.get("answer_type").and_then(Value::as_str).unwrap_or("");
        if answer_type != "mcq" && answer_type != "multiple_choice" {
            continue;
        }
        let options: Vec<String> = match obj.get("options").and_then(Value::as_array) {
            Some(a) if a.len() >= 3 => {
                match a.iter().map(|o| o.as_str().map(str::to_string)).collect::<Option<Vec<_>>>() {
                    Some(opts) => opts,
                    None => continue,
                }
            }
            _ => continue,
        };
        let letter = answer.get("correct").and_then(Value::as_str).map(str::trim).unwrap_or("");
        let correct_index = match letter_to_index(letter).filter(|i| *i < options.len()) {
            Some(i) => i,
            None => continue,
        };
        let text = obj.get("text").and_then(Value::as_str).unwrap_or("").trim().to_string();
        if text.is_empty() {
            continue;
        }

        out.push(PlacementQuestion {
            // Placeholder until the combined set is shuffled and numbered.
            id: String::new(),
            question_number: 0,
            text,
            chapter_id: spec.id,
            chapter: spec.name.to_string(),
            options,
            correct_letter: letter.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('A'),
            correct_index,
            explanation: answer.get("explanation").and_then(Value::as_str).unwrap_or("").to_string(),
            solution_steps: string_list(answer.get("solution_steps")),
            key_concepts: string_list(answer.get("key_concepts")),
        });
    }
    out
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

// --- Answer-key store ---

/// Caller errors surfaced at submission time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitError {
    UnknownTest(String),
    ExpiredTest(String),
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::UnknownTest(id) => write!(f, "unknown placement test '{}'", id),
            SubmitError::ExpiredTest(id) => write!(f, "placement test '{}' has expired", id),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Server-held answer keys, test id -> full test, with an injected
/// retention policy. Lookups do not consume entries, so re-submission is
/// possible while an entry is retained.
pub struct AnswerKeyStore {
    policy: RetentionPolicy,
    tests: RwLock<HashMap<String, PlacementTest>>,
}

impl AnswerKeyStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy, tests: RwLock::new(HashMap::new()) }
    }

    fn expired(&self, test: &PlacementTest, now: DateTime<Utc>) -> bool {
        match self.policy {
            RetentionPolicy::RetainUntilPurged => false,
            RetentionPolicy::ExpireAfter(ttl) => now
                .signed_duration_since(test.generated_at)
                .to_std()
                .map(|age| age > ttl)
                .unwrap_or(false),
        }
    }

    pub async fn insert(&self, test: PlacementTest) {
        let now = Utc::now();
        let mut tests = self.tests.write().await;
        // Opportunistic sweep keeps TTL stores from growing unbounded.
        tests.retain(|_, t| !self.expired(t, now));
        tests.insert(test.test_id.clone(), test);
    }

    pub async fn lookup(&self, test_id: &str) -> Result<PlacementTest, SubmitError> {
        {
            let tests = self.tests.read().await;
            match tests.get(test_id) {
                Some(t) if !self.expired(t, Utc::now()) => return Ok(t.clone()),
                Some(_) => {}
                None => return Err(SubmitError::UnknownTest(test_id.to_string())),
            }
        }
        let mut tests = self.tests.write().await;
        tests.remove(test_id);
        Err(SubmitError::ExpiredTest(test_id.to_string()))
    }

    /// Drop every stored answer key (the explicit purge for the
    /// retain-until-purged policy).
    pub async fn purge(&self) -> usize {
        let mut tests = self.tests.write().await;
        let n = tests.len();
        tests.clear();
        n
    }

    pub async fn len(&self) -> usize {
        self.tests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tests.read().await.is_empty()
    }
}

// --- Evaluation ---

/// Submitted answers: question id -> chosen letter.
pub type AnswerMap = HashMap<String, String>;

/// Overall level bands (score is 0-100).
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Advanced,
    Intermediate,
    Beginner,
    Foundation,
}

impl Level {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Level::Advanced
        } else if score >= 60.0 {
            Level::Intermediate
        } else if score >= 40.0 {
            Level::Beginner
        } else {
            Level::Foundation
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Level::Advanced => "Khá - Giỏi",
            Level::Intermediate => "Trung bình - Khá",
            Level::Beginner => "Cơ bản",
            Level::Foundation => "Nền tảng",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Level::Advanced => "Bạn có nền tảng vững vàng! Nên tập trung vào các bài tập nâng cao và chuyên sâu.",
            Level::Intermediate => "Bạn đã nắm được kiến thức cơ bản. Hãy luyện tập thêm để củng cố và nâng cao.",
            Level::Beginner => "Bạn cần ôn lại kiến thức cơ bản. Hãy bắt đầu với các bài tập đơn giản và tăng dần độ khó.",
            Level::Foundation => "Bạn nên bắt đầu từ các kiến thức nền tảng. Đừng lo lắng, mọi người đều bắt đầu từ đây!",
        }
    }
}

/// A chapter listed under strengths or weaknesses.
#[derive(Clone, Debug, Serialize)]
pub struct ChapterStanding {
    pub chapter: String,
    pub chapter_id: u8,
    pub score: f64,
    pub correct: usize,
    pub total: usize,
}

/// Raw per-chapter tally, reported for every chapter that appeared.
#[derive(Clone, Debug, Serialize)]
pub struct ChapterPerformance {
    pub chapter: String,
    pub chapter_id: u8,
    pub correct: usize,
    pub total: usize,
    pub score: f64,
}

/// Per-chapter result in the shape the mastery ledger ingests.
#[derive(Clone, Debug, Serialize)]
pub struct ChapterResult {
    pub chapter_id: u8,
    pub total_questions: usize,
    pub correct: usize,
    pub percent: f64,
}

/// One row of the capped incorrect-answer summary.
#[derive(Clone, Debug, Serialize)]
pub struct IncorrectQuestion {
    pub id: String,
    pub chapter: String,
    pub text: String,
    pub student_answer: String,
    pub correct_answer: char,
    pub explanation: String,
}

/// Full per-question review, one per test question.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionReview {
    pub question: PlacementQuestionOut,
    pub student_answer: String,
    pub correct_answer: char,
    pub is_correct: bool,
    pub explanation: String,
    pub solution_steps: Vec<String>,
    pub key_concepts: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacementOutcome {
    pub total_questions: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub score: f64,
    pub level: Level,
    pub level_name: String,
    pub recommendation: String,
    pub strengths: Vec<ChapterStanding>,
    pub weaknesses: Vec<ChapterStanding>,
    pub chapter_performance: Vec<ChapterPerformance>,
    pub chapter_results: Vec<ChapterResult>,
    pub incorrect_questions: Vec<IncorrectQuestion>,
    pub question_reviews: Vec<QuestionReview>,
    pub evaluated_at: String,
}

struct Tally {
    chapter_id: u8,
    chapter: String,
    total: usize,
    correct: usize,
}

/// Score a submission against the stored questions. Unanswered questions
/// count as incorrect; answers are matched per letter, trimmed and
/// case-insensitive. Chapter groupings keep first-encounter order.
pub fn evaluate(questions: &[PlacementQuestion], answers: &AnswerMap) -> PlacementOutcome {
    let mut tallies: Vec<Tally> = Vec::new();
    let mut correct_count = 0usize;
    let mut incorrect: Vec<IncorrectQuestion> = Vec::new();
    let mut reviews: Vec<QuestionReview> = Vec::new();

    for q in questions {
        let submitted = answers.get(&q.id).map(String::as_str).unwrap_or("");
        let is_correct = q.is_correct(submitted);
        if is_correct {
            correct_count += 1;
        } else if incorrect.len() < MAX_INCORRECT_SHOWN {
            incorrect.push(IncorrectQuestion {
                id: q.id.clone(),
                chapter: q.chapter.clone(),
                text: truncate_chars(&q.text, 100),
                student_answer: submitted.to_string(),
                correct_answer: q.correct_letter,
                explanation: q.explanation.clone(),
            });
        }

        let idx = match tallies.iter().position(|t| t.chapter_id == q.chapter_id) {
            Some(i) => i,
            None => {
                tallies.push(Tally {
                    chapter_id: q.chapter_id,
                    chapter: q.chapter.clone(),
                    total: 0,
                    correct: 0,
                });
                tallies.len() - 1
            }
        };
        tallies[idx].total += 1;
        if is_correct {
            tallies[idx].correct += 1;
        }

        reviews.push(QuestionReview {
            question: q.to_out(),
            student_answer: submitted.to_string(),
            correct_answer: q.correct_letter,
            is_correct,
            explanation: q.explanation.clone(),
            solution_steps: q.solution_steps.clone(),
            key_concepts: q.key_concepts.clone(),
        });
    }

    let total_questions = questions.len();
    let score = if total_questions == 0 {
        0.0
    } else {
        round_to(correct_count as f64 * 100.0 / total_questions as f64, 2)
    };
    let level = Level::from_score(score);

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut chapter_performance = Vec::new();
    let mut chapter_results = Vec::new();
    for t in &tallies {
        let chapter_score = round_to(t.correct as f64 * 100.0 / t.total as f64, 1);
        let standing = ChapterStanding {
            chapter: t.chapter.clone(),
            chapter_id: t.chapter_id,
            score: chapter_score,
            correct: t.correct,
            total: t.total,
        };
        if chapter_score >= STRENGTH_THRESHOLD {
            strengths.push(standing);
        } else if chapter_score < WEAKNESS_THRESHOLD {
            weaknesses.push(standing);
        }
        chapter_performance.push(ChapterPerformance {
            chapter: t.chapter.clone(),
            chapter_id: t.chapter_id,
            correct: t.correct,
            total: t.total,
            score: chapter_score,
        });
        chapter_results.push(ChapterResult {
            chapter_id: t.chapter_id,
            total_questions: t.total,
            correct: t.correct,
            percent: round_to(t.correct as f64 * 100.0 / t.total as f64, 2),
        });
    }

    PlacementOutcome {
        total_questions,
        correct_count,
        incorrect_count: total_questions - correct_count,
        score,
        level,
        level_name: level.display_name().to_string(),
        recommendation: level.recommendation().to_string(),
        strengths,
        weaknesses,
        chapter_performance,
        chapter_results,
        incorrect_questions: incorrect,
        question_reviews: reviews,
        evaluated_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn question(id: &str, chapter_id: u8, correct_letter: char) -> PlacementQuestion {
        PlacementQuestion {
            id: id.to_string(),
            question_number: 0,
            text: "Câu hỏi dài để kiểm tra phần tóm tắt các câu trả lời sai, cần hơn một trăm ký tự nên sẽ được lặp lại thêm một chút nữa cho đủ độ dài yêu cầu.".to_string(),
            chapter_id,
            chapter: curriculum::chapter_name(chapter_id).unwrap_or("?").to_string(),
            options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
            correct_letter,
            correct_index: (correct_letter as usize) - ('A' as usize),
            explanation: "giải thích".into(),
            solution_steps: vec!["bước 1".into()],
            key_concepts: vec!["khái niệm".into()],
        }
    }

    fn bank(dir: &std::path::Path, per_chapter: usize) {
        for spec in &curriculum::CHAPTERS {
            let items: Vec<Value> = (0..per_chapter)
                .map(|i| {
                    json!({
                        "type": "question",
                        "text": format!("chương {} câu {}", spec.id, i),
                        "answer_type": "mcq",
                        "options": ["1", "2", "3", "4"],
                        "answer": {"correct": "B", "explanation": "vì B"}
                    })
                })
                .collect();
            std::fs::write(dir.join(spec.file), serde_json::to_string(&items).expect("json")).expect("write");
        }
    }

    #[test]
    fn generation_draws_per_chapter_quota_and_numbers_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        bank(dir.path(), 6);
        let test = generate(dir.path(), QUESTIONS_PER_CHAPTER);
        assert_eq!(test.questions.len(), 20);
        assert_eq!(test.time_limit_minutes, 30);
        assert!(test.test_id.starts_with("placement_"));
        assert!(test.instructions.contains("20 câu hỏi"));
        for spec in &curriculum::CHAPTERS {
            let n = test.questions.iter().filter(|q| q.chapter_id == spec.id).count();
            assert_eq!(n, QUESTIONS_PER_CHAPTER);
        }
        for (i, q) in test.questions.iter().enumerate() {
            assert_eq!(q.id, format!("pt_q{}", i + 1));
            assert_eq!(q.question_number, i + 1);
        }
    }

    #[test]
    fn generation_takes_all_when_a_chapter_is_short() {
        let dir = tempfile::tempdir().expect("tempdir");
        bank(dir.path(), 2);
        let test = generate(dir.path(), QUESTIONS_PER_CHAPTER);
        assert_eq!(test.questions.len(), 10);
    }

    #[test]
    fn client_projection_carries_no_answer_key() {
        let q = question("pt_q1", 1, 'B');
        let out = serde_json::to_value(q.to_out()).expect("json");
        let keys: Vec<&str> = out.as_object().expect("obj").keys().map(String::as_str).collect();
        assert!(keys.contains(&"options"));
        assert!(!keys.contains(&"correct_letter"));
        assert!(!keys.contains(&"correct_index"));
        assert!(!keys.contains(&"explanation"));
        assert_eq!(out["type"], "mcq");
    }

    #[test]
    fn fifteen_of_twenty_scores_intermediate() {
        let mut questions = Vec::new();
        for i in 0..20 {
            questions.push(question(&format!("pt_q{}", i + 1), (i % 5 + 1) as u8, 'A'));
        }
        let mut answers = AnswerMap::new();
        for i in 0..15 {
            answers.insert(format!("pt_q{}", i + 1), "a ".to_string());
        }
        let outcome = evaluate(&questions, &answers);
        assert_eq!(outcome.total_questions, 20);
        assert_eq!(outcome.correct_count, 15);
        assert_eq!(outcome.incorrect_count, 5);
        assert_eq!(outcome.score, 75.0);
        assert_eq!(outcome.level, Level::Intermediate);
        assert_eq!(outcome.level_name, "Trung bình - Khá");
        assert_eq!(outcome.question_reviews.len(), 20);
        assert_eq!(outcome.incorrect_questions.len(), 5);
        assert!(outcome.incorrect_questions[0].text.chars().count() <= 103);
        assert!(outcome.incorrect_questions[0].text.ends_with("..."));
    }

    #[test]
    fn strengths_and_weaknesses_follow_the_thresholds() {
        // Chapter 1: 4/4, chapter 2: 1/4, chapter 3: 2/4.
        let mut questions = Vec::new();
        let mut answers = AnswerMap::new();
        let mut n = 0;
        for (chapter, correct_n) in [(1u8, 4usize), (2, 1), (3, 2)] {
            for i in 0..4 {
                n += 1;
                let id = format!("pt_q{}", n);
                questions.push(question(&id, chapter, 'A'));
                answers.insert(id, if i < correct_n { "A".into() } else { "B".into() });
            }
        }
        let outcome = evaluate(&questions, &answers);
        assert_eq!(outcome.strengths.len(), 1);
        assert_eq!(outcome.strengths[0].chapter_id, 1);
        assert_eq!(outcome.strengths[0].score, 100.0);
        assert_eq!(outcome.weaknesses.len(), 1);
        assert_eq!(outcome.weaknesses[0].chapter_id, 2);
        assert_eq!(outcome.weaknesses[0].score, 25.0);
        // 50% is neither a strength nor a weakness.
        assert_eq!(outcome.chapter_performance.len(), 3);
        assert_eq!(outcome.chapter_results.len(), 3);
        assert_eq!(outcome.chapter_results[2].percent, 50.0);
    }

    #[test]
    fn empty_test_scores_zero_foundation() {
        let outcome = evaluate(&[], &AnswerMap::new());
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.level, Level::Foundation);
        assert!(outcome.chapter_performance.is_empty());
    }

    #[tokio::test]
    async fn store_retains_entries_for_resubmission() {
        let store = AnswerKeyStore::new(RetentionPolicy::RetainUntilPurged);
        let mut test = generate_empty("placement_x");
        test.questions.push(question("pt_q1", 1, 'A'));
        store.insert(test).await;

        assert!(store.lookup("placement_x").await.is_ok());
        // Not consumed: a second lookup still succeeds.
        assert!(store.lookup("placement_x").await.is_ok());
        assert_eq!(
            store.lookup("placement_y").await.unwrap_err(),
            SubmitError::UnknownTest("placement_y".into())
        );
        assert_eq!(store.purge().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_expires_entries_under_ttl_policy() {
        let store = AnswerKeyStore::new(RetentionPolicy::ExpireAfter(Duration::from_secs(3600)));
        let fresh = generate_empty("placement_new");
        store.insert(fresh).await;
        // Inserted last so the opportunistic sweep cannot remove it before
        // the lookup observes the expiry.
        let mut stale = generate_empty("placement_old");
        stale.generated_at = Utc::now() - chrono::Duration::hours(2);
        store.insert(stale).await;

        assert_eq!(
            store.lookup("placement_old").await.unwrap_err(),
            SubmitError::ExpiredTest("placement_old".into())
        );
        assert!(store.lookup("placement_new").await.is_ok());
        assert_eq!(store.len().await, 1);
    }

    fn generate_empty(test_id: &str) -> PlacementTest {
        PlacementTest {
            test_id: test_id.to_string(),
            time_limit_minutes: TIME_LIMIT_MINUTES,
            instructions: String::new(),
            questions: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}
