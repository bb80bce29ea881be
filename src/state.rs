//! Application state: shared stores, prompts, and the optional Gemini client.
//!
//! This module owns:
//!   - the passage index (built lazily from the artifacts root)
//!   - the placement answer-key store (retention injected from config)
//!   - per-student mastery ledgers
//!   - the exercise-set document store
//!   - the prompts struct (from TOML or defaults)
//!
//! Every public method here is one pipeline operation; callers never touch
//! the stores directly.

use std::{collections::HashMap, path::Path, sync::Arc};
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::config::{load_content_config_from_env, Prompts, Settings};
use crate::domain::{ExerciseSet, GenerateRequest, PassageChunk};
use crate::gemini::Gemini;
use crate::generator;
use crate::placement::{self, AnswerKeyStore, AnswerMap, PlacementOutcome, PlacementTestOut, SubmitError};
use crate::plan::{self, ChapterOutcome, MasteryLedger, MasteryRecord, OutcomeError, PlanItem};
use crate::retriever::{IndexStats, PassageIndex};
use crate::sets::{self, SetStore, SetSummary};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub prompts: Prompts,
    pub index: Arc<PassageIndex>,
    pub placement_tests: Arc<AnswerKeyStore>,
    pub mastery: Arc<RwLock<HashMap<i64, MasteryLedger>>>,
    pub sets: SetStore,
    pub gemini: Option<Gemini>,
}

impl AppState {
    /// Build state from env: load config, resolve roots, init Gemini.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        // Load TOML config if provided (prompts + retention policy).
        let cfg_opt = load_content_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();
        let retention = cfg_opt
            .as_ref()
            .map(|c| c.retention.policy())
            .unwrap_or_default();

        let settings = Settings::from_env();
        info!(
            target: "content",
            artifacts_root = %settings.artifacts_root.display(),
            question_bank_root = %settings.question_bank_root.display(),
            data_root = %settings.data_root.display(),
            ?retention,
            "Content pipeline configured"
        );

        // Build optional Gemini client (if API key present).
        let gemini = Gemini::from_env();
        if let Some(g) = &gemini {
            info!(target: "learncoach_content", base_url = %g.base_url, model = %g.model, "Gemini enabled.");
        } else {
            info!(target: "learncoach_content", "Gemini disabled (no GOOGLE_API_KEY). Using local artifacts and fallbacks.");
        }

        let sets = SetStore::new(settings.data_root.clone());
        Self {
            settings,
            prompts,
            index: Arc::new(PassageIndex::new()),
            placement_tests: Arc::new(AnswerKeyStore::new(retention)),
            mastery: Arc::new(RwLock::new(HashMap::new())),
            sets,
            gemini,
        }
    }

    /// Top passages for a query. `root` overrides the configured artifacts
    /// root (and triggers a rebuild when it differs from the cached one).
    #[instrument(level = "debug", skip(self, query), fields(query_len = query.len(), top_k))]
    pub async fn retrieve(&self, query: &str, top_k: usize, root: Option<&Path>) -> Vec<PassageChunk> {
        let root = root.unwrap_or(&self.settings.artifacts_root);
        self.index.retrieve(query, top_k, root).await
    }

    pub async fn index_stats(&self) -> IndexStats {
        self.index.stats().await
    }

    /// Explain a problem step by step, grounded in retrieved passages.
    /// Without Gemini (or when the call fails) a deterministic summary of
    /// the retrieved context stands in. Returns the text plus the contexts
    /// it was grounded in.
    #[instrument(level = "info", skip(self, problem), fields(problem_len = problem.len()))]
    pub async fn explain(&self, problem: &str, top_k: usize) -> (String, Vec<PassageChunk>) {
        let contexts = self.retrieve(problem, top_k, None).await;
        if let Some(g) = &self.gemini {
            match g.explain(&self.prompts, problem, &contexts).await {
                Ok(text) => return (text, contexts),
                Err(e) => {
                    error!(target: "content", error = %e, "Gemini explain failed; using stitched context summary");
                }
            }
        }
        (stitched_explanation(&contexts), contexts)
    }

    /// Generate an exercise set for a user and persist it as a document.
    /// Contexts are retrieved once and attached whichever strategy wins.
    /// Only a persistence failure is an error; generation itself cannot
    /// fail thanks to the fallback strategy.
    #[instrument(level = "info", skip(self, req), fields(user_id, topic = %req.topic, n = req.n))]
    pub async fn generate_exercises(&self, user_id: i64, req: &GenerateRequest) -> Result<ExerciseSet, String> {
        let contexts = self.retrieve(&req.topic, req.top_k, None).await;
        let (items, used_model) = generator::generate(
            req,
            &contexts,
            self.gemini.as_ref(),
            &self.prompts,
            &self.settings.question_bank_root,
        )
        .await;

        let (created_at, id) = sets::stamp_and_id();
        let set = ExerciseSet {
            id,
            user_id,
            topic: req.topic.clone(),
            difficulty: req.difficulty,
            format: req.format,
            items,
            contexts,
            used_model,
            created_at,
        };
        match self.sets.save(&set) {
            Ok(_) => Ok(set),
            Err(e) => {
                error!(target: "content", set_id = %set.id, error = %e, "Failed to persist exercise set");
                Err(e)
            }
        }
    }

    pub fn list_exercise_sets(&self, user_id: i64) -> Vec<SetSummary> {
        self.sets.list(user_id)
    }

    pub fn load_exercise_set(&self, user_id: i64, set_id: &str) -> Option<ExerciseSet> {
        self.sets.load(user_id, set_id)
    }

    /// Generate a placement test and hold its answer key server-side.
    /// The caller only ever receives the client projection.
    #[instrument(level = "info", skip(self), fields(questions_per_chapter))]
    pub async fn generate_placement_test(&self, questions_per_chapter: usize) -> PlacementTestOut {
        let test = placement::generate(&self.settings.question_bank_root, questions_per_chapter);
        let out = test.to_out();
        self.placement_tests.insert(test).await;
        out
    }

    /// Score a submission and fold its per-chapter results into the
    /// student's mastery ledger. Unknown/expired test ids are the only
    /// caller errors; everything else resolves to an outcome.
    #[instrument(level = "info", skip(self, answers), fields(user_id, %test_id, answered = answers.len()))]
    pub async fn submit_placement_test(
        &self,
        user_id: i64,
        test_id: &str,
        answers: &AnswerMap,
    ) -> Result<PlacementOutcome, SubmitError> {
        let test = self.placement_tests.lookup(test_id).await?;
        let outcome = placement::evaluate(&test.questions, answers);
        {
            let mut ledgers = self.mastery.write().await;
            let ledger = ledgers.entry(user_id).or_default();
            for cr in &outcome.chapter_results {
                ledger.upsert(cr.chapter_id, cr.total_questions, cr.correct);
            }
        }
        info!(
            target: "content",
            user_id,
            %test_id,
            score = outcome.score,
            level = ?outcome.level,
            "Placement test evaluated"
        );
        Ok(outcome)
    }

    /// Drop all held placement answer keys.
    pub async fn purge_placement_tests(&self) -> usize {
        let purged = self.placement_tests.purge().await;
        info!(target: "content", purged, "Purged placement answer keys");
        purged
    }

    /// Record self-reported diagnostic outcomes. The whole submission is
    /// validated before anything lands in the ledger. Returns the updated
    /// records, one per submitted chapter.
    #[instrument(level = "info", skip(self, outcomes), fields(user_id, chapters = outcomes.len()))]
    pub async fn record_diagnostic(
        &self,
        user_id: i64,
        outcomes: &[ChapterOutcome],
    ) -> Result<Vec<MasteryRecord>, OutcomeError> {
        if outcomes.is_empty() {
            return Err(OutcomeError::NoItems);
        }
        for outcome in outcomes {
            outcome.validate()?;
        }
        let mut ledgers = self.mastery.write().await;
        let ledger = ledgers.entry(user_id).or_default();
        let records = outcomes
            .iter()
            .map(|o| ledger.upsert(o.chapter_id, o.total_questions, o.correct).clone())
            .collect();
        Ok(records)
    }

    /// The student's current mastery records (empty when nothing was
    /// recorded yet).
    pub async fn mastery_records(&self, user_id: i64) -> Vec<MasteryRecord> {
        let ledgers = self.mastery.read().await;
        ledgers.get(&user_id).map(|l| l.records().to_vec()).unwrap_or_default()
    }

    /// Seed a phased learning plan from the student's ledger, weakest
    /// chapters first; teaching order when the ledger is empty.
    #[instrument(level = "info", skip(self), fields(user_id))]
    pub async fn learning_plan(&self, user_id: i64) -> Vec<PlanItem> {
        let records = self.mastery_records(user_id).await;
        let order = plan::prioritize(&records);
        plan::seed_plan(&order)
    }
}

/// Gemini-less explanation: a context digest plus a fixed solving outline,
/// so the operation still returns something useful offline.
fn stitched_explanation(contexts: &[PassageChunk]) -> String {
    let mut lines: Vec<String> = vec![
        "[Mô phỏng Gemini] Không có GOOGLE_API_KEY. Dưới đây là vài đoạn liên quan và gợi ý cách giải:".to_string(),
        "\nTóm tắt ngữ cảnh:".to_string(),
    ];
    for c in contexts {
        lines.push(format!("- ({}) {}", c.chunk_index, c.preview));
    }
    lines.push("\nGợi ý cách tiếp cận:".to_string());
    lines.push("1) Phân tích đề bài, xác định dữ kiện và ẩn số.".to_string());
    lines.push("2) Chọn công thức/định lý áp dụng tương ứng với chủ đề.".to_string());
    lines.push("3) Thực hiện biến đổi, tính toán từng bước.".to_string());
    lines.push("4) Viết kết luận rõ ràng và kiểm tra điều kiện.".to_string());
    lines.join("\n")
}
