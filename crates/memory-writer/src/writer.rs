//! Per-turn memory processing.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use database::{
    conversation_summary, execution_log, memory, Database, MemoryType, NewMemory,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::rules::{Extraction, Extractor};
use crate::summarizer::{Summarizer, SummaryRequest, SUMMARY_MAX_TOKENS};

/// Function name recorded in the execution audit log.
pub const AUDIT_FUNCTION_NAME: &str = "memory-webhook-processor";

/// A summary is produced on every turn number divisible by this.
pub const SUMMARY_INTERVAL: i64 = 5;

/// Number of recent conversation rows fed to the summarizer.
pub const SUMMARY_WINDOW: i64 = 10;

const CONVERSATION_IMPORTANCE: f64 = 0.7;
const PREFERENCE_IMPORTANCE: f64 = 0.9;
const FACT_IMPORTANCE: f64 = 0.8;

/// Optional retention for `agent_memory_enhanced`.
///
/// Both limits are off by default so the table keeps the full history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Option<Duration>,
    pub max_rows_per_user: Option<usize>,
}

impl RetentionPolicy {
    /// Load from `MEMORY_TTL_DAYS` and `MEMORY_MAX_ROWS_PER_USER`. Zero disables a limit.
    pub fn from_env() -> Self {
        Self {
            ttl: env_u64("MEMORY_TTL_DAYS").and_then(days_to_duration),
            max_rows_per_user: env_usize("MEMORY_MAX_ROWS_PER_USER").and_then(cap_from_env),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ttl.is_some() || self.max_rows_per_user.is_some()
    }
}

/// One completed conversation turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInput {
    pub user_id: String,
    pub user_message: String,
    #[serde(default)]
    pub agent_response: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Turn counter supplied by the caller; absent means turn 1 and no summary.
    #[serde(default)]
    pub turn_number: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Extra context merged into the conversation row.
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

fn default_domain() -> String {
    "general".to_string()
}

/// Step-by-step outcome of processing a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub memory_logged: bool,
    pub summary_created: bool,
    /// Recent turns were loaded for summarization.
    pub context_retrieved: bool,
    pub errors: Vec<String>,
}

/// Result of [`MemoryWriter::process_turn`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOutcome {
    pub results: ProcessingReport,
    /// Memory row count per type for the user after this turn.
    pub memory_breakdown: BTreeMap<String, i64>,
    pub preferences_stored: usize,
    pub facts_stored: usize,
}

/// Extracts and persists memories for each conversation turn.
#[derive(Clone)]
pub struct MemoryWriter {
    database: Database,
    extractor: Arc<Extractor>,
    summarizer: Arc<dyn Summarizer>,
    retention: RetentionPolicy,
}

impl MemoryWriter {
    pub fn new(
        database: Database,
        extractor: Arc<Extractor>,
        summarizer: Arc<dyn Summarizer>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            database,
            extractor,
            summarizer,
            retention,
        }
    }

    /// Process one turn. Each step runs even if an earlier one failed;
    /// failures are collected in the report.
    pub async fn process_turn(&self, turn: &TurnInput) -> ProcessingOutcome {
        let started = Instant::now();
        let mut outcome = ProcessingOutcome::default();
        let extracted = self.extractor.extract(&turn.user_message);

        let conversation = self.conversation_memory(turn, Value::Object(extracted.entities));
        match memory::insert_memory(self.database.pool(), &conversation).await {
            Ok(_) => outcome.results.memory_logged = true,
            Err(e) => outcome
                .results
                .errors
                .push(format!("Conversation memory: {}", e)),
        }

        for preference in &extracted.preferences {
            let row = self.extraction_memory(turn, MemoryType::Preference, preference);
            match memory::insert_memory(self.database.pool(), &row).await {
                Ok(_) => outcome.preferences_stored += 1,
                Err(e) => outcome.results.errors.push(format!("Preference: {}", e)),
            }
        }

        for fact in &extracted.facts {
            let row = self.extraction_memory(turn, MemoryType::Fact, fact);
            match memory::insert_memory(self.database.pool(), &row).await {
                Ok(_) => outcome.facts_stored += 1,
                Err(e) => outcome.results.errors.push(format!("Fact: {}", e)),
            }
        }

        if let Some(turn_number) = turn.turn_number.filter(|n| *n > 0 && n % SUMMARY_INTERVAL == 0) {
            self.summarize(turn, turn_number, &mut outcome.results).await;
        }

        self.apply_retention(&turn.user_id).await;

        match memory::count_by_type(self.database.pool(), &turn.user_id).await {
            Ok(counts) => outcome.memory_breakdown = counts.into_iter().collect(),
            Err(e) => outcome
                .results
                .errors
                .push(format!("Memory statistics: {}", e)),
        }

        info!(
            user_id = %turn.user_id,
            turn = turn.turn_number.unwrap_or(1),
            preferences = outcome.preferences_stored,
            facts = outcome.facts_stored,
            errors = outcome.results.errors.len(),
            "Processed memory turn"
        );

        self.audit(turn, &outcome, started).await;
        outcome
    }

    async fn summarize(&self, turn: &TurnInput, turn_number: i64, report: &mut ProcessingReport) {
        let recent = match memory::recent_by_type(
            self.database.pool(),
            &turn.user_id,
            MemoryType::Conversation,
            SUMMARY_WINDOW,
        )
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                report.errors.push(format!("Summary creation: {}", e));
                return;
            }
        };
        if recent.is_empty() {
            return;
        }
        report.context_retrieved = true;

        let conversation_text = recent
            .iter()
            .rev()
            .filter_map(|row| row.content())
            .collect::<Vec<_>>()
            .join("\n\n");

        let request = SummaryRequest {
            conversation_text,
            user_id: turn.user_id.clone(),
            domain: turn.domain.clone(),
            max_tokens: SUMMARY_MAX_TOKENS,
        };

        let summary = match self.summarizer.summarize(&request).await {
            Ok(summary) => summary,
            Err(e) => {
                report.errors.push(format!("Summary creation: {}", e));
                return;
            }
        };

        match conversation_summary::upsert_summary(
            self.database.pool(),
            &turn.user_id,
            &summary,
            turn_number,
        )
        .await
        {
            Ok(()) => {
                report.summary_created = true;
                debug!(user_id = %turn.user_id, turn_number, "Stored conversation summary");
            }
            Err(e) => report.errors.push(format!("Summary storage: {}", e)),
        }
    }

    async fn apply_retention(&self, user_id: &str) {
        if let Some(ttl) = self.retention.ttl {
            if let Err(e) = memory::prune_older_than(self.database.pool(), ttl).await {
                warn!(error = %e, "Failed to prune expired memories");
            }
        }
        if let Some(max_rows) = self.retention.max_rows_per_user {
            if let Err(e) =
                memory::prune_over_limit_for_user(self.database.pool(), user_id, max_rows).await
            {
                warn!(error = %e, user_id, "Failed to prune memories over limit");
            }
        }
    }

    async fn audit(&self, turn: &TurnInput, outcome: &ProcessingOutcome, started: Instant) {
        let input = json!({
            "userId": turn.user_id,
            "domain": turn.domain,
            "turnNumber": turn.turn_number,
            "messageLength": turn.user_message.chars().count(),
        });
        let output = json!({
            "memoryLogged": outcome.results.memory_logged,
            "summaryCreated": outcome.results.summary_created,
            "contextRetrieved": outcome.results.context_retrieved,
            "errors": outcome.results.errors,
            "memoryBreakdown": outcome.memory_breakdown,
        });

        if let Err(e) = execution_log::insert_log(
            self.database.pool(),
            Some(&turn.user_id),
            AUDIT_FUNCTION_NAME,
            &input,
            &output,
            outcome.results.errors.is_empty(),
            started.elapsed().as_millis() as i64,
        )
        .await
        {
            warn!(error = %e, "Failed to write memory audit row");
        }
    }

    fn conversation_memory(&self, turn: &TurnInput, entities: Value) -> NewMemory {
        let turn_number = turn.turn_number.unwrap_or(1);

        let mut context = Map::new();
        context.insert("domain".to_string(), json!(turn.domain));
        context.insert("phoneNumber".to_string(), json!(turn.phone_number));
        context.insert("conversationId".to_string(), json!(turn.conversation_id));
        if let Some(extra) = &turn.context {
            context.extend(extra.clone());
        }

        NewMemory {
            user_id: turn.user_id.clone(),
            memory_type: MemoryType::Conversation,
            memory_key: format!("turn_{}_{}", turn_number, unique_suffix()),
            memory_value: json!({
                "content": format!("User: {}\nAgent: {}", turn.user_message, turn.agent_response),
                "metadata": {
                    "domain": turn.domain,
                    "turnNumber": turn_number,
                    "intent": turn.intent,
                    "entities": entities,
                    "context": context,
                    "importance": CONVERSATION_IMPORTANCE,
                    "confidence": 1.0,
                    "tags": ["conversation", "turn", turn.domain],
                    "timestamp": Utc::now().to_rfc3339(),
                },
            }),
            importance_weight: CONVERSATION_IMPORTANCE,
            confidence_score: 1.0,
        }
    }

    fn extraction_memory(
        &self,
        turn: &TurnInput,
        memory_type: MemoryType,
        extraction: &Extraction,
    ) -> NewMemory {
        let (prefix, importance) = match memory_type {
            MemoryType::Preference => ("pref", PREFERENCE_IMPORTANCE),
            _ => ("fact", FACT_IMPORTANCE),
        };

        let mut tags = vec![memory_type.as_str().to_string()];
        tags.extend(extraction.tags.iter().cloned());

        let mut metadata = json!({
            "domain": turn.domain,
            "importance": importance,
            "confidence": extraction.confidence,
            "tags": tags,
            "extractedAt": Utc::now().to_rfc3339(),
        });
        if memory_type == MemoryType::Fact {
            metadata["entities"] = json!([extraction.value]);
        }

        NewMemory {
            user_id: turn.user_id.clone(),
            memory_type,
            memory_key: format!("{}_{}", prefix, unique_suffix()),
            memory_value: json!({
                "content": extraction.content,
                "metadata": metadata,
            }),
            importance_weight: importance,
            confidence_score: extraction.confidence,
        }
    }
}

/// `{millis}_{random}` so identical input in the same millisecond still gets distinct keys.
fn unique_suffix() -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("{}_{:08x}", Utc::now().timestamp_millis(), random)
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok()?.parse().ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok()?.parse().ok()
}

fn days_to_duration(days: u64) -> Option<Duration> {
    if days == 0 {
        None
    } else {
        Some(Duration::from_secs(days.saturating_mul(24 * 60 * 60)))
    }
}

fn cap_from_env(value: usize) -> Option<usize> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use crate::summarizer::DigestSummarizer;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingSummarizer {
        requests: Mutex<Vec<SummaryRequest>>,
    }

    #[async_trait]
    impl Summarizer for RecordingSummarizer {
        async fn summarize(&self, request: &SummaryRequest) -> Result<String, MemoryError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok("short summary".to_string())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _request: &SummaryRequest) -> Result<String, MemoryError> {
            Err(MemoryError::Summarizer("503".to_string()))
        }
    }

    async fn writer_with(summarizer: Arc<dyn Summarizer>, retention: RetentionPolicy) -> MemoryWriter {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        MemoryWriter::new(db, Arc::new(Extractor::new().unwrap()), summarizer, retention)
    }

    fn turn(user_message: &str, turn_number: Option<i64>) -> TurnInput {
        TurnInput {
            user_id: "user-1".to_string(),
            user_message: user_message.to_string(),
            agent_response: "ok".to_string(),
            turn_number,
            domain: "general".to_string(),
            ..TurnInput::default()
        }
    }

    #[tokio::test]
    async fn test_plain_turn_writes_one_conversation_row() {
        let writer = writer_with(Arc::new(DigestSummarizer::default()), RetentionPolicy::default()).await;

        let outcome = writer.process_turn(&turn("hello", Some(1))).await;

        assert!(outcome.results.memory_logged);
        assert!(!outcome.results.summary_created);
        assert!(outcome.results.errors.is_empty());
        assert_eq!(outcome.memory_breakdown.get("conversation"), Some(&1));
        assert_eq!(outcome.memory_breakdown.len(), 1);

        let rows = memory::list_for_user(writer.database.pool(), "user-1").await.unwrap();
        assert_eq!(rows[0].content(), Some("User: hello\nAgent: ok"));
        assert!(rows[0].memory_key.starts_with("turn_1_"));
        assert_eq!(rows[0].importance_weight, 0.7);
        assert_eq!(rows[0].memory_value.0["metadata"]["tags"], json!(["conversation", "turn", "general"]));
    }

    #[tokio::test]
    async fn test_facts_are_split_at_connectors() {
        let writer = writer_with(Arc::new(DigestSummarizer::default()), RetentionPolicy::default()).await;

        let outcome = writer
            .process_turn(&turn("I live in Kigali and my name is Jean", Some(2)))
            .await;
        assert_eq!(outcome.facts_stored, 2);

        let facts = memory::recent_by_type(writer.database.pool(), "user-1", MemoryType::Fact, 10)
            .await
            .unwrap();
        let mut contents: Vec<_> = facts.iter().filter_map(|f| f.content()).collect();
        contents.sort();
        assert_eq!(contents, vec!["Lives in: Kigali", "User name: Jean"]);
        assert!(facts.iter().all(|f| f.memory_key.starts_with("fact_")));
        assert!(facts.iter().all(|f| f.importance_weight == 0.8));
    }

    #[tokio::test]
    async fn test_preferences_are_stored() {
        let writer = writer_with(Arc::new(DigestSummarizer::default()), RetentionPolicy::default()).await;

        let outcome = writer
            .process_turn(&turn("I prefer Kinyarwanda and I pay with momo", Some(1)))
            .await;

        assert_eq!(outcome.preferences_stored, 2);
        assert_eq!(outcome.memory_breakdown.get("preference"), Some(&2));

        let prefs = memory::recent_by_type(writer.database.pool(), "user-1", MemoryType::Preference, 10)
            .await
            .unwrap();
        assert!(prefs.iter().all(|p| p.importance_weight == 0.9));
        assert!(prefs.iter().all(|p| p.confidence_score == 0.8));
    }

    #[tokio::test]
    async fn test_repeated_input_gets_distinct_keys() {
        let writer = writer_with(Arc::new(DigestSummarizer::default()), RetentionPolicy::default()).await;
        let input = turn("my name is Jean", Some(3));

        writer.process_turn(&input).await;
        writer.process_turn(&input).await;

        let rows = memory::list_for_user(writer.database.pool(), "user-1").await.unwrap();
        assert_eq!(rows.len(), 4);
        let mut keys: Vec<_> = rows.iter().map(|r| r.memory_key.clone()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 4);
    }

    #[tokio::test]
    async fn test_fifth_turn_summarizes_in_order() {
        let summarizer = Arc::new(RecordingSummarizer {
            requests: Mutex::new(Vec::new()),
        });
        let writer = writer_with(summarizer.clone(), RetentionPolicy::default()).await;

        for n in 1..=5 {
            let outcome = writer.process_turn(&turn(&format!("message {n}"), Some(n))).await;
            assert_eq!(outcome.results.summary_created, n == 5);
        }

        let requests = summarizer.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 200);
        assert!(requests[0].conversation_text.starts_with("User: message 1\nAgent: ok\n\n"));
        assert!(requests[0].conversation_text.ends_with("User: message 5\nAgent: ok"));

        let stored = conversation_summary::get_summary(writer.database.pool(), "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.summary, "short summary");
        assert_eq!(stored.turn_count, 5);
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_reported_not_fatal() {
        let writer = writer_with(Arc::new(FailingSummarizer), RetentionPolicy::default()).await;

        let outcome = writer.process_turn(&turn("hello", Some(10))).await;

        assert!(outcome.results.memory_logged);
        assert!(outcome.results.context_retrieved);
        assert!(!outcome.results.summary_created);
        assert_eq!(outcome.results.errors.len(), 1);
        assert!(outcome.results.errors[0].starts_with("Summary creation"));

        let audit = execution_log::list_for_function(writer.database.pool(), AUDIT_FUNCTION_NAME, 5)
            .await
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert!(!audit[0].success_status);
    }

    #[tokio::test]
    async fn test_missing_turn_number_never_summarizes() {
        let writer = writer_with(Arc::new(FailingSummarizer), RetentionPolicy::default()).await;

        let outcome = writer.process_turn(&turn("hello", None)).await;

        assert!(outcome.results.errors.is_empty());
        let rows = memory::list_for_user(writer.database.pool(), "user-1").await.unwrap();
        assert!(rows[0].memory_key.starts_with("turn_1_"));
    }

    #[tokio::test]
    async fn test_retention_caps_rows_per_user() {
        let retention = RetentionPolicy {
            ttl: None,
            max_rows_per_user: Some(2),
        };
        let writer = writer_with(Arc::new(DigestSummarizer::default()), retention).await;

        for n in 1..=4 {
            writer.process_turn(&turn(&format!("turn {n}"), Some(n))).await;
        }

        let rows = memory::list_for_user(writer.database.pool(), "user-1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].content(), Some("User: turn 4\nAgent: ok"));
    }

    #[test]
    fn test_retention_disabled_by_default() {
        assert!(!RetentionPolicy::default().is_enabled());
        assert_eq!(days_to_duration(0), None);
        assert_eq!(cap_from_env(0), None);
        assert_eq!(days_to_duration(1), Some(Duration::from_secs(86_400)));
    }
}
