//! Heuristic predictive engine.
//!
//! Every number produced here is an ad hoc linear combination of keyword
//! counts. `engagement_probability` and `confidence` are not calibrated
//! against outcomes and should be read as relative weights only.

use std::time::Instant;

use database::{behavior, execution_log, Database};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::PredictionError;
use crate::lexicon::{
    contains_any, count_hits, sentiment, INTENT_WORDS, INTEREST_WORDS, OBJECTION_WORDS,
    PRICE_WORDS,
};
use crate::playbook::{guidance, ConversationStage};

/// Function name recorded in the execution audit log.
pub const AUDIT_FUNCTION_NAME: &str = "predictive-response";

const BASE_ENGAGEMENT: f64 = 0.5;
const SENTIMENT_WEIGHT: f64 = 0.2;
const QUESTION_WEIGHT: f64 = 0.05;
const OBJECTION_WEIGHT: f64 = 0.08;
const MAX_COUNTED: usize = 5;

/// One prior message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// "user" or "assistant".
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(alias = "message", alias = "text")]
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

impl HistoryTurn {
    pub fn is_user(&self) -> bool {
        self.role.eq_ignore_ascii_case("user")
    }
}

/// Caller-supplied facts about the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    #[serde(default)]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub user_id: String,
    pub current_message: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryTurn>,
    #[serde(default)]
    pub user_context: Option<UserContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub likely_responses: Vec<String>,
    pub likely_objections: Vec<String>,
    pub recommended_approach: String,
    /// Heuristic weight in [0.05, 0.95].
    pub engagement_probability: f64,
    pub conversation_stage: ConversationStage,
    pub sentiment: f64,
    /// Heuristic weight, not a calibrated probability.
    pub confidence: f64,
}

/// Signals the prediction was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPatterns {
    pub question_count: usize,
    pub objection_count: usize,
    pub message_count: usize,
    pub user_type: Option<String>,
    /// Stored engagement score before this prediction.
    pub previous_engagement: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub predictions: Prediction,
    pub patterns: BehaviorPatterns,
}

impl PredictionOutcome {
    /// Static prediction returned when scoring fails.
    pub fn degraded() -> Self {
        Self {
            predictions: Prediction {
                likely_responses: vec!["Continues the conversation".to_string()],
                likely_objections: Vec::new(),
                recommended_approach: "Respond helpfully and ask a clarifying question"
                    .to_string(),
                engagement_probability: BASE_ENGAGEMENT,
                conversation_stage: ConversationStage::Awareness,
                sentiment: 0.0,
                confidence: 0.1,
            },
            patterns: BehaviorPatterns {
                question_count: 0,
                objection_count: 0,
                message_count: 0,
                user_type: None,
                previous_engagement: None,
            },
        }
    }
}

/// Scores conversations and keeps a running engagement score per user.
#[derive(Debug, Clone)]
pub struct PredictiveEngine {
    database: Database,
}

impl PredictiveEngine {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionOutcome, PredictionError> {
        if request.user_id.trim().is_empty() {
            return Err(PredictionError::InvalidRequest("userId is required".to_string()));
        }

        let started = Instant::now();
        let stored = behavior::get_score(self.database.pool(), &request.user_id).await?;

        let requested_type = request
            .user_context
            .as_ref()
            .and_then(|context| context.user_type.clone());
        let user_type = requested_type
            .clone()
            .or_else(|| stored.as_ref().and_then(|score| score.user_type.clone()));
        let previous_engagement = stored.as_ref().map(|score| score.engagement_score);

        let outcome = score(request, user_type, previous_engagement);

        behavior::upsert_score(
            self.database.pool(),
            &request.user_id,
            outcome.predictions.engagement_probability,
            requested_type.as_deref(),
        )
        .await?;

        debug!(
            user_id = %request.user_id,
            stage = outcome.predictions.conversation_stage.as_str(),
            engagement = outcome.predictions.engagement_probability,
            "Predicted conversation trajectory"
        );

        self.audit(request, &outcome, started).await;
        Ok(outcome)
    }

    async fn audit(&self, request: &PredictionRequest, outcome: &PredictionOutcome, started: Instant) {
        let input = json!({
            "userId": request.user_id,
            "messageLength": request.current_message.chars().count(),
            "historyLength": request.conversation_history.len(),
        });
        let output = json!({
            "stage": outcome.predictions.conversation_stage,
            "engagementProbability": outcome.predictions.engagement_probability,
            "confidence": outcome.predictions.confidence,
        });

        if let Err(e) = execution_log::insert_log(
            self.database.pool(),
            Some(&request.user_id),
            AUDIT_FUNCTION_NAME,
            &input,
            &output,
            true,
            started.elapsed().as_millis() as i64,
        )
        .await
        {
            warn!(error = %e, "Failed to write prediction audit row");
        }
    }
}

/// Pure scoring step.
pub fn score(
    request: &PredictionRequest,
    user_type: Option<String>,
    previous_engagement: Option<f64>,
) -> PredictionOutcome {
    let current = request.current_message.as_str();
    let user_turns: Vec<&str> = request
        .conversation_history
        .iter()
        .filter(|turn| turn.is_user())
        .map(|turn| turn.content.as_str())
        .chain(std::iter::once(current))
        .collect();

    let sentiment = sentiment(current);
    let question_count = user_turns.iter().filter(|text| text.contains('?')).count();
    let objection_count: usize = user_turns
        .iter()
        .map(|text| count_hits(text, OBJECTION_WORDS))
        .sum();

    let stage = classify_stage(request, question_count, objection_count);

    let raw = BASE_ENGAGEMENT + SENTIMENT_WEIGHT * sentiment
        + QUESTION_WEIGHT * question_count.min(MAX_COUNTED) as f64
        - OBJECTION_WEIGHT * objection_count.min(MAX_COUNTED) as f64;
    let mut engagement = raw.clamp(0.05, 0.95);
    if let Some(previous) = previous_engagement {
        engagement = (engagement + previous) / 2.0;
    }

    let history_len = request.conversation_history.len();
    let confidence = (0.4
        + 0.05 * history_len.min(6) as f64
        + if previous_engagement.is_some() { 0.1 } else { 0.0 }
        + 0.1 * sentiment.abs())
    .clamp(0.1, 0.9);

    let (likely_responses, likely_objections, recommended_approach) =
        guidance(stage, user_type.as_deref());

    PredictionOutcome {
        predictions: Prediction {
            likely_responses,
            likely_objections,
            recommended_approach,
            engagement_probability: engagement,
            conversation_stage: stage,
            sentiment,
            confidence,
        },
        patterns: BehaviorPatterns {
            question_count,
            objection_count,
            message_count: history_len + 1,
            user_type,
            previous_engagement,
        },
    }
}

fn classify_stage(
    request: &PredictionRequest,
    question_count: usize,
    objection_count: usize,
) -> ConversationStage {
    let current = request.current_message.as_str();

    if request.conversation_history.is_empty() {
        ConversationStage::Discovery
    } else if contains_any(current, INTENT_WORDS) {
        ConversationStage::Intent
    } else if contains_any(current, PRICE_WORDS) || objection_count > 0 {
        ConversationStage::Consideration
    } else if question_count >= 2 || contains_any(current, INTEREST_WORDS) {
        ConversationStage::Interest
    } else {
        ConversationStage::Awareness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> HistoryTurn {
        HistoryTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    fn request(message: &str, history: Vec<HistoryTurn>) -> PredictionRequest {
        PredictionRequest {
            user_id: "user-1".to_string(),
            current_message: message.to_string(),
            conversation_history: history,
            user_context: None,
        }
    }

    async fn engine() -> PredictiveEngine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        PredictiveEngine::new(db)
    }

    #[test]
    fn test_first_message_is_discovery() {
        let outcome = score(&request("I want to book a ride", vec![]), None, None);
        assert_eq!(outcome.predictions.conversation_stage, ConversationStage::Discovery);
        assert_eq!(outcome.patterns.message_count, 1);
    }

    #[test]
    fn test_stage_order() {
        let history = vec![turn("user", "hi"), turn("assistant", "hello")];

        let stage = |message: &str| {
            score(&request(message, history.clone()), None, None)
                .predictions
                .conversation_stage
        };

        assert_eq!(stage("I want to book now"), ConversationStage::Intent);
        assert_eq!(stage("how much is it"), ConversationStage::Consideration);
        assert_eq!(stage("I'm busy today"), ConversationStage::Consideration);
        assert_eq!(stage("tell me more"), ConversationStage::Interest);
        assert_eq!(stage("alright"), ConversationStage::Awareness);
    }

    #[test]
    fn test_questions_counted_over_user_turns() {
        let history = vec![
            turn("user", "what is this?"),
            turn("assistant", "Can I help?"),
            turn("user", "where are you?"),
        ];
        let outcome = score(&request("ok", history), None, None);

        assert_eq!(outcome.patterns.question_count, 2);
        assert_eq!(outcome.predictions.conversation_stage, ConversationStage::Interest);
    }

    #[test]
    fn test_engagement_formula() {
        let history = vec![turn("user", "is it available?")];
        // sentiment +0.1 (thanks), 2 questions, 0 objections
        let outcome = score(&request("thanks, when?", history), None, None);
        let expected = 0.5 + 0.2 * 0.1 + 0.05 * 2.0;
        assert!((outcome.predictions.engagement_probability - expected).abs() < 1e-9);

        let averaged = score(&request("thanks, when?", vec![turn("user", "is it available?")]), None, Some(0.2));
        assert!((averaged.predictions.engagement_probability - (expected + 0.2) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_engagement_is_clamped() {
        let history = vec![
            turn("user", "no no not difficult expensive busy"),
            turn("user", "cannot"),
        ];
        let outcome = score(&request("no, this is bad and terrible", history), None, None);
        assert_eq!(outcome.predictions.engagement_probability, 0.05);
        assert!(outcome.predictions.confidence <= 0.9);
    }

    #[tokio::test]
    async fn test_predict_stores_and_averages_score() {
        let engine = engine().await;
        let req = PredictionRequest {
            user_context: Some(UserContext {
                user_type: Some("vendor".to_string()),
            }),
            ..request("hello", vec![turn("user", "hi")])
        };

        let first = engine.predict(&req).await.unwrap();
        assert_eq!(first.patterns.previous_engagement, None);
        assert_eq!(first.predictions.likely_responses[0], "Asks about listing products");

        let second = engine
            .predict(&request("hello", vec![turn("user", "hi")]))
            .await
            .unwrap();
        assert_eq!(
            second.patterns.previous_engagement,
            Some(first.predictions.engagement_probability)
        );
        // Stored tag is used when the request has none.
        assert_eq!(second.patterns.user_type.as_deref(), Some("vendor"));

        let stored = behavior::get_score(engine.database.pool(), "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.engagement_score, second.predictions.engagement_probability);
        assert_eq!(stored.user_type.as_deref(), Some("vendor"));
    }

    #[tokio::test]
    async fn test_blank_user_is_rejected() {
        let engine = engine().await;
        let mut req = request("hello", vec![]);
        req.user_id = " ".to_string();

        assert!(matches!(
            engine.predict(&req).await,
            Err(PredictionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_degraded_prediction() {
        let outcome = PredictionOutcome::degraded();
        assert_eq!(outcome.predictions.engagement_probability, 0.5);
        assert_eq!(outcome.predictions.conversation_stage, ConversationStage::Awareness);
    }
}
