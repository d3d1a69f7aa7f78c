//! Urgency scorer implementations.
//!
//! [`OpenAiScorer`] calls an OpenAI-compatible chat-completions endpoint
//! and expects a small JSON object back. [`HeuristicScorer`] is the
//! offline default: a keyword table, good enough for demos and tests.
//! Either way the engine treats scoring as best-effort — any failure here
//! falls back to the default priority.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use grievance::{Category, ScorerError, UrgencyAssessment, UrgencyScorer};

use crate::config::ScorerConfig;

const SYSTEM_PROMPT: &str = "You are triaging citizen grievances for a village governance portal. \
Rate the grievance and reply with only a JSON object: \
{\"sentiment\": \"negative|neutral|positive\", \"urgency_score\": <0.0-1.0>, \
\"recommended_actions\": [\"...\"]}";

/// Urgency scorer backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiScorer {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiScorer {
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl UrgencyScorer for OpenAiScorer {
    async fn score(
        &self,
        title: &str,
        description: &str,
        category: Category,
    ) -> Result<UrgencyAssessment, ScorerError> {
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Category: {category}\nTitle: {title}\n\n{description}"),
                },
            ],
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ScorerError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| ScorerError::Request(e.to_string()))?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScorerError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ScorerError::Malformed("empty choices".to_string()))?;

        debug!(content, "Scorer response received");
        parse_assessment(content)
    }
}

/// Parse the model's reply, tolerating markdown code fences.
fn parse_assessment(content: &str) -> Result<UrgencyAssessment, ScorerError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let assessment: UrgencyAssessment =
        serde_json::from_str(trimmed).map_err(|e| ScorerError::Malformed(e.to_string()))?;
    Ok(assessment.clamped())
}

/// Keywords that signal a public-safety emergency.
const URGENT_KEYWORDS: [&str; 10] = [
    "death", "injury", "accident", "collapse", "fire", "flood", "epidemic", "contaminated",
    "unsafe", "danger",
];

/// Offline keyword scorer. Deterministic and dependency-free; the default
/// when no endpoint is configured.
pub struct HeuristicScorer;

#[async_trait]
impl UrgencyScorer for HeuristicScorer {
    async fn score(
        &self,
        title: &str,
        description: &str,
        category: Category,
    ) -> Result<UrgencyAssessment, ScorerError> {
        let text = format!("{title} {description}").to_lowercase();

        let base = match category {
            Category::Corruption => 0.45,
            Category::Infrastructure | Category::PublicServices => 0.40,
            Category::WelfareSchemes | Category::Administration => 0.35,
            Category::Other => 0.30,
        };

        let hits = URGENT_KEYWORDS
            .iter()
            .filter(|kw| text.contains(**kw))
            .count() as f64;

        let score = (base + hits * 0.15).clamp(0.0, 1.0);
        let sentiment = if score > 0.6 { "negative" } else { "neutral" };

        Ok(UrgencyAssessment {
            sentiment: sentiment.to_string(),
            urgency_score: score,
            recommended_actions: Vec::new(),
        })
    }
}
