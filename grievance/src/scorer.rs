//! Urgency-scoring seam.
//!
//! The external AI collaborator rates a grievance's urgency in `[0, 1]`.
//! Scoring may fail; the engine then falls back to a default priority
//! rather than blocking submission.

use async_trait::async_trait;

use crate::model::Category;

/// Error type for urgency scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("scorer request failed: {0}")]
    Request(String),

    #[error("scorer returned malformed output: {0}")]
    Malformed(String),
}

/// Structured output of an urgency analysis.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UrgencyAssessment {
    pub sentiment: String,
    pub urgency_score: f64,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

impl UrgencyAssessment {
    /// Clamp the urgency score into `[0, 1]`.
    pub fn clamped(mut self) -> Self {
        self.urgency_score = self.urgency_score.clamp(0.0, 1.0);
        self
    }
}

/// Rates the urgency of a grievance based on its text and category.
#[async_trait]
pub trait UrgencyScorer: Send + Sync {
    async fn score(
        &self,
        title: &str,
        description: &str,
        category: Category,
    ) -> Result<UrgencyAssessment, ScorerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        let high = UrgencyAssessment {
            sentiment: "negative".into(),
            urgency_score: 1.7,
            recommended_actions: vec![],
        };
        assert_eq!(high.clamped().urgency_score, 1.0);

        let low = UrgencyAssessment {
            sentiment: "neutral".into(),
            urgency_score: -0.2,
            recommended_actions: vec![],
        };
        assert_eq!(low.clamped().urgency_score, 0.0);
    }
}
