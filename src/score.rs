//! Score orchestrator
//!
//! Fetches the risk assessment for one candidate. Each fetch begins a new
//! generation on a counter dedicated to scoring, so the most recently
//! initiated fetch wins regardless of response order, and lookup activity
//! never invalidates an assessment in flight.

use std::sync::Arc;

use crate::client::ScoringService;
use crate::error::ScoreError;
use crate::generation::{GenerationTracker, RequestToken};
use crate::model::RiskAssessment;

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Ready(RiskAssessment),
    /// A newer fetch was initiated; discard silently
    Stale,
}

#[derive(Clone)]
pub struct ScoreOrchestrator {
    service: Arc<dyn ScoringService>,
    tracker: GenerationTracker,
}

impl ScoreOrchestrator {
    pub fn new(service: Arc<dyn ScoringService>) -> Self {
        Self {
            service,
            tracker: GenerationTracker::new(),
        }
    }

    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    /// Begin a new score generation and fetch under it
    pub async fn fetch_assessment(&self, candidate_id: &str) -> Result<ScoreOutcome, ScoreError> {
        let token = self.tracker.begin_token();
        self.run(token, candidate_id).await
    }

    /// Fetch under an already-issued token
    pub async fn run(
        &self,
        token: RequestToken,
        candidate_id: &str,
    ) -> Result<ScoreOutcome, ScoreError> {
        let generation = token.generation();
        let result = self.service.assess(candidate_id).await;

        if !token.is_live() {
            tracing::debug!(%generation, candidate_id, "Discarding superseded assessment");
            return Ok(ScoreOutcome::Stale);
        }

        let assessment = result.map_err(|e| {
            tracing::warn!(%generation, candidate_id, error = %e, "Scoring failed");
            e
        })?;

        if assessment.subject_id != candidate_id {
            return Err(ScoreError::SubjectMismatch {
                expected: candidate_id.to_string(),
                received: assessment.subject_id,
            });
        }

        tracing::debug!(
            %generation,
            candidate_id,
            probability = assessment.probability_of_adverse_outcome,
            "Assessment received"
        );
        Ok(ScoreOutcome::Ready(assessment))
    }
}
