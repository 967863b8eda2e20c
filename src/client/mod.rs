//! Remote service boundary
//!
//! The coordinator talks to the lookup and scoring services only through
//! these traits. `http` holds the reqwest implementations used in production;
//! tests supply in-process fakes.

pub mod http;

use async_trait::async_trait;

use crate::error::{ScoreError, SearchError};
use crate::model::{Candidate, RiskAssessment};

pub use http::{HttpLookupClient, HttpScoringClient};

/// Free-text candidate lookup
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Return candidates for `query` in service-determined order (possibly empty)
    async fn lookup(&self, query: &str) -> Result<Vec<Candidate>, SearchError>;
}

/// Risk assessment retrieval
#[async_trait]
pub trait ScoringService: Send + Sync {
    /// Return the assessment for one candidate identifier
    async fn assess(&self, candidate_id: &str) -> Result<RiskAssessment, ScoreError>;
}
