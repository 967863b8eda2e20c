//! Lookup orchestrator
//!
//! Runs the two-step search protocol for one generation:
//!
//! 1. Queries below the minimum length short-circuit to an empty list.
//! 2. The exact (trimmed) query is sent.
//! 3. A non-empty exact result is final.
//! 4. An empty exact result is retried with the normalized query, but only
//!    when normalization actually changes the text.
//! 5. A non-empty fallback result carries a "did you mean" suggestion.
//!
//! The generation is checked after every suspension point. Once it is no
//! longer current the routine stops and reports `Stale`, even if the request
//! itself failed; a superseded search never surfaces an error.

use std::sync::Arc;

use crate::client::LookupService;
use crate::error::SearchError;
use crate::generation::{Generation, GenerationTracker, RequestToken};
use crate::model::{Candidate, NormalizedQuery};
use crate::normalize::normalize;

/// Candidates for one generation, ready to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub generation: Generation,
    pub query: String,
    pub candidates: Vec<Candidate>,
    /// Set when the candidates came from the normalized query
    pub fallback: Option<NormalizedQuery>,
}

impl SearchResult {
    fn empty(generation: Generation, query: &str) -> Self {
        Self {
            generation,
            query: query.to_string(),
            candidates: Vec::new(),
            fallback: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Ready(SearchResult),
    /// Superseded by a newer generation; discard silently
    Stale,
}

#[derive(Clone)]
pub struct LookupOrchestrator {
    service: Arc<dyn LookupService>,
    tracker: GenerationTracker,
    min_query_chars: usize,
}

impl LookupOrchestrator {
    pub fn new(service: Arc<dyn LookupService>, min_query_chars: usize) -> Self {
        Self {
            service,
            tracker: GenerationTracker::new(),
            min_query_chars,
        }
    }

    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    /// Whether `query` has enough non-whitespace characters to hit the service
    pub fn is_searchable(&self, query: &str) -> bool {
        query.chars().filter(|c| !c.is_whitespace()).count() >= self.min_query_chars
    }

    /// Begin a new generation and run the search under it
    pub async fn search(&self, query: &str) -> Result<LookupOutcome, SearchError> {
        let token = self.tracker.begin_token();
        self.run(token, query).await
    }

    /// Run the search under an already-issued token.
    ///
    /// The exact request carries the query with surrounding whitespace
    /// trimmed, and the fallback is skipped when normalization yields that
    /// same trimmed text. `SearchResult::query` keeps the text as typed.
    pub async fn run(&self, token: RequestToken, query: &str) -> Result<LookupOutcome, SearchError> {
        let generation = token.generation();

        if !self.is_searchable(query) {
            tracing::debug!(%generation, "Query below minimum length, skipping lookup");
            return Ok(LookupOutcome::Ready(SearchResult::empty(generation, query)));
        }

        let exact_query = query.trim();
        let exact = match self.service.lookup(exact_query).await {
            Ok(candidates) => candidates,
            Err(_) if !token.is_live() => return Ok(self.stale(generation, "exact")),
            Err(e) => {
                tracing::warn!(%generation, query = %exact_query, error = %e, "Lookup failed");
                return Err(e);
            }
        };
        if !token.is_live() {
            return Ok(self.stale(generation, "exact"));
        }

        if !exact.is_empty() {
            tracing::debug!(%generation, count = exact.len(), "Exact lookup matched");
            return Ok(LookupOutcome::Ready(SearchResult {
                generation,
                query: query.to_string(),
                candidates: exact,
                fallback: None,
            }));
        }

        let normalized = normalize(query);
        if normalized.is_empty() || normalized.as_str() == exact_query {
            tracing::debug!(%generation, "No matches and no distinct fallback query");
            return Ok(LookupOutcome::Ready(SearchResult::empty(generation, query)));
        }

        tracing::debug!(%generation, fallback = %normalized, "Exact lookup empty, trying fallback");
        let fallback = match self.service.lookup(normalized.as_str()).await {
            Ok(candidates) => candidates,
            Err(_) if !token.is_live() => return Ok(self.stale(generation, "fallback")),
            Err(e) => {
                // The exact query's empty answer stands
                tracing::warn!(%generation, fallback = %normalized, error = %e, "Fallback lookup failed");
                Vec::new()
            }
        };
        if !token.is_live() {
            return Ok(self.stale(generation, "fallback"));
        }

        let used_fallback = (!fallback.is_empty()).then_some(normalized);
        Ok(LookupOutcome::Ready(SearchResult {
            generation,
            query: query.to_string(),
            candidates: fallback,
            fallback: used_fallback,
        }))
    }

    fn stale(&self, generation: Generation, step: &'static str) -> LookupOutcome {
        tracing::debug!(%generation, step, "Discarding superseded lookup response");
        LookupOutcome::Stale
    }
}
