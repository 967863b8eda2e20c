//! Shared fakes for coordinator integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use risk_lookup::{
    Candidate, Coordinator, CoordinatorHandle, CoordinatorView, DeepLinkStore, LookupConfig,
    LookupService, MemoryDeepLink, RiskAssessment, ScoreError, ScoringService, SearchError,
};

/// `n` candidates with ids `{prefix}-{i}` (lowercased) and names `{prefix} {i}`
pub fn places(prefix: &str, n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            Candidate::new(
                format!("{}-{i}", prefix.to_lowercase()),
                format!("{prefix} {i}"),
                format!("{} Main St", i + 1),
                "Brooklyn",
            )
        })
        .collect()
}

// =============================================================================
// LOOKUP
// =============================================================================

#[derive(Default)]
pub struct FakeLookup {
    replies: Mutex<HashMap<String, Result<Vec<Candidate>, u16>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeLookup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, query: &str, candidates: Vec<Candidate>) {
        self.replies
            .lock()
            .unwrap()
            .insert(query.to_string(), Ok(candidates));
    }

    pub fn fail(&self, query: &str, status: u16) {
        self.replies
            .lock()
            .unwrap()
            .insert(query.to_string(), Err(status));
    }

    /// Hold responses for `query` until the returned gate is notified
    pub fn gate(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(query.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LookupService for FakeLookup {
    async fn lookup(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());
        let gate = self.gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().unwrap().get(query).cloned();
        match reply {
            Some(Ok(candidates)) => Ok(candidates),
            Some(Err(status)) => Err(SearchError::Status {
                status,
                body: "lookup unavailable".into(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// SCORING
// =============================================================================

#[derive(Default)]
pub struct FakeScoring {
    probabilities: Mutex<HashMap<String, f64>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeScoring {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, id: &str, probability: f64) {
        self.probabilities
            .lock()
            .unwrap()
            .insert(id.to_string(), probability);
    }

    pub fn gate(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(id.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoringService for FakeScoring {
    async fn assess(&self, candidate_id: &str) -> Result<RiskAssessment, ScoreError> {
        self.calls.lock().unwrap().push(candidate_id.to_string());
        let gate = self.gates.lock().unwrap().get(candidate_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let probability = self.probabilities.lock().unwrap().get(candidate_id).copied();
        match probability {
            Some(p) => Ok(RiskAssessment::new(candidate_id, p)),
            None => Err(ScoreError::Status {
                status: 404,
                body: "unknown subject".into(),
            }),
        }
    }
}

// =============================================================================
// DEEP LINK
// =============================================================================

/// In-memory deep link that also logs every write; `None` records a clear
#[derive(Default)]
pub struct RecordingDeepLink {
    inner: MemoryDeepLink,
    writes: Mutex<Vec<Option<String>>>,
}

impl RecordingDeepLink {
    pub fn with_id(id: &str) -> Self {
        Self {
            inner: MemoryDeepLink::with_id(id),
            writes: Mutex::default(),
        }
    }

    pub fn writes(&self) -> Vec<Option<String>> {
        self.writes.lock().unwrap().clone()
    }
}

impl DeepLinkStore for RecordingDeepLink {
    fn read(&self) -> Option<String> {
        self.inner.read()
    }

    fn replace(&self, id: &str) {
        self.inner.replace(id);
        self.writes.lock().unwrap().push(Some(id.to_string()));
    }

    fn clear(&self) {
        self.inner.clear();
        self.writes.lock().unwrap().push(None);
    }
}

// =============================================================================
// HARNESS
// =============================================================================

pub fn spawn(
    lookup: &Arc<FakeLookup>,
    scoring: &Arc<FakeScoring>,
    deep_link: &Arc<RecordingDeepLink>,
) -> CoordinatorHandle {
    spawn_with_link(lookup, scoring, deep_link.clone())
}

pub fn spawn_with_link(
    lookup: &Arc<FakeLookup>,
    scoring: &Arc<FakeScoring>,
    deep_link: Arc<dyn DeepLinkStore>,
) -> CoordinatorHandle {
    Coordinator::spawn(
        &LookupConfig::default(),
        lookup.clone(),
        scoring.clone(),
        deep_link,
    )
}

/// Wait for a view matching `predicate`, failing instead of hanging
pub async fn wait_until(
    handle: &CoordinatorHandle,
    predicate: impl FnMut(&CoordinatorView) -> bool,
) -> CoordinatorView {
    tokio::time::timeout(Duration::from_secs(5), handle.wait_for(predicate))
        .await
        .expect("timed out waiting for view")
        .expect("coordinator stopped")
}

/// Let debounce windows and in-flight work run out
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}
