//! Query coordinator
//!
//! One tokio task owns all coordinator state. User intents and completions of
//! spawned work (debounce firings, lookups, score fetches) arrive on a single
//! channel and are handled strictly in order, so no two mutations ever race.
//!
//! ```text
//!  CoordinatorHandle ──Intent──┐
//!  DebounceScheduler ──Fired───┼──► mpsc ──► Coordinator::handle ──► watch<CoordinatorView>
//!  lookup / score tasks ──Done─┘                  │
//!                                                 └── generation check before applying
//! ```
//!
//! Starting a new lookup or score fetch aborts the previous task (advisory),
//! but correctness rests on the generation check: a completion whose
//! generation is no longer current is dropped without touching state.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::client::{LookupService, ScoringService};
use crate::config::LookupConfig;
use crate::debounce::{DebounceScheduler, Ticket};
use crate::deep_link::DeepLinkStore;
use crate::error::{ScoreError, SearchError};
use crate::generation::Generation;
use crate::lookup::{LookupOrchestrator, LookupOutcome};
use crate::model::{CoordinatorView, NormalizedQuery, RiskAssessment};
use crate::score::{ScoreOrchestrator, ScoreOutcome};
use crate::selection::{CommitTarget, Direction, SelectionMachine};

/// User intents accepted from presentation
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    QueryChanged(String),
    MoveHighlight(Direction),
    Commit(CommitTarget),
    Reset,
}

enum Event {
    Intent(Intent),
    DebounceFired(Ticket),
    LookupFinished {
        generation: Generation,
        result: Result<LookupOutcome, SearchError>,
    },
    ScoreFinished {
        generation: Generation,
        result: Result<ScoreOutcome, ScoreError>,
    },
    Shutdown,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Presentation-side handle to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<Event>,
    view: watch::Receiver<CoordinatorView>,
}

impl CoordinatorHandle {
    /// Queue an intent. Returns false once the coordinator has stopped.
    pub fn send(&self, intent: Intent) -> bool {
        self.events.send(Event::Intent(intent)).is_ok()
    }

    pub fn query_changed(&self, text: impl Into<String>) -> bool {
        self.send(Intent::QueryChanged(text.into()))
    }

    pub fn move_highlight(&self, direction: Direction) -> bool {
        self.send(Intent::MoveHighlight(direction))
    }

    pub fn commit(&self, target: CommitTarget) -> bool {
        self.send(Intent::Commit(target))
    }

    pub fn reset(&self) -> bool {
        self.send(Intent::Reset)
    }

    /// Latest published view
    pub fn view(&self) -> CoordinatorView {
        self.view.borrow().clone()
    }

    /// Receiver notified whenever the view changes
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorView> {
        self.view.clone()
    }

    /// Wait until the view satisfies `predicate`; `None` if the coordinator stops first
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&CoordinatorView) -> bool,
    ) -> Option<CoordinatorView> {
        let mut rx = self.view.clone();
        let view = rx.wait_for(|v| predicate(v)).await.ok().map(|v| (*v).clone());
        view
    }

    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    /// Stop the coordinator, cancelling any pending debounce and in-flight requests
    pub async fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
        self.events.closed().await;
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct Coordinator {
    lookup: LookupOrchestrator,
    score: ScoreOrchestrator,
    deep_link: Arc<dyn DeepLinkStore>,
    selection: SelectionMachine,
    debounce: DebounceScheduler,
    query: String,
    searching: bool,
    search_error: Option<String>,
    assessment: Option<RiskAssessment>,
    score_error: Option<String>,
    fallback: Option<NormalizedQuery>,
    lookup_task: Option<JoinHandle<()>>,
    score_task: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<Event>,
    view: watch::Sender<CoordinatorView>,
}

impl Coordinator {
    /// Start the coordinator task and return a handle to it.
    ///
    /// If the deep-link store holds an identifier, the provisional selection
    /// and its score fetch are set up before any intent is processed.
    pub fn spawn(
        config: &LookupConfig,
        lookup: Arc<dyn LookupService>,
        scoring: Arc<dyn ScoringService>,
        deep_link: Arc<dyn DeepLinkStore>,
    ) -> CoordinatorHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(CoordinatorView::default());

        let coordinator = Self::new(config, lookup, scoring, deep_link, events_tx.clone(), view_tx);
        tokio::spawn(coordinator.run(events_rx));

        CoordinatorHandle {
            events: events_tx,
            view: view_rx,
        }
    }

    fn new(
        config: &LookupConfig,
        lookup: Arc<dyn LookupService>,
        scoring: Arc<dyn ScoringService>,
        deep_link: Arc<dyn DeepLinkStore>,
        events: mpsc::UnboundedSender<Event>,
        view: watch::Sender<CoordinatorView>,
    ) -> Self {
        Self {
            lookup: LookupOrchestrator::new(lookup, config.min_query_chars),
            score: ScoreOrchestrator::new(scoring),
            deep_link,
            selection: SelectionMachine::new(),
            debounce: DebounceScheduler::new(config.debounce()),
            query: String::new(),
            searching: false,
            search_error: None,
            assessment: None,
            score_error: None,
            fallback: None,
            lookup_task: None,
            score_task: None,
            events,
            view,
        }
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        tracing::info!("Coordinator started");
        self.init_from_deep_link();
        self.publish();

        loop {
            let event = tokio::select! {
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = self.view.closed() => {
                    tracing::debug!("All coordinator handles dropped");
                    break;
                }
            };
            if !self.handle(event) {
                break;
            }
        }

        self.teardown();
        tracing::info!("Coordinator stopped");
    }

    /// Apply one event. Returns false when the loop should stop.
    fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::Intent(intent) => self.on_intent(intent),
            Event::DebounceFired(ticket) => self.on_debounce_fired(ticket),
            Event::LookupFinished { generation, result } => {
                self.on_lookup_finished(generation, result)
            }
            Event::ScoreFinished { generation, result } => self.on_score_finished(generation, result),
            Event::Shutdown => return false,
        }
        self.publish();
        true
    }

    fn on_intent(&mut self, intent: Intent) {
        match intent {
            Intent::QueryChanged(text) => self.on_query_changed(text),
            Intent::MoveHighlight(direction) => {
                self.selection.move_highlight(direction);
            }
            Intent::Commit(target) => self.on_commit(target),
            Intent::Reset => self.on_reset(),
        }
    }

    fn on_query_changed(&mut self, text: String) {
        self.query = text;
        let events = self.events.clone();
        self.debounce.schedule_with(move |ticket| async move {
            let _ = events.send(Event::DebounceFired(ticket));
        });
    }

    fn on_debounce_fired(&mut self, ticket: Ticket) {
        if !self.debounce.acknowledge(ticket) {
            tracing::debug!(ticket, "Ignoring superseded debounce firing");
            return;
        }
        let query = self.query.clone();
        self.start_lookup(query);
    }

    fn start_lookup(&mut self, query: String) {
        let token = self.lookup.tracker().begin_token();
        let generation = token.generation();
        if let Some(task) = self.lookup_task.take() {
            task.abort();
        }

        tracing::debug!(%generation, query = %query, "Starting lookup");
        self.searching = self.lookup.is_searchable(&query);

        let orchestrator = self.lookup.clone();
        let events = self.events.clone();
        self.lookup_task = Some(tokio::spawn(async move {
            let result = orchestrator.run(token, &query).await;
            let _ = events.send(Event::LookupFinished { generation, result });
        }));
    }

    fn on_lookup_finished(
        &mut self,
        generation: Generation,
        result: Result<LookupOutcome, SearchError>,
    ) {
        if !self.lookup.tracker().is_current(generation) {
            tracing::debug!(%generation, "Discarding superseded lookup completion");
            return;
        }
        self.lookup_task = None;
        self.searching = false;

        match result {
            Ok(LookupOutcome::Ready(result)) => {
                tracing::debug!(
                    %generation,
                    count = result.candidates.len(),
                    fallback = result.fallback.is_some(),
                    "Applying lookup result"
                );
                self.selection.apply_candidates(result.candidates);
                self.fallback = result.fallback;
                self.search_error = None;
            }
            Ok(LookupOutcome::Stale) => {}
            Err(e) => {
                tracing::warn!(%generation, error = %e, "Search failed");
                self.search_error = Some(e.to_string());
            }
        }
    }

    fn on_commit(&mut self, target: CommitTarget) {
        let previous = self.selection.selected().map(|c| c.id.clone());
        let Some(candidate) = self.selection.commit(target) else {
            tracing::debug!("Commit ignored: nothing to select");
            return;
        };

        if previous.as_deref() != Some(candidate.id.as_str()) {
            self.deep_link.replace(&candidate.id);
        }
        tracing::info!(candidate_id = %candidate.id, name = %candidate.label(), "Candidate selected");
        self.start_score(candidate.id);
    }

    fn start_score(&mut self, candidate_id: String) {
        let token = self.score.tracker().begin_token();
        let generation = token.generation();
        if let Some(task) = self.score_task.take() {
            task.abort();
        }

        if self
            .assessment
            .as_ref()
            .is_some_and(|a| a.subject_id != candidate_id)
        {
            self.assessment = None;
        }
        self.score_error = None;

        let orchestrator = self.score.clone();
        let events = self.events.clone();
        self.score_task = Some(tokio::spawn(async move {
            let result = orchestrator.run(token, &candidate_id).await;
            let _ = events.send(Event::ScoreFinished { generation, result });
        }));
    }

    fn on_score_finished(
        &mut self,
        generation: Generation,
        result: Result<ScoreOutcome, ScoreError>,
    ) {
        if !self.score.tracker().is_current(generation) {
            tracing::debug!(%generation, "Discarding superseded score completion");
            return;
        }
        self.score_task = None;

        match result {
            Ok(ScoreOutcome::Ready(assessment)) => {
                self.assessment = Some(assessment);
                self.score_error = None;
            }
            Ok(ScoreOutcome::Stale) => return,
            Err(e) => {
                tracing::warn!(%generation, error = %e, "Scoring failed");
                self.score_error = Some(e.to_string());
            }
        }
        self.selection.finish_scoring();
    }

    fn on_reset(&mut self) {
        tracing::debug!("Resetting coordinator");
        self.cancel_in_flight();
        self.selection.reset();
        self.query.clear();
        self.searching = false;
        self.search_error = None;
        self.assessment = None;
        self.score_error = None;
        self.fallback = None;
        self.deep_link.clear();
    }

    fn init_from_deep_link(&mut self) {
        let Some(id) = self.deep_link.read() else {
            return;
        };
        tracing::info!(candidate_id = %id, "Initializing selection from deep link");
        // A deep link starts a new lookup cycle without issuing a lookup
        self.lookup.tracker().invalidate();
        self.selection.init_deep_link(&id);
        self.start_score(id);
    }

    fn cancel_in_flight(&mut self) {
        self.debounce.cancel();
        self.lookup.tracker().invalidate();
        self.score.tracker().invalidate();
        if let Some(task) = self.lookup_task.take() {
            task.abort();
        }
        if let Some(task) = self.score_task.take() {
            task.abort();
        }
    }

    fn teardown(&mut self) {
        self.cancel_in_flight();
    }

    fn snapshot(&self) -> CoordinatorView {
        CoordinatorView {
            query: self.query.clone(),
            candidates: self.selection.candidates().to_vec(),
            highlighted_index: self.selection.highlighted_index(),
            selected_candidate: self.selection.selected().cloned(),
            phase: self.selection.phase(),
            searching: self.searching,
            search_error: self.search_error.clone(),
            assessment: self.assessment.clone(),
            score_error: self.score_error.clone(),
            fallback_suggestion: self.fallback.clone(),
        }
    }

    /// Publish the current view; receivers are only woken when it changed
    fn publish(&self) {
        let next = self.snapshot();
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep_link::MemoryDeepLink;
    use crate::lookup::SearchResult;
    use crate::model::Candidate;
    use crate::selection::Phase;
    use async_trait::async_trait;

    struct EmptyLookup;

    #[async_trait]
    impl LookupService for EmptyLookup {
        async fn lookup(&self, _query: &str) -> Result<Vec<Candidate>, SearchError> {
            Ok(Vec::new())
        }
    }

    struct FixedScoring;

    #[async_trait]
    impl ScoringService for FixedScoring {
        async fn assess(&self, candidate_id: &str) -> Result<RiskAssessment, ScoreError> {
            Ok(RiskAssessment::new(candidate_id, 0.4))
        }
    }

    fn coordinator() -> (
        Coordinator,
        mpsc::UnboundedReceiver<Event>,
        watch::Receiver<CoordinatorView>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(CoordinatorView::default());
        let coordinator = Coordinator::new(
            &LookupConfig::default(),
            Arc::new(EmptyLookup),
            Arc::new(FixedScoring),
            Arc::new(MemoryDeepLink::default()),
            events_tx,
            view_tx,
        );
        (coordinator, events_rx, view_rx)
    }

    fn named(prefix: &str, n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(format!("{prefix}-{i}"), format!("{prefix} {i}"), "", ""))
            .collect()
    }

    fn ready(generation: Generation, query: &str, candidates: Vec<Candidate>) -> Event {
        Event::LookupFinished {
            generation,
            result: Ok(LookupOutcome::Ready(SearchResult {
                generation,
                query: query.to_string(),
                candidates,
                fallback: None,
            })),
        }
    }

    #[tokio::test]
    async fn test_late_stale_lookup_leaves_state_unchanged() {
        let (mut coord, _events, view) = coordinator();

        coord.start_lookup("coffee".into());
        let g1 = coord.lookup.tracker().current().unwrap();
        coord.start_lookup("tea".into());
        let g2 = coord.lookup.tracker().current().unwrap();

        coord.handle(ready(g2, "tea", named("tea", 2)));
        let after_g2 = view.borrow().clone();
        assert_eq!(after_g2.candidates.len(), 2);

        coord.handle(ready(g1, "coffee", named("coffee", 5)));
        assert_eq!(*view.borrow(), after_g2);
    }

    #[tokio::test]
    async fn test_stale_lookup_error_is_silent() {
        let (mut coord, _events, view) = coordinator();

        coord.start_lookup("coffee".into());
        let g1 = coord.lookup.tracker().current().unwrap();
        coord.start_lookup("tea".into());

        coord.handle(Event::LookupFinished {
            generation: g1,
            result: Err(SearchError::Decode("boom".into())),
        });
        assert!(view.borrow().search_error.is_none());
    }

    #[tokio::test]
    async fn test_late_stale_score_leaves_assessment() {
        let (mut coord, _events, view) = coordinator();
        coord.selection.apply_candidates(named("cafe", 2));

        coord.on_commit(CommitTarget::Index(0));
        let g1 = coord.score.tracker().current().unwrap();
        coord.on_commit(CommitTarget::Index(1));
        let g2 = coord.score.tracker().current().unwrap();

        coord.handle(Event::ScoreFinished {
            generation: g2,
            result: Ok(ScoreOutcome::Ready(RiskAssessment::new("cafe-1", 0.1))),
        });
        coord.handle(Event::ScoreFinished {
            generation: g1,
            result: Ok(ScoreOutcome::Ready(RiskAssessment::new("cafe-0", 0.9))),
        });

        let view = view.borrow().clone();
        assert_eq!(view.assessment.unwrap().subject_id, "cafe-1");
        assert_eq!(view.phase, Phase::Scored);
    }

    #[tokio::test]
    async fn test_search_error_does_not_clear_assessment() {
        let (mut coord, _events, view) = coordinator();
        coord.selection.apply_candidates(named("cafe", 1));
        coord.on_commit(CommitTarget::Index(0));
        let score_gen = coord.score.tracker().current().unwrap();
        coord.handle(Event::ScoreFinished {
            generation: score_gen,
            result: Ok(ScoreOutcome::Ready(RiskAssessment::new("cafe-0", 0.3))),
        });

        coord.start_lookup("broken".into());
        let lookup_gen = coord.lookup.tracker().current().unwrap();
        coord.handle(Event::LookupFinished {
            generation: lookup_gen,
            result: Err(SearchError::Status {
                status: 500,
                body: "down".into(),
            }),
        });

        let view = view.borrow().clone();
        assert!(view.search_error.is_some());
        assert!(view.assessment.is_some());
        assert_eq!(view.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_score_error_does_not_clear_candidates() {
        let (mut coord, _events, view) = coordinator();
        coord.selection.apply_candidates(named("cafe", 3));
        coord.on_commit(CommitTarget::Index(2));
        let generation = coord.score.tracker().current().unwrap();

        coord.handle(Event::ScoreFinished {
            generation,
            result: Err(ScoreError::Decode("bad payload".into())),
        });

        let view = view.borrow().clone();
        assert_eq!(view.candidates.len(), 3);
        assert!(view.score_error.is_some());
        assert_eq!(view.phase, Phase::Scored);
    }

    #[tokio::test]
    async fn test_superseded_debounce_ticket_is_ignored() {
        let (mut coord, _events, _view) = coordinator();
        coord.on_query_changed("co".into());
        coord.on_query_changed("coffee".into());

        coord.handle(Event::DebounceFired(1));
        assert!(coord.lookup.tracker().current().is_none());

        coord.handle(Event::DebounceFired(2));
        assert!(coord.lookup.tracker().current().is_some());
    }
}
