//! Risk Lookup - debounced entity search with risk assessment retrieval
//!
//! The crate turns raw keystrokes into a single well-ordered sequence of
//! lookup requests, tolerates superseded and out-of-order responses, and keeps
//! the highlighted / selected candidate consistent with keyboard input and an
//! external deep-link identifier.
//!
//! ## Call Chain
//!
//! ```text
//! queryChanged ──► DebounceScheduler ──► LookupOrchestrator ──► SelectionMachine
//!                   (350ms)               exact → fallback        highlight / commit
//!                                         (GenerationTracker)            │
//!                                                                        ▼
//! deep link ─────────────────────────────────────────────────► ScoreOrchestrator
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use risk_lookup::{
//!     Coordinator, HttpLookupClient, HttpScoringClient, LookupConfig, MemoryDeepLink,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = LookupConfig::default();
//! let lookup = Arc::new(HttpLookupClient::new(&config)?);
//! let scoring = Arc::new(HttpScoringClient::new(&config)?);
//! let handle = Coordinator::spawn(&config, lookup, scoring, Arc::new(MemoryDeepLink::default()));
//!
//! handle.query_changed("coffee");
//! if let Some(view) = handle.wait_for(|v| !v.candidates.is_empty()).await {
//!     println!("{} candidates", view.candidates.len());
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Configuration
pub mod config;

// Shared data model
pub mod model;

// Coordinator building blocks
pub mod debounce;
pub mod generation;
pub mod normalize;

// Orchestrators and selection
pub mod lookup;
pub mod score;
pub mod selection;

// External collaborators
pub mod client;
pub mod deep_link;

// Event loop wiring everything together
pub mod coordinator;

pub use client::{HttpLookupClient, HttpScoringClient, LookupService, ScoringService};
pub use config::LookupConfig;
pub use coordinator::{Coordinator, CoordinatorHandle, Intent};
pub use deep_link::{DeepLinkStore, MemoryDeepLink, UrlDeepLink};
pub use error::{ConfigError, ScoreError, SearchError};
pub use generation::{Generation, GenerationTracker, RequestToken};
pub use lookup::{LookupOrchestrator, LookupOutcome, SearchResult};
pub use model::{Candidate, CoordinatorView, NormalizedQuery, RiskAssessment, RiskBand};
pub use normalize::normalize;
pub use score::{ScoreOrchestrator, ScoreOutcome};
pub use selection::{CommitTarget, Direction, Phase, SelectionMachine};
