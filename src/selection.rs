//! Selection state machine
//!
//! Owns the candidate list, the highlighted index and the selected candidate.
//!
//! ```text
//!            candidates            commit / deep link          assessment
//!   Idle ─────────────► Browsing ─────────────────► Scoring ─────────────► Scored
//!    ▲                                                 ▲                      │
//!    │                                                 └──── commit ──────────┘
//!    └──────────────────────── reset (from any state) ───────────────────────
//! ```
//!
//! A new candidate list never clears an existing selection; the previous
//! selection persists until the user commits another one.

use serde::Serialize;

use crate::model::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    /// No candidates, no selection
    #[default]
    Idle,
    /// Candidate list present
    Browsing,
    /// A candidate is selected and its assessment is in flight
    Scoring,
    /// Assessment available or failed
    Scored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What a commit intent refers to
#[derive(Debug, Clone, PartialEq)]
pub enum CommitTarget {
    /// Whatever is highlighted (confirm key)
    Highlighted,
    /// A position in the current list (click)
    Index(usize),
    /// An explicit candidate (click on a rendered item)
    Candidate(Candidate),
}

#[derive(Debug, Default)]
pub struct SelectionMachine {
    candidates: Vec<Candidate>,
    highlighted: Option<usize>,
    selected: Option<Candidate>,
    phase: Phase,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn selected(&self) -> Option<&Candidate> {
        self.selected.as_ref()
    }

    /// Replace the candidate list wholesale.
    ///
    /// Highlight resets to the first entry (or none). A provisional selection
    /// whose id appears in the new list picks up the real display fields.
    pub fn apply_candidates(&mut self, candidates: Vec<Candidate>) {
        self.highlighted = if candidates.is_empty() { None } else { Some(0) };

        if let Some(selected) = self.selected.as_mut().filter(|s| s.provisional) {
            if let Some(found) = candidates.iter().find(|c| c.id == selected.id) {
                *selected = found.clone();
            }
        }

        self.candidates = candidates;

        if matches!(self.phase, Phase::Idle | Phase::Browsing) {
            self.phase = if self.candidates.is_empty() {
                Phase::Idle
            } else {
                Phase::Browsing
            };
        }
    }

    /// Move the highlight with wraparound. No-op on an empty list.
    pub fn move_highlight(&mut self, direction: Direction) -> Option<usize> {
        let len = self.candidates.len();
        if len == 0 {
            return None;
        }

        let next = match (self.highlighted, direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => len - 1,
            (Some(i), Direction::Next) => (i + 1) % len,
            (Some(i), Direction::Previous) => (i + len - 1) % len,
        };
        self.highlighted = Some(next);
        self.highlighted
    }

    /// Select a candidate and enter `Scoring`.
    ///
    /// Returns the selected candidate, or `None` (state untouched) when the
    /// target does not resolve to one.
    pub fn commit(&mut self, target: CommitTarget) -> Option<Candidate> {
        let candidate = match target {
            CommitTarget::Highlighted => self
                .highlighted
                .and_then(|i| self.candidates.get(i))
                .cloned()?,
            CommitTarget::Index(i) => {
                let candidate = self.candidates.get(i).cloned()?;
                self.highlighted = Some(i);
                candidate
            }
            CommitTarget::Candidate(candidate) => {
                if let Some(i) = self.candidates.iter().position(|c| c.id == candidate.id) {
                    self.highlighted = Some(i);
                }
                candidate
            }
        };

        self.selected = Some(candidate.clone());
        self.phase = Phase::Scoring;
        Some(candidate)
    }

    /// Select a placeholder built from an external identifier and enter `Scoring`
    pub fn init_deep_link(&mut self, id: &str) -> Candidate {
        let candidate = Candidate::provisional(id);
        self.selected = Some(candidate.clone());
        self.phase = Phase::Scoring;
        candidate
    }

    /// The in-flight assessment resolved (successfully or not)
    pub fn finish_scoring(&mut self) {
        if self.phase == Phase::Scoring {
            self.phase = Phase::Scored;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
