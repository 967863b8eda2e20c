//! Request generation tracking
//!
//! Every lookup cycle (and, with a separate tracker, every score fetch) begins
//! a new generation. A response may only be applied if its generation is still
//! current; anything older is dropped without touching state. This replaces
//! per-request cancellation with a single comparison and works no matter in
//! which order responses arrive, or whether they arrive at all.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic token identifying one request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Issues generations and answers whether one is still current.
///
/// Cloning shares the counter, so a token handed to a spawned task observes
/// generations begun after it was issued.
#[derive(Debug, Clone, Default)]
pub struct GenerationTracker {
    current: Arc<AtomicU64>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; all previously issued ones become stale
    pub fn begin(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Start a new generation and wrap it in a token for in-flight work
    pub fn begin_token(&self) -> RequestToken {
        let generation = self.begin();
        RequestToken {
            generation,
            tracker: self.clone(),
        }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::Acquire) == generation.0
    }

    /// Latest issued generation, if any
    pub fn current(&self) -> Option<Generation> {
        match self.current.load(Ordering::Acquire) {
            0 => None,
            n => Some(Generation(n)),
        }
    }

    /// Invalidate everything in flight without starting a request
    pub fn invalidate(&self) {
        self.begin();
    }
}

/// Handle carried by an in-flight request
#[derive(Debug, Clone)]
pub struct RequestToken {
    generation: Generation,
    tracker: GenerationTracker,
}

impl RequestToken {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether a result produced under this token may still be applied
    pub fn is_live(&self) -> bool {
        self.tracker.is_current(self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_strictly_increase() {
        let tracker = GenerationTracker::new();
        let g1 = tracker.begin();
        let g2 = tracker.begin();
        let g3 = tracker.begin();
        assert!(g1 < g2 && g2 < g3);
    }

    #[test]
    fn test_new_generation_supersedes_old() {
        let tracker = GenerationTracker::new();
        assert!(tracker.current().is_none());

        let g1 = tracker.begin();
        assert!(tracker.is_current(g1));

        let g2 = tracker.begin();
        assert!(!tracker.is_current(g1));
        assert!(tracker.is_current(g2));
        assert_eq!(tracker.current(), Some(g2));
    }

    #[test]
    fn test_token_sees_later_generations_through_clone() {
        let tracker = GenerationTracker::new();
        let token = tracker.begin_token();
        let shared = tracker.clone();
        assert!(token.is_live());

        shared.begin();
        assert!(!token.is_live());
    }

    #[test]
    fn test_invalidate_kills_live_tokens() {
        let tracker = GenerationTracker::new();
        let token = tracker.begin_token();
        tracker.invalidate();
        assert!(!token.is_live());
    }

    #[test]
    fn test_separate_trackers_are_independent() {
        let lookups = GenerationTracker::new();
        let scores = GenerationTracker::new();
        let lookup = lookups.begin();
        scores.begin();
        scores.begin();
        assert!(lookups.is_current(lookup));
    }
}
