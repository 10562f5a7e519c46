//! In-flight operation tracking for the two loading indicators.
//!
//! Neither widget knows bytes or steps; display state derives solely from
//! what is currently in flight.  A request that never completes leaves its
//! token in the set and the bar stays up — there are no timeouts anywhere.

use std::collections::HashSet;

/// The thin fetch bar: counts concurrent operations by opaque token.
/// Progress is a "still working" signal, not a real percentage — more
/// in-flight work shows as a shorter bar.
#[derive(Debug, Default)]
pub struct LoadingTracker {
    inflight: HashSet<u64>,
}

impl LoadingTracker {
    /// Register a new operation and return its token.
    pub fn begin(&mut self) -> u64 {
        let mut token: u64 = rand::random();
        while !self.inflight.insert(token) {
            token = rand::random();
        }
        token
    }

    /// Unregister a finished operation.  Unknown tokens are ignored.
    pub fn finish(&mut self, token: u64) {
        self.inflight.remove(&token);
    }

    pub fn is_visible(&self) -> bool {
        !self.inflight.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    /// Shown percentage: 100 when idle, otherwise `max(30, 100 - 20·n)`.
    pub fn progress(&self) -> u8 {
        let n = self.inflight.len() as i32;
        if n == 0 {
            100
        } else {
            (100 - n * 20).max(30) as u8
        }
    }
}

/// Phase of the background-update overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Episodes,
    Descriptions,
}

/// The phased status overlay: episode and description fetch counts plus an
/// error tally, shown while a podcast update runs in the background.
#[derive(Debug, Default)]
pub struct UpdateStatus {
    pub phase: UpdatePhase,
    pub total: usize,
    pub loaded: usize,
    pub errors: usize,
    pub last_error: Option<String>,
}

impl UpdateStatus {
    pub fn start_episodes(&mut self, total: usize) {
        self.reset();
        self.phase = UpdatePhase::Episodes;
        self.total = total;
    }

    pub fn episodes_progress(&mut self, loaded: usize) {
        self.loaded = loaded;
    }

    pub fn start_descriptions(&mut self, total: usize) {
        self.phase = UpdatePhase::Descriptions;
        self.total = total;
        self.loaded = 0;
    }

    pub fn descriptions_progress(&mut self, loaded: usize) {
        self.loaded = loaded;
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.last_error = Some(message.into());
    }

    pub fn finish(&mut self) {
        self.reset();
    }

    pub fn is_active(&self) -> bool {
        self.phase != UpdatePhase::Idle
    }

    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.loaded * 100) / self.total).min(100) as u8
        }
    }

    pub fn message(&self) -> &'static str {
        match self.phase {
            UpdatePhase::Idle => "",
            UpdatePhase::Episodes => "Fetching episodes…",
            UpdatePhase::Descriptions => "Fetching descriptions…",
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_tracker_is_hidden_at_full_progress() {
        let tracker = LoadingTracker::default();
        assert!(!tracker.is_visible());
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn progress_drops_with_concurrency_and_floors_at_30() {
        let mut tracker = LoadingTracker::default();
        let a = tracker.begin();
        assert_eq!(tracker.progress(), 80);
        let b = tracker.begin();
        assert_eq!(tracker.progress(), 60);
        let more: Vec<u64> = (0..4).map(|_| tracker.begin()).collect();
        assert_eq!(tracker.progress(), 30);

        tracker.finish(b);
        assert_eq!(tracker.progress(), 30);
        for t in more {
            tracker.finish(t);
        }
        assert_eq!(tracker.progress(), 80);
        tracker.finish(a);
        assert!(!tracker.is_visible());
        assert_eq!(tracker.progress(), 100);
    }

    #[test]
    fn finishing_an_unknown_token_is_harmless() {
        let mut tracker = LoadingTracker::default();
        let t = tracker.begin();
        tracker.finish(t ^ 1);
        assert_eq!(tracker.in_flight(), 1);
        tracker.finish(t);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn trackers_are_independent() {
        let mut fetch = LoadingTracker::default();
        let mut other = LoadingTracker::default();
        fetch.begin();
        assert!(fetch.is_visible());
        assert!(!other.is_visible());
        other.begin();
        other.begin();
        assert_eq!(fetch.progress(), 80);
        assert_eq!(other.progress(), 60);
    }

    #[test]
    fn update_status_phases() {
        let mut status = UpdateStatus::default();
        assert!(!status.is_active());

        status.start_episodes(4);
        assert!(status.is_active());
        assert_eq!(status.progress_percent(), 0);
        status.episodes_progress(2);
        assert_eq!(status.progress_percent(), 50);

        status.start_descriptions(1);
        assert_eq!(status.phase, UpdatePhase::Descriptions);
        assert_eq!(status.progress_percent(), 0);
        status.descriptions_progress(1);
        assert_eq!(status.progress_percent(), 100);

        status.add_error("description fetch failed");
        assert_eq!(status.errors, 1);

        status.finish();
        assert!(!status.is_active());
        assert_eq!(status.errors, 0);
    }
}
