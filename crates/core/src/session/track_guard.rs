use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Outcome of presenting a tracked face to the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDecision {
    /// The face should flow through to analysis.
    Continue,
    /// Same track as the one already handled; skip it.
    Suppress,
}

struct GuardState {
    held: Option<u64>,
    last_reset: Instant,
}

/// De-duplicates analysis work for a face that keeps its track id
/// across frames.
///
/// Once a track id has been let through, subsequent frames carrying
/// the same id are suppressed until either the retrack interval
/// elapses or a session (registration or deletion) is pending, which
/// must always see fresh frames.
pub struct TrackGuard {
    retrack_interval: Duration,
    state: Mutex<GuardState>,
}

impl TrackGuard {
    pub fn new(retrack_interval: Duration) -> Self {
        Self {
            retrack_interval,
            state: Mutex::new(GuardState {
                held: None,
                last_reset: Instant::now(),
            }),
        }
    }

    /// Drops the held track id when the retrack interval has elapsed,
    /// so a lingering face is re-analysed periodically.
    pub fn expire_if_stale(&self) {
        let mut state = self.state.lock().unwrap();
        if state.last_reset.elapsed() > self.retrack_interval {
            state.held = None;
            state.last_reset = Instant::now();
        }
    }

    pub fn evaluate(&self, track_id: u64, session_pending: bool) -> TrackDecision {
        let mut state = self.state.lock().unwrap();
        if session_pending {
            // sessions sample every frame
            state.held = None;
            return TrackDecision::Continue;
        }
        if state.held == Some(track_id) {
            return TrackDecision::Suppress;
        }
        state.held = Some(track_id);
        TrackDecision::Continue
    }

    /// Forgets the held track, forcing the next frame through.
    pub fn clear(&self) {
        self.state.lock().unwrap().held = None;
    }
}
