use std::sync::Mutex;

/// A mode change asked for from outside the worker (key press, CLI
/// flag, admin surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequest {
    Register,
    Delete,
}

/// What the worker is currently doing with incoming faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    Registering { attempts: u32, ticks: u32 },
    Deleting { ticks: u32 },
}

impl SessionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionMode::Idle)
    }
}

#[derive(Default)]
struct ControlState {
    pending: Option<SessionRequest>,
    session_active: bool,
}

/// Thread-safe mailbox for session requests.
///
/// Holds at most one pending request; a newer request overwrites the
/// older one, so asking for deletion while a registration request sits
/// unconsumed leaves only the deletion. `session_active` mirrors
/// whether the worker is currently inside a session, so producers can
/// tell that frames must not be de-duplicated.
pub struct SessionControl {
    state: Mutex<ControlState>,
}

impl SessionControl {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ControlState::default()),
        }
    }

    pub fn request_register(&self) {
        self.state.lock().unwrap().pending = Some(SessionRequest::Register);
    }

    pub fn request_delete(&self) {
        self.state.lock().unwrap().pending = Some(SessionRequest::Delete);
    }

    /// Worker side: consumes the pending request, if any.
    pub fn take_pending(&self) -> Option<SessionRequest> {
        self.state.lock().unwrap().pending.take()
    }

    pub fn set_session_active(&self, active: bool) {
        self.state.lock().unwrap().session_active = active;
    }

    /// True while a request is queued or a session is running.
    pub fn session_pending(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.pending.is_some() || state.session_active
    }
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_pending_consumes() {
        let control = SessionControl::new();
        assert_eq!(control.take_pending(), None);
        control.request_register();
        assert_eq!(control.take_pending(), Some(SessionRequest::Register));
        assert_eq!(control.take_pending(), None);
    }

    #[test]
    fn test_latest_request_wins() {
        let control = SessionControl::new();
        control.request_register();
        control.request_delete();
        assert_eq!(control.take_pending(), Some(SessionRequest::Delete));
        assert_eq!(control.take_pending(), None);

        control.request_delete();
        control.request_register();
        assert_eq!(control.take_pending(), Some(SessionRequest::Register));
    }

    #[test]
    fn test_session_pending_tracks_request_and_active() {
        let control = SessionControl::new();
        assert!(!control.session_pending());

        control.request_register();
        assert!(control.session_pending());

        control.take_pending();
        assert!(!control.session_pending());

        control.set_session_active(true);
        assert!(control.session_pending());
        control.set_session_active(false);
        assert!(!control.session_pending());
    }
}
