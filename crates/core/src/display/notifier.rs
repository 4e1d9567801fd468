/// Audible session events.
///
/// The fixed vocabulary of cues the coordinator can emit; what sound
/// (if any) each maps to is the notifier's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Welcome,
    RegisterStart,
    RegisterSuccess,
    RegisterTimeout,
    RegisterLimit,
    AlreadyRegistered,
    DeleteStart,
    DeleteSuccess,
    DeleteTimeout,
    AuthorizeFail,
    Proceed,
}

/// Audio cue sink. Called from the worker thread (and once from
/// startup), so implementations must be thread-safe and must not
/// block for long.
pub trait Notifier: Send + Sync {
    fn play(&self, event: SessionEvent);
}

/// Discards all cues.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn play(&self, _event: SessionEvent) {}
}

/// Logs cues instead of playing audio, for headless runs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn play(&self, event: SessionEvent) {
        log::info!("cue: {event:?}");
    }
}
