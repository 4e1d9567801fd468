use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct GateState {
    accepting: bool,
    delivered: bool,
}

/// Single-flight hand-off between the main capture producer and the
/// worker.
///
/// The worker arms the gate when it is ready for a frame and blocks in
/// `wait`; the producer checks `is_accepting` before publishing and
/// then delivers, which disarms the gate until the worker re-arms at
/// the end of its iteration. This is the back-pressure mechanism: at
/// most one frame is ever in flight through the main slot.
pub struct FrameGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl FrameGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            cond: Condvar::new(),
        }
    }

    /// Worker side: ready for the next frame.
    pub fn arm(&self) {
        self.state.lock().unwrap().accepting = true;
    }

    pub fn is_accepting(&self) -> bool {
        self.state.lock().unwrap().accepting
    }

    /// Producer side: a frame has been published into the slot.
    /// Returns `false` (frame should be dropped) when the gate is not
    /// armed.
    pub fn deliver(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.accepting {
            return false;
        }
        state.accepting = false;
        state.delivered = true;
        self.cond.notify_one();
        true
    }

    /// Worker side: blocks until a frame is delivered or `running`
    /// goes false. Returns `true` when a frame is ready; `false` means
    /// shut down without completing an iteration.
    pub fn wait(&self, running: &AtomicBool) -> bool {
        let mut state = self.state.lock().unwrap();
        loop {
            if !running.load(Ordering::SeqCst) {
                return false;
            }
            if state.delivered {
                state.delivered = false;
                return true;
            }
            state = self.cond.wait(state).unwrap();
        }
    }

    /// Unblocks a waiting worker without delivering, for shutdown.
    pub fn wake(&self) {
        let _state = self.state.lock().unwrap();
        self.cond.notify_all();
    }
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded-wait wake signal from the liveness producer to the worker.
///
/// Best effort: a signal arriving while nobody waits is remembered
/// until the next `wait_for`, but there is no delivery discipline and
/// repeated signals coalesce.
pub struct LivenessGate {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl LivenessGate {
    pub fn new() -> Self {
        Self {
            signaled: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub fn signal(&self) {
        *self.signaled.lock().unwrap() = true;
        self.cond.notify_one();
    }

    /// Waits up to `timeout` for a signal. Expiry means no liveness
    /// data is available.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock().unwrap();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, result) = self.cond.wait_timeout(signaled, deadline - now).unwrap();
            signaled = guard;
            if result.timed_out() {
                break;
            }
        }
        std::mem::take(&mut *signaled)
    }
}

impl Default for LivenessGate {
    fn default() -> Self {
        Self::new()
    }
}
