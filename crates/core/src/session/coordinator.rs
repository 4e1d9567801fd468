use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use thiserror::Error;

use crate::capture::domain::frame_source::FrameSink;
use crate::capture::frame_slot::{FrameSlot, PublishOutcome};
use crate::display::notifier::{Notifier, SessionEvent};
use crate::display::presenter::Presenter;
use crate::recognition::domain::enrollment::rebuild_index;
use crate::recognition::domain::feature_store::FeatureStore;
use crate::recognition::domain::feature_table::{FeatureTable, TableError};
use crate::recognition::domain::perception_engine::{EngineError, PerceptionEngine};
use crate::recognition::infrastructure::preload::{enroll_directory, PreloadError};
use crate::session::gates::{FrameGate, LivenessGate};
use crate::session::session_control::SessionControl;
use crate::session::track_guard::{TrackDecision, TrackGuard};
use crate::session::worker::SessionWorker;
use crate::shared::constants::{
    DEFAULT_CAPACITY, DEFAULT_NAME_PREFIX, LIVENESS_TIMEOUT, MATCH_THRESHOLD, MIN_DETECT_SCORE,
    REAL_SCORE, REGISTER_ATTEMPTS, REGISTER_SCORE, RETRACK_INTERVAL, SESSION_TIMEOUT_TICKS,
};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Preload(#[from] PreloadError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to spawn session worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Tunables for a coordinator instance. `Default` carries the
/// production thresholds.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub capacity: usize,
    pub name_prefix: String,
    pub detect_score: f32,
    pub register_score: f32,
    pub real_score: f32,
    pub match_threshold: f32,
    pub register_attempts: u32,
    pub session_timeout_ticks: u32,
    pub retrack_interval: Duration,
    pub liveness_timeout: Duration,
    /// Directory of reference images enrolled at startup, if any.
    pub preload_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            detect_score: MIN_DETECT_SCORE,
            register_score: REGISTER_SCORE,
            real_score: REAL_SCORE,
            match_threshold: MATCH_THRESHOLD,
            register_attempts: REGISTER_ATTEMPTS,
            session_timeout_ticks: SESSION_TIMEOUT_TICKS,
            retrack_interval: RETRACK_INTERVAL,
            liveness_timeout: LIVENESS_TIMEOUT,
            preload_dir: None,
        }
    }
}

/// A main-stream frame paired with the face chosen for analysis.
pub(super) struct AnalysisFrame {
    pub(super) frame: Frame,
    pub(super) face: Detection,
}

/// Fate of a main-stream frame at ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum IngestOutcome {
    ShuttingDown,
    NoFace,
    Suppressed,
    Busy,
    Queued,
}

/// State shared between the capture producers, the worker thread, and
/// the coordinator handle.
pub(super) struct Shared {
    pub(super) config: CoordinatorConfig,
    pub(super) running: AtomicBool,
    pub(super) engine: Mutex<Box<dyn PerceptionEngine>>,
    pub(super) control: SessionControl,
    pub(super) track_guard: TrackGuard,
    pub(super) frame_gate: FrameGate,
    pub(super) liveness_gate: LivenessGate,
    pub(super) main_slot: FrameSlot<AnalysisFrame>,
    pub(super) liveness_slot: FrameSlot<Frame>,
    pub(super) presenter: Arc<dyn Presenter>,
    pub(super) notifier: Arc<dyn Notifier>,
    /// Identity announced by the last confirmed recognition; cleared
    /// whenever the face leaves or fails liveness so a returning face
    /// is greeted again.
    pub(super) last_announced: Mutex<Option<String>>,
}

impl Shared {
    pub(super) fn new(
        config: CoordinatorConfig,
        engine: Box<dyn PerceptionEngine>,
        presenter: Arc<dyn Presenter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let retrack_interval = config.retrack_interval;
        Self {
            config,
            running: AtomicBool::new(true),
            engine: Mutex::new(engine),
            control: SessionControl::new(),
            track_guard: TrackGuard::new(retrack_interval),
            frame_gate: FrameGate::new(),
            liveness_gate: LivenessGate::new(),
            main_slot: FrameSlot::new(),
            liveness_slot: FrameSlot::new(),
            presenter,
            notifier,
            last_announced: Mutex::new(None),
        }
    }

    /// Main-stream producer path: detect and track on the producer
    /// thread, keep the overlay current, and hand at most one frame at
    /// a time to the worker.
    pub(super) fn ingest_main(&self, frame: Frame) -> IngestOutcome {
        if !self.running.load(Ordering::SeqCst) {
            return IngestOutcome::ShuttingDown;
        }
        self.track_guard.expire_if_stale();

        let faces = {
            let mut engine = self.engine.lock().unwrap();
            match engine
                .detect(&frame)
                .and_then(|detections| engine.track(&frame, detections))
            {
                Ok(faces) => faces,
                Err(err) => {
                    log::warn!("main stream detection failed: {err}");
                    return IngestOutcome::NoFace;
                }
            }
        };

        let qualifying: Vec<Detection> = faces
            .into_iter()
            .filter(|f| {
                f.score >= self.config.detect_score
                    && f.is_well_bounded(frame.width(), frame.height())
            })
            .collect();
        let Some(face) = Detection::best_face(&qualifying).copied() else {
            self.presenter.show_box(0, 0, 0, 0);
            // face left the frame: the next confirmed sighting
            // re-announces
            self.last_announced.lock().unwrap().take();
            return IngestOutcome::NoFace;
        };
        self.presenter
            .show_box(face.left, face.top, face.right, face.bottom);

        if let Some(track_id) = face.track_id {
            if self.track_guard.evaluate(track_id, self.control.session_pending())
                == TrackDecision::Suppress
            {
                return IngestOutcome::Suppressed;
            }
        }

        if !self.frame_gate.is_accepting() {
            return IngestOutcome::Busy;
        }
        self.main_slot.try_publish(AnalysisFrame { frame, face });
        self.frame_gate.deliver();
        IngestOutcome::Queued
    }

    /// Liveness-stream producer path: stash the latest frame and nudge
    /// a worker waiting on the handshake.
    pub(super) fn ingest_liveness(&self, frame: Frame) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if self.liveness_slot.try_publish(frame) == PublishOutcome::Stored {
            self.liveness_gate.signal();
        }
    }
}

struct MainSink {
    shared: Arc<Shared>,
}

impl FrameSink for MainSink {
    fn publish(&self, frame: Frame) {
        self.shared.ingest_main(frame);
    }
}

struct LivenessSink {
    shared: Arc<Shared>,
}

impl FrameSink for LivenessSink {
    fn publish(&self, frame: Frame) {
        self.shared.ingest_liveness(frame);
    }
}

/// Owning handle for a live identification session.
///
/// `start` loads the enrolled table, builds the engine index, and
/// spawns the worker thread; the handle then accepts frames through
/// its sinks and session requests through `request_register` /
/// `request_delete`. Dropping the handle shuts the session down.
pub struct FaceCoordinator {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FaceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceCoordinator").finish_non_exhaustive()
    }
}

impl FaceCoordinator {
    pub fn start(
        mut engine: Box<dyn PerceptionEngine>,
        mut store: Box<dyn FeatureStore>,
        presenter: Arc<dyn Presenter>,
        notifier: Arc<dyn Notifier>,
        config: CoordinatorConfig,
    ) -> Result<Self, StartupError> {
        let mut table = FeatureTable::load(store.as_ref(), config.capacity)?;
        if let Some(dir) = &config.preload_dir {
            let enrolled = enroll_directory(dir, engine.as_mut(), store.as_mut(), &mut table)?;
            if enrolled > 0 {
                log::info!("preloaded {enrolled} reference faces from {}", dir.display());
            }
        }
        if let Err(err) = rebuild_index(engine.as_mut(), &table) {
            notifier.play(SessionEvent::AuthorizeFail);
            return Err(err.into());
        }
        log::info!("coordinator starting with {} enrolled faces", table.len());
        notifier.play(SessionEvent::Welcome);

        let shared = Arc::new(Shared::new(config, engine, presenter, notifier));
        let worker = SessionWorker::new(shared.clone(), table, store);
        let handle = std::thread::Builder::new()
            .name("facegate-worker".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            shared,
            worker: Some(handle),
        })
    }

    /// Sink for the main (recognition) stream.
    pub fn main_sink(&self) -> Arc<dyn FrameSink> {
        Arc::new(MainSink {
            shared: self.shared.clone(),
        })
    }

    /// Sink for the liveness stream.
    pub fn liveness_sink(&self) -> Arc<dyn FrameSink> {
        Arc::new(LivenessSink {
            shared: self.shared.clone(),
        })
    }

    /// Asks the worker to enroll the next suitable unknown face.
    pub fn request_register(&self) {
        self.shared.control.request_register();
    }

    /// Asks the worker to delete the next recognized face.
    pub fn request_delete(&self) {
        self.shared.control.request_delete();
    }

    /// Stops the worker and releases the engine index. Safe to call
    /// more than once; frames arriving afterwards are dropped.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.frame_gate.wake();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("session worker panicked");
            }
            if let Ok(mut engine) = self.shared.engine.lock() {
                engine.release_index();
            }
            log::info!("coordinator stopped");
        }
    }
}

impl Drop for FaceCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
