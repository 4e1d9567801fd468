use std::sync::Arc;

use crate::display::notifier::SessionEvent;
use crate::recognition::domain::enrollment::{self, EnrollError};
use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_store::{FeatureStore, StoreError};
use crate::recognition::domain::feature_table::{display_name, FeatureTable};
use crate::recognition::domain::perception_engine::{EngineError, SearchHit};
use crate::session::coordinator::{AnalysisFrame, Shared};
use crate::session::session_control::{SessionMode, SessionRequest};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// The consumer side of the coordinator: one thread that owns the
/// feature table and the store, takes one frame per gate delivery, and
/// drives the session state machine.
pub(super) struct SessionWorker {
    shared: Arc<Shared>,
    table: FeatureTable,
    store: Box<dyn FeatureStore>,
    mode: SessionMode,
}

impl SessionWorker {
    pub(super) fn new(
        shared: Arc<Shared>,
        table: FeatureTable,
        store: Box<dyn FeatureStore>,
    ) -> Self {
        Self {
            shared,
            table,
            store,
            mode: SessionMode::Idle,
        }
    }

    pub(super) fn run(mut self) {
        self.shared.frame_gate.arm();
        while self.shared.frame_gate.wait(&self.shared.running) {
            self.iterate();
            self.shared.frame_gate.arm();
        }
        log::debug!("session worker stopping");
    }

    /// One delivery: pick up a pending session request, advance the
    /// session clock, and analyze the delivered frame.
    fn iterate(&mut self) {
        self.apply_pending_request();
        self.tick_session();
        let Some(analysis) = self.shared.main_slot.try_take() else {
            return;
        };
        self.analyze(analysis);
    }

    fn apply_pending_request(&mut self) {
        let Some(request) = self.shared.control.take_pending() else {
            return;
        };
        match request {
            SessionRequest::Register => {
                if self.table.is_full() {
                    log::warn!(
                        "registration refused, table holds {} records",
                        self.table.capacity()
                    );
                    self.shared.notifier.play(SessionEvent::RegisterLimit);
                    self.end_session();
                    return;
                }
                self.mode = SessionMode::Registering {
                    attempts: 0,
                    ticks: 0,
                };
                self.shared.control.set_session_active(true);
                self.shared.track_guard.clear();
                self.shared.notifier.play(SessionEvent::RegisterStart);
                log::info!("registration session started");
            }
            SessionRequest::Delete => {
                self.mode = SessionMode::Deleting { ticks: 0 };
                self.shared.control.set_session_active(true);
                self.shared.track_guard.clear();
                self.shared.notifier.play(SessionEvent::DeleteStart);
                log::info!("deletion session started");
            }
        }
    }

    fn tick_session(&mut self) {
        let limit = self.shared.config.session_timeout_ticks;
        let timed_out = match &mut self.mode {
            SessionMode::Idle => return,
            SessionMode::Registering { ticks, .. } | SessionMode::Deleting { ticks } => {
                *ticks += 1;
                *ticks > limit
            }
        };
        if timed_out {
            let event = match self.mode {
                SessionMode::Registering { .. } => SessionEvent::RegisterTimeout,
                _ => SessionEvent::DeleteTimeout,
            };
            log::info!("session timed out after {limit} ticks");
            self.shared.notifier.play(event);
            self.end_session();
        }
    }

    fn end_session(&mut self) {
        self.mode = SessionMode::Idle;
        self.shared.control.set_session_active(false);
    }

    fn analyze(&mut self, analysis: AnalysisFrame) {
        let AnalysisFrame { frame, face } = analysis;
        let (feature, hit) = self.recognize(&frame, &face);

        let mut confirmed = false;
        match (self.mode, &hit) {
            (SessionMode::Registering { .. }, Some(hit)) => self.note_repeat_match(hit),
            (SessionMode::Registering { .. }, None) => self.try_enroll(&face, feature.as_ref()),
            (SessionMode::Deleting { .. }, Some(hit)) => self.delete_match(&hit.name),
            (_, Some(hit)) => confirmed = self.announce(hit),
            (_, None) => self.shared.presenter.show_name(None, false),
        }

        if !confirmed {
            // not a confirmed sighting: the same face must be
            // re-analyzed and re-announced next time it qualifies
            self.shared.last_announced.lock().unwrap().take();
            self.shared.track_guard.clear();
        }
    }

    fn recognize(&mut self, frame: &Frame, face: &Detection) -> (Option<Feature>, Option<SearchHit>) {
        let mut engine = self.shared.engine.lock().unwrap();
        let feature = match engine.extract_feature(frame, face) {
            Ok(feature) => feature,
            Err(EngineError::LowQuality) => return (None, None),
            Err(err) => {
                log::warn!("feature extraction failed: {err}");
                return (None, None);
            }
        };
        let hit = match engine.search(&feature, self.shared.config.match_threshold) {
            Ok(hit) => Some(hit),
            Err(EngineError::NoMatch) => None,
            Err(err) => {
                log::warn!("feature search failed: {err}");
                None
            }
        };
        (Some(feature), hit)
    }

    /// A face matched mid-registration: it is already enrolled. A few
    /// repeats are tolerated before the session is abandoned, so one
    /// borderline match does not cancel an enrollment.
    fn note_repeat_match(&mut self, hit: &SearchHit) {
        let SessionMode::Registering { attempts, ticks } = self.mode else {
            return;
        };
        let attempts = attempts + 1;
        if attempts > self.shared.config.register_attempts {
            log::info!("{:?} is already registered", hit.name);
            self.shared
                .presenter
                .show_name(Some(display_name(&hit.name)), false);
            self.shared.notifier.play(SessionEvent::AlreadyRegistered);
            self.end_session();
        } else {
            self.mode = SessionMode::Registering { attempts, ticks };
        }
    }

    fn try_enroll(&mut self, face: &Detection, feature: Option<&Feature>) {
        let Some(feature) = feature else {
            return;
        };
        if face.score < self.shared.config.register_score {
            return;
        }
        let index = match self.store.next_free_index(&self.shared.config.name_prefix) {
            Ok(index) => index,
            Err(err) => {
                log::error!("could not synthesize a registration name: {err}");
                return;
            }
        };
        let name = format!("{}{index}", self.shared.config.name_prefix);

        let mut engine = self.shared.engine.lock().unwrap();
        match enrollment::register(
            &mut self.table,
            self.store.as_mut(),
            engine.as_mut(),
            &name,
            feature,
        ) {
            Ok(_) => {
                drop(engine);
                self.shared.presenter.show_name(Some(&name), false);
                self.shared.notifier.play(SessionEvent::RegisterSuccess);
                self.end_session();
            }
            Err(EnrollError::Store(StoreError::Duplicate(_))) => {
                // the index was taken between synthesis and insert;
                // the next frame retries with a fresh index
                log::debug!("name {name:?} was taken, retrying");
            }
            Err(err) => {
                // transient store failure: keep the session open so
                // the next frame can retry until the timeout
                log::error!("registration of {name:?} failed: {err}");
            }
        }
    }

    fn delete_match(&mut self, name: &str) {
        let mut engine = self.shared.engine.lock().unwrap();
        match enrollment::remove(&mut self.table, self.store.as_mut(), engine.as_mut(), name) {
            Ok(_removed) => {
                drop(engine);
                self.shared.presenter.show_name(None, false);
                self.shared.notifier.play(SessionEvent::DeleteSuccess);
                self.end_session();
            }
            Err(err) => {
                log::error!("deletion of {name:?} failed: {err}");
            }
        }
    }

    /// Idle-mode recognition: show the match, confirm it on the
    /// liveness stream, and cue "proceed" once per continuous
    /// confirmed sighting.
    fn announce(&mut self, hit: &SearchHit) -> bool {
        let live = self.confirm_liveness();
        self.shared
            .presenter
            .show_name(Some(display_name(&hit.name)), live);
        if !live {
            log::debug!("{:?} matched but liveness not confirmed", hit.name);
            return false;
        }
        let mut last = self.shared.last_announced.lock().unwrap();
        if last.as_deref() != Some(hit.name.as_str()) {
            *last = Some(hit.name.clone());
            drop(last);
            log::info!("{:?} confirmed (similarity {:.3})", hit.name, hit.similarity);
            self.shared.notifier.play(SessionEvent::Proceed);
        }
        true
    }

    /// The liveness handshake: wait briefly for the liveness stream,
    /// then require a qualifying face with a real-face score on its
    /// latest frame. Absence of the stream means no confirmation.
    fn confirm_liveness(&mut self) -> bool {
        if !self
            .shared
            .liveness_gate
            .wait_for(self.shared.config.liveness_timeout)
        {
            log::debug!("liveness stream produced no frame in time");
            return false;
        }
        let Some(frame) = self.shared.liveness_slot.try_take() else {
            return false;
        };
        let mut engine = self.shared.engine.lock().unwrap();
        let faces = match engine.detect(&frame) {
            Ok(faces) => faces,
            Err(err) => {
                log::warn!("liveness detection failed: {err}");
                return false;
            }
        };
        let qualifying: Vec<Detection> = faces
            .into_iter()
            .filter(|f| {
                f.score >= self.shared.config.detect_score
                    && f.is_well_bounded(frame.width(), frame.height())
            })
            .collect();
        let Some(face) = Detection::best_face(&qualifying) else {
            return false;
        };
        match engine.check_liveness(&frame, face) {
            Ok(score) => score >= self.shared.config.real_score,
            Err(EngineError::LowQuality) => false,
            Err(err) => {
                log::warn!("liveness check failed: {err}");
                false
            }
        }
    }
}
