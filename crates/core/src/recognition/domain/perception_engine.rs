use thiserror::Error;

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_table::FaceRecord;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Expected outcome: the face crop is unusable for extraction.
    #[error("face quality too low for feature extraction")]
    LowQuality,
    /// Expected outcome: no enrolled identity cleared the threshold.
    #[error("no enrolled face matched")]
    NoMatch,
    #[error("perception engine failure: {0}")]
    Backend(String),
}

/// Best match returned by a feature search against the current index.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub name: String,
    pub similarity: f32,
}

/// Vendor perception capability behind one seam: detection, tracking,
/// feature extraction, identity search, and liveness scoring.
///
/// The engine owns its search index; the index is only ever replaced
/// wholesale via `release_index` + `build_index` from a feature-table
/// snapshot, never mutated incrementally. Implementations may be
/// stateful (tracking across frames), hence `&mut self`.
pub trait PerceptionEngine: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, EngineError>;

    /// Associates detections with track ids across consecutive frames
    /// of the same stream.
    fn track(
        &mut self,
        frame: &Frame,
        detections: Vec<Detection>,
    ) -> Result<Vec<Detection>, EngineError>;

    fn extract_feature(&mut self, frame: &Frame, face: &Detection)
        -> Result<Feature, EngineError>;

    /// Searches the current index; fails with [`EngineError::NoMatch`]
    /// when no record reaches `threshold`.
    fn search(&mut self, feature: &Feature, threshold: f32) -> Result<SearchHit, EngineError>;

    fn build_index(&mut self, records: &[FaceRecord]) -> Result<(), EngineError>;

    fn release_index(&mut self);

    /// Real-vs-spoof score in `[0, 1]` for a face on the liveness
    /// stream.
    fn check_liveness(&mut self, frame: &Frame, face: &Detection) -> Result<f32, EngineError>;
}
