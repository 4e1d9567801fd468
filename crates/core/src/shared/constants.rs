use std::time::Duration;

/// Dimensionality of a face feature vector.
pub const FEATURE_DIM: usize = 512;

/// Maximum length of an enrolled name, in bytes.
pub const NAME_MAX_LEN: usize = 64;

/// Default number of face record slots in the feature table.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Prefix for synthesized names of anonymous registrations.
pub const DEFAULT_NAME_PREFIX: &str = "user_";

/// Minimum detection confidence for a face to enter the pipeline.
pub const MIN_DETECT_SCORE: f32 = 0.9;

/// Stricter confidence required to enroll a new face.
pub const REGISTER_SCORE: f32 = 0.9999;

/// Minimum liveness score for a real (non-spoof) face.
pub const REAL_SCORE: f32 = 0.9;

/// Similarity threshold for a feature search to count as a match.
pub const MATCH_THRESHOLD: f32 = 0.7;

/// Matches against an already-enrolled face tolerated during a
/// registration session before it aborts as "already registered".
pub const REGISTER_ATTEMPTS: u32 = 5;

/// Worker iterations before a registration or deletion session times out.
pub const SESSION_TIMEOUT_TICKS: u32 = 100;

/// Quiet interval after which a held track id is dropped, forcing
/// re-evaluation of a still-visible face.
pub const RETRACK_INTERVAL: Duration = Duration::from_secs(1);

/// Bounded wait for the liveness stream to produce a frame.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(1);

/// Width frames are normalized to before analysis.
pub const ANALYSIS_WIDTH: u32 = 640;

/// A qualifying face must be at least `frame_width / MIN_FACE_DIVISOR` wide.
pub const MIN_FACE_DIVISOR: i32 = 5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
