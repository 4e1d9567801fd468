//! Histogram-based perception engine.
//!
//! A model-free stand-in for a vendor face SDK: features are 2D
//! Hue-Saturation histograms compared with Pearson correlation, track
//! ids follow frame-to-frame histogram continuity, and the liveness
//! score is a luminance-variance heuristic (flat reproductions score
//! near zero). Suitable for replay harnesses and tests; not a real
//! detector.

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_table::FaceRecord;
use crate::recognition::domain::perception_engine::{EngineError, PerceptionEngine, SearchHit};
use crate::shared::constants::FEATURE_DIM;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

const HUE_BINS: usize = 32;
const SAT_BINS: usize = 16;

/// Histogram continuity above this keeps the previous track id.
const TRACK_CONTINUITY: f64 = 0.9;

/// Luminance standard deviation (in 8-bit levels) that maps to a
/// liveness score of 1.0.
const LIVENESS_FULL_SCALE: f64 = 50.0;

pub struct HistogramPerceptionEngine {
    index: Vec<(String, Feature)>,
    last_feature: Option<Feature>,
    last_track_id: u64,
    next_track_id: u64,
}

impl HistogramPerceptionEngine {
    pub fn new() -> Self {
        Self {
            index: Vec::new(),
            last_feature: None,
            last_track_id: 0,
            next_track_id: 0,
        }
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }
}

impl Default for HistogramPerceptionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PerceptionEngine for HistogramPerceptionEngine {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, EngineError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        // Whole-frame face: replay harnesses supply pre-cropped faces.
        Ok(vec![Detection {
            left: 0,
            top: 0,
            right: frame.width() as i32,
            bottom: frame.height() as i32,
            score: 1.0,
            track_id: None,
        }])
    }

    fn track(
        &mut self,
        frame: &Frame,
        mut detections: Vec<Detection>,
    ) -> Result<Vec<Detection>, EngineError> {
        let Some(face) = detections.first_mut() else {
            self.last_feature = None;
            return Ok(detections);
        };

        let feature = histogram_of(frame, face)?;
        let continuous = self
            .last_feature
            .as_ref()
            .is_some_and(|prev| pearson(prev.as_slice(), feature.as_slice()) >= TRACK_CONTINUITY);
        if !continuous {
            self.next_track_id += 1;
            self.last_track_id = self.next_track_id;
        }
        face.track_id = Some(self.last_track_id);
        self.last_feature = Some(feature);
        Ok(detections)
    }

    fn extract_feature(
        &mut self,
        frame: &Frame,
        face: &Detection,
    ) -> Result<Feature, EngineError> {
        histogram_of(frame, face)
    }

    fn search(&mut self, feature: &Feature, threshold: f32) -> Result<SearchHit, EngineError> {
        self.index
            .iter()
            .map(|(name, indexed)| {
                (name, pearson(indexed.as_slice(), feature.as_slice()) as f32)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, similarity)| *similarity >= threshold)
            .map(|(name, similarity)| SearchHit {
                name: name.clone(),
                similarity,
            })
            .ok_or(EngineError::NoMatch)
    }

    fn build_index(&mut self, records: &[FaceRecord]) -> Result<(), EngineError> {
        self.index = records
            .iter()
            .map(|r| (r.name().to_string(), r.feature().clone()))
            .collect();
        Ok(())
    }

    fn release_index(&mut self) {
        self.index.clear();
    }

    fn check_liveness(&mut self, frame: &Frame, face: &Detection) -> Result<f32, EngineError> {
        let (mean, count) = luminance_fold(frame, face, 0.0, |acc, y| acc + y);
        if count == 0 {
            return Err(EngineError::LowQuality);
        }
        let mean = mean / count as f64;
        let (sq_sum, _) = luminance_fold(frame, face, 0.0, |acc, y| acc + (y - mean) * (y - mean));
        let stddev = (sq_sum / count as f64).sqrt();
        Ok((stddev / LIVENESS_FULL_SCALE).min(1.0) as f32)
    }
}

/// Normalized Hue-Saturation histogram over the face box.
fn histogram_of(frame: &Frame, face: &Detection) -> Result<Feature, EngineError> {
    debug_assert_eq!(HUE_BINS * SAT_BINS, FEATURE_DIM);
    let (x0, y0, x1, y1) = clamped_box(frame, face);
    if x1 <= x0 || y1 <= y0 {
        return Err(EngineError::LowQuality);
    }

    let pixels = frame.as_ndarray();
    let mut hist = vec![0.0f32; FEATURE_DIM];
    let mut count = 0usize;
    for row in y0..y1 {
        for col in x0..x1 {
            let r = pixels[[row, col, 0]] as f64 / 255.0;
            let g = pixels[[row, col, 1]] as f64 / 255.0;
            let b = pixels[[row, col, 2]] as f64 / 255.0;
            let (h, s) = rgb_to_hs(r, g, b);
            let h_bin = ((h / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
            let s_bin = (s * SAT_BINS as f64).min(SAT_BINS as f64 - 1.0) as usize;
            hist[h_bin * SAT_BINS + s_bin] += 1.0;
            count += 1;
        }
    }

    let total = count as f32;
    for v in &mut hist {
        *v /= total;
    }
    Ok(Feature::new(hist))
}

fn clamped_box(frame: &Frame, face: &Detection) -> (usize, usize, usize, usize) {
    let x0 = face.left.max(0) as usize;
    let y0 = face.top.max(0) as usize;
    let x1 = (face.right.max(0) as usize).min(frame.width() as usize);
    let y1 = (face.bottom.max(0) as usize).min(frame.height() as usize);
    (x0, y0, x1, y1)
}

fn luminance_fold(
    frame: &Frame,
    face: &Detection,
    init: f64,
    mut fold: impl FnMut(f64, f64) -> f64,
) -> (f64, usize) {
    let (x0, y0, x1, y1) = clamped_box(frame, face);
    let pixels = frame.as_ndarray();
    let mut acc = init;
    let mut count = 0usize;
    for row in y0..y1 {
        for col in x0..x1 {
            let y = 0.299 * pixels[[row, col, 0]] as f64
                + 0.587 * pixels[[row, col, 1]] as f64
                + 0.114 * pixels[[row, col, 2]] as f64;
            acc = fold(acc, y);
            count += 1;
        }
    }
    (acc, count)
}

fn rgb_to_hs(r: f64, g: f64, b: f64) -> (f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };
    (h, s)
}

/// Pearson correlation coefficient between two equal-length vectors.
fn pearson(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::MATCH_THRESHOLD;
    use approx::assert_relative_eq;
    use std::time::Instant;

    fn solid_frame(rgb: [u8; 3], width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        Frame::new(data, width, height, Instant::now())
    }

    fn checkerboard_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height {
            for col in 0..width {
                let v = if (row + col) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        Frame::new(data, width, height, Instant::now())
    }

    fn whole_frame_face(frame: &Frame) -> Detection {
        Detection {
            left: 0,
            top: 0,
            right: frame.width() as i32,
            bottom: frame.height() as i32,
            score: 1.0,
            track_id: None,
        }
    }

    fn record_for(name: &str, frame: &Frame) -> FaceRecord {
        let mut engine = HistogramPerceptionEngine::new();
        let face = whole_frame_face(frame);
        FaceRecord::new(name, engine.extract_feature(frame, &face).unwrap()).unwrap()
    }

    #[test]
    fn test_detect_reports_one_whole_frame_face() {
        let frame = solid_frame([200, 40, 40], 16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        let faces = engine.detect(&frame).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].width(), 16);
        assert!(faces[0].score >= 1.0);
    }

    #[test]
    fn test_pearson_self_similarity() {
        let frame = solid_frame([200, 40, 40], 16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        let face = whole_frame_face(&frame);
        let f = engine.extract_feature(&frame, &face).unwrap();
        assert_relative_eq!(pearson(f.as_slice(), f.as_slice()), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_search_matches_same_appearance_rejects_different() {
        let red = solid_frame([200, 40, 40], 16, 12);
        let blue = solid_frame([40, 40, 200], 16, 12);

        let mut engine = HistogramPerceptionEngine::new();
        engine
            .build_index(&[record_for("red", &red), record_for("blue", &blue)])
            .unwrap();

        let face = whole_frame_face(&red);
        let probe = engine.extract_feature(&red, &face).unwrap();
        let hit = engine.search(&probe, MATCH_THRESHOLD).unwrap();
        assert_eq!(hit.name, "red");
        assert!(hit.similarity > 0.99);

        let green = solid_frame([40, 200, 40], 16, 12);
        let probe = engine.extract_feature(&green, &whole_frame_face(&green)).unwrap();
        assert!(matches!(
            engine.search(&probe, MATCH_THRESHOLD),
            Err(EngineError::NoMatch)
        ));
    }

    #[test]
    fn test_release_index_drops_all_identities() {
        let red = solid_frame([200, 40, 40], 16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        engine.build_index(&[record_for("red", &red)]).unwrap();
        engine.release_index();

        let probe = engine
            .extract_feature(&red, &whole_frame_face(&red))
            .unwrap();
        assert!(matches!(
            engine.search(&probe, MATCH_THRESHOLD),
            Err(EngineError::NoMatch)
        ));
    }

    #[test]
    fn test_index_rebuild_swaps_identities_atomically() {
        let red = solid_frame([200, 40, 40], 16, 12);
        let blue = solid_frame([40, 40, 200], 16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        engine
            .build_index(&[record_for("red", &red), record_for("blue", &blue)])
            .unwrap();

        // Rebuild without "red": its feature vector must no longer match
        engine.release_index();
        engine.build_index(&[record_for("blue", &blue)]).unwrap();
        let probe = engine.extract_feature(&red, &whole_frame_face(&red)).unwrap();
        assert!(matches!(
            engine.search(&probe, MATCH_THRESHOLD),
            Err(EngineError::NoMatch)
        ));
    }

    #[test]
    fn test_track_keeps_id_across_similar_frames() {
        let mut engine = HistogramPerceptionEngine::new();
        let frame = solid_frame([200, 40, 40], 16, 12);

        let a = engine.track(&frame, vec![whole_frame_face(&frame)]).unwrap();
        let b = engine.track(&frame, vec![whole_frame_face(&frame)]).unwrap();
        assert_eq!(a[0].track_id, b[0].track_id);

        let other = solid_frame([40, 40, 200], 16, 12);
        let c = engine.track(&other, vec![whole_frame_face(&other)]).unwrap();
        assert_ne!(a[0].track_id, c[0].track_id);
    }

    #[test]
    fn test_liveness_flat_frame_scores_zero() {
        let frame = solid_frame([128, 128, 128], 16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        let score = engine
            .check_liveness(&frame, &whole_frame_face(&frame))
            .unwrap();
        assert_relative_eq!(score, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_liveness_textured_frame_scores_high() {
        let frame = checkerboard_frame(16, 12);
        let mut engine = HistogramPerceptionEngine::new();
        let score = engine
            .check_liveness(&frame, &whole_frame_face(&frame))
            .unwrap();
        assert!(score >= 0.9);
    }

    #[test]
    fn test_extract_feature_rejects_degenerate_box() {
        let frame = solid_frame([1, 2, 3], 8, 8);
        let mut engine = HistogramPerceptionEngine::new();
        let degenerate = Detection {
            left: 4,
            top: 4,
            right: 4,
            bottom: 8,
            score: 1.0,
            track_id: None,
        };
        assert!(matches!(
            engine.extract_feature(&frame, &degenerate),
            Err(EngineError::LowQuality)
        ));
    }
}
