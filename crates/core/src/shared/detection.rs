use crate::shared::constants::MIN_FACE_DIVISOR;

/// A detected face: bounding box in frame coordinates, detector
/// confidence, and the track id assigned by the perception engine once
/// the detection has been associated across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub score: f32,
    pub track_id: Option<u64>,
}

impl Detection {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    /// Whether the box lies fully inside the frame and is wide enough
    /// to be worth analyzing (at least a fifth of the frame width).
    pub fn is_well_bounded(&self, frame_width: u32, frame_height: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= frame_width as i32
            && self.bottom <= frame_height as i32
            && self.width() >= frame_width as i32 / MIN_FACE_DIVISOR
    }

    /// Picks the largest detection by box area.
    pub fn best_face(detections: &[Detection]) -> Option<&Detection> {
        detections.iter().max_by_key(|d| d.area())
    }
}
