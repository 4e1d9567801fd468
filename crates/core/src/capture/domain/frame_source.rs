use std::sync::Arc;

use crate::shared::frame::Frame;

/// Consumer side of a capture stream.
///
/// The coordinator hands one sink per stream to its frame sources;
/// sinks must tolerate being called after shutdown (frames are simply
/// dropped).
pub trait FrameSink: Send + Sync {
    fn publish(&self, frame: Frame);
}

/// A hardware or replayed camera stream.
///
/// Implementations deliver ready-to-analyze RGB frames to the injected
/// sink from their own thread. `stop` must not return while the source
/// can still publish.
pub trait FrameSource {
    fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<(), Box<dyn std::error::Error>>;
    fn stop(&mut self);
}
