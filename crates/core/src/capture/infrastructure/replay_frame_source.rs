use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{FrameSink, FrameSource};
use crate::shared::constants::{ANALYSIS_WIDTH, IMAGE_EXTENSIONS};
use crate::shared::frame::Frame;

/// Replays image files from a directory as a camera stream.
///
/// Files are delivered in sorted order at a fixed interval, resized to
/// the analysis width with aspect ratio preserved, so the coordinator
/// sees the same frame geometry a live capture source would produce.
/// With `looped` set the directory is replayed until `stop`.
pub struct ReplayFrameSource {
    dir: PathBuf,
    interval: Duration,
    looped: bool,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplayFrameSource {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration, looped: bool) -> Self {
        Self {
            dir: dir.into(),
            interval,
            looped,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl FrameSource for ReplayFrameSource {
    fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<(), Box<dyn std::error::Error>> {
        let files = list_image_files(&self.dir)?;
        if files.is_empty() {
            return Err(format!("no image files in {}", self.dir.display()).into());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let interval = self.interval;
        let looped = self.looped;

        self.handle = Some(std::thread::spawn(move || loop {
            for path in &files {
                if !running.load(Ordering::SeqCst) {
                    return;
                }
                match load_frame(path) {
                    Ok(frame) => sink.publish(frame),
                    Err(e) => log::warn!("skipping {}: {e}", path.display()),
                }
                std::thread::sleep(interval);
            }
            if !looped {
                return;
            }
        }));

        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplayFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn load_frame(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?;
    let scaled = if img.width() > ANALYSIS_WIDTH {
        let h = (ANALYSIS_WIDTH as u64 * img.height() as u64 / img.width() as u64).max(1) as u32;
        img.resize_exact(ANALYSIS_WIDTH, h, image::imageops::FilterType::Triangle)
    } else {
        img
    };
    let rgb = scaled.to_rgb8();
    let (width, height) = (rgb.width(), rgb.height());
    Ok(Frame::new(rgb.into_raw(), width, height, Instant::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CollectingSink {
        frames: Mutex<Vec<(u32, u32)>>,
    }

    impl FrameSink for CollectingSink {
        fn publish(&self, frame: Frame) {
            self.frames
                .lock()
                .unwrap()
                .push((frame.width(), frame.height()));
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_start_fails_on_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ReplayFrameSource::new(dir.path(), Duration::ZERO, false);
        let sink = Arc::new(CollectingSink {
            frames: Mutex::new(Vec::new()),
        });
        assert!(source.start(sink).is_err());
    }

    #[test]
    fn test_delivers_all_files_once_without_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 8, 6);
        write_png(&dir.path().join("b.png"), 8, 6);
        std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

        let sink = Arc::new(CollectingSink {
            frames: Mutex::new(Vec::new()),
        });
        let mut source = ReplayFrameSource::new(dir.path(), Duration::ZERO, false);
        source.start(sink.clone()).unwrap();
        source.handle.take().unwrap().join().unwrap();

        assert_eq!(sink.frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_oversized_frames_resized_to_analysis_width() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("big.png"), 1280, 720);

        let sink = Arc::new(CollectingSink {
            frames: Mutex::new(Vec::new()),
        });
        let mut source = ReplayFrameSource::new(dir.path(), Duration::ZERO, false);
        source.start(sink.clone()).unwrap();
        source.handle.take().unwrap().join().unwrap();

        let frames = sink.frames.lock().unwrap();
        assert_eq!(frames[0], (ANALYSIS_WIDTH, 360));
    }

    #[test]
    fn test_stop_terminates_looped_replay() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 8, 6);

        let sink = Arc::new(CollectingSink {
            frames: Mutex::new(Vec::new()),
        });
        let mut source = ReplayFrameSource::new(dir.path(), Duration::from_millis(1), true);
        source.start(sink.clone()).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        source.stop();
        assert!(!sink.frames.lock().unwrap().is_empty());
    }
}
