use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::recognition::domain::feature_store::{FeatureStore, StoreError};
use crate::recognition::domain::feature_table::{FaceRecord, FeatureTable, TableError};
use crate::recognition::domain::perception_engine::{EngineError, PerceptionEngine};
use crate::shared::constants::{IMAGE_EXTENSIONS, NAME_MAX_LEN};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum PreloadError {
    #[error("preload would exceed table capacity ({capacity} records)")]
    CapacityExceeded { capacity: usize },
    #[error("failed to read directory {path}: {source}")]
    Dir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Enrolls every readable reference image under `dir` (recursively).
///
/// File names serve as record names; names already present in the
/// store are skipped so re-running preload never double-enrolls.
/// Images that fail to decode or yield no usable face are skipped with
/// a warning. Running out of table capacity mid-scan is an error.
///
/// Returns the number of newly enrolled records. The caller rebuilds
/// the engine index afterwards.
pub fn enroll_directory(
    dir: &Path,
    engine: &mut dyn PerceptionEngine,
    store: &mut dyn FeatureStore,
    table: &mut FeatureTable,
) -> Result<usize, PreloadError> {
    let mut enrolled = 0;
    visit(dir, engine, store, table, &mut enrolled)?;
    Ok(enrolled)
}

fn visit(
    dir: &Path,
    engine: &mut dyn PerceptionEngine,
    store: &mut dyn FeatureStore,
    table: &mut FeatureTable,
    enrolled: &mut usize,
) -> Result<(), PreloadError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|source| PreloadError::Dir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            visit(&path, engine, store, table, enrolled)?;
            continue;
        }
        if !is_image_file(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.len() > NAME_MAX_LEN {
            log::warn!("skipping {name:?}: name exceeds {NAME_MAX_LEN} bytes");
            continue;
        }
        if store.exists(name)? {
            continue;
        }
        if table.is_full() {
            return Err(PreloadError::CapacityExceeded {
                capacity: table.capacity(),
            });
        }

        match extract_from_file(&path, engine) {
            Ok(feature) => {
                let record = match FaceRecord::new(name, feature.clone()) {
                    Ok(record) => record,
                    Err(e) => {
                        log::warn!("skipping {name:?}: {e}");
                        continue;
                    }
                };
                store.insert(name, &feature)?;
                table.add(record)?;
                *enrolled += 1;
                log::debug!("preloaded {name:?}");
            }
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }
    Ok(())
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn extract_from_file(
    path: &Path,
    engine: &mut dyn PerceptionEngine,
) -> Result<crate::recognition::domain::feature::Feature, Box<dyn std::error::Error>> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = (rgb.width(), rgb.height());
    let frame = Frame::new(rgb.into_raw(), width, height, Instant::now());

    let detections = engine.detect(&frame)?;
    let face = Detection::best_face(&detections).ok_or("no face found")?;
    Ok(engine.extract_feature(&frame, face)?)
}
