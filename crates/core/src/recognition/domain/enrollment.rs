use thiserror::Error;

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_store::{FeatureStore, StoreError};
use crate::recognition::domain::feature_table::{FaceRecord, FeatureTable, TableError};
use crate::recognition::domain::perception_engine::{EngineError, PerceptionEngine};

#[derive(Error, Debug)]
pub enum EnrollError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Replaces the engine's search index with a snapshot of the current
/// table. The only way the engine's search view becomes consistent
/// with the table; must follow every successful add or remove.
pub fn rebuild_index(
    engine: &mut dyn PerceptionEngine,
    table: &FeatureTable,
) -> Result<(), EngineError> {
    engine.release_index();
    engine.build_index(table.records())
}

/// Enrolls a new identity: persist, add to the table, rebuild the
/// index. Capacity is checked up front so a refused registration
/// leaves the store untouched.
pub fn register(
    table: &mut FeatureTable,
    store: &mut dyn FeatureStore,
    engine: &mut dyn PerceptionEngine,
    name: &str,
    feature: &Feature,
) -> Result<usize, EnrollError> {
    if table.is_full() {
        return Err(TableError::CapacityFull {
            capacity: table.capacity(),
        }
        .into());
    }
    let record = FaceRecord::new(name, feature.clone())?;
    store.insert(name, feature)?;
    let slot = table.add(record)?;
    rebuild_index(engine, table)?;
    log::info!("registered {name:?} in slot {slot}");
    Ok(slot)
}

/// Removes an enrolled identity. The store is deleted first, then the
/// whole table is reloaded from it (the store is the source of truth
/// after deletion) and the index rebuilt.
///
/// Returns `false` without touching the index when the name is not
/// enrolled, so repeated removal is a no-op.
pub fn remove(
    table: &mut FeatureTable,
    store: &mut dyn FeatureStore,
    engine: &mut dyn PerceptionEngine,
    name: &str,
) -> Result<bool, EnrollError> {
    if !store.exists(name)? {
        return Ok(false);
    }
    store.delete(name)?;
    table.reload(store)?;
    rebuild_index(engine, table)?;
    log::info!("removed {name:?}, {} records remain", table.len());
    Ok(true)
}
