use std::sync::{Arc, Mutex};

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_store::{next_free_index_in, FeatureStore, StoreError};
use crate::recognition::domain::feature_table::FaceRecord;

/// Volatile feature store backed by an in-memory list.
///
/// Clones share the same backing records, which lets tests and demo
/// harnesses keep a handle for inspection after the store has been
/// moved into the session worker. Insertion order is preserved, like
/// the SQLite store's rowid order.
#[derive(Clone, Default)]
pub struct MemoryFeatureStore {
    records: Arc<Mutex<Vec<(String, Feature)>>>,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn insert(&mut self, name: &str, feature: &Feature) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|(n, _)| n == name) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        records.push((name.to_string(), feature.clone()));
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.records.lock().unwrap().retain(|(n, _)| n != name);
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().unwrap().iter().any(|(n, _)| n == name))
    }

    fn load_all(&self) -> Result<Vec<FaceRecord>, StoreError> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(name, feature)| {
                FaceRecord::new(name.clone(), feature.clone())
                    .map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }

    fn next_free_index(&self, prefix: &str) -> Result<u32, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(next_free_index_in(records.iter().map(|(n, _)| n.as_str()), prefix))
    }
}
