use thiserror::Error;

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_store::{FeatureStore, StoreError};
use crate::shared::constants::NAME_MAX_LEN;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("feature table is full ({capacity} records)")]
    CapacityFull { capacity: usize },
    #[error("store holds {found} records but table capacity is {capacity}")]
    CapacityExceeded { found: usize, capacity: usize },
    #[error("name exceeds {max} bytes: {name:?}")]
    NameTooLong { name: String, max: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An enrolled face: a bounded name and its feature vector.
///
/// Records are never mutated in place; every table change replaces the
/// engine's search index with a rebuild from a fresh snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRecord {
    name: String,
    feature: Feature,
}

impl FaceRecord {
    pub fn new(name: impl Into<String>, feature: Feature) -> Result<Self, TableError> {
        let name = name.into();
        if name.len() > NAME_MAX_LEN {
            return Err(TableError::NameTooLong {
                name,
                max: NAME_MAX_LEN,
            });
        }
        Ok(Self { name, feature })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Name without a trailing file extension. Preloaded reference
    /// images enroll under their file name ("alice.jpg"), but the
    /// overlay and audio cues use the bare name.
    pub fn display_name(&self) -> &str {
        display_name(&self.name)
    }
}

pub fn display_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Fixed-capacity, in-memory mirror of the feature store.
///
/// Owned exclusively by the session worker thread after startup; all
/// other threads see enrolled identities only through the engine's
/// search index, which is rebuilt from a snapshot of this table.
#[derive(Debug)]
pub struct FeatureTable {
    records: Vec<FaceRecord>,
    capacity: usize,
}

impl FeatureTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Replays the persistent store into a fresh table.
    pub fn load(store: &dyn FeatureStore, capacity: usize) -> Result<Self, TableError> {
        let records = store.load_all()?;
        if records.len() > capacity {
            return Err(TableError::CapacityExceeded {
                found: records.len(),
                capacity,
            });
        }
        Ok(Self { records, capacity })
    }

    /// Assigns the next free slot. The caller is responsible for
    /// persisting the record and rebuilding the engine index.
    pub fn add(&mut self, record: FaceRecord) -> Result<usize, TableError> {
        if self.records.len() >= self.capacity {
            return Err(TableError::CapacityFull {
                capacity: self.capacity,
            });
        }
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Replaces the whole table from the store. After a deletion the
    /// store is the source of truth; slot compaction is not attempted
    /// in memory.
    pub fn reload(&mut self, store: &dyn FeatureStore) -> Result<usize, TableError> {
        let records = store.load_all()?;
        if records.len() > self.capacity {
            return Err(TableError::CapacityExceeded {
                found: records.len(),
                capacity: self.capacity,
            });
        }
        self.records = records;
        Ok(self.records.len())
    }

    pub fn records(&self) -> &[FaceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::infrastructure::memory_feature_store::MemoryFeatureStore;
    use rstest::rstest;

    fn record(name: &str) -> FaceRecord {
        FaceRecord::new(name, Feature::zeroed()).unwrap()
    }

    #[test]
    fn test_add_assigns_sequential_slots() {
        let mut table = FeatureTable::with_capacity(3);
        assert_eq!(table.add(record("a")).unwrap(), 0);
        assert_eq!(table.add(record("b")).unwrap(), 1);
        assert_eq!(table.len(), 2);
        assert!(!table.is_full());
    }

    #[test]
    fn test_add_on_full_table_fails_and_leaves_table_unchanged() {
        let mut table = FeatureTable::with_capacity(1);
        table.add(record("a")).unwrap();
        let err = table.add(record("b")).unwrap_err();
        assert!(matches!(err, TableError::CapacityFull { capacity: 1 }));
        assert_eq!(table.len(), 1);
        assert!(table.contains_name("a"));
        assert!(!table.contains_name("b"));
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut table = FeatureTable::with_capacity(2);
        for name in ["a", "b", "c", "d"] {
            let _ = table.add(record(name));
        }
        assert!(table.len() <= table.capacity());
    }

    #[test]
    fn test_load_replays_store() {
        let mut store = MemoryFeatureStore::new();
        use crate::recognition::domain::feature_store::FeatureStore;
        store.insert("a", &Feature::zeroed()).unwrap();
        store.insert("b", &Feature::zeroed()).unwrap();

        let table = FeatureTable::load(&store, 10).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.contains_name("a"));
    }

    #[test]
    fn test_load_fails_when_store_exceeds_capacity() {
        let mut store = MemoryFeatureStore::new();
        use crate::recognition::domain::feature_store::FeatureStore;
        store.insert("a", &Feature::zeroed()).unwrap();
        store.insert("b", &Feature::zeroed()).unwrap();

        let err = FeatureTable::load(&store, 1).unwrap_err();
        assert!(matches!(
            err,
            TableError::CapacityExceeded {
                found: 2,
                capacity: 1
            }
        ));
    }

    #[test]
    fn test_reload_replaces_contents() {
        let mut store = MemoryFeatureStore::new();
        use crate::recognition::domain::feature_store::FeatureStore;
        store.insert("a", &Feature::zeroed()).unwrap();

        let mut table = FeatureTable::with_capacity(10);
        table.add(record("stale")).unwrap();
        assert_eq!(table.reload(&store).unwrap(), 1);
        assert!(table.contains_name("a"));
        assert!(!table.contains_name("stale"));
    }

    #[test]
    fn test_record_rejects_oversized_name() {
        let long = "x".repeat(NAME_MAX_LEN + 1);
        assert!(matches!(
            FaceRecord::new(long, Feature::zeroed()),
            Err(TableError::NameTooLong { .. })
        ));
    }

    #[rstest]
    #[case("alice.jpg", "alice")]
    #[case("bob.portrait.png", "bob.portrait")]
    #[case("user_3", "user_3")]
    #[case(".hidden", ".hidden")]
    fn test_display_name_strips_extension(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(record(name).display_name(), expected);
    }
}
