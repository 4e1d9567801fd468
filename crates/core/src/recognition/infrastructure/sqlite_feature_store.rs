use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_store::{next_free_index_in, FeatureStore, StoreError};
use crate::recognition::domain::feature_table::FaceRecord;

/// SQLite-backed feature store.
///
/// One row per enrolled identity in `face_data`; the name is the
/// primary key, the feature vector a little-endian f32 blob. Writes
/// are durable before `insert`/`delete` return.
pub struct SqliteFeatureStore {
    conn: Connection,
}

impl SqliteFeatureStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path).map_err(db_err)?)
    }

    /// Private in-memory database, for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS face_data (
                name TEXT PRIMARY KEY,
                feature BLOB NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;
        Ok(Self { conn })
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl FeatureStore for SqliteFeatureStore {
    fn insert(&mut self, name: &str, feature: &Feature) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO face_data (name, feature) VALUES (?1, ?2)",
            params![name, feature.to_bytes()],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate(name.to_string()))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM face_data WHERE name = ?1", params![name])
            .map_err(db_err)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.conn
            .query_row(
                "SELECT 1 FROM face_data WHERE name = ?1 LIMIT 1",
                params![name],
                |_| Ok(()),
            )
            .optional()
            .map_err(db_err)
            .map(|found| found.is_some())
    }

    fn load_all(&self) -> Result<Vec<FaceRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, feature FROM face_data ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((name, blob))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (name, blob) = row.map_err(db_err)?;
            let feature =
                Feature::from_bytes(&blob).map_err(|e| StoreError::Backend(e.to_string()))?;
            let record = FaceRecord::new(name, feature)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    fn next_free_index(&self, prefix: &str) -> Result<u32, StoreError> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM face_data WHERE name LIKE ?1 ESCAPE '\\'")
            .map_err(db_err)?;
        let names: Vec<String> = stmt
            .query_map(params![pattern], |row| row.get(0))
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        Ok(next_free_index_in(names.iter().map(String::as_str), prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_with_head(v: f32) -> Feature {
        let mut values = Feature::zeroed().as_slice().to_vec();
        values[0] = v;
        Feature::new(values)
    }

    #[test]
    fn test_insert_and_load_round_trip() {
        let mut store = SqliteFeatureStore::open_in_memory().unwrap();
        store.insert("alice.jpg", &feature_with_head(0.5)).unwrap();
        store.insert("bob.jpg", &feature_with_head(1.5)).unwrap();

        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "alice.jpg");
        assert_eq!(records[0].feature().as_slice()[0], 0.5);
        assert_eq!(records[1].name(), "bob.jpg");
    }

    #[test]
    fn test_duplicate_insert_surfaces_as_duplicate() {
        let mut store = SqliteFeatureStore::open_in_memory().unwrap();
        store.insert("a", &Feature::zeroed()).unwrap();
        assert!(matches!(
            store.insert("a", &Feature::zeroed()),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_delete_then_exists_false() {
        let mut store = SqliteFeatureStore::open_in_memory().unwrap();
        store.insert("a", &Feature::zeroed()).unwrap();
        store.delete("a").unwrap();
        assert!(!store.exists("a").unwrap());
        // deleting a missing name is a no-op
        store.delete("a").unwrap();
    }

    #[test]
    fn test_next_free_index_gap_filling() {
        let mut store = SqliteFeatureStore::open_in_memory().unwrap();
        store.insert("user_0", &Feature::zeroed()).unwrap();
        store.insert("user_2", &Feature::zeroed()).unwrap();
        assert_eq!(store.next_free_index("user_").unwrap(), 1);

        store.insert("user_1", &Feature::zeroed()).unwrap();
        assert_eq!(store.next_free_index("user_").unwrap(), 3);
    }

    #[test]
    fn test_next_free_index_ignores_foreign_names() {
        let mut store = SqliteFeatureStore::open_in_memory().unwrap();
        store.insert("alice.jpg", &Feature::zeroed()).unwrap();
        assert_eq!(store.next_free_index("user_").unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faces.db");
        {
            let mut store = SqliteFeatureStore::open(&path).unwrap();
            store.insert("a", &feature_with_head(2.0)).unwrap();
        }
        let store = SqliteFeatureStore::open(&path).unwrap();
        let records = store.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].feature().as_slice()[0], 2.0);
    }
}
