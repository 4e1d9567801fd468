use thiserror::Error;

use crate::recognition::domain::feature::Feature;
use crate::recognition::domain::feature_table::FaceRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a record named {0:?} already exists")]
    Duplicate(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable keyed persistence for enrolled features.
///
/// Names are unique for the lifetime of the store; `insert` on an
/// existing name fails with [`StoreError::Duplicate`]. Replay order of
/// `load_all` is insertion order.
pub trait FeatureStore: Send {
    fn insert(&mut self, name: &str, feature: &Feature) -> Result<(), StoreError>;
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;
    fn exists(&self, name: &str) -> Result<bool, StoreError>;
    fn load_all(&self) -> Result<Vec<FaceRecord>, StoreError>;

    /// Smallest unused index for `<prefix><n>` names (see
    /// [`next_free_index_in`]).
    fn next_free_index(&self, prefix: &str) -> Result<u32, StoreError>;
}

/// Gap-filling index synthesis over default-prefix names.
///
/// Returns the smallest index not used by any `<prefix><n>` name.
/// Deleted indices are reclaimed before the range grows, so the name
/// space stays dense over the table's operational life. Cost is
/// bounded by the number of names, not by the largest index, so a
/// stray `<prefix>4000000000` record cannot blow up memory.
pub fn next_free_index_in<'a>(names: impl Iterator<Item = &'a str>, prefix: &str) -> u32 {
    let mut indices: Vec<u32> = names
        .filter_map(|name| name.strip_prefix(prefix))
        .filter_map(|rest| rest.parse::<u32>().ok())
        .collect();
    indices.sort_unstable();
    indices.dedup();

    indices
        .iter()
        .enumerate()
        .find(|&(position, &index)| index != position as u32)
        .map(|(position, _)| position as u32)
        .unwrap_or(indices.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(&[], 0)]
    #[case::gap_is_filled(&["user_0", "user_2"], 1)]
    #[case::dense_extends(&["user_0", "user_1"], 2)]
    #[case::sparse_start(&["user_3"], 0)]
    #[case::huge_index_is_cheap(&["user_0", "user_4000000000"], 1)]
    #[case::repeated_index_counted_once(&["user_0", "user_0", "user_1"], 2)]
    #[case::unrelated_names_ignored(&["alice.jpg", "user_0"], 1)]
    #[case::non_numeric_suffix_ignored(&["user_x", "user_1"], 0)]
    fn test_next_free_index(#[case] names: &[&str], #[case] expected: u32) {
        assert_eq!(next_free_index_in(names.iter().copied(), "user_"), expected);
    }

    #[test]
    fn test_reclaims_deleted_index_before_growing() {
        // user_1 deleted out of {0,1,2}: next registration reuses 1
        let names = ["user_0", "user_2"];
        assert_eq!(next_free_index_in(names.iter().copied(), "user_"), 1);
    }
}
