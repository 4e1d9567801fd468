pub mod histogram_engine;
pub mod memory_feature_store;
pub mod preload;
pub mod sqlite_feature_store;
