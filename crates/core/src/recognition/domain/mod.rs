pub mod enrollment;
pub mod feature;
pub mod feature_store;
pub mod feature_table;
pub mod perception_engine;
