pub mod domain;
pub mod frame_slot;
pub mod infrastructure;
