pub mod coordinator;
pub mod gates;
pub mod session_control;
pub mod track_guard;
mod worker;
