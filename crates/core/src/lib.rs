pub mod capture;
pub mod display;
pub mod recognition;
pub mod session;
pub mod shared;
