pub mod notifier;
pub mod presenter;
