//! HTTP surface for forwarded action events

pub mod actions;

pub use actions::{discover_action, health, launch_action};
