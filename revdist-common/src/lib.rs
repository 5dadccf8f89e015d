//! # revdist common library
//!
//! Shared code for the review distribution action:
//! - Error type used across crates
//! - TOML/environment configuration loading
//! - Typed review-system and transfer-system entities
//! - Action event, response and form types
//! - Path normalization and file classification

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod path;

pub use error::{Error, Result};
pub use path::FileKind;
