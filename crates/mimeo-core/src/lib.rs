//! # mimeo-core
//!
//! Core types, traits, and abstractions for the mimeo style-learning
//! library.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other mimeo crates depend on: style deltas, edit
//! metadata, style profiles, profile version snapshots, learning jobs,
//! and the repository/extractor/cache seams.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
