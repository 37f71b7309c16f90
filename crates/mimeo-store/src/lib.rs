//! # mimeo-store
//!
//! Storage layer for mimeo: the edit metadata store (capped per-edit style
//! deltas with aggregation) and the profile version store (bounded
//! rollback-capable snapshot history), plus the in-memory backend they run
//! against.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mimeo_store::{MemoryBackend, ProfileVersioningService};
//! use mimeo_core::VersionSource;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let versions = ProfileVersioningService::new(backend.clone());
//!
//! let handle = versions.begin_update(user_id, VersionSource::Feedback).await?;
//! versions.commit_update(handle, updated_profile).await?;
//! ```

pub mod edits;
pub mod memory;
pub mod versioning;

// Re-export core types
pub use mimeo_core::*;

pub use edits::EditMetadataStore;
pub use memory::MemoryBackend;
pub use versioning::{ProfileVersioningService, UpdateHandle};
