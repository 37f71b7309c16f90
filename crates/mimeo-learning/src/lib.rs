//! # mimeo-learning
//!
//! Feedback learning for style profiles: capture content edits, extract
//! style deltas, and fold aggregated patterns back into the user's live
//! profile through queued background jobs.
//!
//! The [`FeedbackLearningEngine`] is the application-facing entry point;
//! the [`LearningWorker`] drains the job queue in the background. The
//! engine uses whatever [`mimeo_core::DeltaExtractor`] is injected; wrap
//! it in [`RetryingExtractor`] to compose bounded exponential backoff
//! over a flaky backend before construction.

pub mod engine;
pub mod extractor;
pub mod worker;

pub use engine::{apply_patterns, FeedbackLearningEngine};
pub use extractor::{MockExtractor, RetryingExtractor};
pub use worker::{LearningWorker, WorkerConfig, WorkerEvent, WorkerHandle};

// Re-export the core types callers need alongside the engine.
pub use mimeo_core::*;
