//! Structured logging field name constants for mimeo.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "versioning", "learning", "cache"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "prune_old_edit_metadata", "rollback_to_version", "process_job"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// User UUID being operated on.
pub const USER_ID: &str = "user_id";

/// Content UUID being operated on.
pub const CONTENT_ID: &str = "content_id";

/// Learning job UUID being processed.
pub const JOB_ID: &str = "job_id";

/// Zero-based thread part index.
pub const PART_INDEX: &str = "part_index";

/// Version index within a user's profile history.
pub const VERSION_INDEX: &str = "version_index";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of records pruned/unset by a maintenance operation.
pub const PRUNED_COUNT: &str = "pruned_count";

/// Number of edits folded by an aggregation.
pub const EDIT_COUNT: &str = "edit_count";

/// Extractor attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
