//! Delta extractor wrappers: bounded-retry policy and a deterministic
//! mock backend for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use mimeo_core::defaults::{EXTRACTOR_BACKOFF_BASE_MS, EXTRACTOR_MAX_ATTEMPTS};
use mimeo_core::{DeltaExtractor, Error, Result, StyleDelta};

// =============================================================================
// RETRYING WRAPPER
// =============================================================================

/// Wraps any [`DeltaExtractor`] with exponential-backoff retry.
///
/// Attempt 1 is immediate; subsequent attempts back off at 1s/2s/4s by
/// default. Validation errors are terminal and re-raised immediately.
/// When attempts are exhausted the last underlying message is surfaced
/// wrapped in `Error::Extraction`.
pub struct RetryingExtractor {
    inner: Arc<dyn DeltaExtractor>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryingExtractor {
    pub fn new(inner: Arc<dyn DeltaExtractor>) -> Self {
        Self {
            inner,
            max_attempts: EXTRACTOR_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(EXTRACTOR_BACKOFF_BASE_MS),
        }
    }

    /// Override the attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the base backoff delay (doubles per retry).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }
}

#[async_trait]
impl DeltaExtractor for RetryingExtractor {
    async fn extract_delta(&self, original: &str, edited: &str) -> Result<StyleDelta> {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                // 1x, 2x, 4x, ... of the base delay.
                let delay = self.backoff_base * 2u32.pow(attempt - 2);
                sleep(delay).await;
            }
            match self.inner.extract_delta(original, edited).await {
                Ok(delta) => return Ok(delta),
                Err(e @ Error::Validation(_)) => return Err(e),
                Err(e @ Error::NotFound(_)) => return Err(e),
                Err(e) => {
                    warn!(attempt, error = %e, "Delta extraction attempt failed");
                    last_error = Some(e);
                }
            }
        }
        let last = last_error.map(|e| e.to_string()).unwrap_or_default();
        Err(Error::Extraction(format!(
            "extraction failed after {} attempts: {}",
            self.max_attempts, last
        )))
    }
}

// =============================================================================
// MOCK EXTRACTOR
// =============================================================================

/// A logged call against the mock extractor.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub original: String,
    pub edited: String,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    scripted: HashMap<String, StyleDelta>,
    default_delta: StyleDelta,
    transient_failures_remaining: u32,
    failure_rate: f64,
    validation_failure: Option<String>,
}

/// Deterministic mock extractor for testing.
///
/// Responses can be scripted per edited text; unscripted calls return a
/// configurable default delta. Failure injection covers both transient
/// errors (a fixed count, or a random rate) and terminal validation
/// errors.
#[derive(Clone, Default)]
pub struct MockExtractor {
    state: Arc<Mutex<MockState>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `delta` whenever the edited text equals `edited`.
    pub fn with_scripted_delta(self, edited: impl Into<String>, delta: StyleDelta) -> Self {
        self.state.lock().unwrap().scripted.insert(edited.into(), delta);
        self
    }

    /// Delta returned for unscripted calls.
    pub fn with_default_delta(self, delta: StyleDelta) -> Self {
        self.state.lock().unwrap().default_delta = delta;
        self
    }

    /// Fail the next `count` calls with a transient extraction error.
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().transient_failures_remaining = count;
        self
    }

    /// Fail calls randomly at the given rate (0.0 - 1.0).
    pub fn with_failure_rate(self, rate: f64) -> Self {
        self.state.lock().unwrap().failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Fail every call with a terminal validation error.
    pub fn with_validation_failure(self, message: impl Into<String>) -> Self {
        self.state.lock().unwrap().validation_failure = Some(message.into());
        self
    }

    /// All logged calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of extraction calls made.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }
}

#[async_trait]
impl DeltaExtractor for MockExtractor {
    async fn extract_delta(&self, original: &str, edited: &str) -> Result<StyleDelta> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall {
            original: original.to_string(),
            edited: edited.to_string(),
        });

        if let Some(msg) = state.validation_failure.clone() {
            return Err(Error::Validation(msg));
        }
        if state.transient_failures_remaining > 0 {
            state.transient_failures_remaining -= 1;
            return Err(Error::Extraction("injected transient failure".into()));
        }
        if state.failure_rate > 0.0 && rand::random::<f64>() < state.failure_rate {
            return Err(Error::Extraction("injected random failure".into()));
        }

        Ok(state
            .scripted
            .get(edited)
            .cloned()
            .unwrap_or_else(|| state.default_delta.clone()))
    }
}
