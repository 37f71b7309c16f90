//! Polling worker that drives queued learning jobs through the engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use mimeo_core::defaults::{EVENT_BUS_CAPACITY, JOB_MAX_RETRIES, JOB_POLL_INTERVAL_MS};
use mimeo_core::{LearningJobRepository, Result};

use crate::engine::FeedbackLearningEngine;

/// Configuration for the learning worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum retries before a job is marked failed.
    pub max_retries: u32,
    /// Whether to enable job processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: JOB_POLL_INTERVAL_MS,
            max_retries: JOB_MAX_RETRIES,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the retry bound for failed jobs.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the learning worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was claimed and started.
    JobStarted { job_id: Uuid },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid },
    /// A job failed (it may be retried by the queue).
    JobFailed { job_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| mimeo_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that claims pending learning jobs and runs them through the
/// engine, recording retry accounting in the job repository.
pub struct LearningWorker {
    engine: Arc<FeedbackLearningEngine>,
    jobs: Arc<dyn LearningJobRepository>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl LearningWorker {
    pub fn new(
        engine: Arc<FeedbackLearningEngine>,
        jobs: Arc<dyn LearningJobRepository>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            engine,
            jobs,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// The pending job count.
    pub async fn pending_count(&self) -> Result<u64> {
        self.jobs.pending_count().await
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop. Claims one job at a time; sleeps only when
    /// the queue is empty.
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Learning worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_retries = self.config.max_retries,
            "Learning worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Learning worker received shutdown signal");
                break;
            }

            let claimed = match self.jobs.claim_next().await {
                Ok(job) => job,
                Err(e) => {
                    error!(error = %e, "Failed to claim job");
                    None
                }
            };

            match claimed {
                Some(job) => self.execute_job(job).await,
                None => {
                    // Queue empty, sleep before polling again.
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Learning worker received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Learning worker stopped");
    }

    /// Execute a single claimed job and record its outcome.
    async fn execute_job(&self, job: mimeo_core::LearningJob) {
        let start = Instant::now();
        let job_id = job.id;
        info!(%job_id, user_id = %job.user_id, "Processing learning job");
        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id });

        match self.engine.process_job(&job).await {
            Ok(()) => {
                if let Err(e) = self.jobs.complete(job_id).await {
                    error!(error = %e, %job_id, "Failed to mark job as completed");
                } else {
                    info!(
                        %job_id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Learning job completed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id });
                }
            }
            Err(e) => {
                let message = e.to_string();
                if let Err(e) = self
                    .jobs
                    .fail(job_id, &message, self.config.max_retries)
                    .await
                {
                    error!(error = %e, %job_id, "Failed to record job failure");
                } else {
                    warn!(
                        %job_id,
                        error = %message,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Learning job failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        error: message,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, JOB_POLL_INTERVAL_MS);
        assert_eq!(config.max_retries, JOB_MAX_RETRIES);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_poll_interval(50)
            .with_max_retries(1)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_retries, 1);
        assert!(!config.enabled);
    }

    #[test]
    fn test_worker_event_clone_and_debug() {
        let job_id = Uuid::new_v4();
        let event = WorkerEvent::JobFailed {
            job_id,
            error: "boom".to_string(),
        };
        let cloned = event.clone();
        let debug_str = format!("{:?}", cloned);
        assert!(debug_str.contains("JobFailed"));
        assert!(debug_str.contains("boom"));
    }
}
