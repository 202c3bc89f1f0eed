pub mod quality_evaluation;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::assessment::engine::AssessmentEngine;
use crate::config::WorkerConfig;

/// Upper bound for a single worker invocation.
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Grace period before scheduler shutdown so in-flight jobs can finish.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    QualityEvaluation,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualityEvaluation => "quality_evaluation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: String,
    pub enabled: bool,
}

pub struct WorkerManager {
    engine: Arc<AssessmentEngine>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(
        engine: Arc<AssessmentEngine>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            engine,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Every job this instance would schedule. Followers schedule nothing.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![JobSpec {
            name: WorkerName::QualityEvaluation,
            cron: self.config.quality_cron.clone(),
            enabled: self.config.enable_quality_evaluation,
        }]
    }

    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;
        self.register_jobs(&scheduler).await;
        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            drain_secs = DRAIN_TIMEOUT.as_secs(),
            "Worker manager shutting down"
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in self.planned_jobs() {
            let name = spec.name.as_str();
            if !spec.enabled {
                tracing::info!(name, "Skipping disabled worker");
                continue;
            }

            let registered = match spec.name {
                WorkerName::QualityEvaluation => {
                    let engine = self.engine.clone();
                    add_job(scheduler, &spec.cron, name, move || {
                        let engine = engine.clone();
                        async move {
                            quality_evaluation::run(&engine).await;
                        }
                    })
                    .await
                }
            };
            if registered {
                tracing::info!(name, cron = %spec.cron, "Registered worker");
            }
        }
    }
}

/// Schedules `run` behind an overlap guard and a timeout. Returns whether the
/// job made it into the scheduler.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F) -> bool
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(worker = name, "Previous run still in progress; skipping tick");
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => match scheduler.add(job).await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
                false
            }
        },
        Err(err) => {
            tracing::error!(error = %err, cron, worker = name, "Failed to create worker job");
            false
        }
    }
}
