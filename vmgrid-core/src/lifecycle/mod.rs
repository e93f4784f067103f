//! Time-driven lifecycle jobs.
//!
//! Each registered job runs on its own tokio task at a fixed cadence. A job
//! failure is logged and the next tick still happens; only cancellation
//! stops a job loop.

pub mod jobs;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Result;

/// Time source, injectable so cadence logic is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy)]
pub enum JobCadence {
    /// Once a day at the given UTC wall-clock time.
    DailyAt(NaiveTime),
    /// Repeatedly with a fixed gap between run starts.
    Every(Duration),
}

impl JobCadence {
    /// First instant strictly after `after` at which the job should run.
    pub fn next_run(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            JobCadence::DailyAt(time) => {
                let today = after.date_naive().and_time(*time).and_utc();
                if today > after {
                    today
                } else {
                    today + chrono::Duration::days(1)
                }
            }
            JobCadence::Every(gap) => {
                let gap = chrono::Duration::from_std(*gap)
                    .unwrap_or_else(|_| chrono::Duration::days(1));
                after + gap
            }
        }
    }
}

#[async_trait]
pub trait LifecycleJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Owns the background task per registered job.
pub struct LifecycleScheduler {
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for LifecycleScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleScheduler")
            .field("jobs", &self.handles.len())
            .finish()
    }
}

impl LifecycleScheduler {
    pub fn new(clock: Arc<dyn Clock>, shutdown: CancellationToken) -> Self {
        Self {
            clock,
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn register(&mut self, job: Arc<dyn LifecycleJob>, cadence: JobCadence) {
        let clock = Arc::clone(&self.clock);
        let shutdown = self.shutdown.clone();

        info!(job = job.name(), ?cadence, "lifecycle job registered");
        let handle = tokio::spawn(async move {
            loop {
                let now = clock.now();
                let next = cadence.next_run(now);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                let started = clock.now();
                match job.run(started).await {
                    Ok(()) => debug!(job = job.name(), "lifecycle job finished"),
                    Err(error) => error!(job = job.name(), %error, "lifecycle job failed"),
                }
            }
            debug!(job = job.name(), "lifecycle job stopped");
        });
        self.handles.push(handle);
    }

    /// Wait for every job loop to observe cancellation and exit.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
