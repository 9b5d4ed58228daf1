//! Cron-driven background refresh of cached analytics snapshots

use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::coordinator::RefreshCoordinator;

/// Periodically re-fetches every snapshot key the coordinator has served
#[derive(Clone)]
pub struct BackgroundRefresher {
    coordinator: Arc<RefreshCoordinator>,
}

impl BackgroundRefresher {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Run one refresh pass over the known keys
    pub async fn run_once(&self) -> usize {
        let refreshed = self.coordinator.refresh_known().await;
        info!("Background refresh updated {} analytics snapshots", refreshed);
        refreshed
    }

    /// Start the scheduler. The returned handle keeps the job alive.
    pub async fn start(&self, schedule: &str) -> Result<JobScheduler> {
        let refresher = self.clone();

        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let refresher = refresher.clone();
            Box::pin(async move {
                refresher.run_once().await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Started analytics refresh scheduler with schedule: {}", schedule);
        Ok(scheduler)
    }
}
