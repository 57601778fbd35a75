//! Named one-shot jobs on the Tokio timer.
//!
//! Registering a name that is already scheduled aborts the earlier job. The table
//! lives in memory only; a restart forgets every pending job.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct ScheduledJob {
    id: u64,
    fire_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

#[derive(Clone, Default)]
pub struct JobScheduler {
    jobs: Arc<DashMap<String, ScheduledJob>>,
    next_id: Arc<AtomicU64>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `job` once at `fire_at`, or right away when that instant has passed.
    pub fn schedule_at<F, Fut>(&self, name: impl Into<String>, fire_at: DateTime<Utc>, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        let (armed_tx, armed_rx) = oneshot::channel::<()>();

        let jobs = Arc::clone(&self.jobs);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            // The entry must be in the table before the job may remove it.
            if armed_rx.await.is_err() {
                return;
            }
            tokio::time::sleep(delay).await;
            jobs.remove_if(&task_name, |_, scheduled| scheduled.id == id);
            info!(event_name = "jobs.fired", job = %task_name, "scheduled job fired");
            job().await;
        });

        let scheduled = ScheduledJob { id, fire_at, handle };
        if let Some(previous) = self.jobs.insert(name.clone(), scheduled) {
            previous.handle.abort();
            debug!(
                event_name = "jobs.replaced",
                job = %name,
                "previous job with the same name aborted"
            );
        }
        let _ = armed_tx.send(());

        info!(
            event_name = "jobs.scheduled",
            job = %name,
            fire_at = %fire_at.to_rfc3339(),
            "job scheduled"
        );
    }

    pub fn cancel(&self, name: &str) -> bool {
        match self.jobs.remove(name) {
            Some((_, scheduled)) => {
                scheduled.handle.abort();
                info!(event_name = "jobs.cancelled", job = %name, "job cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn fire_time(&self, name: &str) -> Option<DateTime<Utc>> {
        self.jobs.get(name).map(|scheduled| scheduled.fire_at)
    }

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    /// Aborts everything. Used on shutdown.
    pub fn shutdown(&self) {
        let names: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            self.cancel(&name);
        }
    }
}
