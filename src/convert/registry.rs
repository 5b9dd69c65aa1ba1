//! Job registry
//!
//! The job map is touched by three actors: the submitting request inserts,
//! the worker updates, and the polling interface reads. All access goes
//! through one RwLock-guarded map; updates to a job that has reached a
//! terminal state are ignored so no actor can resurrect a finished job.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::{ConversionJob, JobSnapshot, JobStatus};

#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<JobRegistryInner>,
}

#[derive(Default)]
struct JobRegistryInner {
    jobs: RwLock<HashMap<Uuid, ConversionJob>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created job
    pub async fn insert(&self, job: ConversionJob) {
        let mut jobs = self.inner.jobs.write().await;
        jobs.insert(job.id, job);
    }

    /// Apply a mutation to a live (non-terminal) job
    ///
    /// Returns false when the job is unknown or already terminal.
    pub async fn update<F>(&self, id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut ConversionJob),
    {
        let mut jobs = self.inner.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if !job.status.is_terminal() => {
                f(job);
                true
            }
            _ => false,
        }
    }

    /// Polling view of a job
    pub async fn snapshot(&self, id: Uuid) -> Option<JobSnapshot> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&id).map(JobSnapshot::from)
    }

    /// Read a job's status and result without consuming the record
    pub async fn peek_result(&self, id: Uuid) -> Option<(JobStatus, Option<String>)> {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&id).map(|job| (job.status, job.result.clone()))
    }

    /// Consume-on-read retrieval: a completed job's record is removed and
    /// its result returned exactly once; non-terminal jobs are left alone
    pub async fn take_result(&self, id: Uuid) -> Option<(JobStatus, Option<String>)> {
        let mut jobs = self.inner.jobs.write().await;
        let status = jobs.get(&id)?.status;
        if status == JobStatus::Completed {
            let job = jobs.remove(&id).expect("job present under write lock");
            Some((status, job.result))
        } else {
            Some((status, None))
        }
    }

    /// Flag a job for cancellation; the worker checks between pages
    pub async fn request_cancel(&self, id: Uuid) -> bool {
        self.update(id, |job| job.cancel_requested = true).await
    }

    pub async fn cancel_requested(&self, id: Uuid) -> bool {
        let jobs = self.inner.jobs.read().await;
        jobs.get(&id).is_some_and(|job| job.cancel_requested)
    }

    pub async fn job_count(&self) -> usize {
        self.inner.jobs.read().await.len()
    }

    /// Drop terminal jobs older than the given age; returns how many
    pub async fn cleanup_older_than(&self, hours: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let mut jobs = self.inner.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !(job.status.is_terminal() && job.created_at < cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::info!(count = removed, "cleaned up stale conversion jobs");
        }
        removed
    }

    /// Periodic stale-job sweep
    pub fn start_cleanup_task(self, hours: i64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1800));
            loop {
                interval.tick().await;
                self.cleanup_older_than(hours).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry_with_job() -> (JobRegistry, Uuid) {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        registry.insert(ConversionJob::new(id)).await;
        (registry, id)
    }

    #[tokio::test]
    async fn insert_and_snapshot() {
        let (registry, id) = registry_with_job().await;
        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Starting);
        assert_eq!(snapshot.progress, 0);

        assert!(registry.snapshot(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn updates_reach_live_jobs_only() {
        let (registry, id) = registry_with_job().await;

        assert!(registry.update(id, |job| job.set_progress(42)).await);
        assert_eq!(registry.snapshot(id).await.unwrap().progress, 42);

        registry
            .update(id, |job| job.fail("boom".to_string()))
            .await;

        // Terminal: further updates are ignored
        assert!(!registry.update(id, |job| job.set_progress(99)).await);
        let snapshot = registry.snapshot(id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.progress, 42);
    }

    #[tokio::test]
    async fn take_result_consumes_completed_jobs_once() {
        let (registry, id) = registry_with_job().await;
        registry
            .update(id, |job| {
                job.complete("<html></html>".to_string(), "done".to_string())
            })
            .await;

        let (status, result) = registry.take_result(id).await.unwrap();
        assert_eq!(status, JobStatus::Completed);
        assert_eq!(result.as_deref(), Some("<html></html>"));

        // Second retrieval through the consuming path: not found
        assert!(registry.take_result(id).await.is_none());
        assert!(registry.snapshot(id).await.is_none());
    }

    #[tokio::test]
    async fn take_result_leaves_running_jobs_alone() {
        let (registry, id) = registry_with_job().await;
        let (status, result) = registry.take_result(id).await.unwrap();
        assert_eq!(status, JobStatus::Starting);
        assert!(result.is_none());
        assert!(registry.snapshot(id).await.is_some());
    }

    #[tokio::test]
    async fn peek_result_is_read_only() {
        let (registry, id) = registry_with_job().await;
        registry
            .update(id, |job| job.complete("x".to_string(), "done".to_string()))
            .await;

        assert!(registry.peek_result(id).await.is_some());
        assert!(registry.peek_result(id).await.is_some());
        assert_eq!(registry.job_count().await, 1);
    }

    #[tokio::test]
    async fn cancel_flag_round_trips() {
        let (registry, id) = registry_with_job().await;
        assert!(!registry.cancel_requested(id).await);
        assert!(registry.request_cancel(id).await);
        assert!(registry.cancel_requested(id).await);

        // Unknown jobs cannot be cancelled
        assert!(!registry.request_cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn cleanup_drops_only_stale_terminal_jobs() {
        let (registry, done_id) = registry_with_job().await;
        registry
            .update(done_id, |job| job.fail("old".to_string()))
            .await;
        // Backdate the terminal job past the cutoff
        {
            let mut jobs = registry.inner.jobs.write().await;
            jobs.get_mut(&done_id).unwrap().created_at =
                Utc::now() - chrono::Duration::hours(48);
        }

        let live_id = Uuid::new_v4();
        registry.insert(ConversionJob::new(live_id)).await;

        assert_eq!(registry.cleanup_older_than(24).await, 1);
        assert!(registry.snapshot(done_id).await.is_none());
        assert!(registry.snapshot(live_id).await.is_some());
    }
}
