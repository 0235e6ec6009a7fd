/// Bounded queue for conversion jobs.
///
/// A tokio Semaphore caps how many uploads are downloaded and rendered at
/// once; each chat may have at most one job queued or running.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

/// Lifecycle of a conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

/// A job tracked by the queue.
#[derive(Debug, Clone)]
pub struct TrackedJob {
    pub job_id: String,
    pub chat_id: i64,
    pub file_name: String,
    pub state: JobState,
    pub enqueued_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
}

impl TrackedJob {
    fn is_active(&self) -> bool {
        matches!(self.state, JobState::Queued | JobState::Running)
    }
}

pub struct ConversionQueue {
    semaphore: Arc<Semaphore>,
    /// Permits held by running jobs; dropping one frees the slot.
    permits: Arc<Mutex<HashMap<String, OwnedSemaphorePermit>>>,
    jobs: Arc<Mutex<HashMap<String, TrackedJob>>>,
    max_concurrent: usize,
}

impl ConversionQueue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            permits: Arc::new(Mutex::new(HashMap::new())),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            max_concurrent,
        }
    }

    /// Track a new job. Returns false if the chat already has an active job
    /// or the id is already known.
    pub async fn enqueue(&self, job_id: &str, chat_id: i64, file_name: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(job_id) {
            warn!("Job {} already in queue", job_id);
            return false;
        }
        if jobs.values().any(|j| j.chat_id == chat_id && j.is_active()) {
            info!("Chat {} already has a conversion in progress", chat_id);
            return false;
        }

        jobs.insert(job_id.to_string(), TrackedJob {
            job_id: job_id.to_string(),
            chat_id,
            file_name: file_name.to_string(),
            state: JobState::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
        });

        info!("Job {} enqueued for chat {} ({})", job_id, chat_id, file_name);
        true
    }

    /// Wait for a free slot and mark the job running.
    pub async fn acquire(&self, job_id: &str) -> bool {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                warn!("Semaphore closed for job {}", job_id);
                return false;
            }
        };

        self.permits.lock().await.insert(job_id.to_string(), permit);
        if let Some(job) = self.jobs.lock().await.get_mut(job_id) {
            job.state = JobState::Running;
            job.started_at = Some(Utc::now());
        }

        info!("Job {} acquired slot, now running", job_id);
        true
    }

    /// Mark a job done and release its slot.
    pub async fn complete(&self, job_id: &str) {
        self.finish(job_id, JobState::Done).await;
        info!("Job {} completed, slot released", job_id);
    }

    /// Mark a job failed and release its slot.
    pub async fn fail(&self, job_id: &str) {
        self.finish(job_id, JobState::Failed).await;
        warn!("Job {} failed, slot released", job_id);
    }

    async fn finish(&self, job_id: &str, state: JobState) {
        if let Some(job) = self.jobs.lock().await.get_mut(job_id) {
            job.state = state;
        }
        self.permits.lock().await.remove(job_id);
    }

    pub async fn get(&self, job_id: &str) -> Option<TrackedJob> {
        self.jobs.lock().await.get(job_id).cloned()
    }

    /// The queued or running job for a chat, if any.
    pub async fn active_for_chat(&self, chat_id: i64) -> Option<TrackedJob> {
        self.jobs
            .lock()
            .await
            .values()
            .find(|j| j.chat_id == chat_id && j.is_active())
            .cloned()
    }

    pub async fn running_count(&self) -> usize {
        self.permits.lock().await.len()
    }

    pub async fn stats(&self) -> QueueStats {
        let jobs = self.jobs.lock().await;
        let running = self.permits.lock().await.len();
        QueueStats {
            max_concurrent: self.max_concurrent,
            running,
            queued: jobs.values().filter(|j| j.state == JobState::Queued).count(),
            completed: jobs.values().filter(|j| j.state == JobState::Done).count(),
            failed: jobs.values().filter(|j| j.state == JobState::Failed).count(),
        }
    }

    /// Forget finished jobs older than `max_age_secs`.
    pub async fn cleanup_old(&self, max_age_secs: i64) {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_secs);
        self.jobs
            .lock()
            .await
            .retain(|_, j| j.is_active() || j.enqueued_at > cutoff);
    }
}

/// Queue statistics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub max_concurrent: usize,
    pub running: usize,
    pub queued: usize,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_acquire() {
        let queue = ConversionQueue::new(2);
        assert!(queue.enqueue("j1", 100, "batch.txt").await);
        assert!(queue.acquire("j1").await);
        assert_eq!(queue.running_count().await, 1);
        assert_eq!(queue.get("j1").await.unwrap().state, JobState::Running);
    }

    #[tokio::test]
    async fn test_one_active_job_per_chat() {
        let queue = ConversionQueue::new(2);
        assert!(queue.enqueue("j1", 100, "a.txt").await);
        assert!(!queue.enqueue("j2", 100, "b.txt").await);
        assert!(queue.enqueue("j3", 200, "c.txt").await);

        queue.acquire("j1").await;
        queue.complete("j1").await;
        assert!(queue.enqueue("j2", 100, "b.txt").await);
    }

    #[tokio::test]
    async fn test_duplicate_job_id() {
        let queue = ConversionQueue::new(2);
        assert!(queue.enqueue("j1", 100, "a.txt").await);
        assert!(!queue.enqueue("j1", 200, "a.txt").await);
    }

    #[tokio::test]
    async fn test_fail_releases_slot() {
        let queue = ConversionQueue::new(1);
        queue.enqueue("j1", 1, "a.txt").await;
        queue.acquire("j1").await;
        queue.fail("j1").await;
        assert_eq!(queue.running_count().await, 0);
        assert!(queue.active_for_chat(1).await.is_none());

        queue.enqueue("j2", 2, "b.txt").await;
        assert!(queue.acquire("j2").await);
    }

    #[tokio::test]
    async fn test_stats_and_cleanup() {
        let queue = ConversionQueue::new(3);
        queue.enqueue("j1", 1, "a.txt").await;
        queue.enqueue("j2", 2, "b.txt").await;
        queue.acquire("j1").await;
        queue.complete("j1").await;

        let stats = queue.stats().await;
        assert_eq!(stats, QueueStats { max_concurrent: 3, running: 0, queued: 1, completed: 1, failed: 0 });

        queue.cleanup_old(-1).await;
        assert!(queue.get("j1").await.is_none());
        assert!(queue.get("j2").await.is_some());
    }
}
