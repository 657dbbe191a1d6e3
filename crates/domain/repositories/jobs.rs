use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{entities::jobs::JobEntity, value_objects::status_poll::StatusPollPayload};

#[async_trait]
#[automock]
pub trait JobRepository {
    async fn enqueue_status_poll(
        &self,
        payload: StatusPollPayload,
        delay: std::time::Duration,
    ) -> Result<Uuid>;
    /// Claims the oldest due job. A `running` job locked longer than
    /// `stale_after` ago belongs to a dead worker and is claimed again.
    async fn lock_next_status_poll_job(
        &self,
        stale_after: std::time::Duration,
    ) -> Result<Option<JobEntity>>;
    async fn mark_job_done(&self, job_id: Uuid) -> Result<()>;
    async fn mark_job_failed(&self, job_id: Uuid, err: &str) -> Result<()>;
    /// Deletes `done` and `failed` jobs scheduled before `older_than` ago.
    async fn prune_finished_jobs(&self, older_than: std::time::Duration) -> Result<usize>;
}
