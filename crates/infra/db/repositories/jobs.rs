use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::{sync::Arc, time::Duration};
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::jobs},
};
use domain::{
    entities::jobs::{InsertJobEntity, JobEntity},
    repositories::{jobs::JobRepository, status_poll_scheduler::StatusPollScheduler},
    value_objects::{
        enums::{job_statuses::JobStatus, poll_kinds::PollKind},
        status_poll::{STATUS_POLL_JOB_TYPE, StatusPollPayload},
    },
};

/// Claims a job may take before a stale lock is failed instead of reclaimed.
pub const MAX_CLAIM_ATTEMPTS: i32 = 3;

pub struct JobPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl JobPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl JobRepository for JobPostgres {
    async fn enqueue_status_poll(&self, payload: StatusPollPayload, delay: Duration) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let insert_entity = InsertJobEntity {
            type_: STATUS_POLL_JOB_TYPE.to_string(),
            payload: serde_json::to_value(payload)?,
            run_at: Utc::now() + chrono::Duration::from_std(delay)?,
            attempts: 0,
            status: JobStatus::Queued.to_string(),
        };

        let result = diesel::insert_into(jobs::table)
            .values(&insert_entity)
            .returning(jobs::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn lock_next_status_poll_job(&self, stale_after: Duration) -> Result<Option<JobEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let worker_id = Uuid::new_v4().to_string();
        let current_time = Utc::now();
        let stale_cutoff = current_time - chrono::Duration::from_std(stale_after)?;

        let job = conn.transaction::<Option<JobEntity>, diesel::result::Error, _>(|conn| {
            let abandoned = diesel::update(
                jobs::table
                    .filter(jobs::type_.eq(STATUS_POLL_JOB_TYPE))
                    .filter(jobs::status.eq(JobStatus::Running.as_str()))
                    .filter(jobs::locked_at.lt(stale_cutoff))
                    .filter(jobs::attempts.ge(MAX_CLAIM_ATTEMPTS)),
            )
            .set((
                jobs::status.eq(JobStatus::Failed.as_str()),
                jobs::error.eq(Some("lock expired after the last claim attempt")),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(conn)?;
            if abandoned > 0 {
                warn!(abandoned, "status_poll: stale jobs failed after repeated claims");
            }

            let candidate = jobs::table
                .select(JobEntity::as_select())
                .filter(jobs::type_.eq(STATUS_POLL_JOB_TYPE))
                .filter(
                    jobs::status.eq(JobStatus::Queued.as_str()).or(jobs::status
                        .eq(JobStatus::Running.as_str())
                        .and(jobs::locked_at.lt(stale_cutoff))),
                )
                .filter(jobs::run_at.le(current_time))
                .order(jobs::run_at.asc())
                .for_update()
                .skip_locked()
                .first::<JobEntity>(conn)
                .optional()?;

            let Some(job) = candidate else {
                return Ok(None);
            };

            let locked = diesel::update(jobs::table.find(job.id))
                .set((
                    jobs::status.eq(JobStatus::Running.as_str()),
                    jobs::attempts.eq(job.attempts + 1),
                    jobs::locked_at.eq(Some(current_time)),
                    jobs::locked_by.eq(Some(worker_id)),
                ))
                .returning(JobEntity::as_select())
                .get_result::<JobEntity>(conn)?;
            if job.status == JobStatus::Running.as_str() {
                warn!(
                    job_id = %locked.id,
                    previous_owner = ?job.locked_by,
                    "status_poll: reclaimed job with a stale lock"
                );
            }
            Ok(Some(locked))
        })?;

        Ok(job)
    }

    async fn mark_job_done(&self, job_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(JobStatus::Done.as_str()),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_job_failed(&self, job_id: Uuid, err: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // No backoff: the reconciler schedules its own single retry.
        diesel::update(jobs::table.find(job_id))
            .set((
                jobs::status.eq(JobStatus::Failed.as_str()),
                jobs::error.eq(Some(err)),
                jobs::locked_at.eq::<Option<DateTime<Utc>>>(None),
                jobs::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn prune_finished_jobs(&self, older_than: Duration) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than)?;

        let deleted = diesel::delete(
            jobs::table
                .filter(
                    jobs::status.eq_any([JobStatus::Done.as_str(), JobStatus::Failed.as_str()]),
                )
                .filter(jobs::run_at.lt(cutoff)),
        )
        .execute(&mut conn)?;

        Ok(deleted)
    }
}

#[async_trait]
impl StatusPollScheduler for JobPostgres {
    async fn schedule(
        &self,
        kind: PollKind,
        payment_id: Uuid,
        delay: Duration,
        attempt: u32,
    ) -> Result<()> {
        let payload = StatusPollPayload {
            payment_id,
            kind,
            attempt,
        };
        self.enqueue_status_poll(payload, delay).await?;
        Ok(())
    }
}
