use anyhow::{Context, Result};
use async_trait::async_trait;
use backend::usecases::{
    gateway::PaymentGateway,
    reconciler::{PollOutcome, StatusReconciler},
};
use crates::domain::{
    entities::jobs::JobEntity,
    repositories::{
        jobs::JobRepository, notifier::PaymentNotifier, payments::PaymentRepository,
        status_poll_scheduler::StatusPollScheduler,
    },
    value_objects::status_poll::StatusPollPayload,
};
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::config_model::StatusPolling;

/// Executes one deferred status poll.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusPollHandler {
    async fn poll(&self, payload: StatusPollPayload) -> Result<PollOutcome>;
}

#[async_trait]
impl<P, G, S, N> StatusPollHandler for StatusReconciler<P, G, S, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    async fn poll(&self, payload: StatusPollPayload) -> Result<PollOutcome> {
        StatusReconciler::poll(self, payload).await
    }
}

/// How often an idle worker deletes old finished jobs.
const PRUNE_EVERY: Duration = Duration::from_secs(3600);

pub async fn run(
    job_repo: Arc<dyn JobRepository + Send + Sync>,
    handler: Arc<dyn StatusPollHandler + Send + Sync>,
    settings: StatusPolling,
) -> Result<()> {
    info!(
        idle_secs = settings.idle_interval.as_secs(),
        stale_lock_secs = settings.stale_lock.as_secs(),
        retention_secs = settings.job_retention.as_secs(),
        "status_poll: starting worker loop"
    );
    let mut last_prune: Option<Instant> = None;
    loop {
        match process_next_job(&job_repo, &handler, settings.stale_lock).await {
            Ok(true) => continue,
            Ok(false) => {
                prune_if_due(&job_repo, settings.job_retention, &mut last_prune).await;
                tokio::time::sleep(settings.idle_interval).await;
            }
            Err(e) => {
                error!(error = %e, "status_poll: error locking next job");
                tokio::time::sleep(settings.idle_interval).await;
            }
        }
    }
}

/// Deletes expired finished jobs at most once per [`PRUNE_EVERY`].
pub async fn prune_if_due(
    job_repo: &Arc<dyn JobRepository + Send + Sync>,
    retention: Duration,
    last_prune: &mut Option<Instant>,
) {
    if last_prune.is_some_and(|at| at.elapsed() < PRUNE_EVERY) {
        return;
    }
    *last_prune = Some(Instant::now());
    match job_repo.prune_finished_jobs(retention).await {
        Ok(0) => {}
        Ok(deleted) => info!(deleted, "status_poll: pruned finished jobs"),
        Err(e) => warn!(error = %e, "status_poll: failed to prune finished jobs"),
    }
}

/// Claims and runs at most one due job. `Ok(false)` when nothing is due.
pub async fn process_next_job(
    job_repo: &Arc<dyn JobRepository + Send + Sync>,
    handler: &Arc<dyn StatusPollHandler + Send + Sync>,
    stale_after: Duration,
) -> Result<bool> {
    let Some(job) = job_repo.lock_next_status_poll_job(stale_after).await? else {
        return Ok(false);
    };

    info!(job_id = %job.id, attempts = job.attempts, "status_poll: processing job");
    match run_job(handler, &job).await {
        Ok(outcome) => {
            info!(job_id = %job.id, outcome = ?outcome, "status_poll: job processed");
            if let Err(mark_err) = job_repo.mark_job_done(job.id).await {
                error!(
                    job_id = %job.id,
                    error = %mark_err,
                    "status_poll: failed to mark job as done"
                );
            }
        }
        Err(e) => {
            // No retry: the webhook channel and the scheduled second poll cover it.
            warn!(job_id = %job.id, error = %e, "status_poll: job failed");
            if let Err(mark_err) = job_repo.mark_job_failed(job.id, &e.to_string()).await {
                error!(
                    job_id = %job.id,
                    error = %mark_err,
                    "status_poll: failed to mark job as failed"
                );
            }
        }
    }
    Ok(true)
}

async fn run_job(
    handler: &Arc<dyn StatusPollHandler + Send + Sync>,
    job: &JobEntity,
) -> Result<PollOutcome> {
    let payload: StatusPollPayload = serde_json::from_value(job.payload.clone())
        .context("status_poll payload is malformed")?;
    handler.poll(payload).await
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crates::domain::{
        repositories::jobs::MockJobRepository,
        value_objects::enums::poll_kinds::PollKind,
    };
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;

    const STALE: Duration = Duration::from_secs(300);

    fn job(payload: Value) -> JobEntity {
        JobEntity {
            id: Uuid::new_v4(),
            type_: "status_poll".into(),
            payload,
            run_at: Utc::now(),
            attempts: 1,
            locked_at: Some(Utc::now()),
            locked_by: Some("worker-test".into()),
            error: None,
            status: "running".into(),
            created_at: Utc::now(),
        }
    }

    fn as_dyn_jobs(repo: MockJobRepository) -> Arc<dyn JobRepository + Send + Sync> {
        Arc::new(repo)
    }

    fn as_dyn_handler(handler: MockStatusPollHandler) -> Arc<dyn StatusPollHandler + Send + Sync> {
        Arc::new(handler)
    }

    #[tokio::test]
    async fn empty_queue_reports_idle() {
        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .returning(|_| Box::pin(async { Ok(None) }));

        let processed = process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(MockStatusPollHandler::new()), STALE)
            .await
            .unwrap();
        assert!(!processed);
    }

    #[tokio::test]
    async fn successful_poll_marks_job_done() {
        let payment_id = Uuid::new_v4();
        let claimed = job(json!({ "payment_id": payment_id, "kind": "charge", "attempt": 1 }));
        let job_id = claimed.id;

        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .times(1)
            .returning(move |_| {
                let claimed = claimed.clone();
                Box::pin(async move { Ok(Some(claimed)) })
            });
        repo.expect_mark_job_done()
            .withf(move |id| *id == job_id)
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));
        repo.expect_mark_job_failed().never();

        let mut handler = MockStatusPollHandler::new();
        handler
            .expect_poll()
            .withf(move |payload| {
                payload.payment_id == payment_id
                    && payload.kind == PollKind::Charge
                    && payload.attempt == 1
            })
            .times(1)
            .returning(|_| {
                Ok(PollOutcome::Updated {
                    status: "successful".into(),
                })
            });

        let processed = process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(handler), STALE)
            .await
            .unwrap();
        assert!(processed);
    }

    #[tokio::test]
    async fn failed_poll_marks_job_failed_with_reason() {
        let claimed = job(json!({
            "payment_id": Uuid::new_v4(),
            "kind": "subscription",
            "attempt": 1
        }));

        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .returning(move |_| {
                let claimed = claimed.clone();
                Box::pin(async move { Ok(Some(claimed)) })
            });
        repo.expect_mark_job_failed()
            .withf(|_, err| err.contains("gateway unavailable"))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));
        repo.expect_mark_job_done().never();

        let mut handler = MockStatusPollHandler::new();
        handler
            .expect_poll()
            .returning(|_| Err(anyhow::anyhow!("gateway unavailable")));

        let processed = process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(handler), STALE)
            .await
            .unwrap();
        assert!(processed);
    }

    #[tokio::test]
    async fn malformed_payload_fails_without_polling() {
        let claimed = job(json!({ "recording_id": 7 }));

        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .returning(move |_| {
                let claimed = claimed.clone();
                Box::pin(async move { Ok(Some(claimed)) })
            });
        repo.expect_mark_job_failed()
            .withf(|_, err| err.contains("malformed"))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let mut handler = MockStatusPollHandler::new();
        handler.expect_poll().never();

        process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(handler), STALE)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn lock_errors_bubble_up() {
        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("connection reset")) }));

        let result =
            process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(MockStatusPollHandler::new()), STALE)
                .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stale_lock_timeout_reaches_the_claim() {
        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .withf(|stale_after| *stale_after == Duration::from_secs(42))
            .times(1)
            .returning(|_| Box::pin(async { Ok(None) }));

        let processed = process_next_job(
            &as_dyn_jobs(repo),
            &as_dyn_handler(MockStatusPollHandler::new()),
            Duration::from_secs(42),
        )
        .await
        .unwrap();
        assert!(!processed);
    }

    #[tokio::test]
    async fn reclaimed_job_runs_again() {
        let mut claimed = job(json!({
            "payment_id": Uuid::new_v4(),
            "kind": "charge",
            "attempt": 1
        }));
        claimed.attempts = 2;
        claimed.locked_by = Some("worker-after-crash".into());
        let job_id = claimed.id;

        let mut repo = MockJobRepository::new();
        repo.expect_lock_next_status_poll_job()
            .times(1)
            .returning(move |_| {
                let claimed = claimed.clone();
                Box::pin(async move { Ok(Some(claimed)) })
            });
        repo.expect_mark_job_done()
            .withf(move |id| *id == job_id)
            .times(1)
            .returning(|_| Box::pin(async { Ok(()) }));

        let mut handler = MockStatusPollHandler::new();
        handler
            .expect_poll()
            .times(1)
            .returning(|_| Ok(PollOutcome::Updated { status: "successful".into() }));

        assert!(
            process_next_job(&as_dyn_jobs(repo), &as_dyn_handler(handler), STALE)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn pruning_runs_once_per_window() {
        let retention = Duration::from_secs(7 * 24 * 3600);
        let mut repo = MockJobRepository::new();
        repo.expect_prune_finished_jobs()
            .withf(move |older_than| *older_than == retention)
            .times(1)
            .returning(|_| Box::pin(async { Ok(12) }));
        let repo = as_dyn_jobs(repo);

        let mut last_prune = None;
        prune_if_due(&repo, retention, &mut last_prune).await;
        prune_if_due(&repo, retention, &mut last_prune).await;

        assert!(last_prune.is_some());
    }

    #[tokio::test]
    async fn prune_failure_waits_for_the_next_window() {
        let mut repo = MockJobRepository::new();
        repo.expect_prune_finished_jobs()
            .times(1)
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("statement timeout")) }));
        let repo = as_dyn_jobs(repo);

        let mut last_prune = None;
        prune_if_due(&repo, Duration::from_secs(60), &mut last_prune).await;
        prune_if_due(&repo, Duration::from_secs(60), &mut last_prune).await;

        assert!(last_prune.is_some());
    }
}
