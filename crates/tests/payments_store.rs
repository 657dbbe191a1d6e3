//! Postgres-backed checks of the payment store invariants.
//!
//! Runs only when `TEST_DATABASE_URL` points at a disposable database; the
//! payment tables are recreated on first use.

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use crates::{
    domain::{
        entities::{jobs::JobEntity, payments::InsertPaymentEntity},
        repositories::{
            jobs::JobRepository, payments::PaymentRepository,
            saved_payment_methods::SavedPaymentMethodRepository,
        },
        value_objects::{
            enums::{payment_types::PaymentType, poll_kinds::PollKind},
            payments::{CreatePaymentOutcome, StatusUpdate},
            saved_payment_methods::SavedPaymentMethodAttrs,
            status_poll::StatusPollPayload,
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::{self, PgPoolSquad},
            schema::jobs,
        },
        repositories::{
            jobs::{JobPostgres, MAX_CLAIM_ATTEMPTS}, payments::PaymentPostgres,
            saved_payment_methods::SavedPaymentMethodPostgres,
        },
    },
};
use diesel::{connection::SimpleConnection, prelude::*};
use serde_json::json;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/2025-01-15-000000_create_payments/up.sql");

const STALE_LOCK: Duration = Duration::from_secs(300);

static POOL: OnceLock<Option<Arc<PgPoolSquad>>> = OnceLock::new();

fn pool() -> Option<Arc<PgPoolSquad>> {
    POOL.get_or_init(|| {
        dotenvy::dotenv().ok();
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = postgres_connection::establish_connection_with_size(&url, 16)
            .expect("test database must be reachable");
        let mut conn = pool.get().expect("test connection");
        conn.batch_execute("DROP TABLE IF EXISTS payments, saved_payment_methods, jobs CASCADE;")
            .expect("drop tables");
        conn.batch_execute(SCHEMA).expect("apply schema");
        Some(Arc::new(pool))
    })
    .clone()
}

fn subscription_row(user_id: Uuid, gateway_id: String) -> InsertPaymentEntity {
    InsertPaymentEntity {
        user_id,
        payment_type: PaymentType::Recurring.as_str().into(),
        status: "unverified".into(),
        gateway_id: Some(gateway_id),
        amount: 1980,
        currency: "JPY".into(),
        mode: "test".into(),
        metadata: json!({}),
        raw_json: json!({}),
        period: Some("monthly".into()),
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn saved_method_upsert_is_idempotent() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = SavedPaymentMethodPostgres::new(Arc::clone(&pool));
    let user_id = Uuid::new_v4();
    let token = format!("tok_{}", Uuid::new_v4().simple());

    let first = repo
        .upsert_saved_method(&token, user_id, SavedPaymentMethodAttrs::default())
        .await
        .unwrap();
    let second = repo
        .upsert_saved_method(&token, user_id, SavedPaymentMethodAttrs::default())
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(second.last_used_at >= first.last_used_at);
    let owned = repo.list_active_for_user(user_id).await.unwrap();
    assert_eq!(owned.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscriptions_leave_exactly_one_active() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = Arc::new(PaymentPostgres::new(Arc::clone(&pool)));
    let user_id = Uuid::new_v4();

    let attempts: Vec<_> = (0..8)
        .map(|n| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.create_payment(subscription_row(user_id, format!("sub_{user_id}_{n}")))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    let mut refused = 0;
    for attempt in attempts {
        match attempt.await.unwrap().unwrap() {
            CreatePaymentOutcome::Created(_) => created += 1,
            CreatePaymentOutcome::ActiveSubscriptionExists(_) => refused += 1,
        }
    }

    assert_eq!(created, 1);
    assert_eq!(refused, 7);
    let active = repo.find_active_subscription(user_id).await.unwrap();
    assert!(active.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn newer_observation_clears_stale_error_columns() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = PaymentPostgres::new(Arc::clone(&pool));
    let user_id = Uuid::new_v4();
    let row = InsertPaymentEntity {
        user_id,
        payment_type: PaymentType::OneTime.as_str().into(),
        status: "pending".into(),
        gateway_id: Some(format!("ch_{}", Uuid::new_v4().simple())),
        amount: 500,
        currency: "JPY".into(),
        mode: "test".into(),
        metadata: json!({}),
        raw_json: json!({ "id": "ch_first" }),
        ..Default::default()
    };
    let CreatePaymentOutcome::Created(payment) = repo.create_payment(row).await.unwrap() else {
        panic!("one-time insert must not conflict");
    };

    repo.apply_status_update(
        payment.id,
        StatusUpdate {
            error_code: Some("card_declined".into()),
            error_message: Some("declined".into()),
            ..StatusUpdate::observed("failed")
        },
    )
    .await
    .unwrap();
    let recovered = repo
        .apply_status_update(
            payment.id,
            StatusUpdate {
                charged_amount: Some(500),
                ..StatusUpdate::observed("successful")
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(recovered.status, "successful");
    assert_eq!(recovered.charged_amount, Some(500));
    assert!(recovered.error_code.is_none());
    assert!(recovered.error_message.is_none());
    assert_eq!(recovered.raw_json, json!({ "id": "ch_first" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn local_transitions_keep_columns_they_do_not_mention() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = PaymentPostgres::new(Arc::clone(&pool));
    let row = InsertPaymentEntity {
        user_id: Uuid::new_v4(),
        payment_type: PaymentType::OneTime.as_str().into(),
        status: "pending".into(),
        gateway_id: Some(format!("ch_{}", Uuid::new_v4().simple())),
        amount: 500,
        currency: "JPY".into(),
        mode: "test".into(),
        metadata: json!({}),
        raw_json: json!({}),
        ..Default::default()
    };
    let CreatePaymentOutcome::Created(payment) = repo.create_payment(row).await.unwrap() else {
        panic!("one-time insert must not conflict");
    };

    repo.apply_status_update(
        payment.id,
        StatusUpdate {
            charged_amount: Some(500),
            ..StatusUpdate::observed("successful")
        },
    )
    .await
    .unwrap();
    let updated = repo
        .apply_status_update(
            payment.id,
            StatusUpdate {
                refunded_amount: Some(500),
                ..StatusUpdate::status_only("refunded")
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.status, "refunded");
    assert_eq!(updated.charged_amount, Some(500));
    assert_eq!(updated.refunded_amount, Some(500));
    assert!(
        repo.apply_status_update(Uuid::new_v4(), StatusUpdate::status_only("failed"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn due_poll_jobs_are_claimed_once_until_their_lock_goes_stale() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = JobPostgres::new(Arc::clone(&pool));
    let payment_id = Uuid::new_v4();

    let job_id = repo
        .enqueue_status_poll(
            StatusPollPayload {
                payment_id,
                kind: PollKind::Charge,
                attempt: 1,
            },
            Duration::ZERO,
        )
        .await
        .unwrap();
    repo.enqueue_status_poll(
        StatusPollPayload {
            payment_id,
            kind: PollKind::Charge,
            attempt: 2,
        },
        Duration::from_secs(3600),
    )
    .await
    .unwrap();

    let mut claimed = Vec::new();
    while let Some(job) = repo.lock_next_status_poll_job(STALE_LOCK).await.unwrap() {
        claimed.push(job);
    }

    let ours: Vec<_> = claimed.iter().filter(|job| job.id == job_id).collect();
    assert_eq!(ours.len(), 1);
    assert_eq!(ours[0].attempts, 1);
    assert_eq!(ours[0].status, "running");
    let first_owner = ours[0].locked_by.clone();
    for job in claimed.iter().filter(|job| job.id != job_id) {
        repo.mark_job_done(job.id).await.unwrap();
    }

    // The worker holding the lock died an hour ago.
    expire_lock(&pool, job_id);
    let reclaimed = repo
        .lock_next_status_poll_job(STALE_LOCK)
        .await
        .unwrap()
        .expect("stale job is claimable again");
    assert_eq!(reclaimed.id, job_id);
    assert_eq!(reclaimed.attempts, 2);
    assert_ne!(reclaimed.locked_by, first_owner);

    pool.get()
        .unwrap()
        .batch_execute(&format!(
            "UPDATE jobs SET attempts = {MAX_CLAIM_ATTEMPTS} WHERE id = '{job_id}';"
        ))
        .unwrap();
    expire_lock(&pool, job_id);
    assert!(repo.lock_next_status_poll_job(STALE_LOCK).await.unwrap().is_none());
    let abandoned = load_job(&pool, job_id);
    assert_eq!(abandoned.status, "failed");
    assert!(abandoned.locked_by.is_none());
    assert!(abandoned.error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pruning_deletes_only_old_finished_jobs() {
    let Some(pool) = pool() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let repo = JobPostgres::new(Arc::clone(&pool));
    let (old_done, old_failed, recent_done) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    pool.get()
        .unwrap()
        .batch_execute(&format!(
            "INSERT INTO jobs (id, type, payload, run_at, attempts, status) VALUES \
             ('{old_done}', 'status_poll', '{{}}', now() - interval '10 days', 1, 'done'), \
             ('{old_failed}', 'status_poll', '{{}}', now() - interval '10 days', 1, 'failed'), \
             ('{recent_done}', 'status_poll', '{{}}', now() - interval '1 hour', 1, 'done');"
        ))
        .unwrap();

    let deleted = repo
        .prune_finished_jobs(Duration::from_secs(7 * 24 * 3600))
        .await
        .unwrap();

    assert!(deleted >= 2);
    let mut conn = pool.get().unwrap();
    let remaining: Vec<Uuid> = jobs::table
        .filter(jobs::id.eq_any([old_done, old_failed, recent_done]))
        .select(jobs::id)
        .load(&mut conn)
        .unwrap();
    assert_eq!(remaining, vec![recent_done]);
}

fn expire_lock(pool: &PgPoolSquad, job_id: Uuid) {
    pool.get()
        .unwrap()
        .batch_execute(&format!(
            "UPDATE jobs SET locked_at = now() - interval '1 hour' WHERE id = '{job_id}';"
        ))
        .unwrap();
}

fn load_job(pool: &PgPoolSquad, job_id: Uuid) -> JobEntity {
    let mut conn = pool.get().unwrap();
    jobs::table
        .find(job_id)
        .select(JobEntity::as_select())
        .first(&mut conn)
        .unwrap()
}
