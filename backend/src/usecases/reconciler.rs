use std::{sync::Arc, time::Duration};

use anyhow::{Result as AnyResult, anyhow};
use crates::domain::{
    entities::payments::PaymentEntity,
    repositories::{
        notifier::{PaymentNotice, PaymentNoticeKind, PaymentNotifier},
        payments::PaymentRepository,
        status_poll_scheduler::StatusPollScheduler,
    },
    value_objects::{
        enums::{
            payment_statuses::{OneTimeStatus, PaymentStatus, RecurringStatus},
            payment_types::PaymentType,
            poll_kinds::PollKind,
        },
        gateway_webhook::{GatewayWebhookEvent, WebhookTarget},
        payments::{StatusUpdate, StatusUpdateKind},
        status_poll::StatusPollPayload,
    },
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    cancel_refund::refund_status,
    gateway::PaymentGateway,
    gateway_documents,
    payment_errors::{PaymentError, UseCaseResult},
};

type HmacSha256 = Hmac<Sha256>;

/// Poll timing and webhook verification settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub poll_after: Duration,
    pub poll_retry_after: Duration,
    pub poll_fallback_enabled: bool,
    /// Shared secret for `X-Signature`. `None` disables verification.
    pub webhook_secret: Option<String>,
}

/// Schedules the deferred status polls that back up the webhook channel.
pub struct DeferredPoller<S>
where
    S: StatusPollScheduler + Send + Sync + 'static,
{
    scheduler: Arc<S>,
    config: ReconcilerConfig,
}

impl<S> Clone for DeferredPoller<S>
where
    S: StatusPollScheduler + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
            config: self.config.clone(),
        }
    }
}

impl<S> DeferredPoller<S>
where
    S: StatusPollScheduler + Send + Sync + 'static,
{
    pub fn new(scheduler: Arc<S>, config: ReconcilerConfig) -> Self {
        Self { scheduler, config }
    }

    pub async fn schedule_first_poll(&self, kind: PollKind, payment_id: Uuid) {
        self.schedule(kind, payment_id, self.config.poll_after, 1)
            .await
    }

    async fn schedule_retry(&self, kind: PollKind, payment_id: Uuid) {
        self.schedule(kind, payment_id, self.config.poll_retry_after, 2)
            .await
    }

    async fn schedule(&self, kind: PollKind, payment_id: Uuid, delay: Duration, attempt: u32) {
        if !self.config.poll_fallback_enabled {
            debug!(%payment_id, %kind, "reconciler: poll fallback disabled, not scheduling");
            return;
        }

        match self
            .scheduler
            .schedule(kind, payment_id, delay, attempt)
            .await
        {
            Ok(()) => info!(
                %payment_id,
                %kind,
                attempt,
                delay_secs = delay.as_secs(),
                "reconciler: status poll scheduled"
            ),
            // The webhook channel still converges the row.
            Err(err) => error!(
                %payment_id,
                %kind,
                attempt,
                error = ?err,
                "reconciler: failed to schedule status poll"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookOutcome {
    pub updated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Updated { status: String },
    RetryScheduled { status: String },
    Skipped(&'static str),
}

pub struct StatusReconciler<P, G, S, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    gateway: Arc<G>,
    poller: DeferredPoller<S>,
    notifier: Arc<N>,
    webhook_secret: Option<String>,
}

impl<P, G, S, N> StatusReconciler<P, G, S, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        gateway: Arc<G>,
        scheduler: Arc<S>,
        notifier: Arc<N>,
        config: ReconcilerConfig,
    ) -> Self {
        let webhook_secret = config.webhook_secret.clone().filter(|s| !s.is_empty());
        Self {
            payment_repo,
            gateway,
            poller: DeferredPoller::new(scheduler, config),
            notifier,
            webhook_secret,
        }
    }

    pub fn poller(&self) -> DeferredPoller<S> {
        self.poller.clone()
    }

    /// Checks `X-Signature` (hex HMAC-SHA256 of the raw body, optionally
    /// prefixed with `sha256=`) in constant time.
    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> UseCaseResult<()> {
        let Some(secret) = self.webhook_secret.as_deref() else {
            debug!("reconciler: webhook secret not configured, skipping signature check");
            return Ok(());
        };

        let provided = signature
            .map(str::trim)
            .map(|value| value.strip_prefix("sha256=").unwrap_or(value))
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                warn!("reconciler: webhook rejected, signature header missing");
                PaymentError::Unauthorized
            })?;

        let provided = hex::decode(provided).map_err(|_| {
            warn!("reconciler: webhook rejected, signature is not hex");
            PaymentError::Unauthorized
        })?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|err| PaymentError::Internal(anyhow!("invalid webhook secret: {err}")))?;
        mac.update(body);
        mac.verify_slice(&provided).map_err(|_| {
            warn!("reconciler: webhook rejected, signature mismatch");
            PaymentError::Unauthorized
        })
    }

    /// Applies a gateway notification. Only a bad signature is an error; every
    /// other failure is logged so the gateway does not retry.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<WebhookOutcome> {
        self.verify_signature(body, signature)?;

        let payload: Value = match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "reconciler: webhook body is not JSON, ignoring");
                return Ok(WebhookOutcome { updated: false });
            }
        };
        let Some(event) = GatewayWebhookEvent::from_value(&payload) else {
            warn!("reconciler: webhook carries no event type or status, ignoring");
            return Ok(WebhookOutcome { updated: false });
        };

        info!(
            event_type = ?event.event_type,
            gateway_status = ?event.status,
            targets = event.targets.len(),
            "reconciler: webhook received"
        );

        for target in &event.targets {
            let applied = match target {
                WebhookTarget::Charge(gateway_id) | WebhookTarget::Subscription(gateway_id) => {
                    self.apply_webhook_status(gateway_id, &event).await
                }
                WebhookTarget::Refund { charge_id, amount } => {
                    self.apply_webhook_refund(charge_id, *amount, &event).await
                }
            };

            match applied {
                Ok(true) => return Ok(WebhookOutcome { updated: true }),
                Ok(false) => continue,
                Err(err) => {
                    error!(error = ?err, "reconciler: webhook processing failed");
                    continue;
                }
            }
        }

        Ok(WebhookOutcome { updated: false })
    }

    async fn apply_webhook_status(
        &self,
        gateway_id: &str,
        event: &GatewayWebhookEvent,
    ) -> AnyResult<bool> {
        let Some(status) = event.status.clone() else {
            debug!(gateway_id, "reconciler: webhook has no status, nothing to merge");
            return Ok(false);
        };
        let Some(payment) = self.payment_repo.find_by_gateway_id(gateway_id).await? else {
            info!(gateway_id, "reconciler: webhook for unknown payment, ignoring");
            return Ok(false);
        };

        let mut update = gateway_documents::status_update(&event.document)
            .unwrap_or_else(|| StatusUpdate::observed(status.clone()));
        update.status = status;

        let previous = payment.status.clone();
        let Some(updated) = self.merge(&payment, update, "webhook").await? else {
            return Ok(false);
        };

        if is_subscription_completion(&previous, &updated) {
            self.notify_completed(&updated).await;
        }
        Ok(true)
    }

    async fn apply_webhook_refund(
        &self,
        charge_id: &str,
        amount: Option<i64>,
        event: &GatewayWebhookEvent,
    ) -> AnyResult<bool> {
        if event.status.as_deref() != Some(OneTimeStatus::Successful.as_str()) {
            debug!(charge_id, status = ?event.status, "reconciler: refund not settled, ignoring");
            return Ok(false);
        }
        let Some(payment) = self.payment_repo.find_by_gateway_id(charge_id).await? else {
            info!(charge_id, "reconciler: refund for unknown charge, ignoring");
            return Ok(false);
        };

        // The event may confirm a refund already recorded by `refund_charge`,
        // so it raises the stored total instead of adding to it.
        let refunded = amount
            .unwrap_or(payment.amount)
            .max(payment.refunded_amount.unwrap_or(0));
        let status = refund_status(Some(refunded), payment.amount);
        let update = StatusUpdate {
            refunded_amount: Some(refunded),
            ..StatusUpdate::status_only(status.as_str())
        };
        Ok(self.merge(&payment, update, "webhook").await?.is_some())
    }

    /// Last write wins: the observation overwrites the stored status.
    async fn merge(
        &self,
        payment: &PaymentEntity,
        update: StatusUpdate,
        channel: &'static str,
    ) -> AnyResult<Option<PaymentEntity>> {
        if let Some(payment_type) = PaymentType::from_str(&payment.payment_type) {
            if PaymentStatus::parse(payment_type, &update.status).is_none() {
                warn!(
                    payment_id = %payment.id,
                    payment_type = %payment_type,
                    gateway_status = %update.status,
                    channel,
                    "reconciler: status outside known vocabulary, storing verbatim"
                );
            }
            if update.kind == StatusUpdateKind::Observation
                && overwrites_terminal_status(payment_type, &payment.status, &update.status)
            {
                warn!(
                    payment_id = %payment.id,
                    previous_status = %payment.status,
                    gateway_status = %update.status,
                    channel,
                    "reconciler: terminal status overwritten by a later observation"
                );
            }
        }

        let new_status = update.status.clone();
        let updated = self
            .payment_repo
            .apply_status_update(payment.id, update)
            .await?;

        match &updated {
            Some(_) => info!(
                payment_id = %payment.id,
                previous_status = %payment.status,
                gateway_status = %new_status,
                channel,
                "reconciler: status merged"
            ),
            None => info!(
                payment_id = %payment.id,
                channel,
                "reconciler: payment disappeared before merge"
            ),
        }
        Ok(updated)
    }

    /// Runs one deferred poll. Errors are returned so the job can be marked failed.
    pub async fn poll(&self, payload: StatusPollPayload) -> AnyResult<PollOutcome> {
        let StatusPollPayload {
            payment_id,
            kind,
            attempt,
        } = payload;

        let Some(payment) = self.payment_repo.find_by_id(payment_id).await? else {
            info!(%payment_id, "status_poll: payment no longer exists, skipping");
            return Ok(PollOutcome::Skipped("payment not found"));
        };
        let Some(gateway_id) = payment.gateway_id.clone() else {
            info!(%payment_id, "status_poll: payment has no gateway id, skipping");
            return Ok(PollOutcome::Skipped("no gateway id"));
        };

        let document = match kind {
            PollKind::Charge => self.gateway.get_charge(&gateway_id).await,
            PollKind::Subscription => self.gateway.get_subscription(&gateway_id).await,
        }
        .map_err(|err| {
            warn!(
                %payment_id,
                %gateway_id,
                %kind,
                attempt,
                gateway_status = err.status,
                "status_poll: gateway fetch failed"
            );
            anyhow::Error::new(err)
        })?;

        let Some(update) = gateway_documents::status_update(&document) else {
            info!(%payment_id, %kind, "status_poll: gateway document has no status");
            return Ok(PollOutcome::Skipped("no status in gateway document"));
        };

        let status = update.status.clone();
        if self.merge(&payment, update, "poll").await?.is_none() {
            return Ok(PollOutcome::Skipped("payment not found"));
        }

        let still_settling = kind == PollKind::Charge
            && OneTimeStatus::from_str(&status).is_some_and(|s| s.is_settling());
        if still_settling && attempt <= 1 {
            self.poller.schedule_retry(kind, payment_id).await;
            return Ok(PollOutcome::RetryScheduled { status });
        }

        Ok(PollOutcome::Updated { status })
    }

    async fn notify_completed(&self, payment: &PaymentEntity) {
        let notice = PaymentNotice {
            user_id: payment.user_id,
            recipient: recipient_of(payment),
            kind: PaymentNoticeKind::SubscriptionCompleted,
            payment_id: payment.id,
            gateway_id: payment.gateway_id.clone(),
        };
        if let Err(err) = self.notifier.send_notice(notice).await {
            warn!(payment_id = %payment.id, error = ?err, "reconciler: completion notice failed");
        }
    }
}

fn is_subscription_completion(previous: &str, updated: &PaymentEntity) -> bool {
    updated.payment_type == PaymentType::Recurring.as_str()
        && updated.status == RecurringStatus::Completed.as_str()
        && previous != RecurringStatus::Completed.as_str()
}

pub(crate) fn recipient_of(payment: &PaymentEntity) -> Option<String> {
    payment
        .metadata
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// True when a gateway observation replaces a terminal status with a different one.
fn overwrites_terminal_status(payment_type: PaymentType, stored: &str, observed: &str) -> bool {
    stored != observed
        && PaymentStatus::parse(payment_type, stored).is_some_and(|status| status.is_terminal())
}
