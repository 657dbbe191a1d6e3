use std::sync::Arc;

use chrono::Utc;
use crates::{
    domain::{
        entities::payments::PaymentEntity,
        repositories::{
            notifier::{PaymentNotice, PaymentNoticeKind, PaymentNotifier},
            payments::PaymentRepository,
        },
        value_objects::{
            enums::{
                payment_statuses::{OneTimeStatus, RecurringStatus},
                payment_types::PaymentType,
            },
            payment_requests::{
                CancelSubscriptionRequest, RefundChargeRequest, RequestValidationError,
            },
            payments::{PaymentDto, StatusUpdate},
        },
    },
    payments::gateway_client::{GatewayClient, RefundParams},
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    gateway::PaymentGateway,
    payment_errors::{PaymentError, UseCaseResult},
    reconciler::recipient_of,
};

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub payment: PaymentDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// A refund of `requested` (full when `None`) against a charge of `charge_amount`.
pub fn refund_status(requested: Option<i64>, charge_amount: i64) -> OneTimeStatus {
    match requested {
        Some(amount) if amount < charge_amount => OneTimeStatus::PartiallyRefunded,
        _ => OneTimeStatus::Refunded,
    }
}

pub struct CancelRefundUseCase<P, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    gateway: Arc<G>,
    notifier: Arc<N>,
}

impl<P, G, N> CancelRefundUseCase<P, G, N>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<P>, gateway: Arc<G>, notifier: Arc<N>) -> Self {
        Self {
            payment_repo,
            gateway,
            notifier,
        }
    }

    pub async fn cancel_subscription(
        &self,
        user_id: Uuid,
        request: CancelSubscriptionRequest,
    ) -> UseCaseResult<CancelOutcome> {
        let command = request.validate()?;

        let subscription = match command.subscription_id {
            Some(payment_id) => self.payment_repo.find_by_id(payment_id).await,
            None => self.payment_repo.find_active_subscription(user_id).await,
        }
        .map_err(|err| {
            error!(%user_id, db_error = ?err, "cancel_subscription: lookup failed");
            PaymentError::Internal(err)
        })?
        .filter(|payment| {
            payment.user_id == user_id && payment.payment_type == PaymentType::Recurring.as_str()
        })
        .ok_or(PaymentError::NotFound("subscription"))?;

        let payment_id = subscription.id;
        let mut note = None;
        let mut raw_json = None;

        match subscription.gateway_id.as_deref() {
            None => {
                warn!(%user_id, %payment_id, "cancel_subscription: no gateway id, cancelling locally");
                note = Some("no gateway subscription was recorded; cancelled locally");
            }
            Some(gateway_id) => match self
                .gateway
                .cancel_subscription(gateway_id, command.termination_mode.as_str())
                .await
            {
                Ok(document) => {
                    raw_json = Some(document).filter(|doc| doc.as_object().is_some_and(|o| !o.is_empty()));
                }
                Err(err) if err.is_not_found() => {
                    info!(%user_id, %payment_id, gateway_id, "cancel_subscription: already gone at gateway");
                    note = Some("subscription was already cancelled at the gateway");
                }
                Err(err) => {
                    warn!(
                        %user_id,
                        %payment_id,
                        gateway_id,
                        gateway_status = err.status,
                        "cancel_subscription: gateway refused cancellation"
                    );
                    return Err(PaymentError::Gateway(err));
                }
            },
        }

        let update = StatusUpdate {
            cancelled_on: Some(Utc::now()),
            termination_mode: Some(command.termination_mode.as_str().to_string()),
            raw_json,
            ..StatusUpdate::status_only(RecurringStatus::Canceled.as_str())
        };
        let cancelled = self
            .payment_repo
            .apply_status_update(payment_id, update)
            .await
            .map_err(|err| {
                error!(%user_id, %payment_id, db_error = ?err, "cancel_subscription: update failed");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("subscription"))?;

        info!(
            %user_id,
            %payment_id,
            termination_mode = %command.termination_mode.as_str(),
            reason = ?command.reason,
            "cancel_subscription: subscription cancelled"
        );
        self.send_notice(&cancelled, PaymentNoticeKind::SubscriptionCancelled)
            .await;

        Ok(CancelOutcome {
            payment: cancelled.into(),
            note,
        })
    }

    pub async fn refund_charge(
        &self,
        user_id: Uuid,
        request: RefundChargeRequest,
    ) -> UseCaseResult<PaymentDto> {
        let command = request.validate()?;

        let charge = self
            .resolve_charge(&command.charge_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "refund_charge: lookup failed");
                PaymentError::Internal(err)
            })?
            .filter(|payment| {
                payment.user_id == user_id && payment.payment_type == PaymentType::OneTime.as_str()
            })
            .ok_or(PaymentError::NotFound("charge"))?;
        let gateway_id = charge
            .gateway_id
            .clone()
            .ok_or(PaymentError::NotFound("charge"))?;

        let already_refunded = charge.refunded_amount.unwrap_or(0);
        let remaining = charge.amount - already_refunded;
        if remaining <= 0 {
            return Err(
                RequestValidationError::new("charge_id", "charge is already fully refunded").into(),
            );
        }
        let amount = command.amount.unwrap_or(remaining);
        let mut metadata = Map::new();
        metadata.insert("user_id".into(), Value::String(user_id.to_string()));
        let params = RefundParams {
            amount,
            currency: charge.currency.clone(),
            reason: command.reason.clone(),
            metadata,
        };

        self.gateway
            .refund_charge(&gateway_id, params, GatewayClient::new_idempotency_key())
            .await
            .map_err(|err| {
                warn!(
                    %user_id,
                    payment_id = %charge.id,
                    gateway_id = %gateway_id,
                    gateway_status = err.status,
                    "refund_charge: gateway refused refund"
                );
                PaymentError::Gateway(err)
            })?;

        // `refunded_amount` is the running total across refunds of this charge.
        let refunded_total = already_refunded + amount;
        let status = refund_status(Some(refunded_total), charge.amount);
        let update = StatusUpdate {
            refunded_amount: Some(refunded_total),
            ..StatusUpdate::status_only(status.as_str())
        };
        let refunded = self
            .payment_repo
            .apply_status_update(charge.id, update)
            .await
            .map_err(|err| {
                error!(%user_id, payment_id = %charge.id, db_error = ?err, "refund_charge: update failed");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("charge"))?;

        info!(
            %user_id,
            payment_id = %refunded.id,
            gateway_id = %gateway_id,
            amount,
            status = %refunded.status,
            "refund_charge: refund recorded"
        );
        Ok(refunded.into())
    }

    async fn resolve_charge(&self, charge_id: &str) -> anyhow::Result<Option<PaymentEntity>> {
        if let Some(payment) = self.payment_repo.find_by_gateway_id(charge_id).await? {
            return Ok(Some(payment));
        }
        match Uuid::parse_str(charge_id) {
            Ok(payment_id) => self.payment_repo.find_by_id(payment_id).await,
            Err(_) => Ok(None),
        }
    }

    async fn send_notice(&self, payment: &PaymentEntity, kind: PaymentNoticeKind) {
        let notice = PaymentNotice {
            user_id: payment.user_id,
            recipient: recipient_of(payment),
            kind,
            payment_id: payment.id,
            gateway_id: payment.gateway_id.clone(),
        };
        if let Err(err) = self.notifier.send_notice(notice).await {
            warn!(payment_id = %payment.id, error = ?err, "cancel_subscription: notice failed");
        }
    }
}
