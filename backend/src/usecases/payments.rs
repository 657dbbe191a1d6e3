use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use crates::{
    domain::{
        entities::payments::{InsertPaymentEntity, PaymentEntity},
        repositories::{
            payments::PaymentRepository, saved_payment_methods::SavedPaymentMethodRepository,
            status_poll_scheduler::StatusPollScheduler,
        },
        value_objects::{
            enums::{
                payment_modes::PaymentMode,
                payment_statuses::{OneTimeStatus, RecurringStatus},
                payment_types::PaymentType,
                poll_kinds::PollKind,
                termination_modes::TerminationMode,
            },
            payment_requests::{CreateChargeRequest, CreateSubscriptionRequest},
            payments::{CreatePaymentOutcome, PaymentDto, PaymentSummary},
            saved_payment_methods::{SavedPaymentMethodAttrs, SavedPaymentMethodDto},
        },
    },
    payments::gateway_client::{ChargeParams, GatewayClient, SubscriptionParams},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    access_policy,
    gateway::PaymentGateway,
    gateway_documents,
    payment_errors::{PaymentError, UseCaseResult},
    reconciler::DeferredPoller,
};

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub mode: PaymentMode,
    pub default_currency: String,
    pub premium_features: Vec<String>,
}

/// The authenticated caller a payment is created for.
#[derive(Debug, Clone)]
pub struct Payer {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    pub payment: PaymentDto,
    pub gateway: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusDto {
    pub has_active_subscription: bool,
    pub has_premium_access: bool,
    pub subscription_status: Option<String>,
    pub access_level: &'static str,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub subscription: Option<PaymentDto>,
    pub premium_features: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

pub struct PaymentUseCase<P, M, G, S>
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    saved_method_repo: Arc<M>,
    gateway: Arc<G>,
    poller: DeferredPoller<S>,
    settings: PaymentSettings,
}

impl<P, M, G, S> PaymentUseCase<P, M, G, S>
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        saved_method_repo: Arc<M>,
        gateway: Arc<G>,
        poller: DeferredPoller<S>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            payment_repo,
            saved_method_repo,
            gateway,
            poller,
            settings,
        }
    }

    pub async fn create_charge(
        &self,
        payer: &Payer,
        request: CreateChargeRequest,
    ) -> UseCaseResult<CreatedPayment> {
        let user_id = payer.user_id;
        let command = request.validate(&self.settings.default_currency)?;

        let params = ChargeParams {
            transaction_token_id: command.token_id.clone(),
            amount: command.amount,
            currency: command.currency.clone(),
            capture: command.capture_at.is_none(),
            capture_at: command.capture_at.map(|at| at.to_rfc3339()),
            metadata: gateway_metadata(&command.metadata, user_id),
            three_ds_mode: command.three_ds_mode.map(|mode| mode.as_str().to_string()),
            redirect_endpoint: command.redirect_endpoint.clone(),
        };

        let document = self
            .gateway
            .create_charge(params, GatewayClient::new_idempotency_key())
            .await
            .map_err(|err| {
                warn!(%user_id, gateway_status = err.status, "create_charge: gateway rejected charge");
                PaymentError::Gateway(err)
            })?;

        let saved_payment_method_id = self
            .link_saved_method(user_id, &command.token_id, command.payment_method)
            .await;

        let mut row = InsertPaymentEntity {
            user_id,
            payment_type: PaymentType::OneTime.as_str().into(),
            status: OneTimeStatus::Pending.as_str().into(),
            amount: command.amount,
            currency: command.currency,
            mode: self.settings.mode.as_str().into(),
            saved_payment_method_id,
            metadata: local_metadata(command.metadata, payer),
            capture_at: command.capture_at,
            redirect_endpoint: command.redirect_endpoint,
            three_ds_mode: command.three_ds_mode.map(|mode| mode.as_str().to_string()),
            ..Default::default()
        };
        gateway_documents::apply_created_document(&mut row, &document);

        let payment = match self.persist(row).await? {
            CreatePaymentOutcome::Created(payment) => payment,
            CreatePaymentOutcome::ActiveSubscriptionExists(_) => {
                return Err(PaymentError::Internal(anyhow!(
                    "one-time payment refused as a subscription conflict"
                )));
            }
        };

        info!(
            %user_id,
            payment_id = %payment.id,
            gateway_id = ?payment.gateway_id,
            status = %payment.status,
            "create_charge: charge recorded"
        );
        self.schedule_poll(&payment, PollKind::Charge).await;

        let gateway = json!({
            "charge_id": payment.gateway_id,
            "status": payment.status,
            "mode": payment.mode,
            "redirect": gateway_documents::challenge(&document),
        });
        Ok(CreatedPayment {
            payment: payment.into(),
            gateway,
        })
    }

    pub async fn create_subscription(
        &self,
        payer: &Payer,
        request: CreateSubscriptionRequest,
    ) -> UseCaseResult<CreatedPayment> {
        let user_id = payer.user_id;
        let command = request.validate(&self.settings.default_currency)?;

        if let Some(existing) = self
            .payment_repo
            .find_active_subscription(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "create_subscription: active subscription lookup failed");
                PaymentError::Internal(err)
            })?
        {
            info!(%user_id, existing_id = %existing.id, "create_subscription: active subscription exists");
            return Err(PaymentError::Conflict {
                existing: PaymentSummary::from(&existing),
            });
        }

        let params = SubscriptionParams {
            transaction_token_id: command.token_id.clone(),
            amount: command.amount,
            currency: command.currency.clone(),
            period: command.period.as_str().to_string(),
            initial_amount: command.initial_amount,
            schedule_settings: command.schedule_settings.clone(),
            metadata: gateway_metadata(&command.metadata, user_id),
            three_ds_mode: command.three_ds_mode.map(|mode| mode.as_str().to_string()),
            redirect_endpoint: command.redirect_endpoint.clone(),
        };

        let document = self
            .gateway
            .create_subscription(params, GatewayClient::new_idempotency_key())
            .await
            .map_err(|err| {
                warn!(%user_id, gateway_status = err.status, "create_subscription: gateway rejected subscription");
                PaymentError::Gateway(err)
            })?;

        let saved_payment_method_id = self
            .link_saved_method(user_id, &command.token_id, command.payment_method)
            .await;

        let mut row = InsertPaymentEntity {
            user_id,
            payment_type: PaymentType::Recurring.as_str().into(),
            status: RecurringStatus::Unverified.as_str().into(),
            amount: command.amount,
            currency: command.currency,
            mode: self.settings.mode.as_str().into(),
            saved_payment_method_id,
            plan_id: command.plan_id,
            metadata: local_metadata(command.metadata, payer),
            redirect_endpoint: command.redirect_endpoint,
            three_ds_mode: command.three_ds_mode.map(|mode| mode.as_str().to_string()),
            period: Some(command.period.as_str().to_string()),
            initial_amount: command.initial_amount,
            schedule_settings: command.schedule_settings,
            ..Default::default()
        };
        gateway_documents::apply_created_document(&mut row, &document);
        let remote_id = row.gateway_id.clone();

        let payment = match self.persist(row).await? {
            CreatePaymentOutcome::Created(payment) => payment,
            CreatePaymentOutcome::ActiveSubscriptionExists(winner) => {
                warn!(
                    %user_id,
                    winner_id = %winner.id,
                    orphan_gateway_id = ?remote_id,
                    "create_subscription: lost race to a concurrent subscription"
                );
                if let Some(remote_id) = remote_id {
                    self.cancel_orphan(user_id, &remote_id).await;
                }
                return Err(PaymentError::Conflict {
                    existing: PaymentSummary::from(&winner),
                });
            }
        };

        info!(
            %user_id,
            payment_id = %payment.id,
            gateway_id = ?payment.gateway_id,
            status = %payment.status,
            "create_subscription: subscription recorded"
        );
        self.schedule_poll(&payment, PollKind::Subscription).await;

        let gateway = json!({
            "subscription_id": payment.gateway_id,
            "status": payment.status,
            "mode": payment.mode,
            "next_payment": document.get("next_payment").cloned().unwrap_or(Value::Null),
            "redirect": gateway_documents::challenge(&document),
        });
        Ok(CreatedPayment {
            payment: payment.into(),
            gateway,
        })
    }

    pub async fn list_payments(&self, user_id: Uuid) -> UseCaseResult<Vec<PaymentDto>> {
        let payments = self
            .payment_repo
            .list_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "list_payments: query failed");
                PaymentError::Internal(err)
            })?;
        Ok(payments.into_iter().map(PaymentDto::from).collect())
    }

    pub async fn get_payment(&self, user_id: Uuid, payment_id: Uuid) -> UseCaseResult<PaymentDto> {
        let payment = self
            .payment_repo
            .find_by_id(payment_id)
            .await
            .map_err(|err| {
                error!(%user_id, %payment_id, db_error = ?err, "get_payment: query failed");
                PaymentError::Internal(err)
            })?
            .filter(|payment| payment.user_id == user_id)
            .ok_or(PaymentError::NotFound("payment"))?;
        Ok(payment.into())
    }

    pub async fn list_saved_methods(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Vec<SavedPaymentMethodDto>> {
        let methods = self
            .saved_method_repo
            .list_active_for_user(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "list_saved_methods: query failed");
                PaymentError::Internal(err)
            })?;
        Ok(methods.into_iter().map(SavedPaymentMethodDto::from).collect())
    }

    pub async fn deactivate_saved_method(
        &self,
        user_id: Uuid,
        method_id: Uuid,
    ) -> UseCaseResult<SavedPaymentMethodDto> {
        let method = self
            .saved_method_repo
            .deactivate(method_id, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, %method_id, db_error = ?err, "deactivate_saved_method: update failed");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::NotFound("payment method"))?;

        info!(%user_id, %method_id, "deactivate_saved_method: payment method deactivated");
        Ok(method.into())
    }

    pub async fn subscription_status(&self, user_id: Uuid) -> UseCaseResult<SubscriptionStatusDto> {
        let latest = self
            .payment_repo
            .find_latest_subscription(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscription_status: query failed");
                PaymentError::Internal(err)
            })?;

        let checked_at = Utc::now();
        let has_premium_access = access_policy::has_premium_access_at(latest.as_ref(), checked_at);
        let has_active_subscription = latest
            .as_ref()
            .and_then(|payment| RecurringStatus::from_str(&payment.status))
            .is_some_and(|status| status.is_active());
        let access_expires_at = latest
            .as_ref()
            .filter(|_| has_premium_access)
            .and_then(access_policy::access_expiry);

        Ok(SubscriptionStatusDto {
            has_active_subscription,
            has_premium_access,
            subscription_status: latest.as_ref().map(|payment| payment.status.clone()),
            access_level: if has_premium_access { "premium" } else { "free" },
            access_expires_at,
            subscription: latest.map(PaymentDto::from),
            premium_features: if has_premium_access {
                self.settings.premium_features.clone()
            } else {
                Vec::new()
            },
            checked_at,
        })
    }

    async fn persist(&self, row: InsertPaymentEntity) -> UseCaseResult<CreatePaymentOutcome> {
        let user_id = row.user_id;
        let gateway_id = row.gateway_id.clone();
        self.payment_repo.create_payment(row).await.map_err(|err| {
            // The gateway already holds this payment; reconcile by hand.
            error!(
                %user_id,
                gateway_id = ?gateway_id,
                db_error = ?err,
                "create_payment: gateway accepted but local insert failed"
            );
            PaymentError::Internal(err)
        })
    }

    /// Best effort: a failure here never fails the payment.
    async fn link_saved_method(
        &self,
        user_id: Uuid,
        token_id: &str,
        attrs: Option<SavedPaymentMethodAttrs>,
    ) -> Option<Uuid> {
        let resolved = match attrs {
            Some(attrs) => self
                .saved_method_repo
                .upsert_saved_method(token_id, user_id, attrs)
                .await
                .map(Some),
            None => self.saved_method_repo.find_by_token_id(token_id).await,
        };

        match resolved {
            Ok(Some(method)) if method.user_id == user_id => Some(method.id),
            Ok(Some(method)) => {
                warn!(%user_id, method_id = %method.id, "saved_method: token belongs to another user, not linking");
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!(%user_id, db_error = ?err, "saved_method: lookup failed, continuing without link");
                None
            }
        }
    }

    async fn schedule_poll(&self, payment: &PaymentEntity, kind: PollKind) {
        if payment.gateway_id.is_none() {
            warn!(payment_id = %payment.id, "create_payment: gateway returned no id, not polling");
            return;
        }
        self.poller.schedule_first_poll(kind, payment.id).await;
    }

    async fn cancel_orphan(&self, user_id: Uuid, remote_id: &str) {
        match self
            .gateway
            .cancel_subscription(remote_id, TerminationMode::Immediate.as_str())
            .await
        {
            Ok(_) => info!(%user_id, gateway_id = remote_id, "create_subscription: orphan subscription cancelled"),
            Err(err) => error!(
                %user_id,
                gateway_id = remote_id,
                gateway_status = err.status,
                "create_subscription: failed to cancel orphan subscription"
            ),
        }
    }
}

fn gateway_metadata(metadata: &Map<String, Value>, user_id: Uuid) -> Map<String, Value> {
    let mut metadata = metadata.clone();
    metadata.insert("user_id".into(), Value::String(user_id.to_string()));
    metadata
}

fn local_metadata(mut metadata: Map<String, Value>, payer: &Payer) -> Value {
    metadata.insert("user_id".into(), Value::String(payer.user_id.to_string()));
    if let Some(email) = &payer.email {
        metadata.insert("email".into(), Value::String(email.clone()));
    }
    Value::Object(metadata)
}
