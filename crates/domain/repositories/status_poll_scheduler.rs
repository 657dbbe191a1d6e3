use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::enums::poll_kinds::PollKind;

/// Durable "look at this payment again later" capability.
#[async_trait]
#[automock]
pub trait StatusPollScheduler {
    async fn schedule(
        &self,
        kind: PollKind,
        payment_id: Uuid,
        delay: Duration,
        attempt: u32,
    ) -> Result<()>;
}
