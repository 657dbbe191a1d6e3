use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::poll_kinds::PollKind;

pub const STATUS_POLL_JOB_TYPE: &str = "status_poll";

/// Payload of a `status_poll` job. `attempt` starts at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusPollPayload {
    pub payment_id: Uuid,
    pub kind: PollKind,
    pub attempt: u32,
}
