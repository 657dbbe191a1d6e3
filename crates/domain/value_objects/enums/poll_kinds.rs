use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::payment_types::PaymentType;

/// Which gateway resource a deferred status poll fetches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    Charge,
    Subscription,
}

impl PollKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollKind::Charge => "charge",
            PollKind::Subscription => "subscription",
        }
    }
}

impl From<PaymentType> for PollKind {
    fn from(value: PaymentType) -> Self {
        match value {
            PaymentType::OneTime => PollKind::Charge,
            PaymentType::Recurring => PollKind::Subscription,
        }
    }
}

impl Display for PollKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
