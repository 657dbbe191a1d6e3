use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::payment_types::PaymentType;

/// Gateway status vocabulary for single charges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OneTimeStatus {
    Pending,
    Awaiting,
    Authorized,
    Successful,
    Failed,
    Error,
    Canceled,
    Refunded,
    PartiallyRefunded,
}

impl OneTimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OneTimeStatus::Pending => "pending",
            OneTimeStatus::Awaiting => "awaiting",
            OneTimeStatus::Authorized => "authorized",
            OneTimeStatus::Successful => "successful",
            OneTimeStatus::Failed => "failed",
            OneTimeStatus::Error => "error",
            OneTimeStatus::Canceled => "canceled",
            OneTimeStatus::Refunded => "refunded",
            OneTimeStatus::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OneTimeStatus::Pending),
            "awaiting" => Some(OneTimeStatus::Awaiting),
            "authorized" => Some(OneTimeStatus::Authorized),
            "successful" => Some(OneTimeStatus::Successful),
            "failed" => Some(OneTimeStatus::Failed),
            "error" => Some(OneTimeStatus::Error),
            "canceled" | "cancelled" => Some(OneTimeStatus::Canceled),
            "refunded" => Some(OneTimeStatus::Refunded),
            "partially_refunded" => Some(OneTimeStatus::PartiallyRefunded),
            _ => None,
        }
    }

    /// Statuses the gateway may still move forward on its own.
    pub fn is_settling(&self) -> bool {
        matches!(self, OneTimeStatus::Pending | OneTimeStatus::Awaiting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OneTimeStatus::Successful
                | OneTimeStatus::Failed
                | OneTimeStatus::Error
                | OneTimeStatus::Canceled
                | OneTimeStatus::Refunded
                | OneTimeStatus::PartiallyRefunded
        )
    }
}

impl Display for OneTimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway status vocabulary for subscriptions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurringStatus {
    Unverified,
    Unconfirmed,
    Current,
    Active,
    Suspended,
    Unpaid,
    Canceled,
    Completed,
    Failed,
    Expired,
}

/// Raw status codes that count as a live subscription for the one-per-user rule.
pub const ACTIVE_SUBSCRIPTION_STATUSES: [&str; 3] = ["current", "active", "unverified"];

impl RecurringStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringStatus::Unverified => "unverified",
            RecurringStatus::Unconfirmed => "unconfirmed",
            RecurringStatus::Current => "current",
            RecurringStatus::Active => "active",
            RecurringStatus::Suspended => "suspended",
            RecurringStatus::Unpaid => "unpaid",
            RecurringStatus::Canceled => "canceled",
            RecurringStatus::Completed => "completed",
            RecurringStatus::Failed => "failed",
            RecurringStatus::Expired => "expired",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "unverified" => Some(RecurringStatus::Unverified),
            "unconfirmed" => Some(RecurringStatus::Unconfirmed),
            "current" => Some(RecurringStatus::Current),
            "active" => Some(RecurringStatus::Active),
            "suspended" => Some(RecurringStatus::Suspended),
            "unpaid" => Some(RecurringStatus::Unpaid),
            "canceled" | "cancelled" => Some(RecurringStatus::Canceled),
            "completed" => Some(RecurringStatus::Completed),
            "failed" => Some(RecurringStatus::Failed),
            "expired" => Some(RecurringStatus::Expired),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_SUBSCRIPTION_STATUSES.contains(&self.as_str())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecurringStatus::Canceled
                | RecurringStatus::Completed
                | RecurringStatus::Failed
                | RecurringStatus::Expired
        )
    }
}

impl Display for RecurringStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status code read in the vocabulary of its payment type.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PaymentStatus {
    OneTime(OneTimeStatus),
    Recurring(RecurringStatus),
}

impl PaymentStatus {
    /// Returns `None` when the code is outside the vocabulary of `payment_type`.
    pub fn parse(payment_type: PaymentType, value: &str) -> Option<Self> {
        match payment_type {
            PaymentType::OneTime => OneTimeStatus::from_str(value).map(PaymentStatus::OneTime),
            PaymentType::Recurring => {
                RecurringStatus::from_str(value).map(PaymentStatus::Recurring)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::OneTime(status) => status.as_str(),
            PaymentStatus::Recurring(status) => status.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            PaymentStatus::OneTime(status) => status.is_terminal(),
            PaymentStatus::Recurring(status) => status.is_terminal(),
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
