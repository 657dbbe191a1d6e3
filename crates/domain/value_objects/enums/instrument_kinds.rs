use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// How a gateway token may be used.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    #[default]
    OneTime,
    Subscription,
    Recurring,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::OneTime => "one_time",
            InstrumentKind::Subscription => "subscription",
            InstrumentKind::Recurring => "recurring",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "one_time" => Some(InstrumentKind::OneTime),
            "subscription" => Some(InstrumentKind::Subscription),
            "recurring" => Some(InstrumentKind::Recurring),
            _ => None,
        }
    }
}

impl Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodFamily {
    #[default]
    Card,
    BankTransfer,
    Konbini,
    QrCode,
    OnlinePayment,
    PaidyWallet,
}

impl PaymentMethodFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodFamily::Card => "card",
            PaymentMethodFamily::BankTransfer => "bank_transfer",
            PaymentMethodFamily::Konbini => "konbini",
            PaymentMethodFamily::QrCode => "qr_code",
            PaymentMethodFamily::OnlinePayment => "online_payment",
            PaymentMethodFamily::PaidyWallet => "paidy_wallet",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "card" => Some(PaymentMethodFamily::Card),
            "bank_transfer" => Some(PaymentMethodFamily::BankTransfer),
            "konbini" => Some(PaymentMethodFamily::Konbini),
            "qr_code" => Some(PaymentMethodFamily::QrCode),
            "online_payment" => Some(PaymentMethodFamily::OnlinePayment),
            "paidy_wallet" => Some(PaymentMethodFamily::PaidyWallet),
            _ => None,
        }
    }
}

impl Display for PaymentMethodFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
