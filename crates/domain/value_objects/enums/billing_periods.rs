use std::fmt::Display;

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannually,
    Annually,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Daily => "daily",
            BillingPeriod::Weekly => "weekly",
            BillingPeriod::Biweekly => "biweekly",
            BillingPeriod::Monthly => "monthly",
            BillingPeriod::Bimonthly => "bimonthly",
            BillingPeriod::Quarterly => "quarterly",
            BillingPeriod::Semiannually => "semiannually",
            BillingPeriod::Annually => "annually",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(BillingPeriod::Daily),
            "weekly" => Some(BillingPeriod::Weekly),
            "biweekly" => Some(BillingPeriod::Biweekly),
            "monthly" => Some(BillingPeriod::Monthly),
            "bimonthly" => Some(BillingPeriod::Bimonthly),
            "quarterly" => Some(BillingPeriod::Quarterly),
            "semiannually" => Some(BillingPeriod::Semiannually),
            "annually" | "yearly" => Some(BillingPeriod::Annually),
            _ => None,
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            BillingPeriod::Daily => 1,
            BillingPeriod::Weekly => 7,
            BillingPeriod::Biweekly => 14,
            BillingPeriod::Monthly => 30,
            BillingPeriod::Bimonthly => 60,
            BillingPeriod::Quarterly => 90,
            BillingPeriod::Semiannually => 180,
            BillingPeriod::Annually => 365,
        }
    }

    /// Length of one billing cycle for a stored period code. Unknown or missing
    /// codes count as a month.
    pub fn duration_for(period: Option<&str>) -> Duration {
        let days = period
            .and_then(BillingPeriod::from_str)
            .map(|period| period.days())
            .unwrap_or(BillingPeriod::Monthly.days());
        Duration::days(days)
    }
}

impl Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yearly_is_an_alias_for_annually() {
        assert_eq!(BillingPeriod::from_str("yearly"), Some(BillingPeriod::Annually));
        assert_eq!(BillingPeriod::duration_for(Some("yearly")), Duration::days(365));
    }

    #[test]
    fn unknown_period_defaults_to_thirty_days() {
        assert_eq!(BillingPeriod::duration_for(Some("fortnightly")), Duration::days(30));
        assert_eq!(BillingPeriod::duration_for(None), Duration::days(30));
        assert_eq!(BillingPeriod::duration_for(Some("weekly")), Duration::days(7));
    }
}
