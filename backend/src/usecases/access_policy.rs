use chrono::{DateTime, Duration, Utc};
use crates::domain::{
    entities::payments::PaymentEntity,
    value_objects::enums::{billing_periods::BillingPeriod, payment_statuses::RecurringStatus},
};

/// How long an `unverified` subscription unlocks premium while the gateway
/// finishes verifying it.
pub const UNVERIFIED_GRACE_HOURS: i64 = 24;

/// End of the paid window for a subscription: the next due date (taken as
/// midnight UTC) or, without one, `created_at` plus one billing period.
///
/// `None` when the window cannot be computed.
pub fn access_expiry(subscription: &PaymentEntity) -> Option<DateTime<Utc>> {
    match subscription.next_payment_due_date {
        Some(due_date) => due_date.and_hms_opt(0, 0, 0).map(|midnight| midnight.and_utc()),
        None => subscription
            .created_at
            .checked_add_signed(BillingPeriod::duration_for(subscription.period.as_deref())),
    }
}

/// Whether the most recent subscription unlocks premium features at `now`.
///
/// Always derived from stored columns; anything that cannot be evaluated
/// denies access.
pub fn has_premium_access_at(subscription: Option<&PaymentEntity>, now: DateTime<Utc>) -> bool {
    let Some(subscription) = subscription else {
        return false;
    };
    if subscription.payment_type != "recurring" {
        return false;
    }

    match RecurringStatus::from_str(&subscription.status) {
        Some(RecurringStatus::Current) => true,
        Some(RecurringStatus::Canceled) | Some(RecurringStatus::Active) => {
            access_expiry(subscription).is_some_and(|expiry| now < expiry)
        }
        Some(RecurringStatus::Unverified) => subscription
            .created_at
            .checked_add_signed(Duration::hours(UNVERIFIED_GRACE_HOURS))
            .is_some_and(|grace_end| now < grace_end),
        Some(RecurringStatus::Failed) | Some(RecurringStatus::Expired) => false,
        _ => false,
    }
}

pub fn has_premium_access(subscription: Option<&PaymentEntity>) -> bool {
    has_premium_access_at(subscription, Utc::now())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::usecases::test_support::sample_subscription;

    fn subscription(status: &str, created_at: DateTime<Utc>) -> PaymentEntity {
        let mut payment = sample_subscription(uuid::Uuid::new_v4(), status);
        payment.created_at = created_at;
        payment.next_payment_due_date = None;
        payment
    }

    #[test]
    fn no_subscription_means_no_access() {
        assert!(!has_premium_access_at(None, Utc::now()));
    }

    #[test]
    fn current_is_granted_without_expiry_check() {
        let long_ago = Utc::now() - Duration::days(900);
        let payment = subscription("current", long_ago);
        assert!(has_premium_access_at(Some(&payment), Utc::now()));
    }

    #[test]
    fn canceled_keeps_access_until_next_due_date() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut payment = subscription("canceled", t - Duration::days(20));
        payment.cancelled_on = Some(t);
        payment.next_payment_due_date = Some((t + Duration::days(10)).date_naive());

        assert!(has_premium_access_at(Some(&payment), t + Duration::days(5)));
        assert!(!has_premium_access_at(Some(&payment), t + Duration::days(11)));
    }

    #[test]
    fn canceled_without_due_date_falls_back_to_one_period() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut payment = subscription("canceled", created);
        payment.period = Some("weekly".into());

        assert_eq!(access_expiry(&payment), Some(created + Duration::days(7)));
        assert!(has_premium_access_at(Some(&payment), created + Duration::days(6)));
        assert!(!has_premium_access_at(Some(&payment), created + Duration::days(7)));
    }

    #[test]
    fn unknown_period_counts_as_thirty_days() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut payment = subscription("active", created);
        payment.period = Some("lunar".into());

        assert!(has_premium_access_at(Some(&payment), created + Duration::days(29)));
        assert!(!has_premium_access_at(Some(&payment), created + Duration::days(31)));
    }

    #[test]
    fn unverified_has_a_twenty_four_hour_grace_window() {
        let now = Utc::now();
        let fresh = subscription("unverified", now - Duration::hours(23));
        let stale = subscription("unverified", now - Duration::hours(25));

        assert!(has_premium_access_at(Some(&fresh), now));
        assert!(!has_premium_access_at(Some(&stale), now));
    }

    #[test]
    fn failed_expired_and_unknown_statuses_deny_access() {
        let now = Utc::now();
        for status in ["failed", "expired", "suspended", "unpaid", "unconfirmed", "bogus"] {
            let mut payment = subscription(status, now - Duration::hours(1));
            payment.next_payment_due_date = Some((now + Duration::days(10)).date_naive());
            assert!(
                !has_premium_access_at(Some(&payment), now),
                "{status} should not grant access"
            );
        }
    }

    #[test]
    fn one_time_payments_never_grant_subscription_access() {
        let mut payment = subscription("current", Utc::now());
        payment.payment_type = "one_time".into();
        assert!(!has_premium_access_at(Some(&payment), Utc::now()));
    }
}
