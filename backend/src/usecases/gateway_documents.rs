//! Reading gateway JSON documents into payment rows.
//!
//! The gateway client hands back untyped documents; this is the only place
//! that knows their field names.

use chrono::{DateTime, NaiveDate, Utc};
use crates::domain::{
    entities::payments::InsertPaymentEntity,
    value_objects::payments::{StatusUpdate, StatusUpdateKind},
};
use serde_json::{Map, Value};

fn at<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |value, key| value.get(*key))
}

pub fn text(doc: &Value, path: &[&str]) -> Option<String> {
    match at(doc, path)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

pub fn integer(doc: &Value, path: &[&str]) -> Option<i64> {
    match at(doc, path)? {
        Value::Number(value) => value.as_i64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(doc: &Value, path: &[&str]) -> Option<DateTime<Utc>> {
    let raw = text(doc, path)?;
    DateTime::parse_from_rfc3339(&raw)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

fn date(doc: &Value, path: &[&str]) -> Option<NaiveDate> {
    let raw = text(doc, path)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|value| value.with_timezone(&Utc).date_naive())
        })
}

/// Error details may be a string or a structured object.
fn error_detail(doc: &Value) -> Option<String> {
    match at(doc, &["error", "details"])? {
        Value::Null => None,
        Value::String(value) if value.trim().is_empty() => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

/// Status plus correlated columns, or `None` when the document carries no status.
/// Columns absent from the document are cleared when the update is applied.
pub fn status_update(doc: &Value) -> Option<StatusUpdate> {
    let status = text(doc, &["status"])?;
    Some(StatusUpdate {
        kind: StatusUpdateKind::Observation,
        status,
        charged_amount: integer(doc, &["charged_amount"]),
        charged_currency: text(doc, &["charged_currency"]),
        fee_amount: integer(doc, &["fee_amount"]),
        fee_currency: text(doc, &["fee_currency"]),
        error_code: text(doc, &["error", "code"]),
        error_message: text(doc, &["error", "message"]),
        error_detail: error_detail(doc),
        refunded_amount: None,
        next_payment_id: text(doc, &["next_payment", "id"]),
        next_payment_due_date: date(doc, &["next_payment", "due_date"]),
        next_payment_amount: integer(doc, &["next_payment", "amount"]),
        cancelled_on: timestamp(doc, &["cancelled_on"]),
        termination_mode: None,
        raw_json: Some(doc.clone()),
    })
}

/// Copies what the gateway returned for a newly created resource onto the
/// pending row. The gateway status replaces the local placeholder.
pub fn apply_created_document(row: &mut InsertPaymentEntity, doc: &Value) {
    row.gateway_id = text(doc, &["id"]);
    row.store_id = text(doc, &["store_id"]);
    if let Some(status) = text(doc, &["status"]) {
        row.status = status;
    }
    if let Some(mode) = text(doc, &["mode"]) {
        row.mode = mode;
    }
    row.created_on = timestamp(doc, &["created_on"]);

    if let Some(Value::Object(remote)) = doc.get("metadata") {
        let mut merged = match std::mem::take(&mut row.metadata) {
            Value::Object(local) => local,
            _ => Map::new(),
        };
        merged.extend(remote.clone());
        row.metadata = Value::Object(merged);
    }

    row.redirect_endpoint = text(doc, &["redirect", "endpoint"]).or(row.redirect_endpoint.take());
    row.redirect_id = text(doc, &["redirect", "redirect_id"]);
    if let Some(mode) = text(doc, &["three_ds", "mode"]) {
        row.three_ds_mode = Some(mode);
    }
    row.three_ds_redirect_endpoint = text(doc, &["three_ds", "redirect_endpoint"]);
    row.three_ds_redirect_id = text(doc, &["three_ds", "redirect_id"]);
    row.capture_at = timestamp(doc, &["capture_at"]).or(row.capture_at);

    row.charged_amount = integer(doc, &["charged_amount"]);
    row.charged_currency = text(doc, &["charged_currency"]);
    row.fee_amount = integer(doc, &["fee_amount"]);
    row.fee_currency = text(doc, &["fee_currency"]);
    row.error_code = text(doc, &["error", "code"]);
    row.error_message = text(doc, &["error", "message"]);
    row.error_detail = error_detail(doc);

    row.next_payment_id = text(doc, &["next_payment", "id"]);
    row.next_payment_due_date = date(doc, &["next_payment", "due_date"]);
    row.next_payment_amount = integer(doc, &["next_payment", "amount"]);

    row.raw_json = doc.clone();
}

/// Redirect / 3-D Secure data the caller must forward to the end user.
pub fn challenge(doc: &Value) -> Value {
    [doc.get("redirect"), doc.get("three_ds")]
        .into_iter()
        .flatten()
        .find(|value| value.as_object().is_some_and(|object| !object.is_empty()))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn created_charge_document_fills_the_row() {
        let mut row = InsertPaymentEntity {
            status: "pending".into(),
            mode: "test".into(),
            metadata: json!({ "item_name": "Premium", "user_id": "u-1" }),
            ..Default::default()
        };
        let doc = json!({
            "id": "ch_1",
            "store_id": "st_1",
            "status": "awaiting",
            "mode": "live",
            "created_on": "2025-01-15T10:00:00.000000Z",
            "metadata": { "order": 7 },
            "redirect": { "endpoint": "https://example.com/back", "redirect_id": "rd_1" },
            "charged_amount": 1000,
            "charged_currency": "JPY"
        });

        apply_created_document(&mut row, &doc);

        assert_eq!(row.gateway_id.as_deref(), Some("ch_1"));
        assert_eq!(row.status, "awaiting");
        assert_eq!(row.mode, "live");
        assert!(row.created_on.is_some());
        assert_eq!(row.metadata["item_name"], "Premium");
        assert_eq!(row.metadata["order"], 7);
        assert_eq!(row.redirect_id.as_deref(), Some("rd_1"));
        assert_eq!(row.charged_amount, Some(1000));
        assert_eq!(row.raw_json, doc);
    }

    #[test]
    fn status_update_reads_next_payment_and_errors() {
        let doc = json!({
            "status": "current",
            "next_payment": { "id": "np_1", "due_date": "2025-02-15", "amount": 980 },
            "error": { "code": "card_expired", "message": "Card expired", "details": { "field": "exp" } }
        });

        let update = status_update(&doc).unwrap();

        assert_eq!(update.status, "current");
        assert_eq!(update.next_payment_id.as_deref(), Some("np_1"));
        assert_eq!(
            update.next_payment_due_date,
            NaiveDate::from_ymd_opt(2025, 2, 15)
        );
        assert_eq!(update.next_payment_amount, Some(980));
        assert_eq!(update.error_code.as_deref(), Some("card_expired"));
        assert_eq!(update.error_detail.as_deref(), Some(r#"{"field":"exp"}"#));
    }

    #[test]
    fn status_update_is_a_full_observation() {
        let update = status_update(&json!({ "status": "current", "termination_mode": "immediate" }))
            .unwrap();

        assert_eq!(update.kind, StatusUpdateKind::Observation);
        assert!(update.error_code.is_none());
        assert!(update.termination_mode.is_none());
        assert!(update.refunded_amount.is_none());
    }

    #[test]
    fn documents_without_status_yield_no_update() {
        assert!(status_update(&json!({ "id": "ch_1" })).is_none());
    }

    #[test]
    fn challenge_prefers_redirect_then_three_ds() {
        let doc = json!({ "redirect": {}, "three_ds": { "redirect_endpoint": "https://acs" } });
        assert_eq!(challenge(&doc), json!({ "redirect_endpoint": "https://acs" }));
        assert_eq!(challenge(&json!({})), json!({}));
    }
}
