use serde_json::Value;

/// Resource a webhook event refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookTarget {
    Charge(String),
    Subscription(String),
    Refund { charge_id: String, amount: Option<i64> },
}

/// A gateway notification reduced to what reconciliation needs.
///
/// The gateway is not consistent about envelope shape: ids may sit at the top
/// level, under `data`, or under nested `charge` / `subscription` objects.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayWebhookEvent {
    pub event_type: Option<String>,
    pub targets: Vec<WebhookTarget>,
    pub status: Option<String>,
    /// The resource document (the `data` object when present, else the body).
    pub document: Value,
}

impl GatewayWebhookEvent {
    /// Returns `None` when the body is not a JSON object or carries none of
    /// `event`, `type` or `status`.
    pub fn from_value(body: &Value) -> Option<Self> {
        let root = body.as_object()?;
        if !["event", "type", "status"]
            .iter()
            .any(|key| root.contains_key(*key))
        {
            return None;
        }

        let data = body.get("data").filter(|data| data.is_object());
        let event_type = string_at(body, "event").or_else(|| string_at(body, "type"));
        let object = string_at(body, "object").map(|object| object.to_ascii_lowercase());
        let own_id = || string_at(body, "id").or_else(|| data.and_then(|d| string_at(d, "id")));

        let mut targets = Vec::new();
        match object.as_deref() {
            Some("charge") | Some("charges") => targets.extend(own_id().map(WebhookTarget::Charge)),
            Some("subscription") | Some("subscriptions") => {
                targets.extend(own_id().map(WebhookTarget::Subscription))
            }
            Some("refund") | Some("refunds") => {
                let charge_id = data
                    .and_then(|d| string_at(d, "charge_id"))
                    .or_else(|| string_at(body, "charge_id"));
                if let Some(charge_id) = charge_id {
                    let amount = data
                        .and_then(|d| d.get("amount"))
                        .or_else(|| body.get("amount"))
                        .and_then(Value::as_i64);
                    targets.push(WebhookTarget::Refund { charge_id, amount });
                }
            }
            _ => {
                let charge_id = body
                    .get("charge")
                    .and_then(|charge| string_at(charge, "id"))
                    .or_else(|| data.and_then(|d| string_at(d, "charge_id")));
                let subscription_id = body
                    .get("subscription")
                    .and_then(|subscription| string_at(subscription, "id"))
                    .or_else(|| data.and_then(|d| string_at(d, "subscription_id")));
                targets.extend(charge_id.map(WebhookTarget::Charge));
                targets.extend(subscription_id.map(WebhookTarget::Subscription));
            }
        }

        let status = string_at(body, "status").or_else(|| data.and_then(|d| string_at(d, "status")));

        Some(Self {
            event_type,
            targets,
            status,
            document: data.cloned().unwrap_or_else(|| body.clone()),
        })
    }
}

fn string_at(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
