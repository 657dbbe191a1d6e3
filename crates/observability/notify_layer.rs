use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::config::ServiceContext;

const QUEUE_CAPACITY: usize = 256;
const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone)]
pub(crate) struct Alert {
    pub(crate) level: Level,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) service: ServiceContext,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) span_path: Vec<String>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Hands alerts to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    tx: mpsc::Sender<Alert>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sink: Arc<dyn AlertSink>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Alert>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                if let Err(err) = sink.deliver(&alert).await {
                    // Not an error event, so it cannot loop back into the sink.
                    warn!(sink = sink.name(), error = %err, "observability: alert delivery failed");
                }
            }
        });

        Self { tx }
    }

    fn dispatch(&self, alert: Alert) {
        if let Err(err) = self.tx.try_send(alert) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            warn!(reason, "observability: dropping alert");
        }
    }
}

pub(crate) struct ErrorNotifyLayer {
    dispatcher: AlertDispatcher,
    service: ServiceContext,
}

impl ErrorNotifyLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, service: ServiceContext) -> Self {
        Self {
            dispatcher,
            service,
        }
    }
}

impl<S> Layer<S> for ErrorNotifyLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Alert failures are logged at WARN; never feed our own events back.
        if metadata.target().starts_with("crates::observability") {
            return;
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);
        let message = visitor
            .fields
            .remove("message")
            .map(|raw| raw.trim_matches('"').to_string());

        let span_path = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| span.metadata().name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.dispatch(Alert {
            level: *metadata.level(),
            timestamp: Utc::now(),
            service: self.service.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields: visitor.fields,
            span_path,
        });
    }
}

#[derive(Default)]
struct RedactingVisitor {
    fields: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        let name = field.name();
        let value = if is_sensitive_field(name) {
            REDACTED.to_string()
        } else {
            value
        };
        self.fields.insert(name.to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }
}

/// Gateway credentials, webhook signatures, card tokens and raw provider
/// bodies never leave the process through alerts.
fn is_sensitive_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    [
        "secret",
        "password",
        "token",
        "authorization",
        "signature",
        "webhook",
        "card",
        "raw_payload",
        "api_key",
    ]
    .iter()
    .any(|needle| name.contains(needle))
}
