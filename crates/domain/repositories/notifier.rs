use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentNoticeKind {
    SubscriptionCancelled,
    SubscriptionCompleted,
}

impl PaymentNoticeKind {
    pub fn subject(&self) -> &'static str {
        match self {
            PaymentNoticeKind::SubscriptionCancelled => "Your subscription has been cancelled",
            PaymentNoticeKind::SubscriptionCompleted => "Your subscription has completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentNotice {
    pub user_id: Uuid,
    /// Address captured in the payment metadata at creation time.
    pub recipient: Option<String>,
    pub kind: PaymentNoticeKind,
    pub payment_id: Uuid,
    pub gateway_id: Option<String>,
}

/// Outbound notices about payment lifecycle events.
#[async_trait]
#[automock]
pub trait PaymentNotifier {
    async fn send_notice(&self, notice: PaymentNotice) -> Result<()>;
}
