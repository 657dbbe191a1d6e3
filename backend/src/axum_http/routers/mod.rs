pub mod charges;
pub mod payments;
pub mod subscriptions;
pub mod webhooks;
