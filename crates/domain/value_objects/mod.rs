pub mod enums;
pub mod gateway_webhook;
pub mod payment_requests;
pub mod payments;
pub mod saved_payment_methods;
pub mod status_poll;
