pub mod jobs;
pub mod notifier;
pub mod payments;
pub mod saved_payment_methods;
pub mod status_poll_scheduler;
