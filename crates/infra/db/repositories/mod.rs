pub mod jobs;
pub mod payments;
pub mod saved_payment_methods;
