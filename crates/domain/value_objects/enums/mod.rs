pub mod billing_periods;
pub mod instrument_kinds;
pub mod job_statuses;
pub mod payment_modes;
pub mod payment_statuses;
pub mod payment_types;
pub mod poll_kinds;
pub mod termination_modes;
pub mod three_ds_modes;
