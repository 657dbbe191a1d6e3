pub mod access_policy;
pub mod cancel_refund;
pub mod gateway;
pub mod gateway_documents;
pub mod payment_errors;
pub mod payments;
pub mod reconciler;
#[cfg(test)]
pub mod test_support;
