pub mod client;
pub mod retry;

pub use client::{GatewayError, WaafiClient, format_account, is_success, reference_id};
pub use retry::with_retry;
