// Inbound PMS webhooks

pub mod dispatch;

pub use dispatch::{dispatch, DispatchOutcome, DispatchResponse};
