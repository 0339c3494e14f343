pub mod catalog;
pub mod common;
pub mod config;
pub mod domain;
pub mod logging;
pub mod metrics;
pub mod providers;
pub mod server;
pub mod state;
pub mod storage;
pub mod vendor;
pub mod webhook;

pub use common::error::{PmsError, Result};
pub use state::AppState;
