//! Brokerage REST API: typed wire shapes, the shared token store, and the
//! per-engine HTTP client.

pub mod client;
pub mod token;
pub mod types;

pub use client::BrokerClient;
pub use token::{run_token_refresher, TokenStore};
