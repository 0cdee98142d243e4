//! Core abstractions: configuration, the budget client seam and startup

pub mod client;
pub mod config;
pub mod error;
pub mod init;
pub mod log;
pub mod session;

// Re-export main types for cleaner imports
pub use client::{BudgetClient, BudgetConnector};
pub use config::AppConfig;
pub use error::FatalError;
pub use init::initialize;
pub use session::Session;

#[cfg(test)]
pub(crate) mod fake;
