//! tradesync - trading state synchronizer for a forex/CFD client
//!
//! Keeps a live mirror of one trading account in sync with the backend:
//! streamed prices, polled trades and balances, derived metrics, order
//! submission and server-side SL/TP enforcement.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::{Config, StreamConfig, SyncConfig};
pub use error::{AppError, Result};
