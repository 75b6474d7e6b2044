//! Whitelist exchange contract
//!
//! This crate implements the on-chain contract layer for the whitelist
//! exchange: an operator role registry, a pause switch, an asset whitelist,
//! the per-block Trade Ledger with custody of the assets it records, and a
//! hash-chained event log that off-chain matchers consume.
//!
//! # Modules
//! - `errors`: Contract-specific error types
//! - `events`: Contract event taxonomy
//! - `event_log`: Append-only, hash-chained event log
//! - `security`: Role registry, pause controller, reentrancy guard
//! - `whitelist`: Tradeable asset registry
//! - `trades`: Trade Records and custody totals
//! - `assets`: External asset capabilities and an in-memory host
//! - `config`: Deploy-time configuration
//! - `exchange`: The contract facade
//!
//! # Version
//! v0.1.0

pub mod assets;
pub mod config;
pub mod errors;
pub mod event_log;
pub mod events;
pub mod exchange;
pub mod security;
pub mod trades;
pub mod whitelist;

pub use config::ExchangeConfig;
pub use errors::{AssetError, ErrorKind, ExchangeError};
pub use events::ExchangeEvent;
pub use exchange::{CallContext, Exchange};

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
