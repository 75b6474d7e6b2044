//! Types library for the whitelist exchange ledger
//!
//! This library provides the primitive types shared by the exchange
//! contract and its callers, so that identities and amounts mean the same
//! thing on both sides of the contract boundary.
//!
//! # Modules
//! - `ids`: Account identity (`Address`)
//! - `numeric`: 256-bit amounts and overflow-checked arithmetic
//! - `errors`: Error taxonomy

pub mod errors;
pub mod ids;
pub mod numeric;
