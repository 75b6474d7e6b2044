//! Whitelist registry of approved asset contracts
//!
//! Only whitelisted assets may be referenced by trade-recording calls.
//! Operator authorization and the contract-code check happen in the
//! exchange before these methods are reached.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use ledger_types::ids::Address;

use crate::errors::ExchangeError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Whitelist {
    entries: BTreeSet<Address>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an asset is whitelisted.
    pub fn contains(&self, asset: &Address) -> bool {
        self.entries.contains(asset)
    }

    /// Add an asset. Fails if it is already present.
    pub fn insert(&mut self, asset: Address) -> Result<(), ExchangeError> {
        if asset.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }
        if !self.entries.insert(asset) {
            return Err(ExchangeError::AlreadyWhitelisted { asset });
        }
        Ok(())
    }

    /// Remove an asset. Fails if it is not present.
    pub fn remove(&mut self, asset: &Address) -> Result<(), ExchangeError> {
        if !self.entries.remove(asset) {
            return Err(ExchangeError::NotInWhitelist { asset: *asset });
        }
        Ok(())
    }

    /// Fail with `AssetNotWhitelisted` unless `asset` is listed.
    pub fn ensure_listed(&self, asset: &Address) -> Result<(), ExchangeError> {
        if !self.contains(asset) {
            return Err(ExchangeError::AssetNotWhitelisted { asset: *asset });
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
