//! Trade Ledger storage and custody accounting
//!
//! Trade Records are keyed by `(recorder, ledger height)`. A second record
//! from the same account at the same height replaces the first one; the
//! event log, not this map, is the system of record for trade history.
//! Replacements are counted and logged so they never pass unnoticed.
//!
//! Custody totals track, per asset, how much came in through trade calls
//! and how much operators took out. All updates are overflow-checked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

use ledger_types::errors::ArithmeticError;
use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, SafeMath};

/// Asset reference stored in a Trade Record.
///
/// `Native` is the reserved value for the ledger's native coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeAsset {
    Native,
    Token(Address),
}

impl fmt::Display for TradeAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAsset::Native => write!(f, "native"),
            TradeAsset::Token(addr) => write!(f, "{}", addr),
        }
    }
}

/// Snapshot of a recorded buy/sell intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub asset: TradeAsset,
    pub amount: Amount,
}

/// Undo information for a single [`TradeLedger::record`] call.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct RecordCheckpoint {
    key: (Address, u64),
    previous: Option<TradeRecord>,
}

/// `(account, height)`-keyed Trade Record store.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    records: HashMap<(Address, u64), TradeRecord>,
    overwrites: u64,
    warn_on_overwrite: bool,
}

impl TradeLedger {
    pub fn new(warn_on_overwrite: bool) -> Self {
        Self {
            records: HashMap::new(),
            overwrites: 0,
            warn_on_overwrite,
        }
    }

    /// Write the record for `(account, height)`, replacing any earlier one.
    pub fn record(
        &mut self,
        account: Address,
        height: u64,
        record: TradeRecord,
    ) -> RecordCheckpoint {
        let key = (account, height);
        let previous = self.records.insert(key, record);
        if let Some(prev) = &previous {
            self.overwrites += 1;
            if self.warn_on_overwrite {
                warn!(
                    account = %account,
                    height,
                    previous_asset = %prev.asset,
                    previous_amount = %prev.amount,
                    "Trade record overwritten at same height"
                );
            }
        }
        RecordCheckpoint { key, previous }
    }

    /// Undo a [`record`](Self::record) call whose operation failed later.
    pub fn rollback(&mut self, checkpoint: RecordCheckpoint) {
        match checkpoint.previous {
            Some(prev) => {
                self.records.insert(checkpoint.key, prev);
                self.overwrites = self.overwrites.saturating_sub(1);
            }
            None => {
                self.records.remove(&checkpoint.key);
            }
        }
    }

    /// Raw lookup by `(account, height)`.
    pub fn get(&self, account: &Address, height: u64) -> Option<&TradeRecord> {
        self.records.get(&(*account, height))
    }

    /// Number of records that replaced an earlier record at the same key.
    pub fn overwrite_count(&self) -> u64 {
        self.overwrites
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Which custody total a checkpoint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CustodySide {
    Received,
    Withdrawn,
}

/// Undo information for a single custody credit.
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct CustodyCheckpoint {
    side: CustodySide,
    asset: TradeAsset,
    previous: Amount,
}

/// Per-asset running totals of assets moved in and out of custody.
#[derive(Debug, Clone, Default)]
pub struct CustodyLedger {
    received: HashMap<TradeAsset, Amount>,
    withdrawn: HashMap<TradeAsset, Amount>,
}

impl CustodyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the received total of `asset`.
    pub fn credit_received(
        &mut self,
        asset: TradeAsset,
        amount: Amount,
    ) -> Result<CustodyCheckpoint, ArithmeticError> {
        self.safe_credit(CustodySide::Received, asset, amount)
    }

    /// Add `amount` to the withdrawn total of `asset`.
    pub fn credit_withdrawn(
        &mut self,
        asset: TradeAsset,
        amount: Amount,
    ) -> Result<CustodyCheckpoint, ArithmeticError> {
        self.safe_credit(CustodySide::Withdrawn, asset, amount)
    }

    /// Put a total back to its value before the checkpointed credit.
    pub fn rollback(&mut self, checkpoint: CustodyCheckpoint) {
        let totals = self.totals_mut(checkpoint.side);
        if checkpoint.previous.is_zero() {
            totals.remove(&checkpoint.asset);
        } else {
            totals.insert(checkpoint.asset, checkpoint.previous);
        }
    }

    pub fn received(&self, asset: &TradeAsset) -> Amount {
        self.received.get(asset).copied().unwrap_or_default()
    }

    pub fn withdrawn(&self, asset: &TradeAsset) -> Amount {
        self.withdrawn.get(asset).copied().unwrap_or_default()
    }

    fn totals_mut(&mut self, side: CustodySide) -> &mut HashMap<TradeAsset, Amount> {
        match side {
            CustodySide::Received => &mut self.received,
            CustodySide::Withdrawn => &mut self.withdrawn,
        }
    }

    fn safe_credit(
        &mut self,
        side: CustodySide,
        asset: TradeAsset,
        amount: Amount,
    ) -> Result<CustodyCheckpoint, ArithmeticError> {
        let totals = self.totals_mut(side);
        let previous = totals.get(&asset).copied().unwrap_or_default();
        let updated = previous.safe_add(amount)?;
        totals.insert(asset, updated);
        Ok(CustodyCheckpoint {
            side,
            asset,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn native(amount: u64) -> TradeRecord {
        TradeRecord {
            asset: TradeAsset::Native,
            amount: Amount::from(amount),
        }
    }

    #[test]
    fn test_record_and_get() {
        let mut ledger = TradeLedger::new(true);
        let _ = ledger.record(addr(1), 5, native(10));
        assert_eq!(ledger.get(&addr(1), 5), Some(&native(10)));
        assert_eq!(ledger.get(&addr(1), 6), None);
        assert_eq!(ledger.get(&addr(2), 5), None);
    }

    #[test]
    fn test_same_height_overwrites() {
        let mut ledger = TradeLedger::new(true);
        let _ = ledger.record(addr(1), 5, native(10));
        let _ = ledger.record(addr(1), 5, native(20));
        assert_eq!(ledger.get(&addr(1), 5), Some(&native(20)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.overwrite_count(), 1);
    }

    #[test]
    fn test_rollback_fresh_record() {
        let mut ledger = TradeLedger::new(false);
        let cp = ledger.record(addr(1), 5, native(10));
        ledger.rollback(cp);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_rollback_restores_previous() {
        let mut ledger = TradeLedger::new(false);
        let _ = ledger.record(addr(1), 5, native(10));
        let cp = ledger.record(addr(1), 5, native(20));
        ledger.rollback(cp);
        assert_eq!(ledger.get(&addr(1), 5), Some(&native(10)));
        assert_eq!(ledger.overwrite_count(), 0);
    }

    #[test]
    fn test_custody_credit_and_rollback() {
        let mut custody = CustodyLedger::new();
        let token = TradeAsset::Token(addr(0x10));
        let _ = custody.credit_received(token, Amount::from(7u64)).unwrap();
        let cp = custody.credit_received(token, Amount::from(3u64)).unwrap();
        assert_eq!(custody.received(&token), Amount::from(10u64));
        custody.rollback(cp);
        assert_eq!(custody.received(&token), Amount::from(7u64));
        assert_eq!(custody.withdrawn(&token), Amount::zero());
    }

    #[test]
    fn test_custody_rollback_first_credit() {
        let mut custody = CustodyLedger::new();
        let cp = custody
            .credit_withdrawn(TradeAsset::Native, Amount::from(5u64))
            .unwrap();
        custody.rollback(cp);
        assert_eq!(custody.withdrawn(&TradeAsset::Native), Amount::zero());
    }

    #[test]
    fn test_custody_overflow() {
        let mut custody = CustodyLedger::new();
        let _ = custody.credit_received(TradeAsset::Native, Amount::MAX).unwrap();
        let err = custody
            .credit_received(TradeAsset::Native, Amount::one())
            .unwrap_err();
        assert_eq!(err, ArithmeticError::Overflow { op: "add" });
        assert_eq!(custody.received(&TradeAsset::Native), Amount::MAX);
    }

    #[test]
    fn test_trade_asset_display() {
        assert_eq!(TradeAsset::Native.to_string(), "native");
        assert!(TradeAsset::Token(addr(1)).to_string().starts_with("0x"));
    }
}
