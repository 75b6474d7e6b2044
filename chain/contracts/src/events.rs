//! Contract events
//!
//! Events are immutable records emitted by contract operations. Every
//! successful mutating call emits exactly one of them, carrying the
//! acting account and the addresses/amounts needed to reconstruct the
//! action off-chain.

use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, TokenId};
use serde::{Deserialize, Serialize};

use crate::trades::TradeAsset;

/// Account granted the operator role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorAdded {
    pub account: Address,
    pub by: Address,
}

/// Account removed from the operator role (by another operator or itself)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRemoved {
    pub account: Address,
    pub by: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paused {
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unpaused {
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistSet {
    pub asset: Address,
    pub operator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistRemoved {
    pub asset: Address,
    pub operator: Address,
}

/// Asset marked as favorite; `symbol` is resolved from the asset itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteAdded {
    pub asset: Address,
    pub symbol: String,
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRemoved {
    pub asset: Address,
    pub symbol: String,
    pub account: Address,
}

/// Buy intent: `buyer` wants `ask_amount` of `ask_asset` and has put
/// `bid_amount` of `bid_asset` into custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyRecorded {
    pub ask_asset: Address,
    pub ask_amount: Amount,
    pub bid_asset: TradeAsset,
    pub bid_amount: Amount,
    pub buyer: Address,
}

/// Sell intent: `seller` put `bid_amount` of `bid_asset` into custody and
/// asks `ask_native_amount` of native coin for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellRecorded {
    pub ask_native_amount: Amount,
    pub bid_asset: Address,
    pub bid_amount: Amount,
    pub seller: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBuy {
    pub ask_asset: Address,
    pub id: Amount,
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSell {
    pub bid_asset: Address,
    pub id: Amount,
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawnNft {
    pub asset: Address,
    pub token_id: TokenId,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawnToken {
    pub asset: Address,
    pub amount: Amount,
    pub to: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawnNative {
    pub amount: Amount,
    pub to: Address,
}

/// Enum wrapper for all exchange events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    OperatorAdded(OperatorAdded),
    OperatorRemoved(OperatorRemoved),
    Paused(Paused),
    Unpaused(Unpaused),
    WhitelistSet(WhitelistSet),
    WhitelistRemoved(WhitelistRemoved),
    FavoriteAdded(FavoriteAdded),
    FavoriteRemoved(FavoriteRemoved),
    BuyRecorded(BuyRecorded),
    SellRecorded(SellRecorded),
    CancelBuy(CancelBuy),
    CancelSell(CancelSell),
    WithdrawnNft(WithdrawnNft),
    WithdrawnToken(WithdrawnToken),
    WithdrawnNative(WithdrawnNative),
}

impl ExchangeEvent {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            ExchangeEvent::OperatorAdded(_) => "operator_added",
            ExchangeEvent::OperatorRemoved(_) => "operator_removed",
            ExchangeEvent::Paused(_) => "paused",
            ExchangeEvent::Unpaused(_) => "unpaused",
            ExchangeEvent::WhitelistSet(_) => "whitelist_set",
            ExchangeEvent::WhitelistRemoved(_) => "whitelist_removed",
            ExchangeEvent::FavoriteAdded(_) => "favorite_added",
            ExchangeEvent::FavoriteRemoved(_) => "favorite_removed",
            ExchangeEvent::BuyRecorded(_) => "buy_recorded",
            ExchangeEvent::SellRecorded(_) => "sell_recorded",
            ExchangeEvent::CancelBuy(_) => "cancel_buy",
            ExchangeEvent::CancelSell(_) => "cancel_sell",
            ExchangeEvent::WithdrawnNft(_) => "withdrawn_nft",
            ExchangeEvent::WithdrawnToken(_) => "withdrawn_token",
            ExchangeEvent::WithdrawnNative(_) => "withdrawn_native",
        }
    }

    /// The account that performed the action.
    pub fn actor(&self) -> Address {
        match self {
            ExchangeEvent::OperatorAdded(e) => e.by,
            ExchangeEvent::OperatorRemoved(e) => e.by,
            ExchangeEvent::Paused(e) => e.account,
            ExchangeEvent::Unpaused(e) => e.account,
            ExchangeEvent::WhitelistSet(e) => e.operator,
            ExchangeEvent::WhitelistRemoved(e) => e.operator,
            ExchangeEvent::FavoriteAdded(e) => e.account,
            ExchangeEvent::FavoriteRemoved(e) => e.account,
            ExchangeEvent::BuyRecorded(e) => e.buyer,
            ExchangeEvent::SellRecorded(e) => e.seller,
            ExchangeEvent::CancelBuy(e) => e.account,
            ExchangeEvent::CancelSell(e) => e.account,
            ExchangeEvent::WithdrawnNft(e) => e.to,
            ExchangeEvent::WithdrawnToken(e) => e.to,
            ExchangeEvent::WithdrawnNative(e) => e.to,
        }
    }

    /// True if `account` acted in, or is the subject of, this event.
    pub fn involves(&self, account: &Address) -> bool {
        if self.actor() == *account {
            return true;
        }
        match self {
            ExchangeEvent::OperatorAdded(e) => e.account == *account,
            ExchangeEvent::OperatorRemoved(e) => e.account == *account,
            ExchangeEvent::WhitelistSet(e) => e.asset == *account,
            ExchangeEvent::WhitelistRemoved(e) => e.asset == *account,
            ExchangeEvent::FavoriteAdded(e) => e.asset == *account,
            ExchangeEvent::FavoriteRemoved(e) => e.asset == *account,
            ExchangeEvent::BuyRecorded(e) => {
                e.ask_asset == *account || e.bid_asset == TradeAsset::Token(*account)
            }
            ExchangeEvent::SellRecorded(e) => e.bid_asset == *account,
            ExchangeEvent::CancelBuy(e) => e.ask_asset == *account,
            ExchangeEvent::CancelSell(e) => e.bid_asset == *account,
            ExchangeEvent::WithdrawnNft(e) => e.asset == *account,
            ExchangeEvent::WithdrawnToken(e) => e.asset == *account,
            ExchangeEvent::Paused(_)
            | ExchangeEvent::Unpaused(_)
            | ExchangeEvent::WithdrawnNative(_) => false,
        }
    }
}
