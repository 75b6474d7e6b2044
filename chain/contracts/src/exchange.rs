//! Exchange: role-gated custody and trade-intent recording
//!
//! Composes the role registry, pause controller, whitelist, Trade Ledger
//! and event log into the contract's public operations.
//!
//! Every operation is atomic: guards run first and touch nothing; local
//! state (Trade Record, custody totals) is written before any external
//! asset call, and rolled back if that call fails; the event is appended
//! only once everything else has succeeded.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, TokenId};

use crate::assets::{
    ensure_contract, fungible_at, non_fungible_at, require_true, AssetHost, CodeInspector,
};
use crate::config::ExchangeConfig;
use crate::errors::ExchangeError;
use crate::event_log::EventLog;
use crate::events::{
    BuyRecorded, CancelBuy, CancelSell, ExchangeEvent, FavoriteAdded, FavoriteRemoved,
    OperatorAdded, OperatorRemoved, Paused, SellRecorded, Unpaused, WhitelistRemoved,
    WhitelistSet, WithdrawnNative, WithdrawnNft, WithdrawnToken,
};
use crate::security::{OperatorRoles, PauseGuard, PauseState, ReentrancyGuard};
use crate::trades::{CustodyLedger, TradeAsset, TradeLedger, TradeRecord};
use crate::whitelist::Whitelist;

/// Who is calling, with how much native value, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    /// Native coin attached to the call
    pub value: Amount,
    /// Ledger height of the call
    pub height: u64,
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    pub fn new(caller: Address, height: u64) -> Self {
        Self {
            caller,
            value: Amount::zero(),
            height,
            timestamp: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// The exchange contract.
#[derive(Debug)]
pub struct Exchange {
    address: Address,
    roles: OperatorRoles,
    pause_guard: PauseGuard,
    whitelist: Whitelist,
    trades: TradeLedger,
    custody: CustodyLedger,
    reentrancy_guard: ReentrancyGuard,
    log: EventLog,
}

impl Exchange {
    /// Deploy the exchange at `address`. The caller becomes an operator.
    pub fn deploy<H: CodeInspector + ?Sized>(
        host: &H,
        ctx: &CallContext,
        address: Address,
        config: &ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        ensure_no_value(ctx)?;
        if ctx.caller.is_zero() || address.is_zero() {
            return Err(ExchangeError::ZeroAddress);
        }

        let mut exchange = Self {
            address,
            roles: OperatorRoles::new(ctx.caller),
            pause_guard: PauseGuard::new(),
            whitelist: Whitelist::new(),
            trades: TradeLedger::new(config.warn_on_record_overwrite),
            custody: CustodyLedger::new(),
            reentrancy_guard: ReentrancyGuard::new(),
            log: EventLog::new(),
        };
        exchange.emit(
            ctx,
            ExchangeEvent::OperatorAdded(OperatorAdded {
                account: ctx.caller,
                by: ctx.caller,
            }),
        );

        for account in &config.initial_operators {
            exchange.add_operator(ctx, *account)?;
        }
        for asset in &config.initial_whitelist {
            exchange.set_whitelist(host, ctx, *asset)?;
        }
        if config.start_paused {
            exchange.pause(ctx)?;
        }

        info!(
            address = %address,
            deployer = %ctx.caller,
            operators = exchange.roles.count(),
            whitelisted = exchange.whitelist.len(),
            paused = exchange.paused(),
            "Exchange deployed"
        );
        Ok(exchange)
    }

    // ───────────────────────── Role Registry ─────────────────────────

    /// Grant the operator role. Operator-only.
    pub fn add_operator(
        &mut self,
        ctx: &CallContext,
        account: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("add_operator", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.add(&ctx.caller, account)?;
            info!(account = %account, by = %ctx.caller, "Operator added");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::OperatorAdded(OperatorAdded {
                    account,
                    by: ctx.caller,
                }),
            ))
        })
    }

    /// Revoke the operator role. Operator-only.
    pub fn remove_operator(
        &mut self,
        ctx: &CallContext,
        account: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("remove_operator", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.remove(&ctx.caller, account)?;
            info!(account = %account, by = %ctx.caller, "Operator removed");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::OperatorRemoved(OperatorRemoved {
                    account,
                    by: ctx.caller,
                }),
            ))
        })
    }

    /// Give up the caller's own operator role.
    pub fn renounce_operator(&mut self, ctx: &CallContext) -> Result<ExchangeEvent, ExchangeError> {
        self.run("renounce_operator", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.renounce(&ctx.caller)?;
            info!(account = %ctx.caller, "Operator renounced");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::OperatorRemoved(OperatorRemoved {
                    account: ctx.caller,
                    by: ctx.caller,
                }),
            ))
        })
    }

    pub fn is_operator(&self, account: &Address) -> bool {
        self.roles.is_operator(account)
    }

    pub fn operators(&self) -> impl Iterator<Item = &Address> {
        self.roles.operators()
    }

    // ───────────────────────── Pause ─────────────────────────

    /// Running → Paused. Operator-only.
    pub fn pause(&mut self, ctx: &CallContext) -> Result<ExchangeEvent, ExchangeError> {
        self.run("pause", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ex.pause_guard.pause()?;
            info!(by = %ctx.caller, height = ctx.height, "Exchange paused");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::Paused(Paused {
                    account: ctx.caller,
                }),
            ))
        })
    }

    /// Paused → Running. Operator-only.
    pub fn unpause(&mut self, ctx: &CallContext) -> Result<ExchangeEvent, ExchangeError> {
        self.run("unpause", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ex.pause_guard.unpause()?;
            info!(by = %ctx.caller, height = ctx.height, "Exchange unpaused");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::Unpaused(Unpaused {
                    account: ctx.caller,
                }),
            ))
        })
    }

    pub fn paused(&self) -> bool {
        self.pause_guard.is_paused()
    }

    pub fn pause_state(&self) -> PauseState {
        self.pause_guard.state()
    }

    // ───────────────────────── Whitelist ─────────────────────────

    /// Approve a code-backed asset for trading. Operator-only.
    pub fn set_whitelist<H: CodeInspector + ?Sized>(
        &mut self,
        host: &H,
        ctx: &CallContext,
        asset: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("set_whitelist", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ensure_contract(host, &asset)?;
            ex.whitelist.insert(asset)?;
            info!(asset = %asset, by = %ctx.caller, "Asset whitelisted");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::WhitelistSet(WhitelistSet {
                    asset,
                    operator: ctx.caller,
                }),
            ))
        })
    }

    /// Withdraw approval for an asset. Operator-only.
    pub fn rm_whitelist(
        &mut self,
        ctx: &CallContext,
        asset: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("rm_whitelist", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ex.whitelist.remove(&asset)?;
            info!(asset = %asset, by = %ctx.caller, "Asset removed from whitelist");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::WhitelistRemoved(WhitelistRemoved {
                    asset,
                    operator: ctx.caller,
                }),
            ))
        })
    }

    pub fn is_in_whitelist(&self, asset: &Address) -> bool {
        self.whitelist.contains(asset)
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    // ───────────────────────── Trade Ledger ─────────────────────────

    /// Record a buy intent paid with the native value attached to the call.
    ///
    /// The attached value is moved into the exchange's custody and the
    /// Trade Record stores it under [`TradeAsset::Native`].
    pub fn record_buy_with_native<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        ask_asset: Address,
        ask_amount: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("record_buy_with_native", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_positive(ctx.value, "value")?;
            ensure_positive(ask_amount, "ask_amount")?;
            ex.whitelist.ensure_listed(&ask_asset)?;

            let custodian = ex.address;
            let record = TradeRecord {
                asset: TradeAsset::Native,
                amount: ctx.value,
            };
            ex.pull_into_custody(ctx, record, || {
                host.transfer_native(ctx.caller, custodian, ctx.value)
                    .map_err(|e| ExchangeError::external(custodian, e))
            })?;

            debug!(
                buyer = %ctx.caller,
                ask_asset = %ask_asset,
                ask_amount = %ask_amount,
                value = %ctx.value,
                height = ctx.height,
                "Buy with native recorded"
            );
            Ok(ex.emit(
                ctx,
                ExchangeEvent::BuyRecorded(BuyRecorded {
                    ask_asset,
                    ask_amount,
                    bid_asset: TradeAsset::Native,
                    bid_amount: ctx.value,
                    buyer: ctx.caller,
                }),
            ))
        })
    }

    /// Record a buy intent paid with a whitelisted token.
    ///
    /// `bid_amount` of `bid_asset` is pulled from the caller with
    /// `transfer_from`; the caller must have approved the exchange first.
    pub fn record_buy_with_token<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        ask_asset: Address,
        ask_amount: Amount,
        bid_asset: Address,
        bid_amount: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("record_buy_with_token", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            ensure_positive(ask_amount, "ask_amount")?;
            ensure_positive(bid_amount, "bid_amount")?;
            ex.whitelist.ensure_listed(&ask_asset)?;
            ex.whitelist.ensure_listed(&bid_asset)?;

            let record = TradeRecord {
                asset: TradeAsset::Token(bid_asset),
                amount: bid_amount,
            };
            let custodian = ex.address;
            ex.pull_into_custody(ctx, record, || {
                pull_token(host, bid_asset, ctx.caller, custodian, bid_amount)
            })?;

            debug!(
                buyer = %ctx.caller,
                ask_asset = %ask_asset,
                ask_amount = %ask_amount,
                bid_asset = %bid_asset,
                bid_amount = %bid_amount,
                height = ctx.height,
                "Buy with token recorded"
            );
            Ok(ex.emit(
                ctx,
                ExchangeEvent::BuyRecorded(BuyRecorded {
                    ask_asset,
                    ask_amount,
                    bid_asset: TradeAsset::Token(bid_asset),
                    bid_amount,
                    buyer: ctx.caller,
                }),
            ))
        })
    }

    /// Record a sell intent: a whitelisted token offered for native coin.
    pub fn record_sell_for_native<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        ask_native_amount: Amount,
        bid_asset: Address,
        bid_amount: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("record_sell_for_native", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            ensure_positive(ask_native_amount, "ask_native_amount")?;
            ensure_positive(bid_amount, "bid_amount")?;
            ex.whitelist.ensure_listed(&bid_asset)?;

            let record = TradeRecord {
                asset: TradeAsset::Token(bid_asset),
                amount: bid_amount,
            };
            let custodian = ex.address;
            ex.pull_into_custody(ctx, record, || {
                pull_token(host, bid_asset, ctx.caller, custodian, bid_amount)
            })?;

            debug!(
                seller = %ctx.caller,
                ask_native_amount = %ask_native_amount,
                bid_asset = %bid_asset,
                bid_amount = %bid_amount,
                height = ctx.height,
                "Sell for native recorded"
            );
            Ok(ex.emit(
                ctx,
                ExchangeEvent::SellRecorded(SellRecorded {
                    ask_native_amount,
                    bid_asset,
                    bid_amount,
                    seller: ctx.caller,
                }),
            ))
        })
    }

    /// Emit a `CancelBuy` audit event. Custody and records are untouched.
    pub fn cancel_buy(
        &mut self,
        ctx: &CallContext,
        ask_asset: Address,
        id: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("cancel_buy", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            ex.whitelist.ensure_listed(&ask_asset)?;
            Ok(ex.emit(
                ctx,
                ExchangeEvent::CancelBuy(CancelBuy {
                    ask_asset,
                    id,
                    account: ctx.caller,
                }),
            ))
        })
    }

    /// Emit a `CancelSell` audit event. Custody and records are untouched.
    pub fn cancel_sell(
        &mut self,
        ctx: &CallContext,
        bid_asset: Address,
        id: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("cancel_sell", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            ex.whitelist.ensure_listed(&bid_asset)?;
            Ok(ex.emit(
                ctx,
                ExchangeEvent::CancelSell(CancelSell {
                    bid_asset,
                    id,
                    account: ctx.caller,
                }),
            ))
        })
    }

    pub fn add_favorite<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        asset: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("add_favorite", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            let symbol = ex.call_external(|| resolve_symbol(host, asset))?;
            Ok(ex.emit(
                ctx,
                ExchangeEvent::FavoriteAdded(FavoriteAdded {
                    asset,
                    symbol,
                    account: ctx.caller,
                }),
            ))
        })
    }

    pub fn remove_favorite<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        asset: Address,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("remove_favorite", ctx, |ex| {
            ex.pause_guard.ensure_running()?;
            ensure_no_value(ctx)?;
            let symbol = ex.call_external(|| resolve_symbol(host, asset))?;
            Ok(ex.emit(
                ctx,
                ExchangeEvent::FavoriteRemoved(FavoriteRemoved {
                    asset,
                    symbol,
                    account: ctx.caller,
                }),
            ))
        })
    }

    /// Raw Trade Record lookup by `(account, height)`.
    pub fn trade_record(&self, account: &Address, height: u64) -> Option<&TradeRecord> {
        self.trades.get(account, height)
    }

    pub fn trades(&self) -> &TradeLedger {
        &self.trades
    }

    pub fn custody(&self) -> &CustodyLedger {
        &self.custody
    }

    // ───────────────────────── Asset Transfer Facade ─────────────────────────

    /// Send a custodied non-fungible token to the calling operator.
    pub fn withdraw_nft<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        asset: Address,
        token_id: TokenId,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("withdraw_nft", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ensure_contract(&*host, &asset)?;

            let custodian = ex.address;
            ex.call_external(|| {
                non_fungible_at(host, &asset)?
                    .safe_transfer_from(custodian, custodian, ctx.caller, token_id)
                    .map_err(|e| ExchangeError::external(asset, e))
            })?;

            info!(asset = %asset, token_id = %token_id, to = %ctx.caller, "NFT withdrawn");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::WithdrawnNft(WithdrawnNft {
                    asset,
                    token_id,
                    to: ctx.caller,
                }),
            ))
        })
    }

    /// Send custodied fungible tokens to the calling operator.
    pub fn withdraw_token<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        asset: Address,
        amount: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("withdraw_token", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ensure_positive(amount, "amount")?;
            ensure_contract(&*host, &asset)?;

            let custodian = ex.address;
            ex.release_from_custody(TradeAsset::Token(asset), amount, || {
                let token = fungible_at(host, &asset)?;
                require_true(asset, token.transfer(custodian, ctx.caller, amount))
            })?;

            info!(asset = %asset, amount = %amount, to = %ctx.caller, "Token withdrawn");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::WithdrawnToken(WithdrawnToken {
                    asset,
                    amount,
                    to: ctx.caller,
                }),
            ))
        })
    }

    /// Send custodied native coin to the calling operator.
    pub fn withdraw_native<H: AssetHost + ?Sized>(
        &mut self,
        host: &mut H,
        ctx: &CallContext,
        amount: Amount,
    ) -> Result<ExchangeEvent, ExchangeError> {
        self.run("withdraw_native", ctx, |ex| {
            ensure_no_value(ctx)?;
            ex.roles.ensure_operator(&ctx.caller)?;
            ensure_positive(amount, "amount")?;

            let custodian = ex.address;
            ex.release_from_custody(TradeAsset::Native, amount, || {
                host.transfer_native(custodian, ctx.caller, amount)
                    .map_err(|e| ExchangeError::external(custodian, e))
            })?;

            info!(amount = %amount, to = %ctx.caller, "Native coin withdrawn");
            Ok(ex.emit(
                ctx,
                ExchangeEvent::WithdrawnNative(WithdrawnNative {
                    amount,
                    to: ctx.caller,
                }),
            ))
        })
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn address(&self) -> Address {
        self.address
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Run an operation body, logging rejected calls.
    fn run<T>(
        &mut self,
        op: &'static str,
        ctx: &CallContext,
        body: impl FnOnce(&mut Self) -> Result<T, ExchangeError>,
    ) -> Result<T, ExchangeError> {
        body(self).map_err(|e| {
            debug!(
                op,
                caller = %ctx.caller,
                height = ctx.height,
                kind = ?e.kind(),
                error = %e,
                "Call rejected"
            );
            e
        })
    }

    fn emit(&mut self, ctx: &CallContext, event: ExchangeEvent) -> ExchangeEvent {
        let entry = self.log.append(ctx.height, ctx.timestamp, event);
        debug!(
            sequence = entry.sequence,
            event_type = entry.event.label(),
            height = entry.height,
            "Event emitted"
        );
        entry.event.clone()
    }

    /// Run untrusted external code under the reentrancy lock.
    fn call_external<T>(
        &mut self,
        call: impl FnOnce() -> Result<T, ExchangeError>,
    ) -> Result<T, ExchangeError> {
        self.reentrancy_guard.acquire()?;
        let result = call();
        self.reentrancy_guard.release();
        result
    }

    /// Write the caller's Trade Record and custody total, then run the
    /// external pull. Both writes are undone if the pull fails.
    fn pull_into_custody(
        &mut self,
        ctx: &CallContext,
        record: TradeRecord,
        pull: impl FnOnce() -> Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError> {
        self.reentrancy_guard.acquire()?;
        let custody_cp = match self.custody.credit_received(record.asset, record.amount) {
            Ok(cp) => cp,
            Err(e) => {
                self.reentrancy_guard.release();
                return Err(e.into());
            }
        };
        let record_cp = self.trades.record(ctx.caller, ctx.height, record);

        let result = pull();
        if result.is_err() {
            self.trades.rollback(record_cp);
            self.custody.rollback(custody_cp);
        }
        self.reentrancy_guard.release();
        result
    }

    /// Count `amount` as withdrawn, then run the external transfer out.
    /// The count is undone if the transfer fails.
    fn release_from_custody(
        &mut self,
        asset: TradeAsset,
        amount: Amount,
        transfer: impl FnOnce() -> Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError> {
        self.reentrancy_guard.acquire()?;
        let custody_cp = match self.custody.credit_withdrawn(asset, amount) {
            Ok(cp) => cp,
            Err(e) => {
                self.reentrancy_guard.release();
                return Err(e.into());
            }
        };

        let result = transfer();
        if result.is_err() {
            self.custody.rollback(custody_cp);
        }
        self.reentrancy_guard.release();
        result
    }
}

fn ensure_positive(amount: Amount, field: &'static str) -> Result<(), ExchangeError> {
    if amount.is_zero() {
        return Err(ExchangeError::InvalidAmount { field });
    }
    Ok(())
}

/// Only `record_buy_with_native` accepts native value.
fn ensure_no_value(ctx: &CallContext) -> Result<(), ExchangeError> {
    if !ctx.value.is_zero() {
        return Err(ExchangeError::UnexpectedValue { value: ctx.value });
    }
    Ok(())
}

fn pull_token<H: AssetHost + ?Sized>(
    host: &mut H,
    asset: Address,
    from: Address,
    custodian: Address,
    amount: Amount,
) -> Result<(), ExchangeError> {
    let token = fungible_at(host, &asset)?;
    require_true(asset, token.transfer_from(custodian, from, custodian, amount))
}

fn resolve_symbol<H: AssetHost + ?Sized>(
    host: &mut H,
    asset: Address,
) -> Result<String, ExchangeError> {
    fungible_at(host, &asset)?
        .symbol()
        .map_err(|e| ExchangeError::external(asset, e))
}
