//! In-memory asset host
//!
//! Reference implementation of every asset capability, used by the test
//! suites and by anything that wants to drive the exchange without a real
//! ledger. Token balances use the same checked arithmetic as the exchange.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, SafeMath, TokenId};

use super::{AssetHost, CodeInspector, FungibleToken, NativeCoin, NonFungibleToken};
use crate::errors::AssetError;

/// Events emitted by in-memory assets.
///
/// For non-fungible tokens `value` in `Transfer`/`Approval` is the token id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Transfer {
        from: Address,
        to: Address,
        value: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: Amount,
    },
    ApprovalForAll {
        owner: Address,
        operator: Address,
        approved: bool,
    },
}

/// ERC-20 style token.
#[derive(Debug, Clone)]
pub struct MemoryToken {
    symbol: String,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    events: Vec<TokenEvent>,
    return_false: bool,
}

impl MemoryToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            total_supply: Amount::zero(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            events: Vec::new(),
            return_false: false,
        }
    }

    /// Make every transfer report `false` instead of failing, like a
    /// non-reverting token would.
    pub fn set_return_false(&mut self, enabled: bool) {
        self.return_false = enabled;
    }

    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<(), AssetError> {
        if to.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        let supply = self.total_supply.safe_add(amount)?;
        let balance = self.balance_of(&to).safe_add(amount)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        self.events.push(TokenEvent::Transfer {
            from: Address::ZERO,
            to,
            value: amount,
        });
        Ok(())
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    fn move_balance(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        if to.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from != to {
            let debited = available.safe_sub(amount)?;
            let credited = self.balance_of(&to).safe_add(amount)?;
            self.balances.insert(from, debited);
            self.balances.insert(to, credited);
        }
        self.events.push(TokenEvent::Transfer {
            from,
            to,
            value: amount,
        });
        Ok(())
    }
}

impl FungibleToken for MemoryToken {
    fn symbol(&self) -> Result<String, AssetError> {
        Ok(self.symbol.clone())
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<bool, AssetError> {
        if spender.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        self.allowances.insert((owner, spender), amount);
        self.events.push(TokenEvent::Approval {
            owner,
            spender,
            value: amount,
        });
        Ok(true)
    }

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, AssetError> {
        if self.return_false {
            return Ok(false);
        }
        self.move_balance(from, to, amount)?;
        Ok(true)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, AssetError> {
        if self.return_false {
            return Ok(false);
        }
        let allowed = self.allowance(&from, &spender);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                required: amount,
                available: allowed,
            });
        }
        self.move_balance(from, to, amount)?;
        let remaining = allowed.safe_sub(amount)?;
        self.allowances.insert((from, spender), remaining);
        Ok(true)
    }
}

/// ERC-721 style token.
#[derive(Debug, Clone, Default)]
pub struct MemoryNft {
    owners: HashMap<TokenId, Address>,
    token_approvals: HashMap<TokenId, Address>,
    operator_approvals: HashSet<(Address, Address)>,
    events: Vec<TokenEvent>,
}

impl MemoryNft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, to: Address, token_id: TokenId) -> Result<(), AssetError> {
        if to.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        if self.owners.contains_key(&token_id) {
            return Err(AssetError::AlreadyMinted { token_id });
        }
        self.owners.insert(token_id, to);
        self.events.push(TokenEvent::Transfer {
            from: Address::ZERO,
            to,
            value: token_id,
        });
        Ok(())
    }

    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operator_approvals.contains(&(*owner, *operator))
    }

    fn is_authorized(&self, caller: &Address, owner: &Address, token_id: TokenId) -> bool {
        caller == owner
            || self.token_approvals.get(&token_id) == Some(caller)
            || self.is_approved_for_all(owner, caller)
    }
}

impl NonFungibleToken for MemoryNft {
    fn owner_of(&self, token_id: TokenId) -> Result<Address, AssetError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(AssetError::UnknownToken { token_id })
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        let count = self.owners.values().filter(|o| *o == owner).count();
        Amount::from(count as u64)
    }

    fn approve(
        &mut self,
        caller: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<(), AssetError> {
        let owner = self.owner_of(token_id)?;
        if caller != owner && !self.is_approved_for_all(&owner, &caller) {
            return Err(AssetError::NotOwnerOrApproved { token_id });
        }
        self.token_approvals.insert(token_id, to);
        self.events.push(TokenEvent::Approval {
            owner,
            spender: to,
            value: token_id,
        });
        Ok(())
    }

    fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), AssetError> {
        if approved {
            self.operator_approvals.insert((caller, operator));
        } else {
            self.operator_approvals.remove(&(caller, operator));
        }
        self.events.push(TokenEvent::ApprovalForAll {
            owner: caller,
            operator,
            approved,
        });
        Ok(())
    }

    fn safe_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<(), AssetError> {
        let owner = self.owner_of(token_id)?;
        if owner != from || !self.is_authorized(&caller, &owner, token_id) {
            return Err(AssetError::NotOwnerOrApproved { token_id });
        }
        if to.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        self.token_approvals.remove(&token_id);
        self.owners.insert(token_id, to);
        self.events.push(TokenEvent::Transfer {
            from,
            to,
            value: token_id,
        });
        Ok(())
    }
}

/// In-memory ledger: native balances, deployed assets and code-backed
/// addresses.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    native: HashMap<Address, Amount>,
    rejecting: HashSet<Address>,
    bare_code: HashSet<Address>,
    tokens: HashMap<Address, MemoryToken>,
    nfts: HashMap<Address, MemoryNft>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a fungible token at `address`, replacing anything there.
    pub fn deploy_token(&mut self, address: Address, symbol: &str) -> &mut MemoryToken {
        match self.tokens.entry(address) {
            Entry::Occupied(mut slot) => {
                slot.insert(MemoryToken::new(symbol));
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(MemoryToken::new(symbol)),
        }
    }

    /// Deploy a non-fungible token at `address`, replacing anything there.
    pub fn deploy_nft(&mut self, address: Address) -> &mut MemoryNft {
        match self.nfts.entry(address) {
            Entry::Occupied(mut slot) => {
                slot.insert(MemoryNft::new());
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(MemoryNft::new()),
        }
    }

    /// Mark `address` as code-backed without any asset interface.
    pub fn deploy_bare_contract(&mut self, address: Address) {
        self.bare_code.insert(address);
    }

    pub fn token(&self, address: &Address) -> Option<&MemoryToken> {
        self.tokens.get(address)
    }

    pub fn token_mut(&mut self, address: &Address) -> Option<&mut MemoryToken> {
        self.tokens.get_mut(address)
    }

    pub fn nft(&self, address: &Address) -> Option<&MemoryNft> {
        self.nfts.get(address)
    }

    pub fn nft_mut(&mut self, address: &Address) -> Option<&mut MemoryNft> {
        self.nfts.get_mut(address)
    }

    /// Credit native coin to `account` out of thin air.
    pub fn fund_native(&mut self, account: Address, amount: Amount) -> Result<(), AssetError> {
        let balance = self.native_balance(&account).safe_add(amount)?;
        self.native.insert(account, balance);
        Ok(())
    }

    /// Make `account` refuse incoming native transfers.
    pub fn reject_native(&mut self, account: Address) {
        self.rejecting.insert(account);
    }
}

impl CodeInspector for MemoryHost {
    fn has_code(&self, account: &Address) -> bool {
        self.bare_code.contains(account)
            || self.tokens.contains_key(account)
            || self.nfts.contains_key(account)
    }
}

impl NativeCoin for MemoryHost {
    fn native_balance(&self, account: &Address) -> Amount {
        self.native.get(account).copied().unwrap_or_default()
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        if to.is_zero() {
            return Err(AssetError::ZeroRecipient);
        }
        if self.rejecting.contains(&to) {
            return Err(AssetError::RecipientRejected { recipient: to });
        }
        let available = self.native_balance(&from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from != to {
            let debited = available.safe_sub(amount)?;
            let credited = self.native_balance(&to).safe_add(amount)?;
            self.native.insert(from, debited);
            self.native.insert(to, credited);
        }
        Ok(())
    }
}

impl AssetHost for MemoryHost {
    fn fungible(&mut self, asset: &Address) -> Option<&mut dyn FungibleToken> {
        self.tokens
            .get_mut(asset)
            .map(|t| t as &mut dyn FungibleToken)
    }

    fn non_fungible(&mut self, asset: &Address) -> Option<&mut dyn NonFungibleToken> {
        self.nfts
            .get_mut(asset)
            .map(|t| t as &mut dyn NonFungibleToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn amt(n: u64) -> Amount {
        Amount::from(n)
    }

    #[test]
    fn test_token_mint_and_transfer() {
        let mut token = MemoryToken::new("TKX");
        token.mint(addr(1), amt(100)).unwrap();
        assert!(token.transfer(addr(1), addr(2), amt(30)).unwrap());
        assert_eq!(token.balance_of(&addr(1)), amt(70));
        assert_eq!(token.balance_of(&addr(2)), amt(30));
        assert_eq!(token.total_supply(), amt(100));
        assert_eq!(token.events().len(), 2);
    }

    #[test]
    fn test_token_transfer_insufficient_balance() {
        let mut token = MemoryToken::new("TKX");
        token.mint(addr(1), amt(10)).unwrap();
        let err = token.transfer(addr(1), addr(2), amt(11)).unwrap_err();
        assert_eq!(
            err,
            AssetError::InsufficientBalance {
                required: amt(11),
                available: amt(10)
            }
        );
        assert_eq!(token.balance_of(&addr(1)), amt(10));
    }

    #[test]
    fn test_token_transfer_from_spends_allowance() {
        let mut token = MemoryToken::new("TKX");
        token.mint(addr(1), amt(100)).unwrap();
        token.approve(addr(1), addr(9), amt(50)).unwrap();
        assert!(token.transfer_from(addr(9), addr(1), addr(9), amt(20)).unwrap());
        assert_eq!(token.allowance(&addr(1), &addr(9)), amt(30));
        assert_eq!(token.balance_of(&addr(9)), amt(20));
    }

    #[test]
    fn test_token_transfer_from_insufficient_allowance() {
        let mut token = MemoryToken::new("TKX");
        token.mint(addr(1), amt(100)).unwrap();
        token.approve(addr(1), addr(9), amt(5)).unwrap();
        let err = token
            .transfer_from(addr(9), addr(1), addr(9), amt(20))
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { .. }));
        assert_eq!(token.balance_of(&addr(1)), amt(100));
    }

    #[test]
    fn test_token_return_false_mode() {
        let mut token = MemoryToken::new("BAD");
        token.mint(addr(1), amt(100)).unwrap();
        token.set_return_false(true);
        assert!(!token.transfer(addr(1), addr(2), amt(1)).unwrap());
        assert_eq!(token.balance_of(&addr(1)), amt(100));
    }

    #[test]
    fn test_nft_transfer_requires_authorization() {
        let mut nft = MemoryNft::new();
        nft.mint(addr(1), amt(7)).unwrap();
        assert_eq!(
            nft.safe_transfer_from(addr(2), addr(1), addr(2), amt(7)),
            Err(AssetError::NotOwnerOrApproved { token_id: amt(7) })
        );
        nft.approve(addr(1), addr(2), amt(7)).unwrap();
        nft.safe_transfer_from(addr(2), addr(1), addr(2), amt(7)).unwrap();
        assert_eq!(nft.owner_of(amt(7)).unwrap(), addr(2));
        assert_eq!(nft.balance_of(&addr(1)), Amount::zero());
    }

    #[test]
    fn test_nft_operator_approval() {
        let mut nft = MemoryNft::new();
        nft.mint(addr(1), amt(1)).unwrap();
        nft.set_approval_for_all(addr(1), addr(3), true).unwrap();
        nft.safe_transfer_from(addr(3), addr(1), addr(4), amt(1)).unwrap();
        assert_eq!(nft.owner_of(amt(1)).unwrap(), addr(4));
    }

    #[test]
    fn test_nft_double_mint_and_unknown() {
        let mut nft = MemoryNft::new();
        nft.mint(addr(1), amt(1)).unwrap();
        assert_eq!(
            nft.mint(addr(2), amt(1)),
            Err(AssetError::AlreadyMinted { token_id: amt(1) })
        );
        assert_eq!(
            nft.owner_of(amt(2)),
            Err(AssetError::UnknownToken { token_id: amt(2) })
        );
    }

    #[test]
    fn test_native_transfer_and_reject() {
        let mut host = MemoryHost::new();
        host.fund_native(addr(1), amt(50)).unwrap();
        host.transfer_native(addr(1), addr(2), amt(20)).unwrap();
        assert_eq!(host.native_balance(&addr(1)), amt(30));
        assert_eq!(host.native_balance(&addr(2)), amt(20));

        host.reject_native(addr(3));
        assert_eq!(
            host.transfer_native(addr(1), addr(3), amt(1)),
            Err(AssetError::RecipientRejected { recipient: addr(3) })
        );
        assert_eq!(host.native_balance(&addr(1)), amt(30));
    }

    #[test]
    fn test_native_credit_overflow_keeps_sender_balance() {
        let mut host = MemoryHost::new();
        host.fund_native(addr(1), amt(10)).unwrap();
        host.fund_native(addr(2), Amount::MAX).unwrap();
        let err = host.transfer_native(addr(1), addr(2), amt(10)).unwrap_err();
        assert!(matches!(err, AssetError::Arithmetic(_)));
        assert_eq!(host.native_balance(&addr(1)), amt(10));
        assert_eq!(host.native_balance(&addr(2)), Amount::MAX);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut host = MemoryHost::new();
        host.fund_native(addr(1), amt(10)).unwrap();
        host.transfer_native(addr(1), addr(1), amt(4)).unwrap();
        assert_eq!(host.native_balance(&addr(1)), amt(10));

        let mut token = MemoryToken::new("TKX");
        token.mint(addr(1), amt(10)).unwrap();
        assert!(token.transfer(addr(1), addr(1), amt(4)).unwrap());
        assert_eq!(token.balance_of(&addr(1)), amt(10));
    }

    #[test]
    fn test_host_resolves_interfaces() {
        let mut host = MemoryHost::new();
        host.deploy_token(addr(0x10), "TKX");
        host.deploy_nft(addr(0x11));
        assert!(host.fungible(&addr(0x10)).is_some());
        assert!(host.fungible(&addr(0x11)).is_none());
        assert!(host.non_fungible(&addr(0x11)).is_some());
        assert!(host.has_code(&addr(0x11)));
    }
}
