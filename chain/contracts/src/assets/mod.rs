//! External asset capabilities
//!
//! The exchange never owns asset balances itself. It calls into these
//! interfaces to move native coin, fungible tokens and non-fungible tokens,
//! and to ask whether an address is backed by contract code. Every call
//! across this boundary is fallible and runs untrusted code.
//!
//! Caller identities (`owner`, `spender`, `caller`) are passed explicitly:
//! they stand for the account invoking the asset, which for exchange
//! calls is the exchange's own address.

pub mod memory;

use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, TokenId};

use crate::errors::{AssetError, ExchangeError};

/// Contract-detection capability.
pub trait CodeInspector {
    /// True if `account` is backed by executable code.
    fn has_code(&self, account: &Address) -> bool;
}

/// Fungible token (ERC-20 style) capability.
pub trait FungibleToken {
    fn symbol(&self) -> Result<String, AssetError>;

    fn total_supply(&self) -> Amount;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<bool, AssetError>;

    /// Move `amount` from `from` (the invoking account) to `to`.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount)
        -> Result<bool, AssetError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, AssetError>;
}

/// Non-fungible token (ERC-721 style) capability.
pub trait NonFungibleToken {
    fn owner_of(&self, token_id: TokenId) -> Result<Address, AssetError>;

    fn balance_of(&self, owner: &Address) -> Amount;

    fn approve(&mut self, caller: Address, to: Address, token_id: TokenId)
        -> Result<(), AssetError>;

    fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), AssetError>;

    fn safe_transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<(), AssetError>;
}

/// Native-coin transfer capability.
pub trait NativeCoin {
    fn native_balance(&self, account: &Address) -> Amount;

    /// Fails if `from` lacks funds or `to` cannot accept them.
    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), AssetError>;
}

/// Everything the exchange needs from the ledger it runs on.
///
/// `fungible` / `non_fungible` resolve an address to the asset deployed
/// there, or `None` if no code at that address implements the interface.
pub trait AssetHost: CodeInspector + NativeCoin {
    fn fungible(&mut self, asset: &Address) -> Option<&mut dyn FungibleToken>;

    fn non_fungible(&mut self, asset: &Address) -> Option<&mut dyn NonFungibleToken>;
}

/// True if `account` is a non-null, code-backed address.
pub fn is_contract<H: CodeInspector + ?Sized>(host: &H, account: &Address) -> bool {
    !account.is_zero() && host.has_code(account)
}

/// Fail with `NotAContract` unless `account` is code-backed.
pub fn ensure_contract<H: CodeInspector + ?Sized>(
    host: &H,
    account: &Address,
) -> Result<(), ExchangeError> {
    if !is_contract(host, account) {
        return Err(ExchangeError::NotAContract { account: *account });
    }
    Ok(())
}

/// Resolve `asset` as a fungible token or fail as an external-call error.
pub(crate) fn fungible_at<'h, H: AssetHost + ?Sized>(
    host: &'h mut H,
    asset: &Address,
) -> Result<&'h mut dyn FungibleToken, ExchangeError> {
    host.fungible(asset).ok_or_else(|| {
        ExchangeError::external(
            *asset,
            AssetError::UnsupportedInterface {
                interface: "fungible token",
            },
        )
    })
}

/// Resolve `asset` as a non-fungible token or fail as an external-call error.
pub(crate) fn non_fungible_at<'h, H: AssetHost + ?Sized>(
    host: &'h mut H,
    asset: &Address,
) -> Result<&'h mut dyn NonFungibleToken, ExchangeError> {
    host.non_fungible(asset).ok_or_else(|| {
        ExchangeError::external(
            *asset,
            AssetError::UnsupportedInterface {
                interface: "non-fungible token",
            },
        )
    })
}

/// Map a boolean-returning token call into a hard failure on `false`.
pub(crate) fn require_true(
    target: Address,
    result: Result<bool, AssetError>,
) -> Result<(), ExchangeError> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(ExchangeError::external(target, AssetError::ReturnedFalse)),
        Err(e) => Err(ExchangeError::external(target, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryHost;
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_is_contract() {
        let mut host = MemoryHost::new();
        host.deploy_token(addr(0x10), "TKX");
        host.deploy_bare_contract(addr(0x20));

        assert!(is_contract(&host, &addr(0x10)));
        assert!(is_contract(&host, &addr(0x20)));
        assert!(!is_contract(&host, &addr(1)));
        assert!(!is_contract(&host, &Address::ZERO));
    }

    #[test]
    fn test_ensure_contract() {
        let host = MemoryHost::new();
        assert_eq!(
            ensure_contract(&host, &addr(1)),
            Err(ExchangeError::NotAContract { account: addr(1) })
        );
    }

    #[test]
    fn test_fungible_at_bare_contract() {
        let mut host = MemoryHost::new();
        host.deploy_bare_contract(addr(0x20));
        let err = fungible_at(&mut host, &addr(0x20)).err().unwrap();
        assert!(matches!(
            err,
            ExchangeError::ExternalCall {
                source: AssetError::UnsupportedInterface { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_require_true() {
        assert!(require_true(addr(1), Ok(true)).is_ok());
        assert_eq!(
            require_true(addr(1), Ok(false)),
            Err(ExchangeError::external(addr(1), AssetError::ReturnedFalse))
        );
        assert_eq!(
            require_true(addr(1), Err(AssetError::ZeroRecipient)),
            Err(ExchangeError::external(addr(1), AssetError::ZeroRecipient))
        );
    }
}
