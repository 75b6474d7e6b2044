//! Contract-specific error types
//!
//! Single error surface for the exchange contract plus the failures an
//! external asset capability can report back to it.

use ledger_types::errors::ArithmeticError;
use ledger_types::ids::Address;
use ledger_types::numeric::{Amount, TokenId};
use thiserror::Error;

/// Coarse classification of exchange failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks the required role
    Authorization,
    /// Operation invalid for the current pause or membership state
    State,
    /// Malformed input
    Validation,
    /// An external asset capability failed
    ExternalCall,
    /// Overflow, underflow or division by zero
    Arithmetic,
}

/// Failures reported by an external asset capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance { required: Amount, available: Amount },

    #[error("Unknown token id: {token_id}")]
    UnknownToken { token_id: TokenId },

    #[error("Token id already minted: {token_id}")]
    AlreadyMinted { token_id: TokenId },

    #[error("Caller is neither owner nor approved for token {token_id}")]
    NotOwnerOrApproved { token_id: TokenId },

    #[error("Recipient {recipient} cannot accept funds")]
    RecipientRejected { recipient: Address },

    #[error("Transfer to the zero address")]
    ZeroRecipient,

    #[error("Call returned false")]
    ReturnedFalse,

    #[error("Target does not implement {interface}")]
    UnsupportedInterface { interface: &'static str },

    #[error("Arithmetic error in asset: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

/// Exchange contract errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Unauthorized: {caller} is not an operator")]
    Unauthorized { caller: Address },

    #[error("Exchange is paused")]
    Paused,

    #[error("Exchange is already paused")]
    AlreadyPaused,

    #[error("Exchange is not paused")]
    NotPaused,

    #[error("Account {account} is already an operator")]
    AlreadyOperator { account: Address },

    #[error("Account {account} is not an operator")]
    NotOperator { account: Address },

    #[error("Asset {asset} is already whitelisted")]
    AlreadyWhitelisted { asset: Address },

    #[error("Asset {asset} is not in the whitelist")]
    NotInWhitelist { asset: Address },

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Zero address is not a valid account")]
    ZeroAddress,

    #[error("Amount must be positive: {field}")]
    InvalidAmount { field: &'static str },

    #[error("Account {account} is not a contract")]
    NotAContract { account: Address },

    #[error("Asset not whitelisted: {asset}")]
    AssetNotWhitelisted { asset: Address },

    #[error("Operation does not accept native value, got {value}")]
    UnexpectedValue { value: Amount },

    /// `target` is the asset contract called, or the exchange itself for
    /// native-coin moves.
    #[error("External call to {target} failed: {source}")]
    ExternalCall {
        target: Address,
        #[source]
        source: AssetError,
    },

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl ExchangeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::Unauthorized { .. } => ErrorKind::Authorization,
            ExchangeError::Paused
            | ExchangeError::AlreadyPaused
            | ExchangeError::NotPaused
            | ExchangeError::AlreadyOperator { .. }
            | ExchangeError::NotOperator { .. }
            | ExchangeError::AlreadyWhitelisted { .. }
            | ExchangeError::NotInWhitelist { .. }
            | ExchangeError::Reentrancy => ErrorKind::State,
            ExchangeError::ZeroAddress
            | ExchangeError::InvalidAmount { .. }
            | ExchangeError::NotAContract { .. }
            | ExchangeError::AssetNotWhitelisted { .. }
            | ExchangeError::UnexpectedValue { .. } => ErrorKind::Validation,
            ExchangeError::ExternalCall { .. } => ErrorKind::ExternalCall,
            ExchangeError::Arithmetic(_) => ErrorKind::Arithmetic,
        }
    }

    pub(crate) fn external(target: Address, source: AssetError) -> Self {
        ExchangeError::ExternalCall { target, source }
    }
}

/// Configuration loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}
