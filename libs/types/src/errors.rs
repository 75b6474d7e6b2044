//! Error types for the ledger primitives
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Checked arithmetic failure on fixed-width amounts.
///
/// Carries the name of the operation that failed so callers can report
/// which computation went out of range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("Arithmetic overflow in {op}")]
    Overflow { op: &'static str },

    #[error("Arithmetic underflow in {op}")]
    Underflow { op: &'static str },

    #[error("Division by zero in {op}")]
    DivisionByZero { op: &'static str },
}

/// Address parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address length: expected {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid address hex: {reason}")]
    InvalidHex { reason: String },
}
