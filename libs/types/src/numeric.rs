//! Fixed-width amounts and safe arithmetic
//!
//! Amounts are 256-bit unsigned integers. Every balance or amount
//! computation in the exchange goes through [`SafeMath`], which either
//! returns the exact result or fails. Nothing wraps.

use primitive_types::U256;

use crate::errors::ArithmeticError;

/// Token, coin and native-value amounts
pub type Amount = U256;

/// Non-fungible token identifier
pub type TokenId = U256;

/// Overflow/underflow-checked arithmetic.
pub trait SafeMath: Sized {
    fn safe_add(self, rhs: Self) -> Result<Self, ArithmeticError>;
    fn safe_sub(self, rhs: Self) -> Result<Self, ArithmeticError>;
    fn safe_mul(self, rhs: Self) -> Result<Self, ArithmeticError>;
    fn safe_div(self, rhs: Self) -> Result<Self, ArithmeticError>;
    fn safe_rem(self, rhs: Self) -> Result<Self, ArithmeticError>;
}

impl SafeMath for U256 {
    fn safe_add(self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_add(rhs)
            .ok_or(ArithmeticError::Overflow { op: "add" })
    }

    fn safe_sub(self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_sub(rhs)
            .ok_or(ArithmeticError::Underflow { op: "sub" })
    }

    fn safe_mul(self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_mul(rhs)
            .ok_or(ArithmeticError::Overflow { op: "mul" })
    }

    fn safe_div(self, rhs: Self) -> Result<Self, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero { op: "div" });
        }
        Ok(self / rhs)
    }

    fn safe_rem(self, rhs: Self) -> Result<Self, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero { op: "rem" });
        }
        Ok(self % rhs)
    }
}
