//! Account identity types
//!
//! Every participant of the ledger (externally owned account or contract)
//! is identified by a 20-byte address. The all-zero address is the null
//! identity and is never a valid operator, whitelist entry or recipient.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::AddressError;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Opaque, globally unique ledger identity.
///
/// Rendered as `0x`-prefixed lowercase hex in `Display` and serde.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The null identity
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a small integer.
    ///
    /// The value is written big-endian into the trailing bytes, so
    /// `from_low_u64(0)` is [`Address::ZERO`].
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// True for the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parse a hex address, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: digits.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| AddressError::InvalidHex {
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::from_low_u64(0).is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn test_from_low_u64_distinct() {
        assert_ne!(Address::from_low_u64(1), Address::from_low_u64(2));
    }

    #[test]
    fn test_display_is_prefixed_hex() {
        let addr = Address::from_low_u64(0xabcd);
        assert_eq!(
            addr.to_string(),
            "0x000000000000000000000000000000000000abcd"
        );
    }

    #[test]
    fn test_parse_with_and_without_prefix() {
        let a: Address = "0x000000000000000000000000000000000000abcd".parse().unwrap();
        let b: Address = "000000000000000000000000000000000000ABCD".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, Address::from_low_u64(0xabcd));
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            AddressError::InvalidLength {
                expected: 40,
                actual: 4
            }
        );
    }

    #[test]
    fn test_parse_bad_hex() {
        let err = "0xzz00000000000000000000000000000000000000"
            .parse::<Address>()
            .unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex { .. }));
    }

    #[test]
    fn test_address_serialization() {
        let addr = Address::from_low_u64(7);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000007\"");
        let deser: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, deser);
    }
}
