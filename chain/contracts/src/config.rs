//! Deploy-time configuration for the exchange.

use serde::{Deserialize, Serialize};

use ledger_types::ids::Address;

use crate::errors::ConfigError;

/// Configuration applied when the exchange is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExchangeConfig {
    /// Start in the paused state.
    pub start_paused: bool,
    /// Operators granted in addition to the deployer.
    pub initial_operators: Vec<Address>,
    /// Assets whitelisted at deploy time. Each must be code-backed.
    pub initial_whitelist: Vec<Address>,
    /// Log a warning when a Trade Record replaces one at the same height.
    pub warn_on_record_overwrite: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            start_paused: false,
            initial_operators: Vec::new(),
            initial_whitelist: Vec::new(),
            warn_on_record_overwrite: true,
        }
    }
}

impl ExchangeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert!(!config.start_paused);
        assert!(config.warn_on_record_overwrite);
        assert!(config.initial_operators.is_empty());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ExchangeConfig::from_json_str(
            r#"{
                "start_paused": true,
                "initial_whitelist": ["0x0000000000000000000000000000000000000010"]
            }"#,
        )
        .unwrap();
        assert!(config.start_paused);
        assert_eq!(config.initial_whitelist, vec![Address::from_low_u64(0x10)]);
        assert!(config.warn_on_record_overwrite);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ExchangeConfig::from_json_str(r#"{"fee_bps": 30}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_bad_address_rejected() {
        let err =
            ExchangeConfig::from_json_str(r#"{"initial_operators": ["0x12"]}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid"));
    }
}
