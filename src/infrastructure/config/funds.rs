//! Account funds configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Starting account state and reserve policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FundsConfig {
    /// Amount never allocated to markets. The reserve only ever grows.
    #[serde(default)]
    pub minimum_reserve: Decimal,

    /// Available funds at startup, until the account stream reports.
    #[serde(default)]
    pub available_funds: Decimal,

    /// Account currency units per base currency unit. Defaults to 1.
    #[serde(default = "default_currency_rate")]
    pub currency_rate: Decimal,
}

fn default_currency_rate() -> Decimal {
    Decimal::ONE
}

impl Default for FundsConfig {
    fn default() -> Self {
        Self {
            minimum_reserve: Decimal::ZERO,
            available_funds: Decimal::ZERO,
            currency_rate: default_currency_rate(),
        }
    }
}

/// Replication queue configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicationConfig {
    /// Capacity of each subscriber queue. Defaults to 1024.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_queue_capacity() -> usize {
    1024
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}
