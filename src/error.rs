use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{EventId, MarketId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors from parsing a textual rule command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("invalid argument `{0}` (expected key=value)")]
    InvalidArgument(String),

    #[error("unknown field `{field}` for `{command}`")]
    UnknownField { command: &'static str, field: String },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("invalid runner id `{0}`")]
    InvalidRunnerId(String),

    #[error("`{field}` of {value} exceeds the largest accepted amount")]
    AmountOutOfRange { field: String, value: Decimal },
}

/// Registry lookups and referential-integrity failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown market {0}")]
    UnknownMarket(MarketId),

    #[error("unknown event {0}")]
    UnknownEvent(EventId),

    #[error("market {market_id} is already managed under event {existing}")]
    EventConflict {
        market_id: MarketId,
        existing: EventId,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
