//! Domain identifier types with proper encapsulation.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` from a string.")]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id!(
    /// Exchange market identifier (e.g. `1.234567890`).
    MarketId
);

string_id!(
    /// Exchange event identifier grouping related markets.
    EventId
);

string_id!(
    /// Exchange-assigned identifier of a single order.
    BetId
);

/// Identity of a runner within its market.
///
/// Selection ids are only unique together with the handicap on asian
/// handicap markets, so both form the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunnerId {
    selection_id: u64,
    handicap: Decimal,
}

impl RunnerId {
    /// Create a runner id with an explicit handicap.
    #[must_use]
    pub fn new(selection_id: u64, handicap: Decimal) -> Self {
        Self {
            selection_id,
            handicap: handicap.normalize(),
        }
    }

    /// Create a runner id for a market without handicaps.
    #[must_use]
    pub fn selection(selection_id: u64) -> Self {
        Self::new(selection_id, Decimal::ZERO)
    }

    #[must_use]
    pub const fn selection_id(&self) -> u64 {
        self.selection_id
    }

    #[must_use]
    pub const fn handicap(&self) -> Decimal {
        self.handicap
    }
}

impl fmt::Display for RunnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.handicap.is_zero() {
            write!(f, "{}", self.selection_id)
        } else {
            write!(f, "{}:{}", self.selection_id, self.handicap)
        }
    }
}

/// Error returned when a runner id string is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerIdParseError(String);

impl fmt::Display for RunnerIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid runner id `{}` (use <selectionId>[:<handicap>])", self.0)
    }
}

impl std::error::Error for RunnerIdParseError {}

impl FromStr for RunnerId {
    type Err = RunnerIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RunnerIdParseError(s.to_string());
        let (raw_selection, raw_handicap) = s.split_once(':').unwrap_or((s, "0"));
        let selection_id = raw_selection.parse::<u64>().map_err(|_| err())?;
        let handicap = Decimal::from_str(raw_handicap).map_err(|_| err())?;
        Ok(Self::new(selection_id, handicap))
    }
}
