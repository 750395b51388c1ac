//! Identity keys assigned by the remote ledger

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel the ledger returns in place of a person it has no record for
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Number of leading characters kept by [`Address::short`]
const SHORT_LEN: usize = 8;

/// Unique, immutable identity key of a ledger participant
///
/// The value is kept exactly as the ledger reports it (after trimming
/// surrounding whitespace); comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            Self(value)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The "no record found" sentinel
    pub fn zero() -> Self {
        Self(ZERO_ADDRESS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for any all-zero hex value, with or without a `0x` prefix
    pub fn is_zero(&self) -> bool {
        let hex = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        !hex.is_empty() && hex.chars().all(|c| c == '0')
    }

    /// Truncated form used as a fallback label, e.g. `0x6216a5...`
    pub fn short(&self) -> String {
        let prefix: String = self.0.chars().take(SHORT_LEN).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
