//! Person domain model

use serde::{Deserialize, Serialize};

use super::Address;

/// A registrant of the shared ledger
///
/// The ledger answers lookups for unknown addresses with a record whose
/// address is the zero sentinel; such a record is not a registrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub address: Address,
    pub name: String,
}

impl Person {
    pub fn new(address: impl Into<Address>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// The "no record found" answer
    pub fn unregistered() -> Self {
        Self {
            address: Address::zero(),
            name: String::new(),
        }
    }

    pub fn is_registrant(&self) -> bool {
        !self.address.is_zero()
    }
}

/// Registration status of the connected identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "name", rename_all = "snake_case")]
pub enum RegistrationState {
    /// Not yet queried
    Unknown,
    NotRegistered,
    Registered(String),
}

impl RegistrationState {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Registered(name) => Some(name),
            _ => None,
        }
    }
}
