//! Registration service - identity lookup and self-registration

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Address, RegistrationState};
use crate::ports::LedgerGateway;

/// Registration service for the connected identity
pub struct RegistrationService {
    gateway: Arc<dyn LedgerGateway>,
}

impl RegistrationService {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self { gateway }
    }

    /// Look up whether `address` has a person record.
    ///
    /// A zero-address sentinel in the answer means `NotRegistered`.
    pub async fn check_registration(&self, address: &Address) -> Result<RegistrationState> {
        let person = self
            .gateway
            .person(address)
            .await
            .map_err(|e| Error::query("getPerson", e))?;

        let state = if person.is_registrant() {
            RegistrationState::Registered(person.name)
        } else {
            RegistrationState::NotRegistered
        };
        debug!(address = %address, ?state, "registration checked");
        Ok(state)
    }

    /// Register the caller under `name` and wait for the ledger to confirm.
    ///
    /// Already-registered callers may register again; the ledger keeps the
    /// latest name.
    pub async fn register(&self, name: &str) -> Result<RegistrationState> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("missing name"));
        }

        let receipt = self.gateway.register_person(name).await.map_err(|e| {
            warn!(caller = %self.gateway.caller(), error = %e, "registration not confirmed");
            Error::remote("registerPerson", e)
        })?;

        info!(
            caller = %self.gateway.caller(),
            reference = receipt.reference.as_deref().unwrap_or("-"),
            "registered"
        );
        Ok(RegistrationState::Registered(name.to_string()))
    }

    /// Registered name of the caller, empty when unregistered
    pub async fn caller_name(&self) -> Result<String> {
        self.gateway
            .caller_name()
            .await
            .map_err(|e| Error::query("getMyName", e))
    }
}
