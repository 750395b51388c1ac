//! JSON-RPC relay client
//!
//! Talks JSON-RPC 2.0 over HTTP POST to a relay that fronts the deployed
//! ledger. Every request names the ledger instance and the caller; mutations
//! additionally carry the session token and only succeed once the relay
//! reports a confirmed receipt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::domain::amount::deserialize_integer;
use crate::domain::result::{Error, GatewayError, Result};
use crate::domain::{Address, Amount, Person, SignedAmount};
use crate::ports::{ExpenseInfo, ExpenseReceipt, GatewayResult, LedgerGateway, Receipt};

const RECEIPT_CONFIRMED: &str = "confirmed";

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: JsonValue,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<JsonValue>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Count(#[serde(deserialize_with = "deserialize_integer")] u64);

/// Mutation receipt as reported by the relay
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    status: String,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    expense_id: Option<JsonValue>,
}

/// Ledger gateway over a JSON-RPC relay
#[derive(Debug)]
pub struct HttpLedgerGateway {
    client: Client,
    endpoint: Url,
    ledger: Address,
    caller: Address,
    session_token: Option<String>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpLedgerGateway {
    pub fn new(endpoint: &str, ledger: Address, caller: Address, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("invalid gateway url '{}': {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            ledger,
            caller,
            session_token: None,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Build a gateway for the configured ledger and account
    pub fn from_config(config: &Config) -> Result<Self> {
        let ledger = config
            .ledger_address
            .as_deref()
            .ok_or_else(|| Error::config("no ledger address configured"))?;
        let account = config
            .account
            .as_deref()
            .ok_or_else(|| Error::config("no account configured"))?;

        let gateway = Self::new(
            &config.gateway_url,
            Address::new(ledger),
            Address::new(account),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(match &config.session_token {
            Some(token) => gateway.with_session_token(token.clone()),
            None => gateway,
        })
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    fn params(&self, extra: JsonValue) -> JsonValue {
        let mut params = json!({ "ledger": self.ledger, "from": self.caller });
        if let (Some(target), JsonValue::Object(fields)) = (params.as_object_mut(), extra) {
            target.extend(fields);
        }
        params
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, extra: JsonValue) -> GatewayResult<T> {
        let result = self.send(method, extra, None).await?;
        serde_json::from_value(result)
            .map_err(|e| GatewayError::decode(format!("{}: {}", method, e)))
    }

    async fn mutate(&self, method: &str, extra: JsonValue) -> GatewayResult<RpcReceipt> {
        let token = self
            .session_token
            .as_deref()
            .ok_or_else(|| GatewayError::rejected("mutations require a session token"))?;

        let result = self.send(method, extra, Some(token)).await?;
        let receipt: RpcReceipt = serde_json::from_value(result)
            .map_err(|e| GatewayError::decode(format!("{} receipt: {}", method, e)))?;

        if receipt.status != RECEIPT_CONFIRMED {
            return Err(GatewayError::Unconfirmed(format!(
                "{} receipt status '{}'",
                method, receipt.status
            )));
        }
        Ok(receipt)
    }

    async fn send(&self, method: &str, extra: JsonValue, token: Option<&str>) -> GatewayResult<JsonValue> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: self.params(extra),
        };
        debug!(method, id = request.id, "gateway request");

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.map_request_error(e))?;
        match response.status().as_u16() {
            200..=299 => {}
            401 | 403 => {
                return Err(GatewayError::rejected(format!(
                    "relay refused authorization (HTTP {})",
                    response.status().as_u16()
                )))
            }
            status => return Err(GatewayError::transport(format!("relay returned HTTP {}", status))),
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::decode(format!("{}: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(GatewayError::rejected(format!("{} ({})", error.message, error.code)));
        }
        body.result
            .ok_or_else(|| GatewayError::decode(format!("{}: response has no result", method)))
    }

    fn map_request_error(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::transport(format!("timed out after {} seconds", self.timeout.as_secs()))
        } else if error.is_connect() {
            GatewayError::transport(format!("unable to connect to relay at {}", self.endpoint))
        } else {
            GatewayError::transport(format!("relay request failed: {}", error))
        }
    }
}

fn amounts_param(amounts: &[Amount]) -> Vec<String> {
    amounts.iter().map(|a| a.base_units().to_string()).collect()
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    fn caller(&self) -> &Address {
        &self.caller
    }

    async fn expense_count(&self) -> GatewayResult<u64> {
        self.call::<Count>("expenseCount", json!({})).await.map(|c| c.0)
    }

    async fn expense_basic_info(&self, id: u64) -> GatewayResult<ExpenseInfo> {
        self.call("getExpenseBasicInfo", json!({ "expenseId": id.to_string() })).await
    }

    async fn expense_participants(&self, id: u64) -> GatewayResult<Vec<Address>> {
        self.call("getExpenseParticipants", json!({ "expenseId": id.to_string() })).await
    }

    async fn amount_paid(&self, id: u64, address: &Address) -> GatewayResult<Amount> {
        self.call(
            "getAmountPaid",
            json!({ "expenseId": id.to_string(), "address": address }),
        )
        .await
    }

    async fn amount_owed(&self, id: u64, address: &Address) -> GatewayResult<Amount> {
        self.call(
            "getAmountOwed",
            json!({ "expenseId": id.to_string(), "address": address }),
        )
        .await
    }

    async fn registered_addresses(&self) -> GatewayResult<Vec<Address>> {
        self.call("getAllRegisteredPeople", json!({})).await
    }

    async fn person(&self, address: &Address) -> GatewayResult<Person> {
        self.call("getPerson", json!({ "address": address })).await
    }

    async fn net_balance(&self, address: &Address) -> GatewayResult<SignedAmount> {
        self.call("getNetBalance", json!({ "address": address })).await
    }

    async fn caller_name(&self) -> GatewayResult<String> {
        self.call("getMyName", json!({})).await
    }

    async fn register_person(&self, name: &str) -> GatewayResult<Receipt> {
        let receipt = self.mutate("registerPerson", json!({ "name": name })).await?;
        Ok(Receipt {
            reference: receipt.transaction_hash,
        })
    }

    async fn add_expense(
        &self,
        label: &str,
        addresses: &[Address],
        paid: &[Amount],
        owed: &[Amount],
    ) -> GatewayResult<ExpenseReceipt> {
        let receipt = self
            .mutate(
                "addExpense",
                json!({
                    "label": label,
                    "addresses": addresses,
                    "paidAmounts": amounts_param(paid),
                    "owedAmounts": amounts_param(owed),
                }),
            )
            .await?;

        let expense_id = receipt
            .expense_id
            .map(serde_json::from_value::<Count>)
            .transpose()
            .map_err(|e| GatewayError::decode(format!("addExpense receipt: {}", e)))?
            .ok_or_else(|| GatewayError::decode("addExpense receipt has no expense id"))?;

        Ok(ExpenseReceipt {
            expense_id: expense_id.0,
            reference: receipt.transaction_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::adapters::relay_mock::{MockRelay, MockRelayConfig};
    use crate::services::SyncService;

    const TOKEN: &str = "test-token";

    async fn relay(config: MockRelayConfig) -> (MockRelay, InMemoryLedger) {
        let ledger = InMemoryLedger::new();
        let relay = MockRelay::start(ledger.clone(), config).await.unwrap();
        (relay, ledger)
    }

    fn gateway(relay: &MockRelay, caller: &str) -> HttpLedgerGateway {
        HttpLedgerGateway::new(
            &relay.base_url(),
            Address::new("0xLEDGER"),
            Address::new(caller),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_session_token(TOKEN)
    }

    fn config_with_token() -> MockRelayConfig {
        MockRelayConfig {
            session_token: Some(TOKEN.to_string()),
            ..MockRelayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_register_and_read_back() {
        let (relay, _ledger) = relay(config_with_token()).await;
        let alice = gateway(&relay, "0xA");

        let receipt = alice.register_person("Alice").await.unwrap();
        assert!(receipt.reference.is_some());
        assert_eq!(alice.caller_name().await.unwrap(), "Alice");

        let person = alice.person(&Address::new("0xA")).await.unwrap();
        assert_eq!(person.name, "Alice");
        let stranger = alice.person(&Address::new("0xZ")).await.unwrap();
        assert!(!stranger.is_registrant());
    }

    #[tokio::test]
    async fn test_large_amounts_survive_the_wire() {
        let (relay, _ledger) = relay(config_with_token()).await;
        let alice = gateway(&relay, "0xA");
        let big = Amount::from_base_units(123_456_789_000_000_000_000_000_000);

        let receipt = alice
            .add_expense("Rent", &[Address::new("0xA")], &[big], &[Amount::ZERO])
            .await
            .unwrap();
        assert_eq!(receipt.expense_id, 0);

        let paid = alice.amount_paid(0, &Address::new("0xA")).await.unwrap();
        assert_eq!(paid, big);
        let net = alice.net_balance(&Address::new("0xA")).await.unwrap();
        assert_eq!(net, SignedAmount::from(big));
    }

    #[tokio::test]
    async fn test_sync_over_relay() {
        let (relay, ledger) = relay(config_with_token()).await;
        let alice = ledger.connect(Address::new("0xA"));
        alice.register_person("Alice").await.unwrap();
        alice
            .add_expense(
                "Dinner",
                &[Address::new("0xA"), Address::new("0xB")],
                &[Amount::from_base_units(10), Amount::ZERO],
                &[Amount::from_base_units(5), Amount::from_base_units(5)],
            )
            .await
            .unwrap();

        let gateway: Arc<dyn LedgerGateway> = Arc::new(gateway(&relay, "0xA"));
        let snapshot = SyncService::new(gateway).synchronize().await.unwrap();
        assert_eq!(snapshot.expenses.len(), 1);
        assert_eq!(snapshot.expenses[0].participants[1].amount_owed.base_units(), 5);
        assert_eq!(snapshot.people, vec![Person::new("0xA", "Alice")]);
    }

    #[tokio::test]
    async fn test_rpc_error_is_rejected() {
        let (relay, _ledger) = relay(config_with_token()).await;
        let err = gateway(&relay, "0xA").expense_basic_info(7).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(ref msg) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn test_pending_receipt_is_unconfirmed() {
        let (relay, _ledger) = relay(MockRelayConfig {
            receipt_status: "pending".to_string(),
            ..config_with_token()
        })
        .await;

        let err = gateway(&relay, "0xA").register_person("Alice").await.unwrap_err();
        assert!(matches!(err, GatewayError::Unconfirmed(_)));
        assert!(err.may_have_committed());
    }

    #[tokio::test]
    async fn test_mutation_without_token_is_refused() {
        let (relay, ledger) = relay(config_with_token()).await;
        let gateway = HttpLedgerGateway::new(
            &relay.base_url(),
            Address::new("0xLEDGER"),
            Address::new("0xA"),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = gateway.register_person("Alice").await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
        assert_eq!(ledger.call_count(), 0);

        let err = gateway
            .with_session_token("wrong")
            .register_person("Alice")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_transport_error() {
        let gateway = HttpLedgerGateway::new(
            "http://127.0.0.1:9",
            Address::new("0xLEDGER"),
            Address::new("0xA"),
            Duration::from_secs(2),
        )
        .unwrap();

        let err = gateway.expense_count().await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[test]
    fn test_from_config_requires_identity() {
        let config = Config {
            ledger_address: Some("0xLEDGER".into()),
            ..Config::default()
        };
        let err = HttpLedgerGateway::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
