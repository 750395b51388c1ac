//! Mock JSON-RPC relay for testing
//!
//! Serves the relay protocol spoken by `HttpLedgerGateway` on a random local
//! port, answering every call from an `InMemoryLedger`. One request per
//! connection; responses close the connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use super::memory::InMemoryLedger;
use crate::domain::{Address, Amount};
use crate::ports::LedgerGateway;

/// Behaviour knobs for the mock relay
#[derive(Debug, Clone)]
pub struct MockRelayConfig {
    /// Bearer token required on mutations; `None` accepts any
    pub session_token: Option<String>,
    /// Status reported in mutation receipts
    pub receipt_status: String,
}

impl Default for MockRelayConfig {
    fn default() -> Self {
        Self {
            session_token: None,
            receipt_status: "confirmed".to_string(),
        }
    }
}

struct RelayState {
    ledger: InMemoryLedger,
    config: MockRelayConfig,
    receipts: AtomicU64,
}

/// Mock relay server, stopped on drop
pub struct MockRelay {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MockRelay {
    pub async fn start(ledger: InMemoryLedger, config: MockRelayConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(RelayState {
            ledger,
            config,
            receipts: AtomicU64::new(0),
        });

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, Arc::clone(&state)));
            }
        });
        Ok(Self { addr, handle })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<RelayState>) {
    let Some((headers, body)) = read_request(&mut stream).await else {
        let _ = send_response(&mut stream, 400, &json!({ "error": "bad request" })).await;
        return;
    };

    let authorization = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("authorization")
                .then(|| value.trim().to_string())
        });

    let Ok(request) = serde_json::from_slice::<JsonValue>(&body) else {
        let _ = send_response(&mut stream, 400, &json!({ "error": "invalid json" })).await;
        return;
    };
    let id = request.get("id").cloned().unwrap_or(JsonValue::Null);
    let method = request.get("method").and_then(JsonValue::as_str).unwrap_or_default();
    let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

    let is_mutation = matches!(method, "registerPerson" | "addExpense");
    if is_mutation {
        if let Some(token) = &state.config.session_token {
            if authorization.as_deref() != Some(format!("Bearer {}", token).as_str()) {
                let _ = send_response(&mut stream, 401, &json!({ "error": "unauthorized" })).await;
                return;
            }
        }
    }

    let body = match dispatch(&state, method, &params).await {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message },
        }),
    };
    let _ = send_response(&mut stream, 200, &body).await;
}

type RpcOutcome = Result<JsonValue, (i64, String)>;

async fn dispatch(state: &RelayState, method: &str, params: &JsonValue) -> RpcOutcome {
    let from: Address = param(params, "from")?;
    let gateway = state.ledger.connect(from);
    let failed = |e: crate::domain::result::GatewayError| (-32000, e.to_string());

    let result = match method {
        "expenseCount" => json!(gateway.expense_count().await.map_err(failed)?.to_string()),
        "getExpenseBasicInfo" => {
            let id = expense_id(params)?;
            let info = gateway.expense_basic_info(id).await.map_err(failed)?;
            json!({ "id": info.id.to_string(), "label": info.label, "timestamp": info.timestamp })
        }
        "getExpenseParticipants" => {
            json!(gateway.expense_participants(expense_id(params)?).await.map_err(failed)?)
        }
        "getAmountPaid" => {
            let address: Address = param(params, "address")?;
            json!(gateway.amount_paid(expense_id(params)?, &address).await.map_err(failed)?)
        }
        "getAmountOwed" => {
            let address: Address = param(params, "address")?;
            json!(gateway.amount_owed(expense_id(params)?, &address).await.map_err(failed)?)
        }
        "getAllRegisteredPeople" => json!(gateway.registered_addresses().await.map_err(failed)?),
        "getPerson" => {
            let address: Address = param(params, "address")?;
            json!(gateway.person(&address).await.map_err(failed)?)
        }
        "getNetBalance" => {
            let address: Address = param(params, "address")?;
            json!(gateway.net_balance(&address).await.map_err(failed)?)
        }
        "getMyName" => json!(gateway.caller_name().await.map_err(failed)?),
        "registerPerson" => {
            let name: String = param(params, "name")?;
            gateway.register_person(&name).await.map_err(failed)?;
            receipt(state, None)
        }
        "addExpense" => {
            let label: String = param(params, "label")?;
            let addresses: Vec<Address> = param(params, "addresses")?;
            let paid: Vec<Amount> = param(params, "paidAmounts")?;
            let owed: Vec<Amount> = param(params, "owedAmounts")?;
            let committed = gateway
                .add_expense(&label, &addresses, &paid, &owed)
                .await
                .map_err(failed)?;
            receipt(state, Some(committed.expense_id))
        }
        other => return Err((-32601, format!("method not found: {}", other))),
    };
    Ok(result)
}

fn receipt(state: &RelayState, expense_id: Option<u64>) -> JsonValue {
    let n = state.receipts.fetch_add(1, Ordering::SeqCst) + 1;
    let mut receipt = json!({
        "status": state.config.receipt_status,
        "transactionHash": format!("0x{:064x}", n),
    });
    if let Some(id) = expense_id {
        receipt["expenseId"] = json!(id.to_string());
    }
    receipt
}

fn param<T: DeserializeOwned>(params: &JsonValue, name: &str) -> Result<T, (i64, String)> {
    let value = params
        .get(name)
        .cloned()
        .ok_or_else(|| (-32602, format!("missing param '{}'", name)))?;
    serde_json::from_value(value).map_err(|e| (-32602, format!("invalid param '{}': {}", name, e)))
}

fn expense_id(params: &JsonValue) -> Result<u64, (i64, String)> {
    let raw: String = param(params, "expenseId")?;
    raw.parse()
        .map_err(|_| (-32602, format!("invalid expense id '{}'", raw)))
}

/// Read headers and a Content-Length body
async fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buffer[header_end..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);
    Some((headers, body))
}

async fn send_response(stream: &mut TcpStream, status: u16, body: &JsonValue) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        _ => "Error",
    };
    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
