//! Configuration management
//!
//! Settings live in `<dir>/settings.json`:
//! ```json
//! {
//!   "gateway": { "url": "http://127.0.0.1:8545", "ledgerAddress": "0x...", "account": "0x...", "timeoutSecs": 30 },
//!   "sync": { "maxConcurrentFetches": 8 },
//!   "amounts": { "decimals": 18, "symbol": "ETH" },
//!   "display": { "fractionDigits": 5 }
//! }
//! ```
//! Environment variables override the file; the session token is only ever
//! read from the environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::AmountCodec;
use crate::services::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::session::SessionOptions;

pub const ENV_DIR: &str = "SPLITLEDGER_DIR";
pub const ENV_GATEWAY_URL: &str = "SPLITLEDGER_GATEWAY_URL";
pub const ENV_LEDGER_ADDRESS: &str = "SPLITLEDGER_LEDGER_ADDRESS";
pub const ENV_ACCOUNT: &str = "SPLITLEDGER_ACCOUNT";
pub const ENV_SESSION_TOKEN: &str = "SPLITLEDGER_SESSION_TOKEN";

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DECIMALS: u32 = 18;
const DEFAULT_SYMBOL: &str = "ETH";
const DEFAULT_FRACTION_DIGITS: u32 = 5;

type Extra = HashMap<String, serde_json::Value>;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    gateway: GatewaySettings,
    #[serde(default)]
    sync: SyncSettings,
    #[serde(default)]
    amounts: AmountSettings,
    #[serde(default)]
    display: DisplaySettings,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ledger_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_concurrent_fetches: Option<usize>,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AmountSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    symbol: Option<String>,
    #[serde(flatten)]
    other: Extra,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fraction_digits: Option<u32>,
    #[serde(flatten)]
    other: Extra,
}

/// SplitLedger configuration (resolved view of settings and environment)
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_url: String,
    pub ledger_address: Option<String>,
    /// Active identity supplied by the signing provider
    pub account: Option<String>,
    /// Bearer token authorizing mutations; never written to disk
    pub session_token: Option<String>,
    pub timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub decimals: u32,
    pub symbol: String,
    pub fraction_digits: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            ledger_address: None,
            account: None,
            session_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            decimals: DEFAULT_DECIMALS,
            symbol: DEFAULT_SYMBOL.to_string(),
            fraction_digits: DEFAULT_FRACTION_DIGITS,
        }
    }
}

impl Config {
    /// Configuration directory from `SPLITLEDGER_DIR`, else `~/.splitledger`
    pub fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var(ENV_DIR) {
            return Ok(PathBuf::from(dir));
        }
        dirs::home_dir()
            .map(|home| home.join(".splitledger"))
            .context("Could not find home directory")
    }

    /// Load config from `dir`, then apply environment overrides
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = Self::from_file(dir)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from `dir` only
    pub fn from_file(dir: &Path) -> Result<Self> {
        let raw = read_settings(dir)?;
        let defaults = Self::default();

        Ok(Self {
            gateway_url: raw.gateway.url.unwrap_or(defaults.gateway_url),
            ledger_address: raw.gateway.ledger_address,
            account: raw.gateway.account,
            session_token: None,
            timeout_secs: raw.gateway.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_concurrent_fetches: raw
                .sync
                .max_concurrent_fetches
                .unwrap_or(defaults.max_concurrent_fetches)
                .max(1),
            decimals: raw.amounts.decimals.unwrap_or(defaults.decimals),
            symbol: raw.amounts.symbol.unwrap_or(defaults.symbol),
            fraction_digits: raw.display.fraction_digits.unwrap_or(defaults.fraction_digits),
        })
    }

    /// Apply overrides from an environment-like lookup; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_GATEWAY_URL) {
            self.gateway_url = url;
        }
        if let Some(address) = get(ENV_LEDGER_ADDRESS) {
            self.ledger_address = Some(address);
        }
        if let Some(account) = get(ENV_ACCOUNT) {
            self.account = Some(account);
        }
        if let Some(token) = get(ENV_SESSION_TOKEN) {
            self.session_token = Some(token);
        }
    }

    /// Save config to `dir`
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut settings = read_settings(dir)?;

        settings.gateway.url = Some(self.gateway_url.clone());
        settings.gateway.ledger_address = self.ledger_address.clone();
        settings.gateway.account = self.account.clone();
        settings.gateway.timeout_secs = Some(self.timeout_secs);
        settings.sync.max_concurrent_fetches = Some(self.max_concurrent_fetches);
        settings.amounts.decimals = Some(self.decimals);
        settings.amounts.symbol = Some(self.symbol.clone());
        settings.display.fraction_digits = Some(self.fraction_digits);

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(dir.join("settings.json"), content)?;
        Ok(())
    }

    pub fn codec(&self) -> Result<AmountCodec> {
        Ok(AmountCodec::new(self.decimals)?)
    }

    pub fn session_options(&self) -> Result<SessionOptions> {
        Ok(SessionOptions {
            codec: self.codec()?,
            max_concurrent_fetches: self.max_concurrent_fetches,
        })
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let settings_path = dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {:?}", settings_path))?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = ?settings_path, error = %e, "ignoring unreadable settings file");
        SettingsFile::default()
    }))
}
