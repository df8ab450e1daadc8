//! Esplora block explorer chain-fact provider.
//!
//! Talks to Esplora-compatible APIs (Blockstream, mempool.space) to answer
//! transaction lookups.
//!
//! # Feature Flags
//!
//! This module requires the `http-executor` feature flag for actual HTTP
//! requests. Without it, lookups return an `Unimplemented` error.
//!
//! ```toml
//! [dependencies]
//! verikit-lib = { version = "0.1", features = ["http-executor"] }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
#[cfg(feature = "http-executor")]
use std::time::Duration;

use super::{ChainFactProvider, ChainTx, TxOutput};
use crate::config::ChainApiConfig;
use crate::{Result, Txid, VerikitError};

/// Chain-fact provider backed by an Esplora-compatible API.
///
/// Read-only: it can fetch transactions and the chain tip, nothing else.
///
/// # Supported APIs
///
/// - mempool.space
/// - Blockstream.info
/// - Any Esplora-compatible API
pub struct EsploraProvider {
    config: ChainApiConfig,
    #[cfg(feature = "http-executor")]
    client: reqwest::Client,
}

impl EsploraProvider {
    /// Create a new provider with the given configuration.
    #[cfg(feature = "http-executor")]
    pub fn new(config: ChainApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VerikitError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a new provider with the given configuration (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    pub fn new(config: ChainApiConfig) -> Result<Self> {
        Ok(Self { config })
    }

    /// Create a provider for mempool.space mainnet.
    pub fn mempool_mainnet() -> Result<Self> {
        Self::new(ChainApiConfig::mempool_mainnet())
    }

    /// Create a provider for mempool.space testnet.
    pub fn mempool_testnet() -> Result<Self> {
        Self::new(ChainApiConfig::mempool_testnet())
    }

    /// Create a provider for Blockstream mainnet.
    pub fn blockstream_mainnet() -> Result<Self> {
        Self::new(ChainApiConfig::blockstream_mainnet())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainApiConfig {
        &self.config
    }

    /// Build the full URL for an API endpoint.
    #[cfg(any(feature = "http-executor", test))]
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Make a GET request to the API.
    #[cfg(feature = "http-executor")]
    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = self.url(path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.map_status_error(status.as_u16(), &error_text));
        }

        response.json::<T>().await.map_err(|e| {
            VerikitError::Serialization(format!("Failed to parse Esplora response: {}", e))
        })
    }

    /// Make a GET request to the API (stub when feature disabled).
    #[cfg(not(feature = "http-executor"))]
    async fn get<T: for<'de> Deserialize<'de>>(&self, _path: &str) -> Result<T> {
        Err(VerikitError::Unimplemented(
            "Esplora HTTP client not compiled - enable the 'http-executor' feature",
        ))
    }

    /// Map HTTP status codes to VerikitError.
    #[cfg(feature = "http-executor")]
    fn map_status_error(&self, status: u16, error_text: &str) -> VerikitError {
        match status {
            400 => VerikitError::invalid_data("request", error_text),
            404 => VerikitError::not_found("Esplora resource", error_text),
            429 => VerikitError::RateLimited {
                retry_after_ms: 5000,
            },
            500..=599 => {
                VerikitError::Internal(format!("Esplora server error ({}): {}", status, error_text))
            }
            _ => VerikitError::Transport(format!(
                "Esplora request failed ({}): {}",
                status, error_text
            )),
        }
    }

    /// Map reqwest errors to VerikitError.
    #[cfg(feature = "http-executor")]
    fn map_reqwest_error(&self, e: reqwest::Error) -> VerikitError {
        if e.is_timeout() {
            VerikitError::ConnectionTimeout {
                operation: "Esplora request".to_string(),
                timeout_ms: self.config.timeout_secs * 1000,
            }
        } else if e.is_connect() {
            VerikitError::ConnectionFailed {
                target: self.config.api_url.clone(),
                reason: e.to_string(),
            }
        } else {
            VerikitError::Transport(format!("Esplora request failed: {}", e))
        }
    }

    /// Get the current blockchain tip height.
    pub async fn get_block_height(&self) -> Result<u64> {
        self.get("blocks/tip/height").await
    }

    /// Get raw transaction details by txid.
    pub async fn get_tx(&self, txid: &Txid) -> Result<EsploraTx> {
        self.get(&format!("tx/{}", txid)).await
    }
}

#[async_trait]
impl ChainFactProvider for EsploraProvider {
    async fn lookup_tx(&self, txid: &Txid) -> Result<Option<ChainTx>> {
        let tx = match self.get_tx(txid).await {
            Ok(tx) => tx,
            Err(VerikitError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Esplora reports inclusion height, not a confirmation count, so we
        // need the tip to derive one.
        let confirmations = match tx.status.block_height {
            Some(h) => {
                let tip = self.get_block_height().await?;
                tip.saturating_sub(h) + 1
            }
            None => 0,
        };

        Ok(Some(ChainTx {
            txid: tx.txid,
            confirmed: tx.status.confirmed,
            confirmations,
            outputs: tx
                .vout
                .into_iter()
                .map(|o| TxOutput {
                    address: o.scriptpubkey_address,
                    value_sats: o.value,
                })
                .collect(),
        }))
    }
}

/// Transaction from the Esplora API.
#[derive(Clone, Debug, Deserialize)]
pub struct EsploraTx {
    /// Transaction ID.
    pub txid: String,
    /// Confirmation status.
    pub status: EsploraTxStatus,
    /// Transaction outputs.
    #[serde(default)]
    pub vout: Vec<EsploraTxOutput>,
}

/// Transaction confirmation status.
#[derive(Clone, Debug, Deserialize)]
pub struct EsploraTxStatus {
    /// Whether the transaction is confirmed.
    pub confirmed: bool,
    /// Block height if confirmed.
    pub block_height: Option<u64>,
}

/// Transaction output.
#[derive(Clone, Debug, Deserialize)]
pub struct EsploraTxOutput {
    /// Value in satoshis.
    pub value: u64,
    /// Destination address (absent for non-standard scripts).
    pub scriptpubkey_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = EsploraProvider::mempool_mainnet().unwrap();
        assert!(provider.config().api_url.contains("mempool.space"));
    }

    #[test]
    fn test_url_building() {
        let provider = EsploraProvider::new(ChainApiConfig::new("https://api.example.com/")).unwrap();
        assert_eq!(
            provider.url("tx/abc123"),
            "https://api.example.com/tx/abc123"
        );
    }

    #[test]
    fn test_tx_deserialization() {
        let json = r#"{
            "txid": "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
            "status": {"confirmed": true, "block_height": 170},
            "vout": [
                {"value": 1000000000, "scriptpubkey_address": "1Q2TWHE3GMdB6BZKafqwxXtWAWgFt5Jvm3"},
                {"value": 4000000000, "scriptpubkey_address": null}
            ]
        }"#;
        let tx: EsploraTx = serde_json::from_str(json).unwrap();
        assert!(tx.status.confirmed);
        assert_eq!(tx.vout.len(), 2);
        assert_eq!(tx.vout[0].value, 1_000_000_000);
        assert!(tx.vout[1].scriptpubkey_address.is_none());
    }
}
