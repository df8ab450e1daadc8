//! Configuration types for the verification engine.

use serde::{Deserialize, Serialize};

/// Bitcoin network selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitcoinNetwork {
    /// Bitcoin mainnet.
    #[default]
    Mainnet,
    /// Bitcoin testnet (testnet3).
    Testnet,
    /// Bitcoin signet.
    Signet,
    /// Bitcoin regtest (local development).
    Regtest,
}

impl BitcoinNetwork {
    /// Get the network name as used by most APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Signet => "signet",
            Self::Regtest => "regtest",
        }
    }

    /// Get the bech32 HRP (human-readable part) for addresses.
    pub fn address_prefix(&self) -> &'static str {
        match self {
            Self::Mainnet => "bc",
            Self::Testnet | Self::Signet | Self::Regtest => "tb",
        }
    }
}

/// Configuration for the Esplora-compatible chain-fact API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainApiConfig {
    /// API base URL (e.g., `https://mempool.space/api`).
    pub api_url: String,

    /// Network the explorer is on.
    #[serde(default)]
    pub network: BitcoinNetwork,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl ChainApiConfig {
    /// Create a new chain API configuration.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            network: BitcoinNetwork::default(),
            timeout_secs: default_timeout(),
        }
    }

    /// Create config for mempool.space mainnet.
    pub fn mempool_mainnet() -> Self {
        Self::new("https://mempool.space/api").with_network(BitcoinNetwork::Mainnet)
    }

    /// Create config for mempool.space testnet.
    pub fn mempool_testnet() -> Self {
        Self::new("https://mempool.space/testnet/api").with_network(BitcoinNetwork::Testnet)
    }

    /// Create config for Blockstream mainnet.
    pub fn blockstream_mainnet() -> Self {
        Self::new("https://blockstream.info/api").with_network(BitcoinNetwork::Mainnet)
    }

    /// Create config for Blockstream testnet.
    pub fn blockstream_testnet() -> Self {
        Self::new("https://blockstream.info/testnet/api").with_network(BitcoinNetwork::Testnet)
    }

    /// Set the network.
    pub fn with_network(mut self, network: BitcoinNetwork) -> Self {
        self.network = network;
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for ChainApiConfig {
    fn default() -> Self {
        Self::mempool_mainnet()
    }
}

/// Policy knobs for challenge creation and proof acceptance.
///
/// Everything here is deployment configuration, not engine logic: the engine
/// reads these values but never hardcodes them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Confirmations required before an on-chain proof is accepted.
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u64,

    /// Minimum payment for store-ownership verification, in satoshis.
    #[serde(default = "default_store_min_sats")]
    pub store_min_sats: u64,

    /// Lower bound of the randomized review-payment amount, in satoshis.
    #[serde(default = "default_review_min_sats")]
    pub review_amount_min_sats: u64,

    /// Upper bound (inclusive) of the randomized review-payment amount.
    #[serde(default = "default_review_max_sats")]
    pub review_amount_max_sats: u64,

    /// TTL for on-chain challenges in seconds. Generous, because the proof
    /// has to wait for block inclusion.
    #[serde(default = "default_onchain_ttl")]
    pub onchain_ttl_secs: i64,

    /// TTL for LNURL-auth challenges in seconds. Short, the flow is
    /// interactive.
    #[serde(default = "default_lnauth_ttl")]
    pub lnauth_ttl_secs: i64,
}

fn default_min_confirmations() -> u64 {
    1
}

fn default_store_min_sats() -> u64 {
    5_000
}

fn default_review_min_sats() -> u64 {
    1_000
}

fn default_review_max_sats() -> u64 {
    5_000
}

fn default_onchain_ttl() -> i64 {
    30 * 60
}

fn default_lnauth_ttl() -> i64 {
    5 * 60
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            min_confirmations: default_min_confirmations(),
            store_min_sats: default_store_min_sats(),
            review_amount_min_sats: default_review_min_sats(),
            review_amount_max_sats: default_review_max_sats(),
            onchain_ttl_secs: default_onchain_ttl(),
            lnauth_ttl_secs: default_lnauth_ttl(),
        }
    }
}

impl VerificationConfig {
    /// Set the confirmation threshold.
    pub fn with_min_confirmations(mut self, n: u64) -> Self {
        self.min_confirmations = n;
        self
    }

    /// Set the store-ownership minimum in sats.
    pub fn with_store_min_sats(mut self, sats: u64) -> Self {
        self.store_min_sats = sats;
        self
    }

    /// Set the review-payment amount range in sats.
    pub fn with_review_range(mut self, min: u64, max: u64) -> Self {
        self.review_amount_min_sats = min;
        self.review_amount_max_sats = max;
        self
    }

    /// Set the on-chain challenge TTL.
    pub fn with_onchain_ttl_secs(mut self, secs: i64) -> Self {
        self.onchain_ttl_secs = secs;
        self
    }

    /// Set the LNURL-auth challenge TTL.
    pub fn with_lnauth_ttl_secs(mut self, secs: i64) -> Self {
        self.lnauth_ttl_secs = secs;
        self
    }
}

/// Server-side settings for building LNURL-auth callback URIs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LnurlServerConfig {
    /// Public domain the wallet will call back to (no scheme).
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Path of the callback endpoint.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

fn default_domain() -> String {
    "localhost".to_string()
}

fn default_callback_path() -> String {
    "/verify/lnauth/callback".to_string()
}

impl Default for LnurlServerConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            callback_path: default_callback_path(),
        }
    }
}

impl LnurlServerConfig {
    /// Create a config for the given public domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            callback_path: default_callback_path(),
        }
    }

    /// Set the callback path.
    pub fn with_callback_path(mut self, path: impl Into<String>) -> Self {
        self.callback_path = path.into();
        self
    }
}
