//! Service configuration.
//!
//! Loaded from a TOML file; every section falls back to its defaults so a
//! missing file still yields a runnable local setup.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use verikit_lib::config::{ChainApiConfig, LnurlServerConfig, VerificationConfig};

/// Top-level configuration for the verification service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Seconds between background sweeps of stale challenges.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Chain-fact backend (Esplora-compatible API).
    #[serde(default)]
    pub chain: ChainApiConfig,

    /// Challenge policy knobs.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// LNURL-auth callback settings.
    #[serde(default)]
    pub lnurl: LnurlServerConfig,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8080".parse().expect("valid literal")
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            sweep_interval_secs: default_sweep_interval_secs(),
            chain: ChainApiConfig::default(),
            verification: VerificationConfig::default(),
            lnurl: LnurlServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Apply `VERIKIT_*` environment overrides on top of the file values.
    pub fn apply_env(mut self) -> anyhow::Result<Self> {
        if let Ok(addr) = std::env::var("VERIKIT_LISTEN_ADDR") {
            self.listen_addr = addr
                .parse()
                .with_context(|| format!("VERIKIT_LISTEN_ADDR: bad address {:?}", addr))?;
        }
        if let Ok(url) = std::env::var("VERIKIT_CHAIN_API_URL") {
            self.chain.api_url = url;
        }
        if let Ok(domain) = std::env::var("VERIKIT_LNURL_DOMAIN") {
            self.lnurl.domain = domain;
        }
        Ok(self)
    }
}
