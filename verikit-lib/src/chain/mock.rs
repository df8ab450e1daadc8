//! Mock chain-fact provider for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChainFactProvider, ChainTx, TxOutput};
use crate::{Result, Txid, VerikitError};

/// In-memory chain-fact provider.
///
/// Seed it with transactions, then hand it to the verifier. Can also be put
/// into an "unreachable" mode to exercise infrastructure-failure paths.
#[derive(Default)]
pub struct MockChainProvider {
    txs: Mutex<HashMap<String, ChainTx>>,
    unreachable: Mutex<bool>,
}

impl MockChainProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a transaction.
    pub fn insert_tx(&self, tx: ChainTx) {
        self.txs
            .lock()
            .expect("mock lock poisoned")
            .insert(tx.txid.clone(), tx);
    }

    /// Seed a simple single-output payment.
    pub fn insert_payment(&self, txid: &Txid, address: &str, value_sats: u64, confirmations: u64) {
        self.insert_tx(ChainTx {
            txid: txid.as_str().to_string(),
            confirmed: confirmations > 0,
            confirmations,
            outputs: vec![TxOutput {
                address: Some(address.to_string()),
                value_sats,
            }],
        });
    }

    /// Simulate the upstream API being down.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().expect("mock lock poisoned") = unreachable;
    }
}

#[async_trait]
impl ChainFactProvider for MockChainProvider {
    async fn lookup_tx(&self, txid: &Txid) -> Result<Option<ChainTx>> {
        if *self.unreachable.lock().expect("mock lock poisoned") {
            return Err(VerikitError::ConnectionFailed {
                target: "mock chain".to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        Ok(self
            .txs
            .lock()
            .expect("mock lock poisoned")
            .get(txid.as_str())
            .cloned())
    }
}
