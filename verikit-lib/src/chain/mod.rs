//! Chain-fact access.
//!
//! The engine treats the blockchain as an external oracle: given a txid it
//! needs confirmations and outputs, nothing more. [`ChainFactProvider`] is
//! the seam; [`EsploraProvider`] is the production implementation and
//! [`MockChainProvider`] backs the tests.

use async_trait::async_trait;

use crate::{Result, Txid};

mod esplora;
pub use esplora::EsploraProvider;

#[cfg(any(test, feature = "test-utils"))]
mod mock;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockChainProvider;

/// A single transaction output as seen on chain.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TxOutput {
    /// Destination address, if the script encodes one.
    pub address: Option<String>,
    /// Value in satoshis.
    pub value_sats: u64,
}

/// The facts about a transaction the verifier cares about.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ChainTx {
    /// The transaction id.
    pub txid: String,
    /// Whether the transaction is included in a block.
    pub confirmed: bool,
    /// Number of confirmations (0 while in the mempool).
    pub confirmations: u64,
    /// Transaction outputs.
    pub outputs: Vec<TxOutput>,
}

impl ChainTx {
    /// Total satoshis this transaction pays to `address`, or `None` if no
    /// output pays it. Summed across outputs so a payment split into several
    /// outputs to the same address still counts once.
    pub fn paid_to(&self, address: &str) -> Option<u64> {
        let total: u64 = self
            .outputs
            .iter()
            .filter(|o| o.address.as_deref() == Some(address))
            .map(|o| o.value_sats)
            .sum();
        if self.outputs.iter().any(|o| o.address.as_deref() == Some(address)) {
            Some(total)
        } else {
            None
        }
    }
}

/// Read-only access to transaction facts.
///
/// Implementations must distinguish "transaction unknown" (`Ok(None)`) from
/// infrastructure failure (`Err`): the verifier keeps a challenge pending on
/// either, but only the latter is reported to callers as retryable.
#[async_trait]
pub trait ChainFactProvider: Send + Sync {
    /// Look up a transaction by id.
    async fn lookup_tx(&self, txid: &Txid) -> Result<Option<ChainTx>>;
}
