//! On-chain payment verification.
//!
//! Issues payment challenges for the two on-chain kinds and checks submitted
//! txids against finalized chain facts. All chain lookups happen before the
//! registry's critical section, so a slow or unreachable backend never blocks
//! other verifications.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;

use verikit_lib::chain::ChainFactProvider;
use verikit_lib::config::VerificationConfig;
use verikit_lib::policy::AmountPolicy;
use verikit_lib::{ChallengeKind, SubjectId, Txid, VerikitError};

use crate::registry::{Completion, CompletionOutcome, VerificationRegistry};
use crate::state::VerificationStatus;
use crate::{EngineError, Proof, RejectReason, Result, Verdict, VerificationChallenge};

/// Verifier for payment-proven challenges (store ownership, review payment).
pub struct OnchainVerifier {
    registry: Arc<VerificationRegistry>,
    chain: Arc<dyn ChainFactProvider>,
    policy: AmountPolicy,
    min_confirmations: u64,
    ttl_secs: i64,
}

impl OnchainVerifier {
    /// Build a verifier over a shared registry and chain backend.
    pub fn new(
        registry: Arc<VerificationRegistry>,
        chain: Arc<dyn ChainFactProvider>,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            registry,
            chain,
            policy: AmountPolicy::from_config(config),
            min_confirmations: config.min_confirmations,
            ttl_secs: config.onchain_ttl_secs,
        }
    }

    /// Issue a payment challenge for a subject.
    ///
    /// The expected amount is fixed here and never recomputed: for review
    /// payments it is a fresh random value that binds the payment to this
    /// challenge. Re-issuing while a pending challenge exists returns the
    /// existing one unchanged, so repeated page loads do not rotate the
    /// amount out from under a payer.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip(self, subject_id, address),
            fields(kind = kind.as_str(), subject = subject_id.as_str())
        )
    )]
    pub fn issue(
        &self,
        kind: ChallengeKind,
        subject_id: SubjectId,
        address: impl Into<String>,
    ) -> Result<VerificationChallenge> {
        if !kind.is_onchain() {
            return Err(VerikitError::invalid_data(
                "kind",
                format!("{} is not proven by payment", kind.as_str()),
            )
            .into());
        }

        // Check-and-create under one registry lock hold: two racing
        // issuances must never mint two amounts for the same subject.
        let challenge = self
            .registry
            .get_or_insert_pending(kind, &subject_id, || {
                let token = new_token(kind, &subject_id);
                let mut challenge =
                    VerificationChallenge::new(&token, kind, subject_id.clone(), self.ttl_secs)
                        .with_expected_address(address);
                if let Some(sats) = self.policy.expected_amount(kind) {
                    challenge = challenge.with_expected_amount(sats);
                }
                challenge
            })?;

        #[cfg(feature = "tracing")]
        tracing::info!(token = %challenge.token, "issued on-chain challenge");

        Ok(challenge)
    }

    /// Check a submitted txid against the subject's pending challenge.
    ///
    /// Returns the submission verdict; infrastructure failures (unreachable
    /// chain backend) propagate as errors and leave the challenge pending,
    /// so the caller can retry the identical submission later.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            skip(self, subject_id),
            fields(kind = kind.as_str(), subject = subject_id.as_str())
        )
    )]
    pub async fn verify(
        &self,
        kind: ChallengeKind,
        subject_id: &SubjectId,
        txid: &str,
    ) -> Result<Verdict> {
        // Malformed txids are bounced before any lookup or state change.
        let txid = match Txid::parse(txid) {
            Ok(t) => t,
            Err(_) => return Ok(Verdict::failed(RejectReason::InvalidTxidFormat)),
        };

        let challenge = self
            .registry
            .resolve_subject(kind, subject_id)
            .ok_or_else(|| EngineError::ChallengeNotFound(subject_id.as_str().to_string()))?;

        match challenge.status {
            VerificationStatus::Pending => {}
            VerificationStatus::Expired => {
                return Err(EngineError::ChallengeExpired(challenge.token));
            }
            // A concurrent submission already settled this challenge;
            // report its outcome instead of re-examining the chain.
            _ => return Ok(challenge.verdict()),
        }

        // Fast path. The authoritative check is repeated inside complete().
        if self.registry.is_txid_spent(txid.as_str()) {
            return Ok(Verdict::failed(RejectReason::TxidAlreadyUsed));
        }

        let tx = match self.chain.lookup_tx(&txid).await? {
            // Unknown to the backend: possibly not yet relayed. Not a
            // rejection, the payer just has to wait.
            None => return Ok(Verdict::pending(Some(RejectReason::AwaitingConfirmation))),
            Some(tx) => tx,
        };

        if !tx.confirmed || tx.confirmations < self.min_confirmations {
            return Ok(Verdict::pending(Some(RejectReason::AwaitingConfirmation)));
        }

        // Finalized facts from here on: rejections are terminal.
        let address = challenge.expected_address.as_deref().ok_or_else(|| {
            VerikitError::Internal(format!(
                "on-chain challenge {} has no expected address",
                challenge.token
            ))
        })?;

        let completion = match tx.paid_to(address) {
            None => Completion::Failed(RejectReason::AddressMismatch),
            Some(actual_sats) => {
                let expected = challenge.expected_amount_sats.unwrap_or(0);
                if self.policy.matches(kind, expected, actual_sats) {
                    Completion::Verified(Proof::OnchainPayment {
                        txid: txid.as_str().to_string(),
                    })
                } else {
                    Completion::Failed(RejectReason::AmountMismatch)
                }
            }
        };

        match self.registry.complete(&challenge.token, completion)? {
            CompletionOutcome::Applied(c) => Ok(c.verdict()),
            CompletionOutcome::AlreadyTerminal(c) => Ok(c.verdict()),
            CompletionOutcome::TxidSpent => Ok(Verdict::failed(RejectReason::TxidAlreadyUsed)),
        }
    }

    /// Current verdict for a subject's latest challenge, without submitting
    /// anything.
    pub fn status(&self, kind: ChallengeKind, subject_id: &SubjectId) -> Result<Verdict> {
        self.registry
            .resolve_subject(kind, subject_id)
            .map(|c| c.verdict())
            .ok_or_else(|| EngineError::ChallengeNotFound(subject_id.as_str().to_string()))
    }
}

/// Mint a unique token for an on-chain challenge.
///
/// Subject-derived tokens would collide on re-issue after expiry, so a
/// random nonce keeps every issuance distinct.
fn new_token(kind: ChallengeKind, subject_id: &SubjectId) -> String {
    let mut nonce = [0u8; 8];
    OsRng.fill_bytes(&mut nonce);
    format!(
        "{}:{}:{}",
        kind.as_str(),
        subject_id.as_str(),
        hex::encode(nonce)
    )
}
