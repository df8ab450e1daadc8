//! LNURL-auth identity verification.
//!
//! Issues single-use k1 challenges, hands out the bech32 LNURL a wallet
//! scans, and settles the challenge when the wallet's signature arrives on
//! the callback. The k1 nonce doubles as the registry token.

use std::sync::Arc;

use serde::Serialize;

use verikit_lib::config::{LnurlServerConfig, VerificationConfig};
use verikit_lib::lnurl;
use verikit_lib::{ChallengeKind, SubjectId};

use crate::registry::{Completion, CompletionOutcome, VerificationRegistry};
use crate::state::VerificationStatus;
use crate::{EngineError, Proof, RejectReason, Result, Verdict, VerificationChallenge};

/// Everything a client needs to drive one LNURL-auth round.
#[derive(Clone, Debug, Serialize)]
pub struct IssuedLnurlChallenge {
    /// The hex k1 nonce; also the token to poll with.
    pub k1: String,
    /// Plain https callback URL the wallet will GET after signing.
    pub callback_url: String,
    /// The bech32 `lnurl1...` encoding of the callback URL.
    pub lnurl: String,
    /// Uppercase LNURL for QR rendering.
    pub qr_payload: String,
    /// Unix timestamp after which the nonce is dead.
    pub expires_at: i64,
}

/// Snapshot of an identity challenge for pollers.
#[derive(Clone, Debug, Serialize)]
pub struct LnurlStatus {
    /// Current lifecycle state.
    pub status: VerificationStatus,
    /// The proven linking key, once verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    /// When the challenge expires (or expired).
    pub expires_at: i64,
}

/// Issues and settles LNURL-auth challenges against the shared registry.
pub struct LnurlAuthChallengeService {
    registry: Arc<VerificationRegistry>,
    server: LnurlServerConfig,
    ttl_secs: i64,
}

impl LnurlAuthChallengeService {
    /// Build a service over a shared registry.
    pub fn new(
        registry: Arc<VerificationRegistry>,
        server: LnurlServerConfig,
        config: &VerificationConfig,
    ) -> Self {
        Self {
            registry,
            server,
            ttl_secs: config.lnauth_ttl_secs,
        }
    }

    /// Issue a fresh identity challenge for a subject.
    ///
    /// Always mints a new k1, even while an earlier one for the same subject
    /// is still pending: each displayed QR code gets its own nonce.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, subject_id), fields(subject = subject_id.as_str()))
    )]
    pub fn issue_challenge(&self, subject_id: SubjectId) -> Result<IssuedLnurlChallenge> {
        let k1 = lnurl::generate_k1();
        let challenge = VerificationChallenge::new(
            &k1,
            ChallengeKind::ReviewIdentity,
            subject_id,
            self.ttl_secs,
        );
        let expires_at = challenge.expires_at;
        self.registry.insert(challenge)?;

        let callback_url = lnurl::build_callback_url(&self.server, &k1);
        let encoded = lnurl::encode_lnurl(&callback_url)?;

        #[cfg(feature = "tracing")]
        tracing::info!(k1, "issued lnurl-auth challenge");

        Ok(IssuedLnurlChallenge {
            k1,
            callback_url,
            qr_payload: lnurl::qr_payload(&encoded),
            lnurl: encoded,
            expires_at,
        })
    }

    /// Settle a challenge with a wallet's signature.
    ///
    /// Malformed hex or key/signature shapes error out without touching the
    /// challenge; a well-formed signature that fails to validate settles it
    /// as failed. A k1 that was already consumed by a verification is
    /// reported as unknown, which keeps spent nonces indistinguishable from
    /// ones that never existed.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, sig)))]
    pub fn verify_signature(&self, k1: &str, sig: &str, pubkey: &str) -> Result<Verdict> {
        let challenge = self
            .registry
            .resolve(k1)
            .ok_or_else(|| EngineError::ChallengeNotFound(k1.to_string()))?;

        match challenge.status {
            VerificationStatus::Pending => {}
            VerificationStatus::Expired => {
                return Err(EngineError::ChallengeExpired(k1.to_string()));
            }
            VerificationStatus::Verified => {
                return Err(EngineError::ChallengeNotFound(k1.to_string()));
            }
            VerificationStatus::Failed => return Ok(challenge.verdict()),
        }

        let completion = if lnurl::verify_auth_signature(k1, sig, pubkey)? {
            Completion::Verified(Proof::LightningKey {
                pubkey: pubkey.to_string(),
            })
        } else {
            Completion::Failed(RejectReason::InvalidSignature)
        };

        match self.registry.complete(k1, completion)? {
            CompletionOutcome::Applied(c) => Ok(c.verdict()),
            CompletionOutcome::AlreadyTerminal(c) => Ok(c.verdict()),
            // Txids play no part in identity proofs.
            CompletionOutcome::TxidSpent => unreachable!("identity proof carries no txid"),
        }
    }

    /// Current state of a challenge, for the browser-side poll loop.
    ///
    /// Polling an expired challenge reports `expired`; only an unknown k1
    /// is an error.
    pub fn poll_status(&self, k1: &str) -> Result<LnurlStatus> {
        let challenge = self
            .registry
            .resolve(k1)
            .ok_or_else(|| EngineError::ChallengeNotFound(k1.to_string()))?;

        let pubkey = match &challenge.proof {
            Some(Proof::LightningKey { pubkey }) => Some(pubkey.clone()),
            _ => None,
        };
        Ok(LnurlStatus {
            status: challenge.status,
            pubkey,
            expires_at: challenge.expires_at,
        })
    }
}
