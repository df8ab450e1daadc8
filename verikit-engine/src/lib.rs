//! Verikit verification engine.
//!
//! The stateful core of the payment-and-identity verification system: a
//! process-wide [`VerificationRegistry`] of challenges, the shared
//! pending -> terminal state machine, and the two proof verifiers
//! ([`OnchainVerifier`] for payments, [`LnurlAuthChallengeService`] for
//! Lightning identities).
//!
//! The registry is the only mutable shared resource. Verifiers fetch
//! external facts without holding any lock and apply outcomes through a
//! per-token compare-and-set, so concurrent submissions for the same
//! challenge resolve to exactly one terminal transition.

use serde::{Deserialize, Serialize};

use verikit_lib::{ChallengeKind, SubjectId, VerikitError};

pub mod lnauth;
pub mod onchain;
pub mod registry;
pub mod state;

pub use lnauth::{IssuedLnurlChallenge, LnurlAuthChallengeService, LnurlStatus};
pub use onchain::OnchainVerifier;
pub use registry::{Completion, CompletionOutcome, VerificationRegistry};
pub use state::{VerificationEvent, VerificationStatus};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors from engine operations.
///
/// These mean "the request could not be processed", not "the proof was
/// wrong" - policy rejections are reported through [`Verdict`] instead.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// No challenge known under this token. Also returned for a consumed
    /// LNURL k1: a spent nonce is indistinguishable from an unknown one.
    #[error("challenge not found: {0}")]
    ChallengeNotFound(String),

    /// The challenge expired before a proof was accepted. Callers should
    /// request a new challenge rather than retry this token.
    #[error("challenge expired: {0}")]
    ChallengeExpired(String),

    /// A challenge already exists under this token. Tokens are assigned
    /// exactly once and never reused.
    #[error("token already in use: {0}")]
    TokenInUse(String),

    /// An underlying primitive failed (chain lookup, bad input shape, ...).
    #[error(transparent)]
    Lib(#[from] VerikitError),
}

impl EngineError {
    /// Returns true if retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lib(e) if e.is_retryable())
    }
}

/// Why a proof submission was not (or not yet) accepted.
///
/// Serialized in SCREAMING_SNAKE_CASE - these are the wire codes the CRUD
/// layer branches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// The submitted txid is not 64 hex characters.
    InvalidTxidFormat,
    /// The txid already proved some other verification.
    TxidAlreadyUsed,
    /// The payment amount does not satisfy the policy for this kind.
    AmountMismatch,
    /// No output of the transaction pays the expected address.
    AddressMismatch,
    /// The transaction has not reached the confirmation threshold yet.
    AwaitingConfirmation,
    /// The signature does not validate over k1 under the supplied key.
    InvalidSignature,
    /// The challenge TTL elapsed before a proof was accepted.
    ChallengeExpired,
}

impl RejectReason {
    /// The wire code for this reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTxidFormat => "INVALID_TXID_FORMAT",
            Self::TxidAlreadyUsed => "TXID_ALREADY_USED",
            Self::AmountMismatch => "AMOUNT_MISMATCH",
            Self::AddressMismatch => "ADDRESS_MISMATCH",
            Self::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ChallengeExpired => "CHALLENGE_EXPIRED",
        }
    }
}

/// The accepted evidence once a challenge is verified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "proof_type", rename_all = "snake_case")]
pub enum Proof {
    /// An on-chain payment satisfying the challenge.
    OnchainPayment {
        /// The consumed transaction id.
        txid: String,
    },
    /// Control of a Lightning linking key, proven via LNURL-auth.
    LightningKey {
        /// The compressed secp256k1 public key, hex-encoded.
        pubkey: String,
    },
}

/// The unit of work for any verification flow.
///
/// Created pending, mutated only through the registry's compare-and-set,
/// and retained after reaching a terminal state so replayed tokens and
/// txids keep being rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationChallenge {
    /// Opaque unique identifier: the k1 nonce for Lightning flows, a
    /// synthetic id for on-chain flows.
    pub token: String,
    /// What this challenge attests for.
    pub kind: ChallengeKind,
    /// The store or review this challenge belongs to.
    pub subject_id: SubjectId,
    /// Payment destination that must appear in an output (on-chain only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_address: Option<String>,
    /// Amount the payment must satisfy, fixed at creation (on-chain only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_amount_sats: Option<u64>,
    /// Current lifecycle state.
    pub status: VerificationStatus,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp after which a pending challenge expires.
    pub expires_at: i64,
    /// Accepted evidence, set when status becomes verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    /// Why the challenge failed, set when status becomes failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RejectReason>,
}

impl VerificationChallenge {
    /// Create a fresh pending challenge with the given lifetime.
    pub fn new(
        token: impl Into<String>,
        kind: ChallengeKind,
        subject_id: SubjectId,
        ttl_secs: i64,
    ) -> Self {
        let now = verikit_lib::current_timestamp();
        Self {
            token: token.into(),
            kind,
            subject_id,
            expected_address: None,
            expected_amount_sats: None,
            status: VerificationStatus::Pending,
            created_at: now,
            expires_at: now + ttl_secs,
            proof: None,
            failure: None,
        }
    }

    /// Set the expected payment destination.
    pub fn with_expected_address(mut self, address: impl Into<String>) -> Self {
        self.expected_address = Some(address.into());
        self
    }

    /// Set the expected payment amount.
    pub fn with_expected_amount(mut self, sats: u64) -> Self {
        self.expected_amount_sats = Some(sats);
        self
    }

    /// Whether the TTL has elapsed (only meaningful while pending).
    pub fn is_stale(&self, now: i64) -> bool {
        self.status == VerificationStatus::Pending && now > self.expires_at
    }

    /// The verdict a caller should see for this challenge as stored.
    pub fn verdict(&self) -> Verdict {
        match self.status {
            VerificationStatus::Pending => Verdict::pending(None),
            VerificationStatus::Verified => Verdict::verified(self.proof.clone()),
            // The stored reason travels as-is; a failed record with none
            // recorded stays unattributed rather than guessing one.
            VerificationStatus::Failed => Verdict {
                status: VerdictStatus::Failed,
                reason: self.failure,
                proof: None,
            },
            VerificationStatus::Expired => Verdict::failed(RejectReason::ChallengeExpired),
        }
    }
}

/// Outcome of a proof submission.
///
/// `status` describes this submission, which is not always the stored
/// challenge state: a malformed or replayed txid is rejected without
/// touching the challenge, which keeps waiting for a correct proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Submission outcome.
    pub status: VerdictStatus,
    /// Reject or still-waiting reason, absent on acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    /// The accepted proof, present when status is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

/// Coarse submission outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// Not decided yet; poll again later.
    Pending,
    /// Proof examined and accepted.
    Verified,
    /// Proof examined and rejected.
    Failed,
}

impl Verdict {
    /// A still-pending verdict, optionally annotated with why.
    pub fn pending(reason: Option<RejectReason>) -> Self {
        Self {
            status: VerdictStatus::Pending,
            reason,
            proof: None,
        }
    }

    /// An accepted verdict.
    pub fn verified(proof: Option<Proof>) -> Self {
        Self {
            status: VerdictStatus::Verified,
            reason: None,
            proof,
        }
    }

    /// A rejected verdict.
    pub fn failed(reason: RejectReason) -> Self {
        Self {
            status: VerdictStatus::Failed,
            reason: Some(reason),
            proof: None,
        }
    }

    /// Whether the proof was accepted.
    pub fn is_verified(&self) -> bool {
        self.status == VerdictStatus::Verified
    }
}
