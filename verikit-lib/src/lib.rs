//! Verikit library.
//!
//! Stateless primitives for Bitcoin payment-and-identity verification:
//! chain-fact access, amount policy, and LNURL-auth cryptography. This crate
//! holds no mutable state; the stateful registry and verifiers live in
//! `verikit-engine`.
//!
//! # Features
//!
//! - **Chain Facts**: Trait-based access to transaction confirmations and
//!   outputs via Esplora-compatible APIs (Blockstream, mempool.space)
//! - **Amount Policy**: Expected-amount generation and matching rules per
//!   challenge kind
//! - **LNURL-auth**: k1 nonce generation, LNURL bech32 encoding, and
//!   secp256k1 signature verification
//!
//! # Example
//!
//! ```
//! use verikit_lib::{ChallengeKind, Txid};
//! use verikit_lib::policy::AmountPolicy;
//!
//! let txid = Txid::parse(
//!     "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef",
//! ).unwrap();
//! assert_eq!(txid.as_str().len(), 64);
//!
//! let policy = AmountPolicy::default();
//! // Store ownership accepts any payment at or above the minimum.
//! assert!(policy.matches(ChallengeKind::StoreOwnership, 5000, 7500));
//! ```

pub mod chain;
pub mod config;
pub mod errors;
pub mod lnurl;
pub mod policy;

pub use errors::{VerikitError, VerikitErrorCode};

/// Common result alias for Verikit operations.
pub type Result<T> = std::result::Result<T, VerikitError>;

/// The kind of verification a challenge attests for.
///
/// The kind selects the amount policy and the proof-acceptance predicate;
/// everything else about challenge lifecycle is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeKind {
    /// A store registrant proving control of their claimed Bitcoin address.
    StoreOwnership,
    /// A reviewer proving they paid the store on-chain.
    ReviewPayment,
    /// A reviewer proving control of a Lightning public key (no payment).
    ReviewIdentity,
}

impl ChallengeKind {
    /// Stable short name, used in tokens and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreOwnership => "store-ownership",
            Self::ReviewPayment => "review-payment",
            Self::ReviewIdentity => "review-identity",
        }
    }

    /// Whether this kind is proven by an on-chain payment.
    pub fn is_onchain(&self) -> bool {
        matches!(self, Self::StoreOwnership | Self::ReviewPayment)
    }
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated Bitcoin transaction id: exactly 64 lowercase hex characters.
///
/// Construction goes through [`Txid::parse`] so malformed input is rejected
/// before any chain lookup happens.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Txid(String);

impl Txid {
    /// Parse and validate a transaction id.
    ///
    /// Accepts mixed-case hex and normalizes to lowercase. Rejects anything
    /// that is not exactly 64 hex characters.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(VerikitError::invalid_data(
                "txid",
                format!("expected 64 hex characters, got {}", s.len()),
            ));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(VerikitError::invalid_data("txid", "not hexadecimal"));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the txid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Txid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Txid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the store or review a challenge attests for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    /// Create a new subject id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the subject id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Helper to get the current unix timestamp in seconds.
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
