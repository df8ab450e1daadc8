//! The process-wide verification registry.
//!
//! Maps tokens to challenges, owns the spent-txid index, and serializes
//! every mutation behind one lock so proof acceptance is an atomic
//! compare-and-set on the challenge status. Terminal records are retained
//! indefinitely - they are what rejects replayed tokens and txids.
//!
//! # Thread Safety
//!
//! Internally uses `RwLock`. Public methods panic if the lock is poisoned,
//! which only happens if a thread panicked while holding it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use verikit_lib::{current_timestamp, ChallengeKind, SubjectId};

use crate::state::{VerificationEvent, VerificationStatus};
use crate::{EngineError, Proof, RejectReason, Result, VerificationChallenge};

/// Terminal outcome to apply to a pending challenge.
#[derive(Clone, Debug)]
pub enum Completion {
    /// Accept the proof and mark the challenge verified.
    Verified(Proof),
    /// Reject the proof and mark the challenge failed.
    Failed(RejectReason),
}

/// What a compare-and-set attempt observed.
#[derive(Clone, Debug)]
pub enum CompletionOutcome {
    /// This call won the race and applied the transition.
    Applied(VerificationChallenge),
    /// The challenge was already terminal; the stored record is returned
    /// so the caller can report its outcome instead of re-processing.
    AlreadyTerminal(VerificationChallenge),
    /// The proof's txid was consumed by another challenge between the
    /// caller's fast-path check and this critical section.
    TxidSpent,
}

#[derive(Default)]
struct Inner {
    challenges: HashMap<String, VerificationChallenge>,
    /// Latest token issued per (kind, subject), for subject-keyed lookups.
    by_subject: HashMap<(ChallengeKind, String), String>,
    spent_txids: HashSet<String>,
}

/// Keyed in-memory store of verification challenges.
///
/// The single writer for all challenge state. Initialized once at service
/// start; entries live at least through their TTL plus whatever grace the
/// retention policy allows (the engine itself never deletes).
#[derive(Default)]
pub struct VerificationRegistry {
    inner: RwLock<Inner>,
}

impl VerificationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh challenge.
    ///
    /// Tokens are assigned exactly once: inserting an existing token is an
    /// error, never an overwrite.
    pub fn insert(&self, challenge: VerificationChallenge) -> Result<()> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if inner.challenges.contains_key(&challenge.token) {
            return Err(EngineError::TokenInUse(challenge.token));
        }
        inner.by_subject.insert(
            (challenge.kind, challenge.subject_id.as_str().to_string()),
            challenge.token.clone(),
        );
        inner.challenges.insert(challenge.token.clone(), challenge);
        Ok(())
    }

    /// Return the subject's pending challenge, or register a fresh one.
    ///
    /// The check and the insert happen under one write-lock hold, so
    /// concurrent issuance for the same subject yields exactly one
    /// challenge: whichever caller wins creates it, the rest get that same
    /// record back. A stale pending challenge found here is expired and
    /// replaced. `make` must build a pending challenge for the same
    /// `(kind, subject)` it was called for.
    pub fn get_or_insert_pending(
        &self,
        kind: ChallengeKind,
        subject_id: &SubjectId,
        make: impl FnOnce() -> VerificationChallenge,
    ) -> Result<VerificationChallenge> {
        let now = current_timestamp();
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let key = (kind, subject_id.as_str().to_string());
        if let Some(token) = inner.by_subject.get(&key).cloned() {
            if let Some(existing) = inner.challenges.get_mut(&token) {
                if existing.is_stale(now) {
                    existing.status = existing.status.apply(VerificationEvent::TtlElapsed).next;
                }
                if existing.status == VerificationStatus::Pending {
                    return Ok(existing.clone());
                }
            }
        }

        let challenge = make();
        if inner.challenges.contains_key(&challenge.token) {
            return Err(EngineError::TokenInUse(challenge.token));
        }
        inner.by_subject.insert(key, challenge.token.clone());
        inner
            .challenges
            .insert(challenge.token.clone(), challenge.clone());
        Ok(challenge)
    }

    /// Look up a challenge by token.
    ///
    /// Performs the lazy expiry check: a pending challenge past its TTL is
    /// transitioned to expired before being returned, so readers never see
    /// a stale pending record.
    pub fn resolve(&self, token: &str) -> Option<VerificationChallenge> {
        let now = current_timestamp();
        {
            let inner = self.inner.read().expect("registry lock poisoned");
            match inner.challenges.get(token) {
                Some(c) if !c.is_stale(now) => return Some(c.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Stale: upgrade to a write lock and expire it.
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let challenge = inner.challenges.get_mut(token)?;
        if challenge.is_stale(now) {
            challenge.status = challenge.status.apply(VerificationEvent::TtlElapsed).next;
            #[cfg(feature = "tracing")]
            tracing::debug!(token, "challenge expired on read");
        }
        Some(challenge.clone())
    }

    /// Latest challenge issued for a subject under the given kind.
    pub fn resolve_subject(
        &self,
        kind: ChallengeKind,
        subject_id: &SubjectId,
    ) -> Option<VerificationChallenge> {
        let token = {
            let inner = self.inner.read().expect("registry lock poisoned");
            inner
                .by_subject
                .get(&(kind, subject_id.as_str().to_string()))
                .cloned()?
        };
        self.resolve(&token)
    }

    /// Whether a txid has already proved some verification.
    pub fn is_txid_spent(&self, txid: &str) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .spent_txids
            .contains(txid)
    }

    /// Atomically apply a terminal outcome to a pending challenge.
    ///
    /// This is the engine's only critical section: callers gather all
    /// external facts first (chain lookups, signature checks) and come here
    /// with a decision. If two submissions race, exactly one observes
    /// `Applied`; the other gets `AlreadyTerminal` with the winning record.
    ///
    /// A proof arriving after the TTL is rejected with
    /// [`EngineError::ChallengeExpired`], never applied.
    pub fn complete(&self, token: &str, completion: Completion) -> Result<CompletionOutcome> {
        let now = current_timestamp();
        let mut inner = self.inner.write().expect("registry lock poisoned");

        let challenge = inner
            .challenges
            .get(token)
            .ok_or_else(|| EngineError::ChallengeNotFound(token.to_string()))?;

        if challenge.is_stale(now) {
            let challenge = inner
                .challenges
                .get_mut(token)
                .expect("checked above");
            challenge.status = challenge.status.apply(VerificationEvent::TtlElapsed).next;
            return Err(EngineError::ChallengeExpired(token.to_string()));
        }

        if challenge.status.is_terminal() {
            if challenge.status == VerificationStatus::Expired {
                return Err(EngineError::ChallengeExpired(token.to_string()));
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(token, status = %challenge.status, "completion on terminal challenge ignored");
            return Ok(CompletionOutcome::AlreadyTerminal(challenge.clone()));
        }

        // Double-check the spent index inside the lock: another challenge
        // may have consumed this txid since the caller's fast-path check.
        if let Completion::Verified(Proof::OnchainPayment { txid }) = &completion {
            if inner.spent_txids.contains(txid) {
                return Ok(CompletionOutcome::TxidSpent);
            }
        }

        let (event, proof, failure) = match completion {
            Completion::Verified(proof) => (VerificationEvent::ProofAccepted, Some(proof), None),
            Completion::Failed(reason) => (VerificationEvent::ProofRejected, None, Some(reason)),
        };

        if let Some(Proof::OnchainPayment { txid }) = &proof {
            inner.spent_txids.insert(txid.clone());
        }

        let challenge = inner.challenges.get_mut(token).expect("checked above");
        challenge.status = challenge.status.apply(event).next;
        challenge.proof = proof;
        challenge.failure = failure;

        Ok(CompletionOutcome::Applied(challenge.clone()))
    }

    /// Transition every stale pending challenge to expired.
    ///
    /// Complements the lazy check-on-read for records nobody polls.
    /// Returns how many challenges were expired.
    pub fn sweep_expired(&self) -> usize {
        let now = current_timestamp();
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let mut swept = 0;
        for challenge in inner.challenges.values_mut() {
            if challenge.is_stale(now) {
                challenge.status = challenge.status.apply(VerificationEvent::TtlElapsed).next;
                swept += 1;
            }
        }
        #[cfg(feature = "tracing")]
        if swept > 0 {
            tracing::debug!(swept, "expired stale challenges");
        }
        swept
    }

    /// Number of challenges ever registered.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .challenges
            .len()
    }

    /// Whether the registry holds no challenges.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verikit_lib::ChallengeKind;

    fn challenge(token: &str, ttl: i64) -> VerificationChallenge {
        VerificationChallenge::new(
            token,
            ChallengeKind::StoreOwnership,
            SubjectId::from("store-1"),
            ttl,
        )
    }

    #[test]
    fn test_token_assigned_exactly_once() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", 600)).unwrap();

        let err = registry.insert(challenge("t1", 600)).unwrap_err();
        assert!(matches!(err, EngineError::TokenInUse(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_subject_returns_latest() {
        let registry = VerificationRegistry::new();
        let mut first = challenge("t1", 600);
        first.status = VerificationStatus::Failed;
        registry.insert(first).unwrap();
        registry.insert(challenge("t2", 600)).unwrap();

        let current = registry
            .resolve_subject(ChallengeKind::StoreOwnership, &SubjectId::from("store-1"))
            .unwrap();
        assert_eq!(current.token, "t2");
        assert_eq!(current.status, VerificationStatus::Pending);
    }

    #[test]
    fn test_get_or_insert_reuses_pending() {
        let registry = VerificationRegistry::new();
        let subject = SubjectId::from("store-1");

        let first = registry
            .get_or_insert_pending(ChallengeKind::StoreOwnership, &subject, || {
                challenge("t1", 600)
            })
            .unwrap();
        let second = registry
            .get_or_insert_pending(ChallengeKind::StoreOwnership, &subject, || {
                panic!("pending challenge must be reused, not rebuilt")
            })
            .unwrap();

        assert_eq!(first.token, second.token);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_or_insert_replaces_terminal() {
        let registry = VerificationRegistry::new();
        let subject = SubjectId::from("store-1");
        let mut settled = challenge("t1", 600);
        settled.status = VerificationStatus::Failed;
        registry.insert(settled).unwrap();

        let fresh = registry
            .get_or_insert_pending(ChallengeKind::StoreOwnership, &subject, || {
                challenge("t2", 600)
            })
            .unwrap();
        assert_eq!(fresh.token, "t2");
        assert_eq!(fresh.status, VerificationStatus::Pending);
        // The settled record is retained under its own token.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_or_insert_expires_stale_pending() {
        let registry = VerificationRegistry::new();
        let subject = SubjectId::from("store-1");
        registry.insert(challenge("t1", -1)).unwrap();

        let fresh = registry
            .get_or_insert_pending(ChallengeKind::StoreOwnership, &subject, || {
                challenge("t2", 600)
            })
            .unwrap();
        assert_eq!(fresh.token, "t2");
        assert_eq!(
            registry.resolve("t1").unwrap().status,
            VerificationStatus::Expired
        );
    }

    #[test]
    fn test_lazy_expiry_on_resolve() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", -1)).unwrap();

        let resolved = registry.resolve("t1").unwrap();
        assert_eq!(resolved.status, VerificationStatus::Expired);

        // Idempotent on re-read
        let resolved = registry.resolve("t1").unwrap();
        assert_eq!(resolved.status, VerificationStatus::Expired);
    }

    #[test]
    fn test_complete_applies_once() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", 600)).unwrap();

        let proof = Proof::OnchainPayment {
            txid: "aa".repeat(32),
        };
        let outcome = registry
            .complete("t1", Completion::Verified(proof.clone()))
            .unwrap();
        assert!(matches!(outcome, CompletionOutcome::Applied(_)));
        assert!(registry.is_txid_spent(&"aa".repeat(32)));

        // Second attempt observes the terminal record, does not re-process
        let outcome = registry
            .complete("t1", Completion::Failed(RejectReason::AmountMismatch))
            .unwrap();
        match outcome {
            CompletionOutcome::AlreadyTerminal(c) => {
                assert_eq!(c.status, VerificationStatus::Verified);
                assert_eq!(c.proof, Some(proof));
            }
            other => panic!("expected AlreadyTerminal, got {:?}", other),
        }
    }

    #[test]
    fn test_spent_txid_blocks_other_challenge() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", 600)).unwrap();
        let mut other = challenge("t2", 600);
        other.subject_id = SubjectId::from("store-2");
        registry.insert(other).unwrap();

        let txid = "ab".repeat(32);
        registry
            .complete(
                "t1",
                Completion::Verified(Proof::OnchainPayment { txid: txid.clone() }),
            )
            .unwrap();

        let outcome = registry
            .complete("t2", Completion::Verified(Proof::OnchainPayment { txid }))
            .unwrap();
        assert!(matches!(outcome, CompletionOutcome::TxidSpent));

        // The losing challenge is still pending and can accept another txid
        let t2 = registry.resolve("t2").unwrap();
        assert_eq!(t2.status, VerificationStatus::Pending);
    }

    #[test]
    fn test_proof_after_expiry_rejected() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", -1)).unwrap();

        let err = registry
            .complete(
                "t1",
                Completion::Verified(Proof::OnchainPayment {
                    txid: "cc".repeat(32),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::ChallengeExpired(_)));

        // The txid was never consumed
        assert!(!registry.is_txid_spent(&"cc".repeat(32)));
    }

    #[test]
    fn test_unknown_token() {
        let registry = VerificationRegistry::new();
        assert!(registry.resolve("nope").is_none());
        let err = registry
            .complete("nope", Completion::Failed(RejectReason::AmountMismatch))
            .unwrap_err();
        assert!(matches!(err, EngineError::ChallengeNotFound(_)));
    }

    #[test]
    fn test_sweep_expired() {
        let registry = VerificationRegistry::new();
        registry.insert(challenge("t1", -1)).unwrap();
        let mut live = challenge("t2", 600);
        live.subject_id = SubjectId::from("store-2");
        registry.insert(live).unwrap();

        assert_eq!(registry.sweep_expired(), 1);
        assert_eq!(registry.sweep_expired(), 0);
        assert_eq!(
            registry.resolve("t2").unwrap().status,
            VerificationStatus::Pending
        );
    }
}
