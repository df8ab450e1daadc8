//! Amount policy: what a payment must be worth to count as proof.
//!
//! The two on-chain flows intentionally use different rules. Store ownership
//! is a threshold check (`actual >= expected`); review payment is an exact
//! match against a freshly randomized amount, because the random amount is
//! what binds the payment to this specific challenge - a payment made before
//! the reviewer saw the amount cannot match it.

use rand::rngs::OsRng;
use rand::Rng;

use crate::config::VerificationConfig;
use crate::ChallengeKind;

/// Computes and matches expected payment amounts per challenge kind.
#[derive(Clone, Debug)]
pub struct AmountPolicy {
    store_min_sats: u64,
    review_min_sats: u64,
    review_max_sats: u64,
}

impl AmountPolicy {
    /// Build a policy from configuration.
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            store_min_sats: config.store_min_sats,
            review_min_sats: config.review_amount_min_sats,
            review_max_sats: config.review_amount_max_sats.max(config.review_amount_min_sats),
        }
    }

    /// Expected amount for a fresh challenge of the given kind.
    ///
    /// Returns `None` for identity challenges, which involve no payment.
    /// Review amounts come from the OS random source: they must be
    /// unpredictable, not merely unique.
    pub fn expected_amount(&self, kind: ChallengeKind) -> Option<u64> {
        match kind {
            ChallengeKind::StoreOwnership => Some(self.store_min_sats),
            ChallengeKind::ReviewPayment => {
                Some(OsRng.gen_range(self.review_min_sats..=self.review_max_sats))
            }
            ChallengeKind::ReviewIdentity => None,
        }
    }

    /// Whether an observed payment amount satisfies the expectation.
    ///
    /// A mismatch is a verification failure, not an error.
    pub fn matches(&self, kind: ChallengeKind, expected: u64, actual: u64) -> bool {
        match kind {
            ChallengeKind::StoreOwnership => actual >= expected,
            ChallengeKind::ReviewPayment => actual == expected,
            ChallengeKind::ReviewIdentity => false,
        }
    }
}

impl Default for AmountPolicy {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default())
    }
}
