//! The shared challenge state machine.
//!
//! One table for all three challenge kinds; only the proof-acceptance
//! predicate differs between them, and that lives in the verifiers.

use serde::{Deserialize, Serialize};

/// Challenge lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Waiting for an acceptable proof.
    Pending,
    /// Proof accepted. Terminal.
    Verified,
    /// Proof examined and rejected. Terminal.
    Failed,
    /// TTL elapsed with no accepted proof. Terminal.
    Expired,
}

/// Events that drive the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationEvent {
    /// A valid proof was accepted.
    ProofAccepted,
    /// A proof was examined against finalized data and rejected.
    ProofRejected,
    /// The TTL elapsed with no accepted proof.
    TtlElapsed,
}

/// Result of applying an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The state after the event.
    pub next: VerificationStatus,
    /// Whether the event changed anything. Events against a terminal
    /// state are absorbed as no-ops.
    pub changed: bool,
}

impl VerificationStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Apply an event. Status only moves forward: terminal states absorb
    /// every event unchanged.
    pub fn apply(self, event: VerificationEvent) -> Transition {
        if self.is_terminal() {
            return Transition {
                next: self,
                changed: false,
            };
        }
        let next = match event {
            VerificationEvent::ProofAccepted => Self::Verified,
            VerificationEvent::ProofRejected => Self::Failed,
            VerificationEvent::TtlElapsed => Self::Expired,
        };
        Transition {
            next,
            changed: true,
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_EVENTS: [VerificationEvent; 3] = [
        VerificationEvent::ProofAccepted,
        VerificationEvent::ProofRejected,
        VerificationEvent::TtlElapsed,
    ];

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            VerificationStatus::Pending
                .apply(VerificationEvent::ProofAccepted)
                .next,
            VerificationStatus::Verified
        );
        assert_eq!(
            VerificationStatus::Pending
                .apply(VerificationEvent::ProofRejected)
                .next,
            VerificationStatus::Failed
        );
        assert_eq!(
            VerificationStatus::Pending
                .apply(VerificationEvent::TtlElapsed)
                .next,
            VerificationStatus::Expired
        );
    }

    #[test]
    fn test_status_is_monotonic() {
        // Once terminal, any sequence of further events is a no-op.
        for terminal in [
            VerificationStatus::Verified,
            VerificationStatus::Failed,
            VerificationStatus::Expired,
        ] {
            let mut state = terminal;
            for _ in 0..4 {
                for event in ALL_EVENTS {
                    let t = state.apply(event);
                    assert!(!t.changed);
                    assert_eq!(t.next, terminal);
                    state = t.next;
                }
            }
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&VerificationStatus::Verified).unwrap(),
            "\"verified\""
        );
    }
}
