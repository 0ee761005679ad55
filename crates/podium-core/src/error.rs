// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Podium token ledger.
//!
//! Three classes matter to callers: [`PodiumError::InsufficientBalance`] and
//! [`PodiumError::Verification`] are recoverable and user-facing, while
//! [`PodiumError::ConsistencyFault`] needs manual reconciliation.

use std::time::Duration;

use thiserror::Error;

/// Why a payment session could not be turned into a ledger credit.
///
/// None of these leave a partial credit behind; the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Neither the local store nor the processor knows this session.
    #[error("payment session not found")]
    SessionNotFound,

    /// The processor has not (yet) confirmed payment.
    #[error("payment not yet confirmed")]
    NotPaid,

    /// The session expired or was cancelled at the processor.
    #[error("payment session failed or expired")]
    SessionFailed,

    /// The session was opened by a different user.
    #[error("payment session belongs to another user")]
    WrongUser,

    /// The processor could not be reached or answered with an error.
    #[error("payment processor unreachable: {0}")]
    ProcessorUnreachable(String),

    /// The processor did not answer within the configured bound.
    #[error("payment processor timed out after {0:?}")]
    Timeout(Duration),
}

/// The primary error type used across all Podium crates.
#[derive(Debug, Error)]
pub enum PodiumError {
    /// Configuration errors (invalid TOML, missing secrets, bad catalog).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, constraint).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A debit was refused because the balance does not cover it.
    #[error("insufficient balance: need {required} tokens, have {available}")]
    InsufficientBalance { required: u64, available: u64 },

    /// A payment session could not be verified.
    #[error("payment verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// A debit went through but neither the grant nor its rollback did.
    #[error(
        "consistency fault for user {user_id} on {content_id} \
         (debit {debit_transaction_id}): {detail}"
    )]
    ConsistencyFault {
        user_id: String,
        content_id: String,
        debit_transaction_id: String,
        detail: String,
    },

    /// A catalog entry (content, package, membership plan) does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Ledger amounts must be positive.
    #[error("invalid amount: {0} (must be a positive integer)")]
    InvalidAmount(u64),

    /// Checkout creation or other processor call failed.
    #[error("payment processor error: {message}")]
    PaymentProcessor {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PodiumError {
    /// Whether a caller may retry the same call (with backoff).
    ///
    /// Insufficient balance is never retried automatically, and a
    /// consistency fault must not be retried blindly. A session that failed
    /// or belongs to someone else stays that way, so only transient
    /// verification outcomes qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PodiumError::Verification(
                VerificationError::NotPaid
                    | VerificationError::SessionNotFound
                    | VerificationError::ProcessorUnreachable(_)
                    | VerificationError::Timeout(_)
            ) | PodiumError::Timeout { .. }
                | PodiumError::Storage { .. }
        )
    }

    /// The message shown to an end user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PodiumError::InsufficientBalance {
                required,
                available,
            } => {
                let missing = required.saturating_sub(*available);
                format!("You need {missing} more tokens. Buy more tokens to continue.")
            }
            PodiumError::Verification(VerificationError::NotPaid) => {
                "We have not received your payment yet. Try again in a moment.".to_string()
            }
            PodiumError::Verification(_) => {
                "We could not verify your payment. Try again or check your payment.".to_string()
            }
            PodiumError::NotFound { kind, .. } => format!("That {kind} is not available."),
            _ => "Something went wrong. Please contact support.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_reports_shortfall() {
        let err = PodiumError::InsufficientBalance {
            required: 20,
            available: 5,
        };
        assert!(err.user_message().contains("15 more tokens"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn verification_errors_are_retryable_and_distinct() {
        let err: PodiumError = VerificationError::NotPaid.into();
        assert!(err.is_retryable());
        assert!(err.user_message().contains("Try again"));
        assert!(!err.user_message().contains("Buy more"));
    }

    #[test]
    fn terminal_verification_outcomes_are_not_retryable() {
        for terminal in [VerificationError::WrongUser, VerificationError::SessionFailed] {
            assert!(!PodiumError::from(terminal).is_retryable());
        }
        for transient in [
            VerificationError::SessionNotFound,
            VerificationError::ProcessorUnreachable("down".into()),
            VerificationError::Timeout(Duration::from_secs(10)),
        ] {
            assert!(PodiumError::from(transient).is_retryable());
        }
    }

    #[test]
    fn consistency_fault_asks_for_support() {
        let err = PodiumError::ConsistencyFault {
            user_id: "u1".into(),
            content_id: "c1".into(),
            debit_transaction_id: "t1".into(),
            detail: "grant failed".into(),
        };
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("contact support"));
        assert!(err.to_string().contains("t1"));
    }
}
