// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns payment-processor confirmations into ledger credits, exactly once.
//!
//! Verification of one session id is serialized. A confirmed session is
//! answered from local state without contacting the processor or crediting
//! again; a pending one is checked with the processor under a timeout and,
//! when paid, credited together with its transition to `confirmed` in one
//! SQLite transaction.

use std::sync::Arc;
use std::time::Duration;

use podium_config::model::PaymentConfig;
use podium_core::types::now_timestamp;
use podium_core::{
    Catalog, CheckoutSession, PaymentProcessor, PaymentSession, PaymentStatus, PodiumError,
    ProcessorVerdict, TransactionKind, VerificationError,
};
use podium_storage::Database;
use podium_storage::queries::payments;
use serde::Serialize;
use tracing::{info, warn};

use crate::ledger::LedgerStore;
use crate::locks::KeyedLocks;

/// Reason recorded on a package credit.
pub const PURCHASE_REASON: &str = "purchased";

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCredit {
    pub tokens_credited: u64,
    pub new_balance: u64,
    /// The credit transaction recorded for the session.
    pub transaction_id: Option<String>,
    /// True when the session had already been credited by an earlier call.
    pub replayed: bool,
}

pub struct PaymentReconciler {
    ledger: Arc<LedgerStore>,
    db: Database,
    processor: Option<Arc<dyn PaymentProcessor>>,
    catalog: Arc<dyn Catalog>,
    locks: KeyedLocks,
    verify_timeout: Duration,
}

impl PaymentReconciler {
    pub fn new(
        ledger: Arc<LedgerStore>,
        catalog: Arc<dyn Catalog>,
        processor: Option<Arc<dyn PaymentProcessor>>,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            db: ledger.database().clone(),
            ledger,
            processor,
            catalog,
            locks: KeyedLocks::new(),
            verify_timeout,
        }
    }

    pub fn from_config(
        ledger: Arc<LedgerStore>,
        catalog: Arc<dyn Catalog>,
        processor: Option<Arc<dyn PaymentProcessor>>,
        config: &PaymentConfig,
    ) -> Self {
        Self::new(
            ledger,
            catalog,
            processor,
            Duration::from_secs(config.verify_timeout_secs),
        )
    }

    fn processor(&self) -> Result<&Arc<dyn PaymentProcessor>, PodiumError> {
        self.processor
            .as_ref()
            .ok_or_else(|| PodiumError::Config("no payment processor configured".to_string()))
    }

    /// Open a checkout for `package_id` and track it as a pending session.
    pub async fn begin_checkout(
        &self,
        user_id: &str,
        package_id: &str,
    ) -> Result<CheckoutSession, PodiumError> {
        let package = self
            .catalog
            .package(package_id)
            .await?
            .ok_or_else(|| PodiumError::NotFound {
                kind: "package",
                id: package_id.to_string(),
            })?;
        let checkout = self.processor()?.create_checkout(&package, user_id).await?;
        let now = now_timestamp();
        let session = PaymentSession {
            session_id: checkout.session_id.clone(),
            user_id: user_id.to_string(),
            package_id: package.id.clone(),
            tokens_to_credit: package.total_tokens(),
            status: PaymentStatus::Pending,
            credit_transaction_id: None,
            created_at: now.clone(),
            updated_at: now,
        };
        payments::insert_session(&self.db, &session).await?;
        info!(
            user_id,
            package_id,
            session_id = %session.session_id,
            tokens = session.tokens_to_credit,
            "checkout started"
        );
        Ok(checkout)
    }

    /// Verify `session_id` with the processor and credit it once.
    pub async fn verify_and_credit(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> Result<PaymentCredit, PodiumError> {
        let _guard = self.locks.lock(session_id).await;

        let session = payments::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| reject(session_id, VerificationError::SessionNotFound))?;
        if session.user_id != user_id {
            return Err(reject(session_id, VerificationError::WrongUser));
        }
        match session.status {
            PaymentStatus::Confirmed => {
                let balance = self.ledger.get_balance(user_id).await?;
                info!(user_id, session_id, "payment already credited, replay");
                return Ok(PaymentCredit {
                    tokens_credited: session.tokens_to_credit,
                    new_balance: balance.balance,
                    transaction_id: session.credit_transaction_id,
                    replayed: true,
                });
            }
            PaymentStatus::Failed => return Err(reject(session_id, VerificationError::SessionFailed)),
            PaymentStatus::Pending => {}
        }

        let processor = self.processor()?;
        let verdict = match tokio::time::timeout(
            self.verify_timeout,
            processor.verify_session(session_id),
        )
        .await
        {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(PodiumError::Verification(e))) => return Err(reject(session_id, e)),
            Ok(Err(e)) => {
                return Err(reject(
                    session_id,
                    VerificationError::ProcessorUnreachable(e.to_string()),
                ));
            }
            Err(_) => {
                return Err(reject(
                    session_id,
                    VerificationError::Timeout(self.verify_timeout),
                ));
            }
        };

        match verdict {
            ProcessorVerdict::Paid => {}
            ProcessorVerdict::Unpaid => return Err(reject(session_id, VerificationError::NotPaid)),
            ProcessorVerdict::NotFound => {
                return Err(reject(session_id, VerificationError::SessionNotFound));
            }
            ProcessorVerdict::Expired => {
                payments::mark_failed(&self.db, session_id).await?;
                return Err(reject(session_id, VerificationError::SessionFailed));
            }
        }

        let sid = session_id.to_string();
        let posting = self
            .ledger
            .credit_with(
                user_id,
                session.tokens_to_credit,
                TransactionKind::Purchased,
                PURCHASE_REASON,
                move |tx, credit| payments::confirm_in_tx(tx, &sid, &credit.id),
            )
            .await?;
        info!(
            user_id,
            session_id,
            package_id = %session.package_id,
            tokens = session.tokens_to_credit,
            "payment credited"
        );
        Ok(PaymentCredit {
            tokens_credited: session.tokens_to_credit,
            new_balance: posting.balance.balance,
            transaction_id: Some(posting.transaction.id),
            replayed: false,
        })
    }
}

fn reject(session_id: &str, error: VerificationError) -> PodiumError {
    warn!(session_id, %error, "payment verification failed");
    PodiumError::Verification(error)
}
