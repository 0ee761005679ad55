// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Podium token ledger.
//!
//! This crate provides the shared types, the error taxonomy, and the adapter
//! traits through which the ledger reaches its external collaborators
//! (payment processor, catalog). It has no storage or runtime dependencies.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{PodiumError, VerificationError};
pub use types::{
    AccountBalance, AdapterType, Capability, CheckoutSession, ContentKind, Decision, Entitlement,
    HealthStatus, Identity, Membership, MembershipPlan, PaymentSession, PaymentStatus,
    PremiumContent, ProcessorVerdict, RewardEvent, TokenPackage, Transaction, TransactionKind,
};

pub use traits::{Catalog, PaymentProcessor, PluginAdapter};
