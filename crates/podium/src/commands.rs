// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations. Each returns the JSON document to print.

use clap::{Subcommand, ValueEnum};
use podium_core::{Capability, Identity, PodiumError, RewardEvent};
use podium_ledger::TokenEngine;
use podium_storage::models::PendingUnlock;
use serde_json::{Value, json};

/// Reviewer roles that can be asserted for access checks.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Role {
    Moderator,
    Administrator,
}

impl From<Role> for Capability {
    fn from(role: Role) -> Self {
        match role {
            Role::Moderator => Capability::Moderator,
            Role::Administrator => Capability::Administrator,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a user's balance (creating the account on first use).
    Balance {
        #[arg(long)]
        user: String,
    },
    /// List a user's transactions, newest first.
    History {
        #[arg(long)]
        user: String,
        #[arg(long)]
        limit: Option<usize>,
        /// Only entries older than this sequence number.
        #[arg(long)]
        before: Option<i64>,
    },
    /// Decide whether a user may open a content item.
    Access {
        #[arg(long)]
        user: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_enum)]
        role: Option<Role>,
    },
    /// Unlock a content item with tokens.
    Unlock {
        #[arg(long)]
        user: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_enum)]
        role: Option<Role>,
    },
    /// Buy a coach membership.
    Membership {
        #[arg(long)]
        user: String,
        #[arg(long)]
        coach: String,
    },
    /// List token packages.
    Packages,
    /// Start a checkout for a token package.
    Checkout {
        #[arg(long)]
        user: String,
        #[arg(long)]
        package: String,
    },
    /// Verify a checkout session and credit its tokens.
    Verify {
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: String,
    },
    /// Credit an engagement reward.
    Award {
        #[arg(long)]
        user: String,
        /// watch, like, referral, daily_login, check_in, safety_report
        #[arg(long, value_parser = parse_event)]
        event: RewardEvent,
        /// Content the event relates to.
        #[arg(long)]
        content: Option<String>,
    },
    /// Compare a user's cached balance with the transaction log.
    Audit {
        #[arg(long)]
        user: String,
    },
    /// Content a user has unlocked.
    Library {
        #[arg(long)]
        user: String,
    },
    /// Checkout sessions a user has opened.
    Sessions {
        #[arg(long)]
        user: String,
    },
    /// Unlock debits across all users still awaiting a grant or refund.
    StrandedUnlocks,
}

fn parse_event(s: &str) -> Result<RewardEvent, String> {
    s.parse()
        .map_err(|_| format!("unknown reward event `{s}`"))
}

fn identity(user: &str, role: Option<Role>) -> Identity {
    let identity = Identity::user(user);
    match role {
        Some(role) => identity.with_capability(role.into()),
        None => identity,
    }
}

fn markers_json(markers: &[PendingUnlock]) -> Value {
    markers
        .iter()
        .map(|m| {
            json!({
                "user_id": m.user_id,
                "content_id": m.content_id,
                "debit_transaction_id": m.debit_transaction_id,
                "amount": m.amount,
                "created_at": m.created_at,
            })
        })
        .collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, PodiumError> {
    serde_json::to_value(value).map_err(|e| PodiumError::Internal(format!("serialization failed: {e}")))
}

pub async fn run(engine: &TokenEngine, command: Commands) -> Result<Value, PodiumError> {
    match command {
        Commands::Balance { user } => to_json(&engine.get_balance(&user).await?),
        Commands::History {
            user,
            limit,
            before,
        } => {
            let entries = match before {
                Some(seq) => engine.history_before(&user, seq, limit).await?,
                None => engine.history(&user, limit).await?,
            };
            to_json(&entries)
        }
        Commands::Access {
            user,
            content,
            role,
        } => to_json(&engine.can_access(&identity(&user, role), &content).await?),
        Commands::Unlock {
            user,
            content,
            role,
        } => to_json(&engine.unlock(&identity(&user, role), &content).await?),
        Commands::Membership { user, coach } => {
            to_json(&engine.purchase_membership(&Identity::user(&user), &coach).await?)
        }
        Commands::Packages => to_json(&engine.packages().await?),
        Commands::Checkout { user, package } => {
            to_json(&engine.begin_checkout(&user, &package).await?)
        }
        Commands::Verify { user, session } => to_json(&engine.verify_payment(&session, &user).await?),
        Commands::Award {
            user,
            event,
            content,
        } => {
            let awarded = match content {
                Some(content_id) => engine.award_for_content(&user, event, &content_id).await?,
                None => engine.award_event(&user, event).await?,
            };
            let balance = engine.get_balance(&user).await?;
            Ok(json!({
                "awarded": awarded.is_some(),
                "transaction": to_json(&awarded)?,
                "balance": balance.balance,
            }))
        }
        Commands::Audit { user } => {
            let report = engine.audit(&user).await?;
            Ok(json!({
                "consistent": report.is_consistent(),
                "needs_attention": report.needs_attention(),
                "cached": to_json(&report.cached)?,
                "folded": to_json(&report.folded)?,
                "transactions": report.transaction_count,
                "stranded_unlocks": markers_json(&report.stranded_unlocks),
            }))
        }
        Commands::Library { user } => to_json(&engine.entitlements(&user).await?),
        Commands::Sessions { user } => to_json(&engine.payment_sessions(&user).await?),
        Commands::StrandedUnlocks => Ok(markers_json(&engine.stranded_unlocks().await?)),
    }
}

/// Process exit status for a failed command.
pub fn exit_code(error: &PodiumError) -> i32 {
    match error {
        PodiumError::InsufficientBalance { .. } => 2,
        PodiumError::Verification(_) => 3,
        PodiumError::ConsistencyFault { .. } => 4,
        _ => 1,
    }
}

/// JSON body printed for a failed command.
pub fn error_json(error: &PodiumError) -> Value {
    json!({
        "error": error.to_string(),
        "message": error.user_message(),
        "retryable": error.is_retryable(),
    })
}
