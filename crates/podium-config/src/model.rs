// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Podium token ledger.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use podium_core::ContentKind;
use serde::{Deserialize, Serialize};

/// Top-level Podium configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PodiumConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ledger policy settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Reward schedule for engagement events.
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Payment processor settings.
    #[serde(default)]
    pub payments: PaymentConfig,

    /// Token package catalog.
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageConfig>,

    /// Priced premium content.
    #[serde(default)]
    pub content: Vec<ContentConfig>,

    /// Coach membership plans.
    #[serde(default)]
    pub memberships: Vec<MembershipPlanConfig>,
}

impl Default for PodiumConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            storage: StorageConfig::default(),
            ledger: LedgerConfig::default(),
            rewards: RewardConfig::default(),
            payments: PaymentConfig::default(),
            packages: default_packages(),
            content: Vec::new(),
            memberships: Vec::new(),
        }
    }
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "podium".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("podium").join("podium.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("podium.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Tokens granted to every account on creation.
pub const DEFAULT_WELCOME_BONUS: u64 = 100;

/// Ledger policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Signup bonus credited once, when an account is first created.
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            welcome_bonus: default_welcome_bonus(),
        }
    }
}

fn default_welcome_bonus() -> u64 {
    DEFAULT_WELCOME_BONUS
}

/// How the once-per-day login reward window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginWindow {
    /// The 24 hours preceding the claim.
    Rolling,
    /// The current UTC calendar day.
    Calendar,
}

/// Fixed token amounts per engagement event.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RewardConfig {
    #[serde(default = "default_watch_reward")]
    pub watch: u64,

    #[serde(default = "default_like_reward")]
    pub like: u64,

    #[serde(default = "default_referral_reward")]
    pub referral: u64,

    #[serde(default = "default_daily_login_reward")]
    pub daily_login: u64,

    #[serde(default = "default_check_in_reward")]
    pub check_in: u64,

    #[serde(default = "default_safety_report_reward")]
    pub safety_report: u64,

    /// Window used to limit the daily login reward to one claim.
    #[serde(default = "default_login_window")]
    pub daily_login_window: LoginWindow,

    /// Make per-content rewards (watch, like) one-time per user and content.
    #[serde(default)]
    pub dedupe_content_rewards: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            watch: default_watch_reward(),
            like: default_like_reward(),
            referral: default_referral_reward(),
            daily_login: default_daily_login_reward(),
            check_in: default_check_in_reward(),
            safety_report: default_safety_report_reward(),
            daily_login_window: default_login_window(),
            dedupe_content_rewards: false,
        }
    }
}

fn default_watch_reward() -> u64 {
    5
}

fn default_like_reward() -> u64 {
    1
}

fn default_referral_reward() -> u64 {
    50
}

fn default_daily_login_reward() -> u64 {
    10
}

fn default_check_in_reward() -> u64 {
    5
}

fn default_safety_report_reward() -> u64 {
    20
}

fn default_login_window() -> LoginWindow {
    LoginWindow::Rolling
}

/// Payment processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Base URL of the processor API.
    #[serde(default = "default_payments_base_url")]
    pub base_url: String,

    /// Processor secret key. `None` disables checkout and verification.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upper bound on a single verification call.
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,

    /// Where the processor sends the user after paying.
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Where the processor sends the user after abandoning checkout.
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    /// Retries for transient processor errors (429, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            base_url: default_payments_base_url(),
            api_key: None,
            verify_timeout_secs: default_verify_timeout_secs(),
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_payments_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_verify_timeout_secs() -> u64 {
    10
}

fn default_success_url() -> String {
    "https://podium.app/tokens/success?session_id={CHECKOUT_SESSION_ID}".to_string()
}

fn default_cancel_url() -> String {
    "https://podium.app/tokens".to_string()
}

fn default_max_retries() -> u32 {
    1
}

/// One `[[packages]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    pub id: String,
    pub tokens: u64,
    #[serde(default)]
    pub bonus_tokens: u64,
    pub price_cents: u64,
    #[serde(default)]
    pub label: String,
}

fn default_packages() -> Vec<PackageConfig> {
    let package = |id: &str, tokens, bonus_tokens, price_cents, label: &str| PackageConfig {
        id: id.to_string(),
        tokens,
        bonus_tokens,
        price_cents,
        label: label.to_string(),
    };
    vec![
        package("starter", 100, 0, 99, "Starter"),
        package("pro", 500, 75, 499, "Pro"),
        package("elite", 1200, 250, 999, "Elite"),
        package("champion", 2500, 750, 1999, "Champion"),
    ]
}

/// One `[[content]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    pub id: String,
    pub kind: ContentKind,
    /// Token price; zero marks the content free.
    #[serde(default)]
    pub cost: u64,
    #[serde(default)]
    pub coach_id: Option<String>,
}

/// One `[[memberships]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MembershipPlanConfig {
    pub coach_id: String,
    pub cost: u64,
    #[serde(default = "default_membership_days")]
    pub duration_days: u32,
}

fn default_membership_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PodiumConfig::default();
        assert_eq!(config.ledger.welcome_bonus, 100);
        assert_eq!(config.rewards.daily_login_window, LoginWindow::Rolling);
        assert!(!config.rewards.dedupe_content_rewards);
        assert_eq!(config.payments.verify_timeout_secs, 10);
        assert_eq!(config.packages.len(), 4);
        let pro = config.packages.iter().find(|p| p.id == "pro").unwrap();
        assert_eq!(pro.tokens + pro.bonus_tokens, 575);
    }

    #[test]
    fn content_section_parses_kind() {
        let toml_str = r#"
[[content]]
id = "vid-1"
kind = "livestream"
cost = 20
coach_id = "coach-7"
"#;
        let config: PodiumConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.content[0].kind, ContentKind::Livestream);
        assert_eq!(config.content[0].coach_id.as_deref(), Some("coach-7"));
        // Packages fall back to the built-in catalog.
        assert_eq!(config.packages.len(), 4);
    }

    #[test]
    fn membership_duration_defaults_to_thirty_days() {
        let toml_str = r#"
[[memberships]]
coach_id = "coach-7"
cost = 150
"#;
        let config: PodiumConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.memberships[0].duration_days, 30);
    }
}
