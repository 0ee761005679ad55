// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive reward
//! amounts, unique catalog ids, a usable payment endpoint.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::PodiumConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation rather than failing fast.
pub fn validate_config(config: &PodiumConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    let rewards = &config.rewards;
    for (key, amount) in [
        ("watch", rewards.watch),
        ("like", rewards.like),
        ("referral", rewards.referral),
        ("daily_login", rewards.daily_login),
        ("check_in", rewards.check_in),
        ("safety_report", rewards.safety_report),
    ] {
        if amount == 0 {
            invalid(format!("rewards.{key} must be a positive token amount"));
        }
    }

    let payments = &config.payments;
    if !(payments.base_url.starts_with("http://") || payments.base_url.starts_with("https://")) {
        invalid(format!(
            "payments.base_url `{}` must be an http(s) URL",
            payments.base_url
        ));
    }
    if payments.verify_timeout_secs == 0 {
        invalid("payments.verify_timeout_secs must be at least 1".to_string());
    }

    let mut package_ids = HashSet::new();
    for (i, package) in config.packages.iter().enumerate() {
        if package.id.trim().is_empty() {
            invalid(format!("packages[{i}].id must not be empty"));
        } else if !package_ids.insert(package.id.as_str()) {
            invalid(format!("duplicate package id `{}` in [[packages]]", package.id));
        }
        if package.tokens == 0 {
            invalid(format!("packages[{i}].tokens must be positive"));
        }
    }

    let mut content_ids = HashSet::new();
    for (i, content) in config.content.iter().enumerate() {
        if content.id.trim().is_empty() {
            invalid(format!("content[{i}].id must not be empty"));
        } else if !content_ids.insert(content.id.as_str()) {
            invalid(format!("duplicate content id `{}` in [[content]]", content.id));
        }
    }

    let mut coaches = HashSet::new();
    for (i, plan) in config.memberships.iter().enumerate() {
        if !coaches.insert(plan.coach_id.as_str()) {
            invalid(format!(
                "duplicate membership plan for coach `{}` in [[memberships]]",
                plan.coach_id
            ));
        }
        if plan.cost == 0 {
            invalid(format!("memberships[{i}].cost must be positive"));
        }
        if plan.duration_days == 0 {
            invalid(format!("memberships[{i}].duration_days must be at least 1"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentConfig, PackageConfig};
    use podium_core::ContentKind;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&PodiumConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = PodiumConfig::default();
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn zero_reward_fails_validation() {
        let mut config = PodiumConfig::default();
        config.rewards.like = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "rewards.like"));
    }

    #[test]
    fn duplicate_package_ids_fail_validation() {
        let mut config = PodiumConfig::default();
        config.packages.push(PackageConfig {
            id: "pro".to_string(),
            tokens: 10,
            bonus_tokens: 0,
            price_cents: 1,
            label: String::new(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate package id `pro`"));
    }

    #[test]
    fn duplicate_content_ids_fail_validation() {
        let mut config = PodiumConfig::default();
        let item = ContentConfig {
            id: "vid-1".to_string(),
            kind: ContentKind::Video,
            cost: 20,
            coach_id: None,
        };
        config.content = vec![item.clone(), item];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate content id"));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = PodiumConfig::default();
        config.payments.base_url = "ftp://example".to_string();
        config.payments.verify_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
