// SPDX-FileCopyrightText: 2026 Podium Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./podium.toml` > `~/.config/podium/podium.toml` > `/etc/podium/podium.toml`
//! with environment variable overrides via `PODIUM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PodiumConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/podium/podium.toml";

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "podium.toml";

/// User-level config file under the XDG config directory.
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("podium").join(LOCAL_CONFIG_FILE))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/podium/podium.toml` (system-wide)
/// 3. `~/.config/podium/podium.toml` (user XDG config)
/// 4. `./podium.toml` (local directory)
/// 5. `PODIUM_*` environment variables
pub fn load_config() -> Result<PodiumConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PodiumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PodiumConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PodiumConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PodiumConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PodiumConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `PODIUM_PAYMENTS_API_KEY` must become `payments.api_key`,
/// not `payments.api.key`.
fn env_provider() -> Env {
    Env::prefixed("PODIUM_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("app_", "app.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("ledger_", "ledger.", 1)
            .replacen("rewards_", "rewards.", 1)
            .replacen("payments_", "payments.", 1);
        mapped.into()
    })
}
