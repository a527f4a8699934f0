// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./telefetch.toml` > `~/.config/telefetch/telefetch.toml` >
//! `/etc/telefetch/telefetch.toml` with environment variable overrides via `TELEFETCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TelefetchConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/telefetch/telefetch.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "telefetch.toml";

/// Path of the per-user config file, if a config directory is known.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("telefetch/telefetch.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/telefetch/telefetch.toml` (system-wide)
/// 3. `~/.config/telefetch/telefetch.toml` (user XDG config)
/// 4. `./telefetch.toml` (local directory)
/// 5. `TELEFETCH_*` environment variables
pub fn load_config() -> Result<TelefetchConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TelefetchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TelefetchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TelefetchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TelefetchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TelefetchConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TELEFETCH_AUTOMATION_DOWNLOAD_LIMIT` must map to
/// `automation.download_limit`, not `automation.download.limit`. Keys reach
/// the closure in their original case, so they are lowercased first.
fn env_provider() -> Env {
    Env::prefixed("TELEFETCH_").map(|key| env_key_to_path(key.as_str()).into())
}

const SECTIONS: [&str; 4] = ["automation", "transfer", "speed", "logging"];

/// Map a prefix-stripped env key onto a dotted config path.
///
/// Only the leading section name is rewritten.
pub(crate) fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    match key.split_once('_') {
        Some((section, field)) if SECTIONS.contains(&section) => format!("{section}.{field}"),
        _ => key,
    }
}
