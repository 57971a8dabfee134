// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment-variable configuration.
//!
//! Every other crate takes a `Config` by reference or by clone; none of them
//! read `std::env` directly. Construction never panics — missing or
//! unparseable values fall back to the documented defaults and are logged,
//! not fatal. Only [`Config::validate`] turns a missing hard requirement
//! into an error, and only the CLI decides what to do with that error.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_PORT: u16 = 6969;
const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLAUDE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 300;
const DEFAULT_TASK_CHECK_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key found; set HEADLESS_PM_API_KEY, API_KEY_HEADLESS_PM, or API_KEY")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service_port: u16,
    pub base_url: String,
    pub api_key: Option<String>,
    pub no_autostart: bool,
    pub command_override: Option<String>,
    pub spawn_dir: Option<PathBuf>,
    pub from_mcp: bool,
    pub hook_timeout_secs: u64,
    pub claude_timeout_secs: u64,
    pub health_check_interval_secs: u64,
    pub task_check_interval_secs: u64,
}

impl Config {
    /// Build from the real process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary lookup function — the seam tests use to avoid
    /// mutating real process environment variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let service_port = lookup("SERVICE_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let base_url = lookup("HEADLESS_PM_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("http://127.0.0.1:{service_port}"));

        // First non-empty of the three API key variables wins.
        let api_key = lookup("HEADLESS_PM_API_KEY")
            .filter(|v| !v.is_empty())
            .or_else(|| lookup("API_KEY_HEADLESS_PM").filter(|v| !v.is_empty()))
            .or_else(|| lookup("API_KEY").filter(|v| !v.is_empty()));

        let no_autostart = lookup("HEADLESS_PM_NO_AUTOSTART")
            .map(|v| !v.is_empty())
            .unwrap_or(false);

        let command_override = lookup("HEADLESS_PM_COMMAND").filter(|v| !v.is_empty());
        let spawn_dir = lookup("HEADLESS_PM_DIR").filter(|v| !v.is_empty()).map(PathBuf::from);
        let from_mcp = lookup("HEADLESS_PM_FROM_MCP").map(|v| !v.is_empty()).unwrap_or(false);

        let hook_timeout_secs = parse_or_default(
            lookup("HEADLESS_PM_HOOK_TIMEOUT"),
            DEFAULT_HOOK_TIMEOUT_SECS,
        );
        let claude_timeout_secs = parse_or_default(
            lookup("HEADLESS_PM_CLAUDE_TIMEOUT"),
            DEFAULT_CLAUDE_TIMEOUT_SECS,
        );
        let health_check_interval_secs = parse_or_default(
            lookup("HEADLESS_PM_HEALTH_CHECK_INTERVAL"),
            DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
        );
        let task_check_interval_secs = parse_or_default(
            lookup("HEADLESS_PM_TASK_CHECK_INTERVAL"),
            DEFAULT_TASK_CHECK_INTERVAL_SECS,
        );

        Self {
            service_port,
            base_url,
            api_key,
            no_autostart,
            command_override,
            spawn_dir,
            from_mcp,
            hook_timeout_secs,
            claude_timeout_secs,
            health_check_interval_secs,
            task_check_interval_secs,
        }
    }

    /// Hard requirements for actually talking to the PM service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    /// `<system-temp>/headless_pm_mcp_clients_<port>.json`.
    pub fn registry_path(&self) -> PathBuf {
        registry_path_for_port(self.service_port)
    }

    /// `<user-home>/.headless-pm/locks`.
    pub fn lease_dir(&self) -> PathBuf {
        lease_dir()
    }
}

pub fn registry_path_for_port(port: u16) -> PathBuf {
    env::temp_dir().join(format!("headless_pm_mcp_clients_{port}.json"))
}

pub fn lease_dir() -> PathBuf {
    let home = dirs_home();
    home.join(".headless-pm").join("locks")
}

fn dirs_home() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_or_default(raw: Option<String>, default: u64) -> u64 {
    match raw {
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %v, "failed to parse timing env var, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
