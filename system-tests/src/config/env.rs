// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed knobs for MCP conformance system tests.
// Purpose: Select run roots, deadlines, and live-backend behavior.
// Dependencies: mcp-conformance-config
// ============================================================================

//! ## Overview
//! System-test knobs are read with strict UTF-8 enforcement through
//! [`mcp_conformance_config::read_env_strict`]. Empty or malformed values fail
//! closed instead of silently falling back to defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use mcp_conformance_config::read_env_strict;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional run root override.
    RunRoot,
    /// Optional deadline floor in seconds (positive integer).
    TimeoutSeconds,
    /// Model used by the live inference suite.
    LiveModel,
    /// Fail instead of skipping when the live backend is absent (`1`/`0`).
    RequireLive,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "MCP_CONFORMANCE_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "MCP_CONFORMANCE_SYSTEM_TEST_TIMEOUT_SEC",
            Self::LiveModel => "MCP_CONFORMANCE_SYSTEM_TEST_MODEL",
            Self::RequireLive => "MCP_CONFORMANCE_SYSTEM_TEST_REQUIRE_LIVE",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Optional run root override.
    pub run_root: Option<PathBuf>,
    /// Optional deadline floor.
    pub timeout: Option<Duration>,
    /// Live suite model override.
    pub live_model: Option<String>,
    /// Missing live backend is a failure rather than a skip.
    pub require_live: bool,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is not valid UTF-8, is empty, or fails
    /// validation.
    pub fn load() -> Result<Self, String> {
        let run_root = read_nonempty(SystemTestEnv::RunRoot)?.map(PathBuf::from);
        let timeout = read_nonempty(SystemTestEnv::TimeoutSeconds)?
            .map(|value| parse_timeout_seconds(SystemTestEnv::TimeoutSeconds, &value))
            .transpose()?;
        let live_model = read_nonempty(SystemTestEnv::LiveModel)?;
        let require_live =
            parse_flag(SystemTestEnv::RequireLive, read_nonempty(SystemTestEnv::RequireLive)?)?;
        Ok(Self {
            run_root,
            timeout,
            live_model,
            require_live,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a variable and rejects empty values.
fn read_nonempty(env: SystemTestEnv) -> Result<Option<String>, String> {
    let name = env.as_str();
    match read_env_strict(name).map_err(|err| err.to_string())? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        other => Ok(other),
    }
}

/// Parses a positive number of seconds.
fn parse_timeout_seconds(env: SystemTestEnv, raw: &str) -> Result<Duration, String> {
    let name = env.as_str();
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(format!("{name} must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(format!("{name} must be a positive integer number of seconds")),
    }
}

/// Parses `1`/`0`/`true`/`false`; absent means false.
fn parse_flag(env: SystemTestEnv, raw: Option<String>) -> Result<bool, String> {
    let Some(value) = raw else {
        return Ok(false);
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(true);
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(false);
    }
    Err(format!("{} must be 1, 0, true, or false", env.as_str()))
}
