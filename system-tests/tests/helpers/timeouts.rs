// system-tests/tests/helpers/timeouts.rs
// ============================================================================
// Module: System Test Timeouts
// Description: Centralized timeout configuration with env overrides.
// Purpose: Keep system-test deadlines consistent and configurable across suites.
// ============================================================================

use std::time::Duration;

use system_tests::config::SystemTestConfig;
use system_tests::config::SystemTestEnv;

/// Returns the effective timeout, honoring the system-test timeout override.
/// The override acts as a minimum so slow hosts never shorten a deadline.
#[must_use]
pub fn resolve_timeout(requested: Duration) -> Duration {
    match SystemTestConfig::load() {
        Ok(config) => config.timeout.map_or(requested, |floor| requested.max(floor)),
        Err(err) => panic!("{}: {err}", SystemTestEnv::TimeoutSeconds.as_str()),
    }
}

/// Returns `requested` as whole milliseconds after applying the override.
#[must_use]
pub fn resolve_timeout_ms(requested: Duration) -> u64 {
    u64::try_from(resolve_timeout(requested).as_millis()).unwrap_or(u64::MAX)
}
