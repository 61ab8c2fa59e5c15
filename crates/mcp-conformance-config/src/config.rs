// crates/mcp-conformance-config/src/config.rs
// ============================================================================
// Module: Conformance Configuration
// Description: Typed model for mcp-conformance.toml.
// Purpose: Load, override, and validate harness settings fail-closed.
// Dependencies: serde, serde_json, toml
// ============================================================================

//! ## Overview
//! [`ConformanceConfig`] is parsed from TOML, then environment overrides are
//! applied (see [`crate::env::ConformanceEnv`]), then the whole structure is
//! validated. Every section has defaults that reproduce the reference run:
//! `ollama serve` on `127.0.0.1:11434` with `llama3.2:3b`, the bundled
//! greeter as the tool server, and all six scenarios enabled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::env::ConformanceEnv;
use crate::env::parse_timeout_seconds;
use crate::env::read_env_nonempty;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "mcp-conformance.toml";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default inference model.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
/// Only transport the harness can open a tool session over.
pub const SESSION_TRANSPORT: &str = "stdio";
/// Default success marker emitted by the reference tool server.
pub const DEFAULT_SUCCESS_MARKER: &str = "TEST_MARKER_SUCCESS";
/// Default user prompt for the round-trip scenario.
pub const DEFAULT_ROUND_TRIP_PROMPT: &str = "I want to say hello to someone named \"MCPUser\". \
     Please use the available tools to do this. Respond only with the JSON payload.";

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceConfig {
    /// Inference backend settings.
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Tool server settings.
    #[serde(default)]
    pub tool_server: ToolServerConfig,
    /// Manifest under test.
    #[serde(default)]
    pub manifest: ManifestConfig,
    /// Scenario selection and fixtures.
    #[serde(default)]
    pub scenarios: ScenarioConfig,
    /// Structured event logging.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Diagnostic artifact output.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

impl ConformanceConfig {
    /// Loads configuration from an explicit path, `MCP_CONFORMANCE_CONFIG`, or
    /// `mcp-conformance.toml`, falling back to defaults when none exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// override is malformed, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on I/O, size, encoding, or TOML errors.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses TOML text without applying overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when an override is empty or malformed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(model) = read_env_nonempty(ConformanceEnv::Model)? {
            self.inference.model = model;
        }
        if let Some(raw) = read_env_nonempty(ConformanceEnv::TimeoutSeconds)? {
            let minimum = parse_timeout_seconds(ConformanceEnv::TimeoutSeconds.as_str(), &raw)?;
            self.raise_timeouts(minimum);
        }
        if let Some(root) = read_env_nonempty(ConformanceEnv::RunRoot)? {
            self.artifacts.root = Some(PathBuf::from(root));
        }
        Ok(())
    }

    /// Raises overall deadlines to at least `minimum`; never shortens them.
    pub fn raise_timeouts(&mut self, minimum: Duration) {
        let floor = u64::try_from(minimum.as_millis()).unwrap_or(u64::MAX);
        let inference = &mut self.inference;
        inference.readiness_timeout_ms = inference.readiness_timeout_ms.max(floor);
        inference.pull_timeout_ms = inference.pull_timeout_ms.max(floor);
        inference.chat_timeout_ms = inference.chat_timeout_ms.max(floor);
        let tools = &mut self.tool_server;
        tools.handshake_timeout_ms = tools.handshake_timeout_ms.max(floor);
        tools.request_timeout_ms = tools.request_timeout_ms.max(floor);
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.inference.validate()?;
        self.tool_server.validate()?;
        self.manifest.validate()?;
        self.scenarios.validate()?;
        self.logging.validate()?;
        self.validate_session_transport()
    }

    /// Session scenarios can only run when the manifest must declare stdio.
    fn validate_session_transport(&self) -> Result<(), ConfigError> {
        let session = self.scenarios.enabled.iter().find(|id| id.needs_tool_server());
        match session {
            Some(id) if self.manifest.expected_transport != SESSION_TRANSPORT => {
                Err(ConfigError::Invalid(format!(
                    "manifest.expected_transport must be `{SESSION_TRANSPORT}` when scenario `{}` \
                     is enabled (found `{}`)",
                    id.as_str(),
                    self.manifest.expected_transport
                )))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Inference Backend
// ============================================================================

/// Inference backend (Ollama) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// Backend executable name or path.
    pub program: String,
    /// Loopback host the backend binds.
    pub host: String,
    /// Port the backend binds.
    pub port: u16,
    /// Model name used for every chat call.
    pub model: String,
    /// Overall readiness deadline in milliseconds.
    pub readiness_timeout_ms: u64,
    /// Interval between readiness probes in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-probe HTTP timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Deadline for listing installed models in milliseconds.
    pub list_timeout_ms: u64,
    /// Deadline for pulling a missing model in milliseconds.
    pub pull_timeout_ms: u64,
    /// Per-call chat timeout in milliseconds.
    pub chat_timeout_ms: u64,
    /// Grace period between terminate and kill in milliseconds.
    pub shutdown_grace_ms: u64,
    /// Attach to an already-healthy backend instead of spawning one.
    pub reuse_running: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            program: "ollama".to_string(),
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: DEFAULT_MODEL.to_string(),
            readiness_timeout_ms: 30_000,
            poll_interval_ms: 500,
            probe_timeout_ms: 1_000,
            list_timeout_ms: 10_000,
            pull_timeout_ms: 300_000,
            chat_timeout_ms: 60_000,
            shutdown_grace_ms: 10_000,
            reuse_running: false,
        }
    }
}

impl InferenceConfig {
    /// Returns the backend base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Returns the overall readiness deadline.
    #[must_use]
    pub const fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    /// Returns the readiness poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the per-probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Returns the model listing deadline.
    #[must_use]
    pub const fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    /// Returns the model pull deadline.
    #[must_use]
    pub const fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }

    /// Returns the chat call timeout.
    #[must_use]
    pub const fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.chat_timeout_ms)
    }

    /// Returns the shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Validates inference settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonempty("inference.program", &self.program)?;
        require_nonempty("inference.host", &self.host)?;
        require_trimmed("inference.model", &self.model)?;
        if self.port == 0 {
            return Err(ConfigError::Invalid("inference.port must be non-zero".to_string()));
        }
        require_positive("inference.readiness_timeout_ms", self.readiness_timeout_ms)?;
        require_positive("inference.poll_interval_ms", self.poll_interval_ms)?;
        require_positive("inference.probe_timeout_ms", self.probe_timeout_ms)?;
        require_positive("inference.list_timeout_ms", self.list_timeout_ms)?;
        require_positive("inference.pull_timeout_ms", self.pull_timeout_ms)?;
        require_positive("inference.chat_timeout_ms", self.chat_timeout_ms)?;
        if self.poll_interval_ms > self.readiness_timeout_ms {
            return Err(ConfigError::Invalid(
                "inference.poll_interval_ms must not exceed inference.readiness_timeout_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tool Server
// ============================================================================

/// On-demand tool server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolServerConfig {
    /// Executable (interpreter or server binary) name or path.
    pub program: String,
    /// Optional script passed as the first argument; must exist.
    pub script: Option<PathBuf>,
    /// Additional arguments after the script.
    pub args: Vec<String>,
    /// Environment overlay for the spawned server.
    pub env: BTreeMap<String, String>,
    /// Module search path propagated to the spawned server.
    pub module_path: Option<PathBuf>,
    /// Environment variable receiving `module_path`.
    pub module_path_var: String,
    /// Capability handshake deadline in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Per-request deadline in milliseconds.
    pub request_timeout_ms: u64,
    /// Grace period after closing stdin before terminating, in milliseconds.
    pub close_grace_ms: u64,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            program: "mcp-conformance-greeter".to_string(),
            script: None,
            args: Vec::new(),
            env: BTreeMap::new(),
            module_path: None,
            module_path_var: "PYTHONPATH".to_string(),
            handshake_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            close_grace_ms: 2_000,
        }
    }
}

impl ToolServerConfig {
    /// Returns the handshake deadline.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Returns the per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the close grace period.
    #[must_use]
    pub const fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }

    /// Validates tool server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_nonempty("tool_server.program", &self.program)?;
        if let Some(script) = &self.script {
            require_path("tool_server.script", script)?;
        }
        if self.module_path.is_some() {
            require_nonempty("tool_server.module_path_var", &self.module_path_var)?;
        }
        for key in self.env.keys() {
            if key.is_empty() || key.contains('=') {
                return Err(ConfigError::Invalid(format!(
                    "tool_server.env key `{key}` must be non-empty and contain no `=`"
                )));
            }
        }
        require_positive("tool_server.handshake_timeout_ms", self.handshake_timeout_ms)?;
        require_positive("tool_server.request_timeout_ms", self.request_timeout_ms)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Manifest under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Manifest JSON path.
    pub path: PathBuf,
    /// Transport literal the manifest must declare.
    pub expected_transport: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fixtures/hello_service.proto.mcp.json"),
            expected_transport: SESSION_TRANSPORT.to_string(),
        }
    }
}

impl ManifestConfig {
    /// Validates manifest settings.
    fn validate(&self) -> Result<(), ConfigError> {
        require_path("manifest.path", &self.path)?;
        require_trimmed("manifest.expected_transport", &self.expected_transport)
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Scenario identifiers in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Required top-level manifest fields.
    ManifestStructure,
    /// Server transport declaration.
    ServerConfig,
    /// Tool entry completeness.
    ToolsStructure,
    /// Model comprehension of the manifest.
    Comprehension,
    /// Direct tool invocation against the live server.
    DirectInvocation,
    /// Model-driven tool call with result feedback.
    RoundTrip,
}

impl ScenarioId {
    /// All scenarios in execution order.
    pub const ALL: [Self; 6] = [
        Self::ManifestStructure,
        Self::ServerConfig,
        Self::ToolsStructure,
        Self::Comprehension,
        Self::DirectInvocation,
        Self::RoundTrip,
    ];

    /// Returns the stable scenario label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManifestStructure => "manifest_structure",
            Self::ServerConfig => "server_config",
            Self::ToolsStructure => "tools_structure",
            Self::Comprehension => "comprehension",
            Self::DirectInvocation => "direct_invocation",
            Self::RoundTrip => "round_trip",
        }
    }

    /// Returns true when the scenario needs the inference backend.
    #[must_use]
    pub const fn needs_inference(self) -> bool {
        matches!(self, Self::Comprehension | Self::RoundTrip)
    }

    /// Returns true when the scenario needs the tool server.
    #[must_use]
    pub const fn needs_tool_server(self) -> bool {
        matches!(self, Self::DirectInvocation | Self::RoundTrip)
    }
}

impl FromStr for ScenarioId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown scenario `{value}`")))
    }
}

/// Tool-call acceptance strategy for the round-trip scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallMatchMode {
    /// Strict equality with `expected_call`.
    #[default]
    Exact,
    /// Declared tool with schema-conforming arguments.
    Schema,
}

/// How inference failures affect the rest of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatFailurePolicy {
    /// Fail only the scenario that issued the call.
    #[default]
    Scenario,
    /// Fail the scenario and skip every remaining one.
    Fatal,
}

/// Tool call pinned by the exact matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedCall {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Scenario selection and fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Enabled scenarios; executed in canonical order.
    pub enabled: Vec<ScenarioId>,
    /// Tool exercised by the comprehension and direct scenarios.
    pub target_tool: String,
    /// Parameter name the comprehension scenario looks for.
    pub target_parameter: String,
    /// Arguments for the direct invocation scenario.
    pub direct_arguments: Map<String, Value>,
    /// User prompt for the round-trip scenario.
    pub round_trip_prompt: String,
    /// Call the exact matcher pins.
    pub expected_call: ExpectedCall,
    /// Literal the tool server must return on success.
    pub success_marker: String,
    /// Tool-call acceptance strategy.
    pub tool_call_match: ToolCallMatchMode,
    /// Inference failure policy.
    pub chat_failure: ChatFailurePolicy,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let mut direct_arguments = Map::new();
        direct_arguments.insert("name".to_string(), Value::String("TestUser".to_string()));
        let mut expected_arguments = Map::new();
        expected_arguments.insert("name".to_string(), Value::String("MCPUser".to_string()));
        Self {
            enabled: ScenarioId::ALL.to_vec(),
            target_tool: "say_hello".to_string(),
            target_parameter: "name".to_string(),
            direct_arguments,
            round_trip_prompt: DEFAULT_ROUND_TRIP_PROMPT.to_string(),
            expected_call: ExpectedCall {
                name: "say_hello".to_string(),
                arguments: expected_arguments,
            },
            success_marker: DEFAULT_SUCCESS_MARKER.to_string(),
            tool_call_match: ToolCallMatchMode::Exact,
            chat_failure: ChatFailurePolicy::Scenario,
        }
    }
}

impl ScenarioConfig {
    /// Returns enabled scenarios in canonical order.
    #[must_use]
    pub fn ordered(&self) -> Vec<ScenarioId> {
        let set: BTreeSet<ScenarioId> = self.enabled.iter().copied().collect();
        set.into_iter().collect()
    }

    /// Validates scenario settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled.is_empty() {
            return Err(ConfigError::Invalid("scenarios.enabled must not be empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for id in &self.enabled {
            if !seen.insert(*id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate scenarios.enabled entry: {}",
                    id.as_str()
                )));
            }
        }
        require_trimmed("scenarios.target_tool", &self.target_tool)?;
        require_trimmed("scenarios.target_parameter", &self.target_parameter)?;
        require_trimmed("scenarios.expected_call.name", &self.expected_call.name)?;
        require_nonempty("scenarios.round_trip_prompt", &self.round_trip_prompt)?;
        require_nonempty("scenarios.success_marker", &self.success_marker)
    }
}

// ============================================================================
// SECTION: Logging and Artifacts
// ============================================================================

/// Event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `logging.path`.
    File,
    /// Discard events.
    None,
}

/// Structured event logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Sink kind.
    pub sink: LogSinkKind,
    /// Log file path for the file sink.
    pub path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (LogSinkKind::File, None) => {
                Err(ConfigError::Invalid("logging.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => require_path("logging.path", path),
            _ => Ok(()),
        }
    }
}

/// Diagnostic artifact settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Run root; defaults to `target/mcp-conformance/run_<ms>`.
    pub root: Option<PathBuf>,
    /// Redirect backend stdout/stderr into the run root.
    pub capture_backend_logs: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            root: None,
            capture_backend_logs: true,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Malformed environment override.
    #[error("config env error: {0}")]
    Env(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument, the environment, or
/// the default file name when it exists.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = read_env_nonempty(ConformanceEnv::ConfigPath)? {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default_path.is_file().then_some(default_path))
}

/// Rejects empty or whitespace-only values.
fn require_nonempty(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{key} must not be empty")));
    }
    Ok(())
}

/// Rejects empty values and values with surrounding whitespace.
fn require_trimmed(key: &str, value: &str) -> Result<(), ConfigError> {
    require_nonempty(key, value)?;
    if value.trim() != value {
        return Err(ConfigError::Invalid(format!("{key} must be trimmed")));
    }
    Ok(())
}

/// Rejects zero durations.
fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{key} must be greater than zero")));
    }
    Ok(())
}

/// Rejects empty or oversized paths.
fn require_path(key: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{key} must not be empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{key} exceeds max length")));
    }
    Ok(())
}
