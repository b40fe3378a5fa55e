//! Dispatcher settings and the handler catalogue file.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

pub const CONFIG_FILENAME: &str = "switchyard.json";
pub const CONFIG_VERSION: &str = "1.0.0";
pub const DEFAULT_HISTORY_WINDOW: usize = 5;
pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FILES_ROOT: &str = "workspace";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of most recent turns shown to the oracle and the handler.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// `None` waits on the oracle indefinitely.
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            oracle_timeout_ms: Some(DEFAULT_ORACLE_TIMEOUT_MS),
        }
    }
}

impl DispatcherConfig {
    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// `SWITCHYARD_HISTORY_WINDOW` and `SWITCHYARD_ORACLE_TIMEOUT_SECS`
    /// (0 disables the timeout). Unparsable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(window) = lookup("SWITCHYARD_HISTORY_WINDOW")
            .and_then(|value| value.parse::<usize>().ok())
        {
            self.history_window = window;
        }
        if let Some(secs) = lookup("SWITCHYARD_ORACLE_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
        {
            self.oracle_timeout_ms = (secs > 0).then(|| secs.saturating_mul(1000));
        }
        self
    }
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_oracle_timeout() -> Option<u64> {
    Some(DEFAULT_ORACLE_TIMEOUT_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Answers with the model reply.
    #[default]
    Chat,
    /// Asks the model for one file operation and applies it under `root`.
    Files,
}

/// One LLM-backed handler, declared as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub system_prompt: String,
    /// Keywords for the local confidence heuristic. Empty opts out.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub kind: HandlerKind,
    /// Workspace for `files` handlers. Relative paths resolve against the
    /// config file's directory; defaults to `workspace`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchyardConfig {
    pub version: String,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

impl SwitchyardConfig {
    pub fn default_new() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            dispatcher: DispatcherConfig::default(),
            handlers: vec![
                HandlerConfig {
                    name: "file_operations".to_string(),
                    description: "Works with files inside the workspace directory: reads \
                                  files, writes or appends text, lists directories and \
                                  deletes files."
                        .to_string(),
                    capabilities: vec![
                        "read files".into(),
                        "write files".into(),
                        "append to files".into(),
                        "delete files".into(),
                        "list directories".into(),
                    ],
                    system_prompt: "You operate on files in a workspace directory. Pick the \
                                    single file operation that satisfies the user's request."
                        .to_string(),
                    keywords: vec![
                        "file".into(),
                        "read".into(),
                        "write".into(),
                        "save".into(),
                        "delete".into(),
                        "list".into(),
                        "directory".into(),
                        "folder".into(),
                        "append".into(),
                    ],
                    kind: HandlerKind::Files,
                    root: Some(PathBuf::from(DEFAULT_FILES_ROOT)),
                },
                HandlerConfig {
                    name: "research".to_string(),
                    description: "Answers general-knowledge questions and explains or \
                                  summarizes topics from the model's own knowledge. It \
                                  has no web access."
                        .to_string(),
                    capabilities: vec![
                        "explanations".into(),
                        "summarization".into(),
                        "general knowledge".into(),
                    ],
                    system_prompt: "You are a research assistant without internet access. \
                                    Answer from what you know, concisely, and say when you \
                                    are unsure or when the answer may be out of date."
                        .to_string(),
                    keywords: vec![
                        "research".into(),
                        "search".into(),
                        "find".into(),
                        "who".into(),
                        "what".into(),
                        "explain".into(),
                        "summarize".into(),
                    ],
                    kind: HandlerKind::Chat,
                    root: None,
                },
                HandlerConfig {
                    name: "weather".to_string(),
                    description: "Discusses weather and climate in general terms, such as \
                                  typical conditions for a place and season. It has no \
                                  live weather data."
                        .to_string(),
                    capabilities: vec![
                        "climate overview".into(),
                        "seasonal conditions".into(),
                        "weather concepts".into(),
                    ],
                    system_prompt: "You are a weather assistant without access to live \
                                    data. Describe typical conditions for the place and \
                                    season asked about, and tell the user to check a \
                                    forecast service for current weather."
                        .to_string(),
                    keywords: vec![
                        "weather".into(),
                        "forecast".into(),
                        "temperature".into(),
                        "rain".into(),
                        "sunny".into(),
                    ],
                    kind: HandlerKind::Chat,
                    root: None,
                },
            ],
        }
    }
}

/// Load the config file at `path`, writing the defaults there first if it
/// does not exist.
pub fn load_or_create_config(path: &Path) -> CoreResult<SwitchyardConfig> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| {
            CoreError::Internal(format!(
                "failed to create config directory {}: {error}",
                parent.display()
            ))
        })?;
    }

    if !path.exists() {
        let config = SwitchyardConfig::default_new();
        write_config(path, &config)?;
        tracing::info!(path = %path.display(), "wrote default config");
        return Ok(config);
    }

    let data = std::fs::read_to_string(path).map_err(|error| {
        CoreError::Internal(format!("failed to read config {}: {error}", path.display()))
    })?;
    let config: SwitchyardConfig = serde_json::from_str(&data).map_err(|error| {
        CoreError::InvalidInput(format!("failed to parse config {}: {error}", path.display()))
    })?;
    if config.version != CONFIG_VERSION {
        tracing::warn!(
            found = %config.version,
            expected = CONFIG_VERSION,
            "config version mismatch"
        );
    }
    Ok(config)
}

pub fn write_config(path: &Path, config: &SwitchyardConfig) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        CoreError::Internal(format!("failed to serialize config {}: {error}", path.display()))
    })?;
    std::fs::write(path, data).map_err(|error| {
        CoreError::Internal(format!("failed to write config {}: {error}", path.display()))
    })
}
