//! Application configuration for press.
//!
//! User config lives at `~/.press/press.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PressError, Result};
use crate::types::SubjectDescriptor;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "press.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".press";

/// Name used when no subject list can be found.
const PLACEHOLDER_SUBJECT: &str = "Sample Subject";

// ---------------------------------------------------------------------------
// Config structs (matching press.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Paths and global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP collector settings.
    #[serde(default)]
    pub collectors: CollectorsConfig,

    /// Summarization model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Snapshot diff policy.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding subject lists.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory receiving rendered HTML pages.
    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    /// libSQL database file.
    #[serde(default = "default_database")]
    pub database: String,

    /// Explicit subject list (TOML or plain text). Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects_file: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            site_dir: default_site_dir(),
            database: default_database(),
            subjects_file: None,
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_site_dir() -> String {
    "site".into()
}
fn default_database() -> String {
    "data/press.db".into()
}

/// `[collectors]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// Encyclopedia summary endpoint; the page title is appended.
    #[serde(default = "default_encyclopedia_endpoint")]
    pub encyclopedia_endpoint: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum characters of page text kept after extraction.
    #[serde(default = "default_page_text_limit")]
    pub page_text_limit: usize,
}

impl Default for CollectorsConfig {
    fn default() -> Self {
        Self {
            encyclopedia_endpoint: default_encyclopedia_endpoint(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            page_text_limit: default_page_text_limit(),
        }
    }
}

fn default_encyclopedia_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary/".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("press-bot/", env!("CARGO_PKG_VERSION")).into()
}
fn default_page_text_limit() -> usize {
    30_000
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Total summarization attempts per link before falling back to an excerpt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff; attempt `n` waits `base * 2^n`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_llm_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1_000
}

/// What a new snapshot is diffed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselinePolicy {
    /// Compare against the most recently stored diff text. This drifts from the
    /// real content over several runs but matches the historical data.
    #[default]
    PreviousDiff,
    /// Compare against the activity block the latest snapshot was computed from.
    PreviousContent,
}

/// `[snapshot]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default)]
    pub baseline: BaselinePolicy,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.press/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.press/press.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PressError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PressError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| PressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the summarization API key from the configured env var.
pub fn api_key(config: &LlmConfig) -> Option<String> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Subject lists
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SubjectsFile {
    #[serde(default)]
    subjects: Vec<SubjectDescriptor>,
}

/// Load subject descriptors.
///
/// An explicit file is parsed by extension (`.toml` → `[[subjects]]` tables,
/// anything else → one name per line). Without one, `<data_dir>/subjects.toml`
/// then `<data_dir>/subjects.txt` are tried, and a single placeholder subject is
/// returned if neither exists.
pub fn load_subjects(explicit: Option<&Path>, data_dir: &Path) -> Result<Vec<SubjectDescriptor>> {
    if let Some(path) = explicit {
        return load_subjects_from(path);
    }

    for candidate in ["subjects.toml", "subjects.txt"] {
        let path = data_dir.join(candidate);
        if path.exists() {
            return load_subjects_from(&path);
        }
    }

    tracing::warn!(
        data_dir = %data_dir.display(),
        "no subject list found, using placeholder subject"
    );
    Ok(vec![SubjectDescriptor::named(PLACEHOLDER_SUBJECT)])
}

/// Load subject descriptors from a specific file.
pub fn load_subjects_from(path: &Path) -> Result<Vec<SubjectDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|e| PressError::io(path, e))?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        let parsed: SubjectsFile = toml::from_str(&content).map_err(|e| {
            PressError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        return Ok(parsed.subjects);
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(SubjectDescriptor::named)
        .collect())
}
