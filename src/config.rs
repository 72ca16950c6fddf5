use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use which::which;

use crate::{NotesError, Result, DEFAULT_STORAGE_KEY};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_KEY_ENV: &str = "TAGNOTES_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory holding the notes blob
    pub data_dir: PathBuf,

    /// Key (file stem) the notes collection is stored under
    pub storage_key: String,

    /// Default editor command
    pub editor_command: Option<String>,

    /// Tag suggestion provider settings
    pub suggestion: SuggestionConfig,
}

/// Where and how tag suggestions are requested.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SuggestionConfig {
    /// OpenAI-compatible chat completions URL
    pub endpoint: String,

    /// Model name sent in the request body
    pub model: String,

    /// Name of the environment variable holding the bearer token
    pub api_key_env: String,

    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SuggestionConfig {
    /// Reads the API key from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            editor_command: None,
            suggestion: SuggestionConfig::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tagnotes")
}

fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(project) => project.data_dir().to_path_buf(),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tagnotes"),
    }
}

/// Platform location of `config.json`, if one can be determined
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|project| project.config_dir().join("config.json"))
}

impl Config {
    /// Loads configuration from `path` (or the platform default location).
    ///
    /// A missing file yields defaults; a file that does not parse is an error.
    /// `TAGNOTES_ENDPOINT` and `TAGNOTES_MODEL` override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                let raw = fs::read_to_string(&path)?;
                serde_json::from_str(&raw).map_err(|e| NotesError::ConfigError {
                    message: format!("Invalid config file {}: {}", path.display(), e),
                })?
            }
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Config::default()
            }
            None => Config::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("TAGNOTES_ENDPOINT") {
            debug!("Suggestion endpoint overridden from environment");
            self.suggestion.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("TAGNOTES_MODEL") {
            debug!("Suggestion model overridden from environment");
            self.suggestion.model = model;
        }
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -t".to_string()
        } else {
            // Try common Linux editors
            for editor in &["nano", "vim", "vi", "emacs"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}
