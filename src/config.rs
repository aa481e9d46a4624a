//! Engine configuration
//!
//! Settings come from two places:
//! - `<root>/.elm-intel.toml`, every section optional
//! - client settings (the editor's `elmLS` section), merged over the
//!   defaults key by key: keys present in the client object win
//!
//! ```toml
//! [compiler]
//! enabled = true
//! path = "/usr/local/bin/elm"
//! debounce_ms = 300
//!
//! [linter]
//! enabled = true
//! command = "elm-review"
//! args = ["--report=json"]
//! stdin = false
//!
//! [resolver]
//! qualified_access = "open"   # or "exposed-only"
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::resolve::QualifiedAccess;

/// File name of the per-root configuration
pub const CONFIG_FILE: &str = ".elm-intel.toml";

/// Configuration of one workspace root
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub linter: LinterConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Compiler channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path of the `elm` binary; looked up on `PATH` when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Quiet period before a compile starts
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Linter channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_linter_command")]
    pub command: String,

    #[serde(default = "default_linter_args")]
    pub args: Vec<String>,

    /// Lint one file at a time with its text on stdin
    #[serde(default)]
    pub stdin: bool,
}

fn default_linter_command() -> String {
    "elm-review".to_string()
}

fn default_linter_args() -> Vec<String> {
    vec!["--report=json".to_string()]
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_linter_command(),
            args: default_linter_args(),
            stdin: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolverConfig {
    #[serde(default)]
    pub qualified_access: QualifiedAccess,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load `<root>/.elm-intel.toml`, or defaults when it does not exist
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_from(&root.join(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;

        let config: Self = toml::from_str(&content).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply client settings on top of the file configuration
    pub fn apply_client_settings(&mut self, settings: &ClientSettings) {
        self.compiler.path = Some(PathBuf::from(&settings.elm_path));
        self.linter.command = settings.elm_review_path.clone();
    }

    /// The client view of this configuration
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            elm_path: self
                .compiler
                .path
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(default_elm_path),
            elm_review_path: self.linter.command.clone(),
            ..ClientSettings::default()
        }
    }

    /// Merge an editor settings object over the file configuration
    ///
    /// Accepts either `{"elmLS": {...}}` or the section itself. Keys the
    /// client leaves out keep their configured values.
    pub fn merge_client_settings(&mut self, overrides: &serde_json::Value) -> Result<ClientSettings> {
        let section = overrides.get("elmLS").unwrap_or(overrides);
        let merged = ClientSettings::merged(&self.client_settings(), section)?;
        self.apply_client_settings(&merged);
        debug!(elm = %merged.elm_path, linter = %merged.elm_review_path, "client settings applied");
        Ok(merged)
    }

    /// Read a settings object from a JSON file
    pub fn read_client_settings(path: &Path) -> Result<serde_json::Value> {
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| EngineError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// The compiler binary, if it can be found
    pub fn compiler_program(&self) -> Option<PathBuf> {
        match &self.compiler.path {
            Some(path) => locate(&path.to_string_lossy()),
            None => locate("elm"),
        }
    }

    /// The linter binary, if it can be found
    pub fn linter_program(&self) -> Option<PathBuf> {
        locate(&self.linter.command)
    }
}

/// Resolve a program name or path to an executable
fn locate(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

// ============================================================================
// Client settings
// ============================================================================

/// Settings the editor sends under its `elmLS` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    #[serde(default = "default_elm_path")]
    pub elm_path: String,

    #[serde(default = "default_elm_format_path")]
    pub elm_format_path: String,

    #[serde(default = "default_elm_review_path")]
    pub elm_review_path: String,
}

fn default_elm_path() -> String {
    "elm".to_string()
}

fn default_elm_format_path() -> String {
    "elm-format".to_string()
}

fn default_elm_review_path() -> String {
    default_linter_command()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            elm_path: default_elm_path(),
            elm_format_path: default_elm_format_path(),
            elm_review_path: default_elm_review_path(),
        }
    }
}

impl ClientSettings {
    /// Merge a client-provided settings object over `base`
    ///
    /// Keys present (and not null) in `overrides` replace the base values;
    /// unknown keys are ignored. A non-object `overrides` leaves `base`
    /// unchanged, as when the client cannot provide configuration.
    pub fn merged(base: &ClientSettings, overrides: &serde_json::Value) -> Result<ClientSettings> {
        let mut merged = serde_json::to_value(base).map_err(|e| EngineError::ConfigError {
            message: e.to_string(),
        })?;
        if let (Some(target), Some(source)) = (merged.as_object_mut(), overrides.as_object()) {
            for (key, value) in source {
                if !value.is_null() {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        serde_json::from_value(merged).map_err(|e| EngineError::ConfigError {
            message: format!("Invalid client settings: {}", e),
        })
    }
}
