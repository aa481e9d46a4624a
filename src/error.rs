//! Error types and exit codes for elm-intel

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for elm-intel operations
///
/// Unresolved references and failed tool runs are not errors; they are
/// ordinary outcomes handled where they occur.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("No elm.json found for {path}")]
    NoProjectRoot { path: String },

    #[error("Invalid elm.json at {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Failed to parse file: {message}")]
    ParseFailure { message: String },

    #[error("Invalid document uri: {uri}")]
    InvalidUri { uri: String },

    #[error("Failed to run {program}: {message}")]
    Tool { program: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error at {path}: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Convert error to a process exit code:
    /// - 1: File not found / IO error
    /// - 2: No project root / invalid manifest
    /// - 3: Parse failure
    /// - 4: External tool failure
    /// - 5: Configuration or uri error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(1),
            Self::NoProjectRoot { .. } => ExitCode::from(2),
            Self::Manifest { .. } => ExitCode::from(2),
            Self::ParseFailure { .. } => ExitCode::from(3),
            Self::Tool { .. } => ExitCode::from(4),
            Self::ConfigError { .. } => ExitCode::from(5),
            Self::InvalidUri { .. } => ExitCode::from(5),
            Self::IoError { .. } => ExitCode::from(1),
            Self::Io(_) => ExitCode::from(1),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for elm-intel operations
pub type Result<T> = std::result::Result<T, EngineError>;
