//! Protocol errors module

use thiserror::Error;

/// Reasons a POST request is refused before any file I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OriginError {
    #[error("missing origin header")]
    Missing,

    #[error("origin header is not valid UTF-8")]
    NotUtf8,

    #[error("unauthorized origin")]
    Disallowed { origin: String },
}

/// Failures of a single edit after authorization succeeded.
///
/// Every variant is terminal for its request and is reported to the client
/// as an internal server error.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Unable to open temporary file: {source}")]
    CreateTempFile { source: std::io::Error },

    #[error("Unable to write full content ({declared} bytes), only {written} bytes written")]
    Transfer { declared: u64, written: u64 },

    #[error("Unable to write content to '{path}': {source}")]
    Write { path: String, source: std::io::Error },

    #[error("Unable to read returned content from '{path}': {source}")]
    ReadBack { path: String, source: std::io::Error },

    #[error("Editor did not finish cleanly: {outcome}")]
    Editor { outcome: String },
}

impl EditError {
    /// Short machine-friendly name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EditError::CreateTempFile { .. } => "create_temp_file",
            EditError::Transfer { .. } => "transfer",
            EditError::Write { .. } => "write",
            EditError::ReadBack { .. } => "read_back",
            EditError::Editor { .. } => "editor",
        }
    }
}

/// Startup configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Editor command is empty")]
    EmptyEditorCommand,

    #[error("Invalid bind address '{address}': {reason}")]
    InvalidBindAddress { address: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
