//! Error types for sessiond

use thiserror::Error;

/// Session service error type
#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A backend was registered twice under the same name
    #[error("Session provider registered twice: {0}")]
    DuplicateProvider(String),

    /// No backend is registered under the requested name
    #[error("Session provider not registered: {0}")]
    UnknownProvider(String),

    /// The random source failed while generating a session identifier
    #[error("Session identifier generation failed: {0}")]
    IdGeneration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Whether the error comes from startup wiring rather than a request
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SessionError::Config(_)
                | SessionError::DuplicateProvider(_)
                | SessionError::UnknownProvider(_)
        )
    }
}
