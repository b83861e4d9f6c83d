//! Client error taxonomy.

use stagecfg_core::ConfigError;
use stagecfg_protocol::{TokenError, ValidationError};
use thiserror::Error;

/// Coarse failure category, stable across error variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid bootstrap parameter.
    Validation,
    /// The server does not know the application.
    UnknownApplication,
    /// Unexpected server-side failure.
    Server,
    /// Required key absent across all sources.
    MissingKey,
    /// Value present but not convertible.
    Conversion,
    /// The server could not be reached.
    Transport,
}

/// Errors from fetching or reading remote configuration.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Application '{0}' not known by the config server")]
    UnknownApplication(String),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Transport(String),

    #[error("invalid token from config server: {0}")]
    Token(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) => ErrorKind::Validation,
            ClientError::UnknownApplication(_) => ErrorKind::UnknownApplication,
            ClientError::Server(_) => ErrorKind::Server,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Token(_) => ErrorKind::Server,
            ClientError::Config(ConfigError::MissingKey(_)) => ErrorKind::MissingKey,
            ClientError::Config(ConfigError::Conversion(_)) => ErrorKind::Conversion,
            ClientError::Config(_) => ErrorKind::Server,
        }
    }
}

impl From<TokenError> for ClientError {
    fn from(e: TokenError) -> Self {
        ClientError::Token(e.to_string())
    }
}

impl From<ClientError> for ConfigError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Config(inner) => inner,
            other => ConfigError::Source {
                name: crate::remote::REMOTE_SOURCE_NAME.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
