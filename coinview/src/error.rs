use thiserror::Error;

/// Errors that can occur in the coinview front-end
#[derive(Error, Debug)]
pub enum FrontendError {
    /// Node or wallet engine error (via coinlink)
    #[error("Engine error: {0}")]
    LinkError(#[from] coinlink::LinkError),

    /// I/O error
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error object returned by the JSON-RPC server
    #[error("RPC error {code}: {message}")]
    RPCError { code: i64, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Wallet database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Settings store error
    #[error("Settings error: {0}")]
    SettingsError(String),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

impl From<jsonrpc_core::Error> for FrontendError {
    fn from(error: jsonrpc_core::Error) -> Self {
        FrontendError::RPCError {
            code: error.code.code(),
            message: error.message,
        }
    }
}

impl From<String> for FrontendError {
    fn from(error: String) -> Self {
        FrontendError::Generic(error)
    }
}
