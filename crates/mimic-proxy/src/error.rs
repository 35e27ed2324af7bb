//! Error types for the proxy crate.

use mimic_sql::InterceptError;
use mimic_sql::error::codes;
use thiserror::Error;

/// MySQL `ER_ACCESS_DENIED_ERROR`.
const ACCESS_DENIED: u16 = 1045;

/// Errors that can occur while serving a connection.
///
/// Statement errors end the statement, not the connection.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The statement was rejected while being intercepted.
    #[error(transparent)]
    Intercept(#[from] InterceptError),

    /// The backend does not know the connecting user.
    #[error("Access denied for user '{0}'")]
    AccessDenied(String),

    /// The backend failed to run a forwarded statement.
    #[error("backend error: {0}")]
    Backend(#[source] anyhow::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// MySQL error number reported to the client.
    pub fn code(&self) -> u16 {
        match self {
            ProxyError::Intercept(e) => e.code(),
            ProxyError::AccessDenied(_) => ACCESS_DENIED,
            ProxyError::Backend(_) | ProxyError::Internal(_) => codes::UNKNOWN_ERROR,
        }
    }
}
