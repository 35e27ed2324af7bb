//! Error types for the interception crate.

use thiserror::Error;

/// MySQL error numbers surfaced to clients.
pub mod codes {
    pub const BAD_FIELD: u16 = 1054;
    pub const PARSE_ERROR: u16 = 1064;
    pub const UNKNOWN_ERROR: u16 = 1105;
    pub const UNKNOWN_SYSTEM_VARIABLE: u16 = 1193;
    pub const WRONG_VALUE_FOR_VAR: u16 = 1231;
    pub const NOT_SUPPORTED_YET: u16 = 1235;
    pub const INCORRECT_GLOBAL_LOCAL_VAR: u16 = 1238;
}

/// Errors that can occur while intercepting a statement.
///
/// Every variant aborts only the current statement.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// A session or global variable that was never declared.
    #[error("Unknown system variable '{name}'")]
    UnknownVariable { name: String },

    /// Attempt to change a read-only variable.
    #[error("Variable '{name}' is a read only variable")]
    VariableNotDynamic { name: String },

    /// Value cannot be coerced to the variable's declared kind.
    #[error("Variable '{name}' can't be set to the value of '{value}'")]
    InvalidVariableValue { name: String, value: String },

    /// Attempt to set a variable in a scope this server does not allow.
    #[error("Cannot SET variable {name} with scope {scope}")]
    VariableScope { name: String, scope: String },

    /// SHOW variant the catalog cannot answer.
    #[error("Unsupported SHOW command: {kind}")]
    UnsupportedShowStatement { kind: String },

    /// A SET_VAR hint whose right-hand side is not a literal.
    #[error("SET_VAR value must be a literal, got: {expr}")]
    MalformedHintValue { expr: String },

    /// A column the catalog query refers to does not exist.
    #[error("Unknown column '{name}' in 'field list'")]
    UnknownColumn { name: String },

    /// Statement shape the virtual catalog or the SET handler does not support.
    #[error("{0}")]
    NotSupported(String),

    /// The schema description handed to the catalog is malformed.
    #[error("Invalid schema mapping: {0}")]
    InvalidSchemaMapping(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl InterceptError {
    /// MySQL error number for this error.
    pub fn code(&self) -> u16 {
        match self {
            InterceptError::ParseError(_) => codes::PARSE_ERROR,
            InterceptError::UnknownVariable { .. } => codes::UNKNOWN_SYSTEM_VARIABLE,
            InterceptError::VariableNotDynamic { .. } | InterceptError::VariableScope { .. } => {
                codes::INCORRECT_GLOBAL_LOCAL_VAR
            }
            InterceptError::InvalidVariableValue { .. } => codes::WRONG_VALUE_FOR_VAR,
            InterceptError::UnknownColumn { .. } => codes::BAD_FIELD,
            InterceptError::UnsupportedShowStatement { .. }
            | InterceptError::NotSupported(_) => codes::NOT_SUPPORTED_YET,
            InterceptError::MalformedHintValue { .. } => codes::WRONG_VALUE_FOR_VAR,
            InterceptError::InvalidSchemaMapping(_) | InterceptError::Internal(_) => {
                codes::UNKNOWN_ERROR
            }
        }
    }

    pub(crate) fn not_supported(message: impl Into<String>) -> Self {
        InterceptError::NotSupported(message.into())
    }
}

impl From<sqlparser::parser::ParserError> for InterceptError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        InterceptError::ParseError(e.to_string())
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for InterceptError {
    fn from(e: sqlparser::tokenizer::TokenizerError) -> Self {
        InterceptError::ParseError(e.to_string())
    }
}
