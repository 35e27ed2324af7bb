//! Per-statement session snapshot.

use crate::error::InterceptError;
use crate::variables::SessionVariables;
use chrono::{Local, NaiveDateTime};
use mimic_core::Value;

/// Connection facts owned by the connection and copied into every statement's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub connection_id: u32,
    /// Authorized user name.
    pub user: String,
    /// Currently selected database.
    pub database: Option<String>,
}

impl ClientIdentity {
    pub fn new(connection_id: u32, user: impl Into<String>) -> Self {
        Self {
            connection_id,
            user: user.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// Immutable facts about the session, captured once per statement.
///
/// Every built-in resolved while rewriting one statement reads from the same snapshot, so
/// `SELECT NOW(), NOW()` yields two identical values.
#[derive(Debug, Clone)]
pub struct SessionContext<'a> {
    pub connection_id: u32,
    /// User name as reported by the identity provider (`@@external_user`).
    pub external_user: String,
    pub current_user: String,
    pub version: String,
    pub database: Option<String>,
    pub variables: &'a SessionVariables,
    pub timestamp: NaiveDateTime,
}

impl<'a> SessionContext<'a> {
    /// Snapshot the session with the statement timestamp fixed to now.
    pub fn new(
        identity: &ClientIdentity,
        variables: &'a SessionVariables,
    ) -> Result<Self, InterceptError> {
        Self::at(identity, variables, Local::now().naive_local())
    }

    /// Snapshot the session with an explicit statement timestamp.
    pub fn at(
        identity: &ClientIdentity,
        variables: &'a SessionVariables,
        timestamp: NaiveDateTime,
    ) -> Result<Self, InterceptError> {
        Ok(Self {
            connection_id: identity.connection_id,
            external_user: text_variable(variables, "external_user")?,
            current_user: identity.user.clone(),
            version: text_variable(variables, "version")?,
            database: identity.database.clone(),
            variables,
            timestamp,
        })
    }
}

fn text_variable(variables: &SessionVariables, name: &str) -> Result<String, InterceptError> {
    Ok(match variables.get(name)? {
        Value::Null => String::new(),
        value => value.to_string(),
    })
}
