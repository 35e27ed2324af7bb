//! The backend seam.
//!
//! A [`Session`] is whatever actually executes forwarded statements: a real database, a query
//! engine, or a canned in-memory table. It sees only rewritten SQL; hints, variables and
//! metadata queries are dealt with before it is called.

use async_trait::async_trait;
use mimic_core::{ResultSet, Value};
use std::collections::HashMap;

/// An account known to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    /// Database selected at login when the client does not name one.
    pub default_database: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_database: None,
        }
    }

    pub fn with_default_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = Some(database.into());
        self
    }
}

/// Per-connection backend.
#[async_trait]
pub trait Session: Send + Sync {
    /// Run one rewritten statement.
    ///
    /// `attributes` are the client's query attributes for this statement.
    async fn query(
        &self,
        sql: &str,
        attributes: &HashMap<String, String>,
    ) -> anyhow::Result<ResultSet>;

    /// Look up the account a client is logging in as. `None` rejects the login.
    ///
    /// The default accepts everyone.
    async fn get_user(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(Some(User::new(username)))
    }

    /// Called after a `SET` statement with the variables it changed and their new values.
    async fn set(&self, _changed: &[(String, Value)]) -> anyhow::Result<()> {
        Ok(())
    }
}
