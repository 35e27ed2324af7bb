//! Server-wide state shared by every connection.
//!
//! [`MimicProxy`] owns what connections have in common: the server identity, the global
//! variable store and the schema registry. Each accepted client gets its own [`Connection`]
//! with private session variables.

use crate::error::ProxyError;
use crate::handler::Connection;
use crate::session::Session;
use mimic_core::{MimicConfig, ServerConfig};
use mimic_sql::{ClientIdentity, GlobalVariables, InfoSchema, SessionVariables};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// The current catalog, swappable while connections are running.
///
/// Statements take a snapshot when they start and keep it until they finish, so a reload never
/// changes the answer to a statement already in flight.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    current: RwLock<Arc<InfoSchema>>,
}

impl SchemaRegistry {
    pub fn new(catalog: InfoSchema) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<InfoSchema> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, catalog: InfoSchema) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
    }
}

/// The proxy server.
pub struct MimicProxy {
    server: ServerConfig,
    globals: Arc<GlobalVariables>,
    registry: Arc<SchemaRegistry>,
    next_connection_id: AtomicU32,
}

impl MimicProxy {
    pub fn new(server: ServerConfig, globals: GlobalVariables, catalog: InfoSchema) -> Self {
        let next_connection_id = AtomicU32::new(server.first_connection_id);
        Self {
            server,
            globals: Arc::new(globals),
            registry: Arc::new(SchemaRegistry::new(catalog)),
            next_connection_id,
        }
    }

    /// Build a proxy from loaded configuration: globals from `server` and `variables`, the
    /// catalog from the schema mapping (empty when none is configured).
    pub fn from_config(config: &MimicConfig) -> Result<Self, ProxyError> {
        let globals = GlobalVariables::from_config(&config.server, &config.variables)?;
        let catalog = match config.schema_mapping() {
            Some(mapping) => InfoSchema::from_mapping(mapping)?,
            None => InfoSchema::default(),
        };

        tracing::info!(
            tables = catalog.table_count(),
            columns = catalog.column_count(),
            version = %config.server.version,
            "Loaded schema"
        );

        Ok(Self::new(config.server.clone(), globals, catalog))
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn globals(&self) -> &Arc<GlobalVariables> {
        &self.globals
    }

    /// The catalog new statements will see.
    pub fn catalog(&self) -> Arc<InfoSchema> {
        self.registry.snapshot()
    }

    /// Replace the catalog with one built from `mapping`.
    ///
    /// On error the current catalog stays in place.
    pub fn reload(&self, mapping: &serde_json::Value) -> Result<(), ProxyError> {
        let catalog = InfoSchema::from_mapping(mapping)?;
        tracing::info!(
            tables = catalog.table_count(),
            columns = catalog.column_count(),
            "Reloaded schema"
        );
        self.registry.replace(catalog);
        Ok(())
    }

    /// Open a connection for `username` (the configured default user when `None`).
    ///
    /// The selected database is, in order: the one the client asked for, the user's default,
    /// the server's default.
    pub async fn connect<S: Session>(
        &self,
        session: S,
        username: Option<&str>,
        database: Option<&str>,
    ) -> Result<Connection<S>, ProxyError> {
        let username = username.unwrap_or(&self.server.default_user);
        let user = session
            .get_user(username)
            .await
            .map_err(ProxyError::Backend)?
            .ok_or_else(|| {
                tracing::warn!(user = %username, "Rejected unknown user");
                ProxyError::AccessDenied(username.to_string())
            })?;

        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let mut identity = ClientIdentity::new(connection_id, user.name);
        identity.database = database
            .map(str::to_string)
            .or(user.default_database)
            .or_else(|| self.server.default_database.clone());

        tracing::info!(
            connection_id,
            user = %identity.user,
            database = ?identity.database,
            "Connection opened"
        );

        Ok(Connection::new(
            identity,
            SessionVariables::new(self.globals.clone()),
            self.registry.clone(),
            session,
        ))
    }
}
