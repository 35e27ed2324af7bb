//! Server identity configuration.

use serde::{Deserialize, Serialize};

/// What the server reports about itself to MySQL clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Value of `@@version` and `VERSION()`.
    #[serde(default = "default_version")]
    pub version: String,

    /// Value of `@@version_comment`.
    #[serde(default = "default_version_comment")]
    pub version_comment: String,

    /// Database selected for new connections, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,

    /// User name assumed when a connection does not authenticate.
    #[serde(default = "default_user")]
    pub default_user: String,

    /// Id handed to the first connection. Subsequent connections count up from here.
    #[serde(default = "default_first_connection_id")]
    pub first_connection_id: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            version_comment: default_version_comment(),
            default_database: None,
            default_user: default_user(),
            first_connection_id: default_first_connection_id(),
        }
    }
}

// Default value functions
fn default_version() -> String {
    "8.0.29".to_string()
}

fn default_version_comment() -> String {
    "mysql-mimic".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

fn default_first_connection_id() -> u32 {
    1
}
