//! # mimic-core
//!
//! Types shared by every mysql-mimic crate:
//!
//! - [`Value`]: the native value model used for system variables, literals and result cells
//! - [`ResultSet`]: rows plus column names, the shape returned by both the backend and the
//!   virtual INFORMATION_SCHEMA
//! - [`config`]: YAML configuration (`mimic.yaml`)

pub mod config;
pub mod result;
pub mod value;

pub use config::{ConfigError, MimicConfig, ServerConfig};
pub use result::ResultSet;
pub use value::Value;
