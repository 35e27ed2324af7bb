//! # mimic-proxy
//!
//! Per-connection statement pipeline for mysql-mimic.
//!
//! This crate sits between a MySQL wire front end and a pluggable backend:
//! - Keeps each connection's session variables, current database and user
//! - Runs every statement through `mimic-sql` (SET_VAR hints, built-ins, variables)
//! - Answers SET, USE, SHOW and INFORMATION_SCHEMA queries itself
//! - Forwards everything else to the backend as rewritten SQL
//!
//! ## Architecture
//!
//! ```text
//! MySQL client
//!       │
//!       │ statements
//!       ▼
//! ┌──────────────────────┐
//! │  Connection          │
//! │  1. Parse + hints    │  ← mimic-sql
//! │  2. Scope variables  │  ← mimic-sql
//! │  3. Rewrite          │  ← mimic-sql
//! │  4. Route            │  ← INFORMATION_SCHEMA / variables
//! │  5. Restore          │
//! └──────────┬───────────┘
//!            │ rewritten SQL
//!            ▼
//!      impl Session
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use async_trait::async_trait;
//! use mimic_core::{MimicConfig, ResultSet};
//! use mimic_proxy::{MimicProxy, Session};
//! use std::collections::HashMap;
//!
//! struct Backend;
//!
//! #[async_trait]
//! impl Session for Backend {
//!     async fn query(
//!         &self,
//!         sql: &str,
//!         _attributes: &HashMap<String, String>,
//!     ) -> anyhow::Result<ResultSet> {
//!         println!("backend received: {sql}");
//!         Ok(ResultSet::empty())
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = MimicConfig::load_with_context("mimic.yaml")?;
//! let proxy = MimicProxy::from_config(&config)?;
//! let mut conn = proxy.connect(Backend, None, None).await?;
//! let results = conn.handle_query("SELECT /*+ SET_VAR(sql_mode='ANSI') */ NOW()").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod proxy;
pub mod session;

pub use error::ProxyError;
pub use handler::Connection;
pub use proxy::{MimicProxy, SchemaRegistry};
pub use session::{Session, User};
