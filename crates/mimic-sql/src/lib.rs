//! # mimic-sql
//!
//! Statement interception for mysql-mimic.
//!
//! This crate sits between the wire layer and a pluggable backend and works on the parsed form
//! of every statement:
//! - Lift `/*+ ... */` optimizer hints out of the SQL and apply `SET_VAR` assignments for the
//!   duration of one statement
//! - Replace session built-ins (`NOW()`, `DATABASE()`, `CURRENT_USER`, ...) and `@@variable`
//!   references with literals
//! - Answer SHOW and INFORMATION_SCHEMA queries from a declared schema
//!
//! ## How It Works
//!
//! **Before (from client):**
//! ```sql
//! SELECT /*+ SET_VAR(sql_mode = 'TRADITIONAL') BKA(t) */ NOW(), @@sql_mode FROM t
//! ```
//!
//! **After (to backend):**
//! ```sql
//! SELECT /*+ BKA(t) */ '2024-01-02 03:04:05' AS `NOW()`, 'TRADITIONAL' AS `@@sql_mode` FROM t
//! ```
//!
//! and `sql_mode` is back to its previous value once the statement ends.
//!
//! ## Statement Handling
//!
//! | Statement | Handling |
//! |-----------|----------|
//! | `SELECT ...` with built-ins | Rewritten, then forwarded |
//! | `SET x = expr` | Values rewritten, target kept |
//! | `SHOW TABLES / COLUMNS / DATABASES` | Rewritten to a catalog SELECT |
//! | `SELECT ... FROM information_schema.*` | Answered by [`InfoSchema`] |

pub mod context;
pub mod error;
pub mod functions;
pub mod hints;
pub mod info_schema;
pub mod interceptor;
pub mod literal;
pub mod parser;
pub mod variables;

pub use context::{ClientIdentity, SessionContext};
pub use error::InterceptError;
pub use functions::{Builtin, FunctionTable};
pub use hints::{Hint, HintItem};
pub use info_schema::{
    Column, InfoSchema, like_regex, mapping_to_columns, show_statement_to_info_schema_query,
};
pub use interceptor::{VariableScope, rewrite_statement};
pub use literal::{expression_to_setting, expression_to_value, value_to_expression};
pub use parser::{InterceptedStatement, SqlParser, TableReference};
pub use variables::{GlobalVariables, SessionVariables, Setting, VariableKind, VariableSchema};
