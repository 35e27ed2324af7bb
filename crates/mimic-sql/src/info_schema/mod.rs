//! Virtual INFORMATION_SCHEMA.
//!
//! Metadata queries are answered from a declared schema description, never from the backend.
//!
//! ## Relations
//!
//! | Relation | Contents |
//! |----------|----------|
//! | `information_schema.schemata` | One row per schema, first-seen order |
//! | `information_schema.tables` | One row per table, first-seen order |
//! | `information_schema.columns` | One row per column, declared order |
//! | `key_column_usage`, `referential_constraints`, `character_sets`, `statistics`, `parameters` | Empty |
//!
//! The catalog's own relations are listed in `tables` and `columns` as `SYSTEM TABLE`s.
//!
//! ## Example
//!
//! ```text
//! schema:                          SHOW COLUMNS FROM users
//!   shop:                            Field | Type | Null | ...
//!     users:                         id    | INT  | YES  | ...
//!       id: INT                      name  | TEXT | YES  | ...
//!       name: TEXT
//! ```

mod catalog;
mod columns;
mod query;
mod show;

pub use catalog::{INFORMATION_SCHEMA, InfoSchema};
pub use columns::{Column, DEFAULT_CATALOG, mapping_to_columns};
pub use query::like_regex;
pub use show::show_statement_to_info_schema_query;
