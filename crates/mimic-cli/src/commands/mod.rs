//! CLI command implementations for mysql-mimic.

pub mod check;
pub mod run;
