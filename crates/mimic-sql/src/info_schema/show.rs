//! SHOW statements as SELECTs over the catalog.

use super::catalog::INFORMATION_SCHEMA;
use crate::error::InterceptError;
use crate::parser::{SqlParser, split_object_name};
use sqlparser::ast::{
    Ident, Query, ShowStatementFilter, ShowStatementFilterPosition, ShowStatementOptions,
    Statement,
};

/// Rewrite a SHOW statement into an equivalent SELECT over INFORMATION_SCHEMA.
///
/// Statements that don't name a database bind to `current_database`. Supported: `SHOW
/// DATABASES`, `SHOW [FULL] TABLES` and `SHOW [FULL] COLUMNS`, each with an optional LIKE, and
/// `SHOW INDEX`.
pub fn show_statement_to_info_schema_query(
    show: &Statement,
    current_database: Option<&str>,
) -> Result<Query, InterceptError> {
    let select = match show {
        Statement::ShowDatabases { show_options, .. }
        | Statement::ShowSchemas { show_options, .. } => {
            let mut select = ShowSelect::new("schemata", vec![("schema_name", "Database")]);
            if let Some(pattern) = like_pattern(show, show_options)? {
                select.filter_like("schema_name", &pattern);
            }
            select
        }
        Statement::ShowTables {
            full, show_options, ..
        } => {
            let database = show_options
                .show_in
                .as_ref()
                .and_then(|show_in| show_in.parent_name.as_ref())
                .and_then(|name| split_object_name(name))
                .map(|(_, name)| name)
                .or_else(|| current_database.map(str::to_string));

            let heading = match &database {
                Some(db) => format!("Tables_in_{db}"),
                None => "Table_name".to_string(),
            };
            let mut outputs = vec![("table_name", heading.as_str())];
            if *full {
                outputs.push(("table_type", "Table_type"));
            }

            let mut select = ShowSelect::new("tables", outputs);
            if let Some(db) = &database {
                select.filter_eq("table_schema", db);
            }
            if let Some(pattern) = like_pattern(show, show_options)? {
                select.filter_like("table_name", &pattern);
            }
            select
        }
        Statement::ShowColumns {
            full, show_options, ..
        } => {
            let (database, table) = show_options
                .show_in
                .as_ref()
                .and_then(|show_in| show_in.parent_name.as_ref())
                .and_then(split_object_name)
                .ok_or_else(|| InterceptError::UnsupportedShowStatement {
                    kind: "COLUMNS without a table".to_string(),
                })?;
            let database = database.or_else(|| current_database.map(str::to_string));

            let outputs = if *full {
                vec![
                    ("column_name", "Field"),
                    ("column_type", "Type"),
                    ("collation_name", "Collation"),
                    ("is_nullable", "Null"),
                    ("column_key", "Key"),
                    ("column_default", "Default"),
                    ("extra", "Extra"),
                    ("privileges", "Privileges"),
                    ("column_comment", "Comment"),
                ]
            } else {
                vec![
                    ("column_name", "Field"),
                    ("column_type", "Type"),
                    ("is_nullable", "Null"),
                    ("column_key", "Key"),
                    ("column_default", "Default"),
                    ("extra", "Extra"),
                ]
            };

            let mut select = ShowSelect::new("columns", outputs);
            select.filter_eq("table_name", &table);
            if let Some(db) = &database {
                select.filter_eq("table_schema", db);
            }
            if let Some(pattern) = like_pattern(show, show_options)? {
                select.filter_like("column_name", &pattern);
            }
            select
        }
        Statement::ShowVariable { variable } => {
            let (database, table) = index_target(variable).ok_or_else(|| {
                InterceptError::UnsupportedShowStatement {
                    kind: show_kind(show),
                }
            })?;
            let database = database.or_else(|| current_database.map(str::to_string));

            let mut select = ShowSelect::new(
                "statistics",
                vec![
                    ("table_name", "Table"),
                    ("non_unique", "Non_unique"),
                    ("index_name", "Key_name"),
                    ("seq_in_index", "Seq_in_index"),
                    ("column_name", "Column_name"),
                    ("collation", "Collation"),
                    ("cardinality", "Cardinality"),
                    ("sub_part", "Sub_part"),
                    ("packed", "Packed"),
                    ("nullable", "Null"),
                    ("index_type", "Index_type"),
                    ("comment", "Comment"),
                    ("index_comment", "Index_comment"),
                    ("is_visible", "Visible"),
                    ("expression", "Expression"),
                ],
            );
            select.filter_eq("table_name", &table);
            if let Some(db) = &database {
                select.filter_eq("table_schema", db);
            }
            select
        }
        other => {
            return Err(InterceptError::UnsupportedShowStatement {
                kind: show_kind(other),
            });
        }
    };

    let sql = select.to_sql();
    tracing::debug!(show = %show, sql = %sql, "rewrote SHOW statement");

    match SqlParser::new().parse_one(&sql)?.ast {
        Statement::Query(query) => Ok(*query),
        other => Err(InterceptError::Internal(anyhow::anyhow!(
            "SHOW rewrite produced a non-query statement: {other}"
        ))),
    }
}

/// The pieces of the generated SELECT.
struct ShowSelect {
    relation: &'static str,
    outputs: Vec<String>,
    conditions: Vec<String>,
}

impl ShowSelect {
    fn new(relation: &'static str, outputs: Vec<(&str, &str)>) -> Self {
        Self {
            relation,
            outputs: outputs
                .into_iter()
                .map(|(column, alias)| {
                    format!("{} AS {}", quote_identifier(column), quote_identifier(alias))
                })
                .collect(),
            conditions: Vec::new(),
        }
    }

    fn filter_eq(&mut self, column: &str, value: &str) {
        self.conditions
            .push(format!("{column} = {}", quote_string(value)));
    }

    fn filter_like(&mut self, column: &str, pattern: &str) {
        self.conditions
            .push(format!("{column} LIKE {}", quote_string(pattern)));
    }

    fn to_sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {INFORMATION_SCHEMA}.{}",
            self.outputs.join(", "),
            self.relation
        );
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Database and table of `SHOW {INDEX | INDEXES | KEYS} {FROM | IN} [db.]table [{FROM | IN} db]`.
///
/// The parser has no node for this form and hands it over as the bare list of words.
fn index_target(words: &[Ident]) -> Option<(Option<String>, String)> {
    let keyword = |ident: &Ident, options: &[&str]| {
        ident.quote_style.is_none()
            && options
                .iter()
                .any(|option| ident.value.eq_ignore_ascii_case(option))
    };

    let [kind, from, rest @ ..] = words else {
        return None;
    };
    if !keyword(kind, &["INDEX", "INDEXES", "KEYS"]) || !keyword(from, &["FROM", "IN"]) {
        return None;
    }
    match rest {
        [table] => Some((None, table.value.clone())),
        [db, table] => Some((Some(db.value.clone()), table.value.clone())),
        [table, from, db] if keyword(from, &["FROM", "IN"]) => {
            Some((Some(db.value.clone()), table.value.clone()))
        }
        _ => None,
    }
}

fn like_pattern(
    show: &Statement,
    options: &ShowStatementOptions,
) -> Result<Option<String>, InterceptError> {
    let filter = match &options.filter_position {
        None => return Ok(None),
        Some(ShowStatementFilterPosition::Infix(filter))
        | Some(ShowStatementFilterPosition::Suffix(filter)) => filter,
    };
    match filter {
        ShowStatementFilter::Like(pattern)
        | ShowStatementFilter::ILike(pattern)
        | ShowStatementFilter::NoKeyword(pattern) => Ok(Some(pattern.clone())),
        ShowStatementFilter::Where(_) => Err(InterceptError::UnsupportedShowStatement {
            kind: format!("{} ... WHERE", show_kind(show)),
        }),
    }
}

/// The word naming what a SHOW statement lists, e.g. `TABLES` for `SHOW FULL TABLES`.
fn show_kind(statement: &Statement) -> String {
    let sql = statement.to_string();
    let mut words = sql.split_whitespace();
    let first = words.next().unwrap_or_default();
    if !first.eq_ignore_ascii_case("SHOW") {
        return first.to_ascii_uppercase();
    }
    words
        .find(|word| {
            !matches!(
                word.to_ascii_uppercase().as_str(),
                "FULL" | "EXTENDED" | "TERSE" | "GLOBAL" | "SESSION"
            )
        })
        .unwrap_or_default()
        .to_ascii_uppercase()
}
