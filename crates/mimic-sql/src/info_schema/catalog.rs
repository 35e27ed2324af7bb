//! The synthetic INFORMATION_SCHEMA relations.

use super::columns::{Column, DEFAULT_CATALOG, mapping_to_columns};
use super::query;
use crate::error::InterceptError;
use crate::parser::{SqlParser, TableReference};
use mimic_core::{ResultSet, Value};
use sqlparser::ast::Query;
use std::collections::{BTreeMap, HashMap};

pub const INFORMATION_SCHEMA: &str = "information_schema";

const ENGINE: &str = "MinervaSQL";
const ENGINE_VERSION: &str = "1.0";
const CHARSET: &str = "utf8mb4";
const COLLATION: &str = "utf8mb4_general_ci";

/// Layout of the catalog's own relations: `(table, [(column, type)])`.
const RELATIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "schemata",
        &[
            ("catalog_name", "TEXT"),
            ("schema_name", "TEXT"),
            ("default_character_set_name", "TEXT"),
            ("default_collation_name", "TEXT"),
            ("sql_path", "TEXT"),
        ],
    ),
    (
        "tables",
        &[
            ("table_catalog", "TEXT"),
            ("table_schema", "TEXT"),
            ("table_name", "TEXT"),
            ("table_type", "TEXT"),
            ("engine", "TEXT"),
            ("version", "TEXT"),
            ("row_format", "TEXT"),
            ("table_rows", "INT"),
            ("avg_row_length", "INT"),
            ("data_length", "INT"),
            ("max_data_length", "INT"),
            ("index_length", "INT"),
            ("data_free", "INT"),
            ("auto_increment", "INT"),
            ("create_time", "TEXT"),
            ("update_time", "TEXT"),
            ("check_time", "TEXT"),
            ("table_collation", "TEXT"),
            ("checksum", "TEXT"),
            ("create_options", "TEXT"),
            ("table_comment", "TEXT"),
        ],
    ),
    (
        "columns",
        &[
            ("table_catalog", "TEXT"),
            ("table_schema", "TEXT"),
            ("table_name", "TEXT"),
            ("column_name", "TEXT"),
            ("ordinal_position", "INT"),
            ("column_default", "TEXT"),
            ("is_nullable", "TEXT"),
            ("data_type", "TEXT"),
            ("character_maximum_length", "INT"),
            ("character_octet_length", "INT"),
            ("numeric_precision", "INT"),
            ("numeric_scale", "INT"),
            ("datetime_precision", "INT"),
            ("character_set_name", "TEXT"),
            ("collation_name", "TEXT"),
            ("column_type", "TEXT"),
            ("column_key", "TEXT"),
            ("extra", "TEXT"),
            ("privileges", "TEXT"),
            ("column_comment", "TEXT"),
            ("generation_expression", "TEXT"),
            ("srs_id", "TEXT"),
        ],
    ),
    (
        "key_column_usage",
        &[
            ("constraint_catalog", "TEXT"),
            ("constraint_schema", "TEXT"),
            ("constraint_name", "TEXT"),
            ("table_catalog", "TEXT"),
            ("table_schema", "TEXT"),
            ("table_name", "TEXT"),
            ("column_name", "TEXT"),
            ("ordinal_position", "INT"),
            ("position_in_unique_constraint", "INT"),
            ("referenced_table_schema", "TEXT"),
            ("referenced_table_name", "TEXT"),
            ("referenced_column_name", "TEXT"),
        ],
    ),
    (
        "referential_constraints",
        &[
            ("constraint_catalog", "TEXT"),
            ("constraint_schema", "TEXT"),
            ("constraint_name", "TEXT"),
            ("unique_constraint_catalog", "TEXT"),
            ("unique_constraint_schema", "TEXT"),
            ("unique_constraint_name", "TEXT"),
            ("match_option", "TEXT"),
            ("update_rule", "TEXT"),
            ("delete_rule", "TEXT"),
            ("table_name", "TEXT"),
            ("referenced_table_name", "TEXT"),
        ],
    ),
    (
        "character_sets",
        &[
            ("character_set_name", "TEXT"),
            ("default_collate_name", "TEXT"),
            ("description", "TEXT"),
            ("maxlen", "INT"),
        ],
    ),
    (
        "statistics",
        &[
            ("table_catalog", "TEXT"),
            ("table_schema", "TEXT"),
            ("table_name", "TEXT"),
            ("non_unique", "INT"),
            ("index_schema", "TEXT"),
            ("index_name", "TEXT"),
            ("seq_in_index", "INT"),
            ("column_name", "TEXT"),
            ("collation", "TEXT"),
            ("cardinality", "INT"),
            ("sub_part", "TEXT"),
            ("packed", "TEXT"),
            ("nullable", "TEXT"),
            ("index_type", "TEXT"),
            ("comment", "TEXT"),
            ("index_comment", "TEXT"),
            ("is_visible", "TEXT"),
            ("expression", "TEXT"),
        ],
    ),
    (
        "parameters",
        &[
            ("specific_catalog", "TEXT"),
            ("specific_schema", "TEXT"),
            ("specific_name", "TEXT"),
            ("ordinal_position", "INT"),
            ("parameter_mode", "TEXT"),
            ("parameter_name", "TEXT"),
            ("data_type", "TEXT"),
            ("character_maximum_length", "INT"),
            ("character_octet_length", "INT"),
            ("numeric_precision", "INT"),
            ("numeric_scale", "INT"),
            ("datetime_precision", "INT"),
            ("character_set_name", "TEXT"),
            ("collation_name", "TEXT"),
            ("dtd_identifier", "TEXT"),
            ("routine_type", "TEXT"),
        ],
    ),
];

/// The catalog's own relations, described as columns.
fn catalog_columns() -> impl Iterator<Item = Column> {
    RELATIONS.iter().flat_map(|(table, cols)| {
        cols.iter()
            .map(move |(name, data_type)| Column::new(INFORMATION_SCHEMA, *table, *name, *data_type))
    })
}

/// A virtual INFORMATION_SCHEMA built from a fixed set of columns.
///
/// Built once and never mutated; a schema reload builds a new one.
#[derive(Debug, Clone)]
pub struct InfoSchema {
    /// Relation name (lowercase) to its rows.
    relations: BTreeMap<String, ResultSet>,
    /// Backend columns, excluding the catalog's own.
    column_count: usize,
    table_count: usize,
}

impl Default for InfoSchema {
    fn default() -> Self {
        Self::from_columns(Vec::new())
    }
}

impl InfoSchema {
    /// Index backend columns and precompute every relation's rows.
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        let user_columns: Vec<Column> = columns.into_iter().collect();
        let column_count = user_columns.len();

        let mut relations: BTreeMap<String, ResultSet> = RELATIONS
            .iter()
            .map(|(name, cols)| {
                let names = cols.iter().map(|(c, _)| c.to_string()).collect();
                (name.to_string(), ResultSet::new(names, Vec::new()))
            })
            .collect();

        let mut ordinals: HashMap<(String, String, String), i64> = HashMap::new();
        let mut tables: Vec<(String, String, String)> = Vec::new();
        let mut schemas: Vec<(String, String)> = Vec::new();

        let mut column_rows = Vec::new();
        for column in user_columns.into_iter().chain(catalog_columns()) {
            let table_key = (
                column.catalog.clone(),
                column.schema.clone(),
                column.table.clone(),
            );
            let ordinal = ordinals.entry(table_key.clone()).or_insert(0);
            *ordinal += 1;

            if !tables.contains(&table_key) {
                tables.push(table_key);
            }
            let schema_key = (column.catalog.clone(), column.schema.clone());
            if !schemas.contains(&schema_key) {
                schemas.push(schema_key);
            }

            column_rows.push(column_row(&column, *ordinal));
        }

        let table_count = tables
            .iter()
            .filter(|(_, schema, _)| schema != INFORMATION_SCHEMA)
            .count();

        let table_rows = tables
            .into_iter()
            .map(|(catalog, schema, table)| table_row(catalog, schema, table))
            .collect();
        let schema_rows = schemas
            .into_iter()
            .map(|(catalog, schema)| {
                vec![
                    Value::from(catalog),
                    Value::from(schema),
                    Value::from(CHARSET),
                    Value::from(COLLATION),
                    Value::Null,
                ]
            })
            .collect();

        if let Some(relation) = relations.get_mut("columns") {
            relation.rows = column_rows;
        }
        if let Some(relation) = relations.get_mut("tables") {
            relation.rows = table_rows;
        }
        if let Some(relation) = relations.get_mut("schemata") {
            relation.rows = schema_rows;
        }

        Self {
            relations,
            column_count,
            table_count,
        }
    }

    /// Build a catalog straight from a schema mapping.
    pub fn from_mapping(mapping: &serde_json::Value) -> Result<Self, InterceptError> {
        Ok(Self::from_columns(mapping_to_columns(mapping)?))
    }

    /// A relation by name, case-insensitively.
    pub fn relation(&self, name: &str) -> Option<&ResultSet> {
        self.relations.get(&name.to_ascii_lowercase())
    }

    /// Number of backend columns the catalog describes.
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Number of backend tables the catalog describes.
    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// Whether every table `query` reads from is one of the catalog's relations.
    pub fn handles(&self, query: &Query, current_database: Option<&str>) -> bool {
        let tables = SqlParser::new().extract_tables(query);
        !tables.is_empty()
            && tables
                .iter()
                .all(|table| self.resolves(table, current_database))
    }

    pub(crate) fn resolves(&self, table: &TableReference, current_database: Option<&str>) -> bool {
        let schema = table.schema.as_deref().or(current_database);
        matches!(schema, Some(s) if s.eq_ignore_ascii_case(INFORMATION_SCHEMA))
            && self.relation(&table.name).is_some()
    }

    /// Evaluate a SELECT over the catalog's relations.
    pub fn query(&self, query: &Query) -> Result<ResultSet, InterceptError> {
        query::evaluate(self, query)
    }
}

fn column_row(column: &Column, ordinal: i64) -> Vec<Value> {
    vec![
        Value::from(column.catalog.as_str()),
        Value::from(column.schema.as_str()),
        Value::from(column.table.as_str()),
        Value::from(column.name.as_str()),
        Value::Int(ordinal),
        Value::from(column.default.clone()),
        Value::from(if column.is_nullable { "YES" } else { "NO" }),
        Value::from(column.data_type.as_str()),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::from(column.data_type.as_str()),
        Value::from(""),
        Value::from(""),
        Value::from("select"),
        Value::from(column.comment.as_str()),
        Value::Null,
        Value::Null,
    ]
}

fn table_row(catalog: String, schema: String, table: String) -> Vec<Value> {
    let table_type = if schema == INFORMATION_SCHEMA {
        "SYSTEM TABLE"
    } else {
        "BASE TABLE"
    };
    let catalog = if catalog.is_empty() {
        DEFAULT_CATALOG.to_string()
    } else {
        catalog
    };
    vec![
        Value::from(catalog),
        Value::from(schema),
        Value::from(table),
        Value::from(table_type),
        Value::from(ENGINE),
        Value::from(ENGINE_VERSION),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Null,
        Value::from(COLLATION),
        Value::Null,
        Value::Null,
        Value::Null,
    ]
}
