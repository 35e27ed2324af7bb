//! Schema model: backend columns described by a nested mapping.

use crate::error::InterceptError;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// The only catalog MySQL knows about.
pub const DEFAULT_CATALOG: &str = "def";

/// One column of a backend table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Raw type text, e.g. `VARCHAR(255)`.
    pub data_type: String,
    pub table: String,
    pub schema: String,
    pub catalog: String,
    pub comment: String,
    pub default: Option<String>,
    pub is_nullable: bool,
}

impl Column {
    /// A column with every optional field at its default.
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            table: table.into(),
            schema: schema.into(),
            catalog: DEFAULT_CATALOG.to_string(),
            comment: String::new(),
            default: None,
            is_nullable: true,
        }
    }
}

/// A mapping leaf: a bare type, or a record with the type plus metadata.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Type(String),
    Record(ColumnRecord),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnRecord {
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    default: Option<JsonValue>,
    #[serde(default = "default_nullable")]
    is_nullable: bool,
}

fn default_nullable() -> bool {
    true
}

const RECORD_KEYS: &[&str] = &["type", "comment", "default", "is_nullable"];

/// Whether `value` is a column leaf rather than another nesting level.
fn is_leaf(value: &JsonValue) -> bool {
    match value {
        JsonValue::Object(map) => {
            matches!(map.get("type"), Some(JsonValue::String(_)))
                && map.keys().all(|k| RECORD_KEYS.contains(&k.as_str()))
        }
        _ => true,
    }
}

/// Nesting depth, found by following the first entry at each level.
fn depth(value: &JsonValue) -> usize {
    if is_leaf(value) {
        return 0;
    }
    match value {
        JsonValue::Object(map) => 1 + map.values().next().map(depth).unwrap_or(0),
        _ => 0,
    }
}

/// Flatten a schema mapping into columns, in mapping order.
///
/// - depth 1: `{column: type}`, one table with an empty name
/// - depth 2: `{table: {column: type}}`
/// - depth 3: `{schema: {table: {column: type}}}`
///
/// Tables without a schema level get the empty schema name.
pub fn mapping_to_columns(mapping: &JsonValue) -> Result<Vec<Column>, InterceptError> {
    let JsonValue::Object(root) = mapping else {
        return Err(InterceptError::InvalidSchemaMapping(
            "expected a mapping at the top level".to_string(),
        ));
    };
    if root.is_empty() {
        return Ok(Vec::new());
    }

    let mut columns = Vec::new();
    match depth(mapping) {
        1 => push_table(&mut columns, "", "", root)?,
        2 => push_schema(&mut columns, "", root)?,
        3 => {
            for (schema, tables) in root {
                push_schema(&mut columns, schema, as_object(tables, schema)?)?;
            }
        }
        n => {
            return Err(InterceptError::InvalidSchemaMapping(format!(
                "expected 1 to 3 levels of nesting, found {n}"
            )));
        }
    }
    Ok(columns)
}

fn push_schema(
    columns: &mut Vec<Column>,
    schema: &str,
    tables: &Map<String, JsonValue>,
) -> Result<(), InterceptError> {
    for (table, cols) in tables {
        push_table(columns, schema, table, as_object(cols, table)?)?;
    }
    Ok(())
}

fn push_table(
    columns: &mut Vec<Column>,
    schema: &str,
    table: &str,
    cols: &Map<String, JsonValue>,
) -> Result<(), InterceptError> {
    for (name, spec) in cols {
        let spec: ColumnSpec = serde_json::from_value(spec.clone()).map_err(|e| {
            InterceptError::InvalidSchemaMapping(format!("column '{table}.{name}': {e}"))
        })?;

        let mut column = Column::new(schema, table, name.as_str(), "");
        match spec {
            ColumnSpec::Type(data_type) => column.data_type = data_type,
            ColumnSpec::Record(record) => {
                column.data_type = record.data_type;
                column.comment = record.comment.unwrap_or_default();
                column.default = record.default.and_then(default_text);
                column.is_nullable = record.is_nullable;
            }
        }
        columns.push(column);
    }
    Ok(())
}

fn as_object<'a>(
    value: &'a JsonValue,
    name: &str,
) -> Result<&'a Map<String, JsonValue>, InterceptError> {
    value.as_object().ok_or_else(|| {
        InterceptError::InvalidSchemaMapping(format!("'{name}' must be a mapping"))
    })
}

/// Column defaults are kept as text, the way INFORMATION_SCHEMA reports them.
fn default_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn names(columns: &[Column]) -> Vec<(&str, &str, &str)> {
        columns
            .iter()
            .map(|c| (c.schema.as_str(), c.table.as_str(), c.name.as_str()))
            .collect()
    }

    #[test]
    fn test_depth_one() {
        let columns = mapping_to_columns(&json!({"id": "INT", "name": "TEXT"})).unwrap();
        assert_eq!(names(&columns), vec![("", "", "id"), ("", "", "name")]);
        assert!(columns.iter().all(|c| c.catalog == "def"));
    }

    #[test]
    fn test_depth_two_preserves_order() {
        let columns = mapping_to_columns(&json!({
            "users": {"zeta": "INT", "alpha": "TEXT"},
            "orders": {"id": "INT"},
        }))
        .unwrap();
        assert_eq!(
            names(&columns),
            vec![
                ("", "users", "zeta"),
                ("", "users", "alpha"),
                ("", "orders", "id")
            ]
        );
        assert_eq!(columns[0].data_type, "INT");
        assert_eq!(columns[0].comment, "");
        assert_eq!(columns[0].default, None);
        assert!(columns[0].is_nullable);
    }

    #[test]
    fn test_depth_three() {
        let columns = mapping_to_columns(&json!({
            "shop": {"users": {"id": "INT"}},
            "crm": {"leads": {"id": "INT", "email": "TEXT"}},
        }))
        .unwrap();
        assert_eq!(
            names(&columns),
            vec![
                ("shop", "users", "id"),
                ("crm", "leads", "id"),
                ("crm", "leads", "email")
            ]
        );
    }

    #[test]
    fn test_metadata_record() {
        let columns = mapping_to_columns(&json!({
            "shop": {"users": {
                "id": {"type": "INT", "is_nullable": false, "default": 0},
                "name": {"type": "TEXT", "comment": "display name", "default": "anon"},
            }}
        }))
        .unwrap();

        assert_eq!(columns[0].data_type, "INT");
        assert!(!columns[0].is_nullable);
        assert_eq!(columns[0].default.as_deref(), Some("0"));
        assert_eq!(columns[0].comment, "");

        assert_eq!(columns[1].comment, "display name");
        assert_eq!(columns[1].default.as_deref(), Some("anon"));
        assert!(columns[1].is_nullable);
    }

    #[test]
    fn test_record_at_depth_one() {
        let columns =
            mapping_to_columns(&json!({"id": {"type": "INT", "comment": "pk"}})).unwrap();
        assert_eq!(names(&columns), vec![("", "", "id")]);
        assert_eq!(columns[0].comment, "pk");
    }

    #[test]
    fn test_invalid_mappings() {
        assert!(mapping_to_columns(&json!(["a"])).is_err());
        assert!(mapping_to_columns(&json!({"a": {"b": {"c": {"d": "INT"}}}})).is_err());
        assert!(mapping_to_columns(&json!({"t": {"c": {"type": "INT", "extra": 1}}})).is_err());
        assert!(mapping_to_columns(&json!({})).unwrap().is_empty());
    }
}
