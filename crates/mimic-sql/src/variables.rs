//! System variables.
//!
//! Two stores share one declared schema:
//!
//! - [`GlobalVariables`]: process-wide values, fixed once the server is configured and shared
//!   between connections through an `Arc`.
//! - [`SessionVariables`]: connection-local overrides that fall back to the globals. `SET`
//!   statements and SET_VAR hints only ever write here, so connections cannot observe each
//!   other's session state.

use crate::error::InterceptError;
use mimic_core::{ServerConfig, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Declared type of a system variable. Assigned values are coerced to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Bool,
    Int,
    Str,
}

/// Declaration of one system variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub kind: VariableKind,
    pub default: Value,
    /// Whether clients may change it at runtime.
    pub dynamic: bool,
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    Value(Value),
    /// `SET x = DEFAULT`
    Default,
}

/// Declared variables, keyed by lowercase name.
#[derive(Debug, Clone, Default)]
pub struct VariableSchema {
    defs: BTreeMap<String, VariableDef>,
}

impl VariableSchema {
    /// The variables every MySQL client expects to be able to read.
    pub fn mysql() -> Self {
        use VariableKind::*;

        let mut schema = Self::default();
        schema.define("autocommit", Bool, true, true);
        schema.define("version", Str, "8.0.29", false);
        schema.define("version_comment", Str, "mysql-mimic", false);
        schema.define("external_user", Str, "", false);
        for name in [
            "character_set_client",
            "character_set_results",
            "character_set_server",
            "character_set_connection",
            "character_set_database",
        ] {
            schema.define(name, Str, "utf8mb4", true);
        }
        for name in [
            "collation_server",
            "collation_database",
            "collation_connection",
        ] {
            schema.define(name, Str, "utf8mb4_general_ci", true);
        }
        schema.define("transaction_isolation", Str, "READ-COMMITTED", true);
        schema.define("transaction_read_only", Bool, false, true);
        schema.define("sql_mode", Str, "ANSI", true);
        schema.define("time_zone", Str, "SYSTEM", true);
        schema.define("lower_case_table_names", Int, 0, false);
        schema.define("max_allowed_packet", Int, 67_108_864, true);
        schema.define("wait_timeout", Int, 28_800, true);
        schema.define("interactive_timeout", Int, 28_800, true);
        schema.define("net_write_timeout", Int, 60, true);
        schema.define("sql_select_limit", Int, i64::MAX, true);
        schema
    }

    pub fn define(
        &mut self,
        name: &str,
        kind: VariableKind,
        default: impl Into<Value>,
        dynamic: bool,
    ) {
        self.defs.insert(
            name.to_ascii_lowercase(),
            VariableDef {
                kind,
                default: default.into(),
                dynamic,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&VariableDef> {
        self.defs.get(&name.to_ascii_lowercase())
    }

    /// Like [`VariableSchema::get`], but unknown names are an error.
    pub fn require(&self, name: &str) -> Result<&VariableDef, InterceptError> {
        self.get(name).ok_or_else(|| InterceptError::UnknownVariable {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }
}

/// Process-wide variable values.
#[derive(Debug, Clone)]
pub struct GlobalVariables {
    schema: VariableSchema,
    values: BTreeMap<String, Value>,
}

impl Default for GlobalVariables {
    fn default() -> Self {
        Self::new(VariableSchema::mysql())
    }
}

impl GlobalVariables {
    pub fn new(schema: VariableSchema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Globals for a configured server: identity from `server`, then explicit overrides.
    pub fn from_config(
        server: &ServerConfig,
        overrides: &BTreeMap<String, Value>,
    ) -> Result<Self, InterceptError> {
        let mut globals = Self::default();
        globals.set("version", Setting::Value(server.version.clone().into()), true)?;
        globals.set(
            "version_comment",
            Setting::Value(server.version_comment.clone().into()),
            true,
        )?;
        for (name, value) in overrides {
            globals.set(name, Setting::Value(value.clone()), true)?;
        }
        Ok(globals)
    }

    /// Every declared variable with its global value, sorted by name.
    pub fn list(&self) -> Vec<(String, Value)> {
        self.schema
            .names()
            .filter_map(|name| self.get(name).ok().map(|value| (name.to_string(), value)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<Value, InterceptError> {
        let def = self.schema.require(name)?;
        Ok(self
            .values
            .get(&name.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| def.default.clone()))
    }

    /// Globals are only written while the server is being configured, before they are shared.
    pub fn set(&mut self, name: &str, setting: Setting, force: bool) -> Result<(), InterceptError> {
        let def = self.schema.require(name)?;
        if !def.dynamic && !force {
            return Err(InterceptError::VariableNotDynamic {
                name: name.to_string(),
            });
        }
        let key = name.to_ascii_lowercase();
        match setting {
            Setting::Default => {
                self.values.remove(&key);
            }
            Setting::Value(value) => {
                let value = coerce(name, def.kind, value)?;
                self.values.insert(key, value);
            }
        }
        Ok(())
    }
}

/// Connection-local variable values.
#[derive(Debug, Clone)]
pub struct SessionVariables {
    globals: Arc<GlobalVariables>,
    values: BTreeMap<String, Value>,
}

impl SessionVariables {
    pub fn new(globals: Arc<GlobalVariables>) -> Self {
        Self {
            globals,
            values: BTreeMap::new(),
        }
    }

    pub fn globals(&self) -> &Arc<GlobalVariables> {
        &self.globals
    }

    /// Current value: the session override if present, otherwise the global value.
    pub fn get(&self, name: &str) -> Result<Value, InterceptError> {
        self.globals.schema.require(name)?;
        match self.values.get(&name.to_ascii_lowercase()) {
            Some(value) => Ok(value.clone()),
            None => self.globals.get(name),
        }
    }

    /// Assign a session value.
    ///
    /// Read-only variables are rejected unless `force` is set. `DEFAULT` drops the session
    /// override so the global value shows through again.
    pub fn set(&mut self, name: &str, setting: Setting, force: bool) -> Result<(), InterceptError> {
        let def = self.globals.schema.require(name)?;
        if !def.dynamic && !force {
            return Err(InterceptError::VariableNotDynamic {
                name: name.to_string(),
            });
        }
        let key = name.to_ascii_lowercase();
        match setting {
            Setting::Default => {
                self.values.remove(&key);
            }
            Setting::Value(value) => {
                let value = coerce(name, def.kind, value)?;
                self.values.insert(key, value);
            }
        }
        Ok(())
    }

    /// Every declared variable with its current value, sorted by name.
    pub fn list(&self) -> Vec<(String, Value)> {
        self.globals
            .schema
            .names()
            .filter_map(|name| self.get(name).ok().map(|value| (name.to_string(), value)))
            .collect()
    }

    /// The raw session override for `name`, without global fallback.
    pub(crate) fn local(&self, name: &str) -> Option<Value> {
        self.values.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Put back a session override captured with [`SessionVariables::local`].
    pub(crate) fn restore_local(&mut self, name: &str, prior: Option<Value>) {
        let key = name.to_ascii_lowercase();
        match prior {
            Some(value) => {
                self.values.insert(key, value);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }
}

fn coerce(name: &str, kind: VariableKind, value: Value) -> Result<Value, InterceptError> {
    let invalid = |value: &Value| InterceptError::InvalidVariableValue {
        name: name.to_string(),
        value: value.to_string(),
    };

    match kind {
        VariableKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::Int(0) => Ok(Value::Bool(false)),
            Value::Int(1) => Ok(Value::Bool(true)),
            Value::Str(s) => match s.trim().to_ascii_uppercase().as_str() {
                "ON" | "TRUE" | "1" => Ok(Value::Bool(true)),
                "OFF" | "FALSE" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid(&value)),
            },
            _ => Err(invalid(&value)),
        },
        VariableKind::Int => match &value {
            Value::Int(_) => Ok(value),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| invalid(&value)),
            _ => Err(invalid(&value)),
        },
        VariableKind::Str => match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Str(if b { "ON" } else { "OFF" }.to_string())),
            other => Ok(Value::Str(other.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> SessionVariables {
        SessionVariables::new(Arc::new(GlobalVariables::default()))
    }

    #[test]
    fn test_defaults() {
        let vars = session();
        assert_eq!(vars.get("autocommit").unwrap(), Value::Bool(true));
        assert_eq!(vars.get("VERSION").unwrap(), Value::from("8.0.29"));
        assert_eq!(vars.get("lower_case_table_names").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_unknown_variable() {
        let mut vars = session();
        assert!(matches!(
            vars.get("foo"),
            Err(InterceptError::UnknownVariable { .. })
        ));
        assert!(matches!(
            vars.set("foo", Setting::Value(Value::Int(1)), false),
            Err(InterceptError::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_set_and_reset() {
        let mut vars = session();
        vars.set("sql_mode", Setting::Value(Value::from("TRADITIONAL")), false)
            .unwrap();
        assert_eq!(vars.get("sql_mode").unwrap(), Value::from("TRADITIONAL"));

        vars.set("sql_mode", Setting::Default, false).unwrap();
        assert_eq!(vars.get("sql_mode").unwrap(), Value::from("ANSI"));
    }

    #[test]
    fn test_read_only() {
        let mut vars = session();
        assert!(matches!(
            vars.set("version", Setting::Value(Value::from("9")), false),
            Err(InterceptError::VariableNotDynamic { .. })
        ));
        vars.set("version", Setting::Value(Value::from("9")), true)
            .unwrap();
        assert_eq!(vars.get("version").unwrap(), Value::from("9"));
    }

    #[test]
    fn test_coercion() {
        let mut vars = session();
        vars.set("autocommit", Setting::Value(Value::Int(0)), false)
            .unwrap();
        assert_eq!(vars.get("autocommit").unwrap(), Value::Bool(false));

        vars.set("autocommit", Setting::Value(Value::from("on")), false)
            .unwrap();
        assert_eq!(vars.get("autocommit").unwrap(), Value::Bool(true));

        vars.set("wait_timeout", Setting::Value(Value::from("60")), false)
            .unwrap();
        assert_eq!(vars.get("wait_timeout").unwrap(), Value::Int(60));

        vars.set("character_set_results", Setting::Value(Value::Null), false)
            .unwrap();
        assert_eq!(vars.get("character_set_results").unwrap(), Value::Null);

        assert!(matches!(
            vars.set("autocommit", Setting::Value(Value::from("maybe")), false),
            Err(InterceptError::InvalidVariableValue { .. })
        ));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let globals = Arc::new(GlobalVariables::default());
        let mut a = SessionVariables::new(globals.clone());
        let b = SessionVariables::new(globals);

        a.set("sql_mode", Setting::Value(Value::from("STRICT")), false)
            .unwrap();
        assert_eq!(a.get("sql_mode").unwrap(), Value::from("STRICT"));
        assert_eq!(b.get("sql_mode").unwrap(), Value::from("ANSI"));
    }

    #[test]
    fn test_from_config() {
        let server = ServerConfig {
            version: "5.7.99".to_string(),
            ..ServerConfig::default()
        };
        let mut overrides = BTreeMap::new();
        overrides.insert("sql_mode".to_string(), Value::from("TRADITIONAL"));

        let globals = GlobalVariables::from_config(&server, &overrides).unwrap();
        assert_eq!(globals.get("version").unwrap(), Value::from("5.7.99"));
        assert_eq!(globals.get("sql_mode").unwrap(), Value::from("TRADITIONAL"));

        let mut overrides = BTreeMap::new();
        overrides.insert("no_such_var".to_string(), Value::Int(1));
        assert!(GlobalVariables::from_config(&server, &overrides).is_err());
    }

    #[test]
    fn test_list_sorted() {
        let vars = session();
        let names: Vec<String> = vars.list().into_iter().map(|(n, _)| n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"autocommit".to_string()));
    }

    #[test]
    fn test_global_list_ignores_session_values() {
        let mut vars = session();
        vars.set("sql_mode", Setting::Value(Value::from("STRICT")), false)
            .unwrap();

        let lookup = |list: Vec<(String, Value)>| {
            list.into_iter()
                .find(|(name, _)| name == "sql_mode")
                .map(|(_, value)| value)
        };
        assert_eq!(lookup(vars.list()), Some(Value::from("STRICT")));
        assert_eq!(lookup(vars.globals().list()), Some(Value::from("ANSI")));
    }

    #[test]
    fn test_local_restore() {
        let mut vars = session();
        let prior = vars.local("sql_mode");
        vars.set("sql_mode", Setting::Value(Value::from("X")), false)
            .unwrap();
        vars.restore_local("sql_mode", prior);
        assert_eq!(vars.local("sql_mode"), None);
        assert_eq!(vars.get("sql_mode").unwrap(), Value::from("ANSI"));
    }
}
