//! Built-in functions that depend on session state.
//!
//! These are resolved to literals before a statement leaves the interception layer, so the
//! backend never has to know about MySQL's connection-scoped built-ins.

use crate::context::SessionContext;
use mimic_core::Value;

/// A context-dependent MySQL built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    ConnectionId,
    User,
    CurrentUser,
    Version,
    Database,
    Now,
    CurDate,
    CurTime,
}

/// Canonical names.
const BUILTINS: &[(&str, Builtin)] = &[
    ("CONNECTION_ID", Builtin::ConnectionId),
    ("USER", Builtin::User),
    ("CURRENT_USER", Builtin::CurrentUser),
    ("VERSION", Builtin::Version),
    ("DATABASE", Builtin::Database),
    ("NOW", Builtin::Now),
    ("CURDATE", Builtin::CurDate),
    ("CURTIME", Builtin::CurTime),
];

/// Alternative spellings and the canonical name they stand for.
const SYNONYMS: &[(&str, &str)] = &[
    ("SYSTEM_USER", "USER"),
    ("SESSION_USER", "USER"),
    ("SCHEMA", "DATABASE"),
    ("CURRENT_TIMESTAMP", "NOW"),
    ("LOCALTIME", "NOW"),
    ("LOCALTIMESTAMP", "NOW"),
    ("CURRENT_DATE", "CURDATE"),
    ("CURRENT_TIME", "CURTIME"),
];

/// Names MySQL accepts without parentheses.
const CONSTANTS: &[&str] = &[
    "CURRENT_USER",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
];

impl Builtin {
    /// Look up a built-in by name, following synonyms. Case-insensitive.
    pub fn lookup(name: &str) -> Option<Builtin> {
        let upper = name.to_ascii_uppercase();
        let canonical = SYNONYMS
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, target)| *target)
            .unwrap_or(upper.as_str());
        BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == canonical)
            .map(|(_, b)| *b)
    }

    pub fn resolve(self, ctx: &SessionContext<'_>) -> Value {
        match self {
            Builtin::ConnectionId => Value::from(ctx.connection_id),
            Builtin::User => Value::from(ctx.external_user.clone()),
            Builtin::CurrentUser => Value::from(ctx.current_user.clone()),
            Builtin::Version => Value::from(ctx.version.clone()),
            Builtin::Database => Value::from(ctx.database.clone()),
            Builtin::Now => Value::from(ctx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Builtin::CurDate => Value::from(ctx.timestamp.format("%Y-%m-%d").to_string()),
            Builtin::CurTime => Value::from(ctx.timestamp.format("%H:%M:%S").to_string()),
        }
    }
}

/// Whether a bare identifier (no parentheses) names a built-in.
pub fn is_constant(name: &str) -> bool {
    CONSTANTS.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Built-ins bound to one statement's snapshot.
pub struct FunctionTable<'c, 'v> {
    ctx: &'c SessionContext<'v>,
}

impl<'c, 'v> FunctionTable<'c, 'v> {
    pub fn new(ctx: &'c SessionContext<'v>) -> Self {
        Self { ctx }
    }

    /// Resolve a function-call name. `None` if it is not a session built-in.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        Builtin::lookup(name).map(|builtin| builtin.resolve(self.ctx))
    }

    /// Resolve a bare identifier such as `CURRENT_USER`.
    pub fn resolve_constant(&self, name: &str) -> Option<Value> {
        if is_constant(name) {
            self.resolve(name)
        } else {
            None
        }
    }

    pub fn context(&self) -> &SessionContext<'v> {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ClientIdentity;
    use crate::variables::{GlobalVariables, SessionVariables};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn with_table(f: impl FnOnce(&FunctionTable<'_, '_>)) {
        let vars = SessionVariables::new(Arc::new(GlobalVariables::default()));
        let identity = ClientIdentity::new(42, "bob").with_database("shop");
        let timestamp = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        let ctx = SessionContext::at(&identity, &vars, timestamp).unwrap();
        f(&FunctionTable::new(&ctx));
    }

    #[test]
    fn test_synonyms() {
        assert_eq!(Builtin::lookup("now"), Some(Builtin::Now));
        assert_eq!(Builtin::lookup("CURRENT_TIMESTAMP"), Some(Builtin::Now));
        assert_eq!(Builtin::lookup("LocalTime"), Some(Builtin::Now));
        assert_eq!(Builtin::lookup("schema"), Some(Builtin::Database));
        assert_eq!(Builtin::lookup("SESSION_USER"), Some(Builtin::User));
        assert_eq!(Builtin::lookup("CURRENT_DATE"), Some(Builtin::CurDate));
        assert_eq!(Builtin::lookup("CONCAT"), None);
    }

    #[test]
    fn test_resolve() {
        with_table(|table| {
            assert_eq!(table.resolve("CONNECTION_ID"), Some(Value::Int(42)));
            assert_eq!(table.resolve("current_user"), Some(Value::from("bob")));
            assert_eq!(table.resolve("DATABASE"), Some(Value::from("shop")));
            assert_eq!(table.resolve("VERSION"), Some(Value::from("8.0.29")));
            assert_eq!(
                table.resolve("NOW"),
                Some(Value::from("2023-12-31 23:59:58"))
            );
            assert_eq!(table.resolve("CURDATE"), Some(Value::from("2023-12-31")));
            assert_eq!(table.resolve("CURRENT_TIME"), Some(Value::from("23:59:58")));
            assert_eq!(table.resolve("UPPER"), None);
        });
    }

    #[test]
    fn test_constants() {
        assert!(is_constant("current_user"));
        assert!(!is_constant("NOW"));
        with_table(|table| {
            assert_eq!(table.resolve_constant("NOW"), None);
            assert_eq!(
                table.resolve_constant("CURRENT_TIMESTAMP"),
                Some(Value::from("2023-12-31 23:59:58"))
            );
        });
    }

    #[test]
    fn test_database_null_without_selection() {
        let vars = SessionVariables::new(Arc::new(GlobalVariables::default()));
        let identity = ClientIdentity::new(1, "bob");
        let ctx = SessionContext::new(&identity, &vars).unwrap();
        assert_eq!(FunctionTable::new(&ctx).resolve("DATABASE"), Some(Value::Null));
    }
}
