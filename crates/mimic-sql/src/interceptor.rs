//! Statement-scoped variable and built-in resolution.
//!
//! [`VariableScope::begin`] applies a statement's SET_VAR hints to the session store and rewrites
//! its AST so that session built-ins and variable references become literals. The scope puts every
//! hinted variable back when it ends, whether through [`VariableScope::end`] or by being dropped
//! (errors, early returns, a cancelled future).

use crate::context::{ClientIdentity, SessionContext};
use crate::error::InterceptError;
use crate::functions::FunctionTable;
use crate::hints::extract_set_var_assignments;
use crate::literal::value_to_expression;
use crate::parser::InterceptedStatement;
use crate::variables::{SessionVariables, Setting};
use chrono::{Local, NaiveDateTime};
use mimic_core::Value;
use sqlparser::ast::{
    Expr, Ident, Query, SelectItem, Set, SetExpr, Statement, VisitMut, VisitorMut,
};
use std::ops::ControlFlow;

/// Guard over the hint-driven changes made to a connection's session variables.
pub struct VariableScope<'v> {
    variables: &'v mut SessionVariables,
    /// Session overrides as they were before the statement, in application order.
    saved: Vec<(String, Option<Value>)>,
}

impl<'v> VariableScope<'v> {
    /// Start a statement with the current time as its timestamp.
    pub fn begin(
        statement: &mut InterceptedStatement,
        variables: &'v mut SessionVariables,
        identity: &ClientIdentity,
    ) -> Result<Self, InterceptError> {
        Self::begin_at(
            statement,
            variables,
            identity,
            Local::now().naive_local(),
        )
    }

    /// Start a statement: apply its SET_VAR hints, then rewrite it against a snapshot taken at
    /// `timestamp`.
    ///
    /// On error the partially applied hints are already restored when this returns.
    pub fn begin_at(
        statement: &mut InterceptedStatement,
        variables: &'v mut SessionVariables,
        identity: &ClientIdentity,
        timestamp: NaiveDateTime,
    ) -> Result<Self, InterceptError> {
        let mut scope = Self {
            variables,
            saved: Vec::new(),
        };

        let assignments = extract_set_var_assignments(&mut statement.hints)?;
        for (name, setting) in assignments {
            scope.apply(&name, setting)?;
        }

        let ctx = SessionContext::at(identity, &*scope.variables, timestamp)?;
        rewrite_statement(&mut statement.ast, &ctx)?;

        Ok(scope)
    }

    fn apply(&mut self, name: &str, setting: Setting) -> Result<(), InterceptError> {
        tracing::debug!(variable = %name, ?setting, "applying SET_VAR hint");
        self.saved.push((name.to_string(), self.variables.local(name)));
        self.variables.set(name, setting, false)
    }

    pub fn variables(&self) -> &SessionVariables {
        &*self.variables
    }

    /// Writes made here that touch a hinted variable are undone when the scope ends.
    pub fn variables_mut(&mut self) -> &mut SessionVariables {
        &mut *self.variables
    }

    /// End the statement, restoring every hinted variable.
    pub fn end(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        while let Some((name, prior)) = self.saved.pop() {
            tracing::debug!(variable = %name, "restoring variable after statement");
            self.variables.restore_local(&name, prior);
        }
    }
}

impl Drop for VariableScope<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Replace session built-ins and variable references in `statement` with literals.
///
/// For `SET`, only the assigned values are rewritten; the targets are left alone.
pub fn rewrite_statement(
    statement: &mut Statement,
    ctx: &SessionContext<'_>,
) -> Result<(), InterceptError> {
    let mut rewriter = Rewriter {
        functions: FunctionTable::new(ctx),
        error: None,
    };

    match statement {
        Statement::Set(set) => match set {
            Set::SingleAssignment { values, .. } => {
                for value in values {
                    let _ = value.visit(&mut rewriter);
                }
            }
            Set::MultipleAssignments { assignments } => {
                for assignment in assignments {
                    let _ = assignment.value.visit(&mut rewriter);
                }
            }
            _ => {}
        },
        other => {
            let _ = other.visit(&mut rewriter);
        }
    }

    match rewriter.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

struct Rewriter<'c, 'v> {
    functions: FunctionTable<'c, 'v>,
    error: Option<InterceptError>,
}

impl Rewriter<'_, '_> {
    /// The literal value `expr` stands for, if it is something this layer resolves.
    fn substitution(&self, expr: &Expr) -> Result<Option<Value>, InterceptError> {
        let ctx = self.functions.context();
        match expr {
            Expr::Function(function) if function.name.0.len() == 1 => {
                Ok(self.functions.resolve(&function.name.to_string()))
            }
            Expr::Identifier(ident) if ident.quote_style.is_none() => {
                let name = ident.value.as_str();
                if let Some(var) = name.strip_prefix("@@") {
                    ctx.variables.get(var).map(Some)
                } else if let Some(var) = name.strip_prefix('@') {
                    ctx.variables.get(var).map(Some)
                } else {
                    Ok(self.functions.resolve_constant(name))
                }
            }
            Expr::CompoundIdentifier(parts) if parts.len() == 2 => {
                let var = parts[1].value.as_str();
                match parts[0].value.to_ascii_lowercase().as_str() {
                    "@@session" | "@@local" => ctx.variables.get(var).map(Some),
                    "@@global" => ctx.variables.globals().get(var).map(Some),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

impl Rewriter<'_, '_> {
    /// Every SELECT of a set operation names its own columns. Parenthesized subqueries are
    /// visited as queries of their own.
    fn alias_projections(&mut self, body: &mut SetExpr) {
        match body {
            SetExpr::Select(select) => {
                for item in select.projection.iter_mut() {
                    let SelectItem::UnnamedExpr(expr) = item else {
                        continue;
                    };
                    if !matches!(self.substitution(expr), Ok(Some(_))) {
                        continue;
                    }
                    let alias = Ident::with_quote('`', expr.to_string());
                    let expr = expr.clone();
                    *item = SelectItem::ExprWithAlias { expr, alias };
                }
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.alias_projections(left);
                self.alias_projections(right);
            }
            _ => {}
        }
    }
}

impl VisitorMut for Rewriter<'_, '_> {
    type Break = ();

    /// Name projected built-ins after their original text, as MySQL does.
    fn pre_visit_query(&mut self, query: &mut Query) -> ControlFlow<Self::Break> {
        self.alias_projections(query.body.as_mut());
        ControlFlow::Continue(())
    }

    fn post_visit_expr(&mut self, expr: &mut Expr) -> ControlFlow<Self::Break> {
        match self.substitution(expr) {
            Ok(Some(value)) => {
                tracing::debug!(from = %expr, to = %value, "substituting session value");
                *expr = value_to_expression(&value);
                ControlFlow::Continue(())
            }
            Ok(None) => ControlFlow::Continue(()),
            Err(error) => {
                self.error = Some(error);
                ControlFlow::Break(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use crate::variables::{GlobalVariables, VariableKind, VariableSchema};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session() -> SessionVariables {
        let mut schema = VariableSchema::mysql();
        schema.define("foo", VariableKind::Int, 0, true);
        schema.define("x", VariableKind::Int, 10, true);
        schema.define("y", VariableKind::Int, 20, true);
        SessionVariables::new(Arc::new(GlobalVariables::new(schema)))
    }

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn identity() -> ClientIdentity {
        ClientIdentity::new(9, "alice").with_database("shop")
    }

    fn parse(sql: &str) -> InterceptedStatement {
        SqlParser::new().parse_one(sql).unwrap()
    }

    #[test]
    fn test_set_var_applies_and_restores() {
        let mut vars = session();
        let mut stmt = parse("SELECT /*+ SET_VAR(foo=1) */ @@foo");

        let scope = VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp()).unwrap();
        assert_eq!(scope.variables().get("foo").unwrap(), Value::Int(1));
        scope.end();

        assert_eq!(stmt.ast.to_string(), "SELECT 1 AS `@@foo`");
        assert!(stmt.hints.is_empty());
        assert_eq!(vars.get("foo").unwrap(), Value::Int(0));
        assert_eq!(vars.local("foo"), None);
    }

    #[test]
    fn test_restores_prior_session_value() {
        let mut vars = session();
        vars.set("foo", Setting::Value(Value::Int(5)), false).unwrap();

        let mut stmt = parse("SELECT /*+ SET_VAR(foo=1) */ 1");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();

        assert_eq!(vars.get("foo").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_earliest_hint_wins() {
        let mut vars = session();
        let mut stmt = parse("SELECT /*+ SET_VAR(foo=1) */ /*+ SET_VAR(foo=2) */ @@foo");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(stmt.ast.to_string(), "SELECT 1 AS `@@foo`");
    }

    #[test]
    fn test_restore_on_drop() {
        let mut vars = session();
        {
            let mut stmt = parse("SELECT /*+ SET_VAR(foo=3) */ 1");
            let _scope =
                VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp()).unwrap();
        }
        assert_eq!(vars.get("foo").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_restore_when_rewrite_fails() {
        let mut vars = session();
        let mut stmt = parse("SELECT /*+ SET_VAR(foo=3) */ @@no_such_variable");
        let result = VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp());
        assert!(matches!(
            result,
            Err(InterceptError::UnknownVariable { .. })
        ));
        drop(result);
        assert_eq!(vars.get("foo").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_unknown_hint_variable() {
        let mut vars = session();
        let mut stmt = parse("SELECT /*+ SET_VAR(foo=3, bar=1) */ 1");
        assert!(VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp()).is_err());
        assert_eq!(vars.local("foo"), None);
    }

    #[test]
    fn test_set_rewrites_only_values() {
        let mut vars = session();
        let mut stmt = parse("SET @@x = @@y");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();

        let sql = stmt.ast.to_string();
        assert!(sql.contains("@@x"), "{sql}");
        assert!(!sql.contains("@@y"), "{sql}");
        assert!(sql.ends_with("= 20"), "{sql}");
    }

    #[test]
    fn test_set_operation_branches_are_aliased() {
        let mut vars = session();
        let mut stmt = parse("SELECT VERSION() UNION SELECT @@x UNION ALL (SELECT 1, VERSION())");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(
            stmt.ast.to_string(),
            "SELECT '8.0.29' AS `VERSION()` UNION SELECT 10 AS `@@x` \
             UNION ALL (SELECT 1, '8.0.29' AS `VERSION()`)"
        );
    }

    #[test]
    fn test_now_is_aliased() {
        let mut vars = session();
        let mut stmt = parse("SELECT NOW()");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(
            stmt.ast.to_string(),
            "SELECT '2024-01-02 03:04:05' AS `NOW()`"
        );
    }

    #[test]
    fn test_builtins_in_expressions() {
        let mut vars = session();
        let mut stmt = parse("SELECT a FROM t WHERE owner = CURRENT_USER() AND id = CONNECTION_ID()");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(
            stmt.ast.to_string(),
            "SELECT a FROM t WHERE owner = 'alice' AND id = 9"
        );
    }

    #[test]
    fn test_scoped_variable_reads() {
        let mut vars = session();
        vars.set("x", Setting::Value(Value::Int(1)), false).unwrap();
        let mut stmt = parse("SELECT @@session.x, @@global.x");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(
            stmt.ast.to_string(),
            "SELECT 1 AS `@@session.x`, 10 AS `@@global.x`"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let vars = session();
        let mut stmt = parse("SELECT NOW(), DATABASE(), VERSION()");
        let ctx = SessionContext::at(&identity(), &vars, timestamp()).unwrap();

        rewrite_statement(&mut stmt.ast, &ctx).unwrap();
        let once = stmt.ast.to_string();
        rewrite_statement(&mut stmt.ast, &ctx).unwrap();
        assert_eq!(stmt.ast.to_string(), once);
    }

    #[test]
    fn test_other_hints_kept() {
        let mut vars = session();
        let mut stmt = parse("SELECT /*+ SET_VAR(foo=1) BKA(t) */ a FROM t");
        VariableScope::begin_at(&mut stmt, &mut vars, &identity(), timestamp())
            .unwrap()
            .end();
        assert_eq!(stmt.to_sql(), "SELECT /*+ BKA(t) */ a FROM t");
    }
}
