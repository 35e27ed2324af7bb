//! Connection handler.
//!
//! Every statement a client sends goes through the same steps:
//!
//! 1. Parse, lifting `/*+ ... */` hints out of the SQL
//! 2. Open a [`VariableScope`]: apply SET_VAR hints, rewrite built-ins and variable references
//! 3. Route the rewritten statement (table below)
//! 4. Close the scope, putting hinted variables back
//!
//! | Statement | Answered by |
//! |-----------|-------------|
//! | `SET var = expr`, `SET NAMES` | Backend's `set` hook, then the session variable store |
//! | `USE db` | The connection |
//! | `SHOW [GLOBAL] VARIABLES` | Session (or global) variable store |
//! | `SHOW DATABASES / TABLES / COLUMNS / INDEX` | Virtual INFORMATION_SCHEMA |
//! | `SELECT ... FROM information_schema.*` | Virtual INFORMATION_SCHEMA |
//! | Anything else | Backend, as rewritten SQL |

use crate::error::ProxyError;
use crate::proxy::SchemaRegistry;
use crate::session::Session;
use mimic_core::{ResultSet, Value};
use mimic_sql::parser::split_object_name;
use mimic_sql::{
    ClientIdentity, InterceptError, InterceptedStatement, SessionVariables, Setting, SqlParser,
    VariableScope, expression_to_setting, like_regex, show_statement_to_info_schema_query,
};
use sqlparser::ast::{ContextModifier, Expr, ObjectName, Set, ShowStatementFilter, Statement, Use};
use std::collections::HashMap;
use std::sync::Arc;

/// Variables written by `SET NAMES`.
const NAMES_VARIABLES: [&str; 3] = [
    "character_set_client",
    "character_set_connection",
    "character_set_results",
];

/// One client connection.
///
/// Statements on a connection run one at a time (`&mut self`); connections run concurrently and
/// share nothing mutable but the schema registry.
pub struct Connection<S> {
    identity: ClientIdentity,
    variables: SessionVariables,
    parser: SqlParser,
    registry: Arc<SchemaRegistry>,
    session: S,
}

impl<S: Session> Connection<S> {
    pub(crate) fn new(
        identity: ClientIdentity,
        variables: SessionVariables,
        registry: Arc<SchemaRegistry>,
        session: S,
    ) -> Self {
        Self {
            identity,
            variables,
            parser: SqlParser::new(),
            registry,
            session,
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn variables(&self) -> &SessionVariables {
        &self.variables
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Run every statement in `sql`, returning one result per statement.
    ///
    /// Stops at the first failing statement. Statements before it keep their effects.
    pub async fn handle_query(&mut self, sql: &str) -> Result<Vec<ResultSet>, ProxyError> {
        self.handle_query_with_attributes(sql, &HashMap::new())
            .await
    }

    /// Like [`Connection::handle_query`], passing query attributes through to the backend.
    pub async fn handle_query_with_attributes(
        &mut self,
        sql: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<Vec<ResultSet>, ProxyError> {
        let connection_id = self.identity.connection_id;
        tracing::debug!(connection_id, sql = %sql, "Received query");

        let statements = self.parser.parse(sql).map_err(|e| {
            tracing::warn!(connection_id, error = %e, "Failed to parse query");
            ProxyError::from(e)
        })?;

        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            match self.execute(statement, attributes).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(
                        connection_id,
                        code = e.code(),
                        error = %e,
                        "Statement failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    /// Close the connection.
    pub fn close(self) {
        tracing::info!(
            connection_id = self.identity.connection_id,
            user = %self.identity.user,
            "Connection closed"
        );
    }

    async fn execute(
        &mut self,
        mut statement: InterceptedStatement,
        attributes: &HashMap<String, String>,
    ) -> Result<ResultSet, ProxyError> {
        let connection_id = self.identity.connection_id;
        let catalog = self.registry.snapshot();
        let mut scope = VariableScope::begin(&mut statement, &mut self.variables, &self.identity)?;

        let result = match &statement.ast {
            Statement::Set(set) => match assign(set, scope.variables())? {
                Some(staged) => {
                    self.session
                        .set(&staged.changed)
                        .await
                        .map_err(ProxyError::Backend)?;
                    tracing::debug!(connection_id, changed = ?staged.changed, "Applied SET");
                    *scope.variables_mut() = staged.variables;
                    ResultSet::empty()
                }
                None => forward(&self.session, &statement, attributes, connection_id).await?,
            },
            Statement::Use(target) => {
                let database = use_target(target)?;
                tracing::debug!(connection_id, database = %database, "Switched database");
                self.identity.database = Some(database);
                ResultSet::empty()
            }
            Statement::ShowVariables { filter, global, .. } => {
                let variables = if *global {
                    scope.variables().globals().list()
                } else {
                    scope.variables().list()
                };
                show_variables(variables, filter.as_ref())?
            }
            show if is_show(show) => {
                let query =
                    show_statement_to_info_schema_query(show, self.identity.database.as_deref())?;
                catalog.query(&query)?
            }
            Statement::Query(query)
                if catalog.handles(query, self.identity.database.as_deref()) =>
            {
                tracing::debug!(connection_id, "Answering from INFORMATION_SCHEMA");
                catalog.query(query)?
            }
            _ => forward(&self.session, &statement, attributes, connection_id).await?,
        };

        scope.end();
        Ok(result)
    }
}

async fn forward<S: Session>(
    session: &S,
    statement: &InterceptedStatement,
    attributes: &HashMap<String, String>,
    connection_id: u32,
) -> Result<ResultSet, ProxyError> {
    let sql = statement.to_sql();
    tracing::debug!(connection_id, sql = %sql, "Forwarding statement");
    session
        .query(&sql, attributes)
        .await
        .map_err(ProxyError::Backend)
}

/// A `SET` applied to a copy of the session store. Nothing is visible to the connection until
/// the copy replaces its store.
struct StagedSet {
    variables: SessionVariables,
    changed: Vec<(String, Value)>,
}

/// Apply a `SET` to a copy of the session store and report what changed.
///
/// `None` means the statement is not a variable assignment this layer handles (for example
/// `SET TRANSACTION`) and belongs to the backend.
fn assign(set: &Set, variables: &SessionVariables) -> Result<Option<StagedSet>, InterceptError> {
    let mut targets: Vec<(&ObjectName, Option<&ContextModifier>, &Expr)> = Vec::new();
    match set {
        Set::SingleAssignment {
            scope,
            variable,
            values,
            ..
        } => {
            let [value] = values.as_slice() else {
                return Err(InterceptError::NotSupported(format!(
                    "SET {variable} with {} values",
                    values.len()
                )));
            };
            targets.push((variable, scope.as_ref(), value));
        }
        Set::MultipleAssignments { assignments } => {
            for assignment in assignments {
                targets.push((&assignment.name, assignment.scope.as_ref(), &assignment.value));
            }
        }
        Set::SetNames {
            charset_name,
            collation_name,
        } => {
            let charset = unquote(&charset_name.to_string());
            let mut staged = variables.clone();
            let changed = set_names(&mut staged, Some(charset), collation_name.clone())?;
            return Ok(Some(StagedSet {
                variables: staged,
                changed,
            }));
        }
        Set::SetNamesDefault {} => {
            let mut staged = variables.clone();
            let changed = set_names(&mut staged, None, None)?;
            return Ok(Some(StagedSet {
                variables: staged,
                changed,
            }));
        }
        _ => return Ok(None),
    }

    let mut staged = variables.clone();
    let mut changed = Vec::with_capacity(targets.len());
    for (name, scope, value) in targets {
        let name = variable_name(name, scope)?;
        staged.set(&name, expression_to_setting(value)?, false)?;
        let value = staged.get(&name)?;
        changed.push((name, value));
    }
    Ok(Some(StagedSet {
        variables: staged,
        changed,
    }))
}

/// The system variable a SET target names.
fn variable_name(
    name: &ObjectName,
    scope: Option<&ContextModifier>,
) -> Result<String, InterceptError> {
    let text = name.to_string();
    let global = |name: &str| InterceptError::VariableScope {
        name: name.to_string(),
        scope: "GLOBAL".to_string(),
    };

    if matches!(scope, Some(ContextModifier::Global)) {
        return Err(global(text.trim_start_matches('@')));
    }

    let Some(rest) = text.strip_prefix("@@") else {
        if text.starts_with('@') {
            return Err(InterceptError::NotSupported(
                "User-defined variables not supported yet".to_string(),
            ));
        }
        return Ok(text);
    };

    match rest.split_once('.') {
        Some((prefix, var)) if prefix.eq_ignore_ascii_case("global") => Err(global(var)),
        Some((prefix, var))
            if prefix.eq_ignore_ascii_case("session") || prefix.eq_ignore_ascii_case("local") =>
        {
            Ok(var.to_string())
        }
        _ => Ok(rest.to_string()),
    }
}

/// `SET NAMES charset [COLLATE collation]`; `None` charset is `SET NAMES DEFAULT`.
fn set_names(
    variables: &mut SessionVariables,
    charset: Option<String>,
    collation: Option<String>,
) -> Result<Vec<(String, Value)>, InterceptError> {
    let setting = |value: &Option<String>| match value {
        Some(value) => Setting::Value(Value::from(value.as_str())),
        None => Setting::Default,
    };

    let mut names = NAMES_VARIABLES.to_vec();
    if collation.is_some() || charset.is_none() {
        names.push("collation_connection");
    }

    let mut changed = Vec::with_capacity(names.len());
    for name in names {
        let value = if name == "collation_connection" {
            setting(&collation)
        } else {
            setting(&charset)
        };
        variables.set(name, value, false)?;
        changed.push((name.to_string(), variables.get(name)?));
    }
    Ok(changed)
}

fn use_target(target: &Use) -> Result<String, InterceptError> {
    match target {
        Use::Object(name) | Use::Database(name) | Use::Schema(name) => split_object_name(name)
            .map(|(_, database)| database)
            .ok_or_else(|| InterceptError::NotSupported(format!("USE {name}"))),
        _ => Err(InterceptError::NotSupported(
            "USE of anything but a database".to_string(),
        )),
    }
}

fn show_variables(
    variables: Vec<(String, Value)>,
    filter: Option<&ShowStatementFilter>,
) -> Result<ResultSet, InterceptError> {
    let pattern = match filter {
        None => None,
        Some(
            ShowStatementFilter::Like(pattern)
            | ShowStatementFilter::ILike(pattern)
            | ShowStatementFilter::NoKeyword(pattern),
        ) => Some(like_regex(pattern, '\\')?),
        Some(ShowStatementFilter::Where(_)) => {
            return Err(InterceptError::UnsupportedShowStatement {
                kind: "VARIABLES ... WHERE".to_string(),
            });
        }
    };

    let rows = variables
        .into_iter()
        .filter(|(name, _)| pattern.as_ref().is_none_or(|p| p.is_match(name)))
        .map(|(name, value)| vec![Value::Str(name), Value::Str(variable_text(&value))])
        .collect();

    Ok(ResultSet::new(
        vec!["Variable_name".to_string(), "Value".to_string()],
        rows,
    ))
}

/// How `SHOW VARIABLES` prints a value.
fn variable_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "ON".to_string(),
        Value::Bool(false) => "OFF".to_string(),
        other => other.to_string(),
    }
}

fn is_show(statement: &Statement) -> bool {
    matches!(
        statement,
        Statement::ShowFunctions { .. }
            | Statement::ShowVariable { .. }
            | Statement::ShowStatus { .. }
            | Statement::ShowCreate { .. }
            | Statement::ShowColumns { .. }
            | Statement::ShowDatabases { .. }
            | Statement::ShowSchemas { .. }
            | Statement::ShowCharset(_)
            | Statement::ShowObjects(_)
            | Statement::ShowTables { .. }
            | Statement::ShowViews { .. }
            | Statement::ShowCollation { .. }
    )
}

fn unquote(name: &str) -> String {
    name.trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}
