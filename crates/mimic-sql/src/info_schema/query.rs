//! A small SELECT evaluator over the catalog's relations.
//!
//! Covers what clients and ORMs send when they introspect a server: filters, joins between
//! catalog relations, a handful of scalar functions, COUNT, DISTINCT, ORDER BY and LIMIT.
//! String comparisons ignore case, like `utf8mb4_general_ci`.

use super::catalog::{INFORMATION_SCHEMA, InfoSchema};
use crate::error::InterceptError;
use crate::literal::expression_to_value;
use crate::parser::TableReference;
use mimic_core::{ResultSet, Value};
use regex::{Regex, RegexBuilder};
use sqlparser::ast::{
    BinaryOperator, Distinct, DuplicateTreatment, Expr, Function, FunctionArg, FunctionArgExpr,
    FunctionArguments, GroupByExpr, JoinConstraint, JoinOperator, LimitClause, OrderByExpr,
    OrderByKind, Query, Select, SelectItem, SelectItemQualifiedWildcardKind, SetExpr, TableFactor,
    TableWithJoins, UnaryOperator, Value as SqlValue, ValueWithSpan, visit_expressions,
};
use std::cmp::Ordering;
use std::ops::ControlFlow;

type Row = Vec<Value>;

/// Evaluate `query` against the catalog.
pub(crate) fn evaluate(catalog: &InfoSchema, query: &Query) -> Result<ResultSet, InterceptError> {
    if query.with.is_some() {
        return Err(unsupported("WITH is not supported in information_schema queries"));
    }
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(unsupported(
            "only plain SELECT is supported in information_schema queries",
        ));
    };
    check_select(select)?;

    let (frame, rows) = bind_from(catalog, &select.from)?;
    let rows = match &select.selection {
        Some(predicate) => {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if truth(&eval(predicate, &Ctx::row(&frame, &row))?) == Some(true) {
                    kept.push(row);
                }
            }
            kept
        }
        None => rows,
    };

    let projection = Projection::plan(&frame, &select.projection)?;

    let output: Vec<(Row, Row)> = if projection.is_aggregate() {
        let ctx = Ctx {
            frame: &frame,
            row: rows.first().map(Vec::as_slice),
            group: Some(rows.as_slice()),
        };
        let source = rows
            .first()
            .cloned()
            .unwrap_or_else(|| vec![Value::Null; frame.width]);
        vec![(source, projection.evaluate(&ctx)?)]
    } else {
        let mut output = Vec::with_capacity(rows.len());
        for row in rows {
            let projected = projection.evaluate(&Ctx::row(&frame, &row))?;
            output.push((row, projected));
        }
        output
    };

    let mut rows = match &query.order_by {
        Some(order_by) => match &order_by.kind {
            OrderByKind::Expressions(exprs) => order_rows(&frame, &projection, output, exprs)?,
            OrderByKind::All(_) => return Err(unsupported("ORDER BY ALL is not supported")),
        },
        None => output.into_iter().map(|(_, projected)| projected).collect(),
    };

    if matches!(select.distinct, Some(Distinct::Distinct)) {
        let mut unique: Vec<Row> = Vec::with_capacity(rows.len());
        for row in rows {
            if !unique.iter().any(|seen| rows_equal(seen, &row)) {
                unique.push(row);
            }
        }
        rows = unique;
    }

    apply_limit(query, &mut rows)?;

    Ok(ResultSet::new(projection.names, rows))
}

fn check_select(select: &Select) -> Result<(), InterceptError> {
    if let Some(Distinct::On(_)) = &select.distinct {
        return Err(unsupported("DISTINCT ON is not supported"));
    }
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
        _ => return Err(unsupported("GROUP BY is not supported in information_schema queries")),
    }
    if select.having.is_some() {
        return Err(unsupported("HAVING is not supported in information_schema queries"));
    }
    Ok(())
}

fn unsupported(message: impl Into<String>) -> InterceptError {
    InterceptError::not_supported(message)
}

/// One relation in the FROM clause, placed at `offset` in the joined row.
struct Binding {
    qualifier: String,
    columns: Vec<String>,
    offset: usize,
}

/// Layout of joined rows.
#[derive(Default)]
struct Frame {
    bindings: Vec<Binding>,
    width: usize,
}

impl Frame {
    fn push(&mut self, qualifier: String, columns: Vec<String>) {
        let width = columns.len();
        self.bindings.push(Binding {
            qualifier,
            columns,
            offset: self.width,
        });
        self.width += width;
    }

    fn resolve(&self, qualifier: Option<&str>, column: &str) -> Result<usize, InterceptError> {
        self.bindings
            .iter()
            .filter(|b| qualifier.is_none_or(|q| b.qualifier.eq_ignore_ascii_case(q)))
            .find_map(|b| {
                b.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
                    .map(|idx| b.offset + idx)
            })
            .ok_or_else(|| InterceptError::UnknownColumn {
                name: match qualifier {
                    Some(q) => format!("{q}.{column}"),
                    None => column.to_string(),
                },
            })
    }
}

fn bind_from(
    catalog: &InfoSchema,
    from: &[TableWithJoins],
) -> Result<(Frame, Vec<Row>), InterceptError> {
    let mut frame = Frame::default();
    // A FROM-less SELECT still produces one row.
    let mut rows: Vec<Row> = vec![Vec::new()];

    for table_with_joins in from {
        let relation = bind_table(catalog, &mut frame, &table_with_joins.relation)?;
        rows = rows
            .iter()
            .flat_map(|left| {
                relation.rows.iter().map(move |right| {
                    let mut row = left.clone();
                    row.extend(right.iter().cloned());
                    row
                })
            })
            .collect();

        for join in &table_with_joins.joins {
            let relation = bind_table(catalog, &mut frame, &join.relation)?;
            rows = join_rows(&frame, rows, relation, &join.join_operator)?;
        }
    }

    Ok((frame, rows))
}

fn bind_table<'c>(
    catalog: &'c InfoSchema,
    frame: &mut Frame,
    factor: &TableFactor,
) -> Result<&'c ResultSet, InterceptError> {
    let table = TableReference::from_factor(factor)
        .ok_or_else(|| unsupported("only plain table references are supported"))?;

    let in_catalog = table
        .schema
        .as_deref()
        .is_none_or(|s| s.eq_ignore_ascii_case(INFORMATION_SCHEMA));
    let relation = catalog
        .relation(&table.name)
        .filter(|_| in_catalog)
        .ok_or_else(|| {
            unsupported(format!(
                "Table '{}' is not part of information_schema",
                table.name
            ))
        })?;

    frame.push(table.qualifier().to_string(), relation.columns.clone());
    Ok(relation)
}

fn join_rows(
    frame: &Frame,
    left_rows: Vec<Row>,
    right: &ResultSet,
    operator: &JoinOperator,
) -> Result<Vec<Row>, InterceptError> {
    let (constraint, outer) = match operator {
        JoinOperator::Join(c) | JoinOperator::Inner(c) | JoinOperator::CrossJoin(c) => (c, false),
        JoinOperator::Left(c) | JoinOperator::LeftOuter(c) => (c, true),
        _ => return Err(unsupported("unsupported join type in information_schema query")),
    };
    let condition = match constraint {
        JoinConstraint::On(expr) => Some(expr),
        JoinConstraint::None => None,
        _ => return Err(unsupported("USING and NATURAL joins are not supported")),
    };

    let mut joined = Vec::new();
    for left in left_rows {
        let mut matched = false;
        for right_row in &right.rows {
            let mut row = left.clone();
            row.extend(right_row.iter().cloned());
            let keep = match condition {
                Some(expr) => truth(&eval(expr, &Ctx::row(frame, &row))?) == Some(true),
                None => true,
            };
            if keep {
                matched = true;
                joined.push(row);
            }
        }
        if outer && !matched {
            let mut row = left;
            row.resize(row.len() + right.columns.len(), Value::Null);
            joined.push(row);
        }
    }
    Ok(joined)
}

enum Output<'q> {
    Column(usize),
    Expr(&'q Expr),
}

struct Projection<'q> {
    names: Vec<String>,
    outputs: Vec<Output<'q>>,
}

impl<'q> Projection<'q> {
    fn plan(frame: &Frame, items: &'q [SelectItem]) -> Result<Self, InterceptError> {
        let mut names = Vec::new();
        let mut outputs = Vec::new();

        for item in items {
            match item {
                SelectItem::Wildcard(_) => {
                    for binding in &frame.bindings {
                        for (idx, column) in binding.columns.iter().enumerate() {
                            names.push(column.clone());
                            outputs.push(Output::Column(binding.offset + idx));
                        }
                    }
                }
                SelectItem::QualifiedWildcard(SelectItemQualifiedWildcardKind::ObjectName(name), _) => {
                    let qualifier = name.0.last().map(|p| p.to_string()).unwrap_or_default();
                    let binding = frame
                        .bindings
                        .iter()
                        .find(|b| b.qualifier.eq_ignore_ascii_case(&qualifier))
                        .ok_or_else(|| InterceptError::UnknownColumn {
                            name: format!("{qualifier}.*"),
                        })?;
                    for (idx, column) in binding.columns.iter().enumerate() {
                        names.push(column.clone());
                        outputs.push(Output::Column(binding.offset + idx));
                    }
                }
                SelectItem::QualifiedWildcard(..) => {
                    return Err(unsupported("unsupported wildcard in select list"));
                }
                SelectItem::UnnamedExpr(expr) => {
                    names.push(output_name(expr));
                    outputs.push(Output::Expr(expr));
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    names.push(alias.value.clone());
                    outputs.push(Output::Expr(expr));
                }
            }
        }

        Ok(Self { names, outputs })
    }

    fn is_aggregate(&self) -> bool {
        self.outputs.iter().any(|output| match output {
            Output::Expr(expr) => contains_count(expr),
            Output::Column(_) => false,
        })
    }

    fn evaluate(&self, ctx: &Ctx<'_>) -> Result<Row, InterceptError> {
        self.outputs
            .iter()
            .map(|output| match output {
                Output::Column(idx) => Ok(ctx.value_at(*idx)),
                Output::Expr(expr) => eval(expr, ctx),
            })
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }
}

fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

fn contains_count(expr: &Expr) -> bool {
    visit_expressions(expr, |e| match e {
        Expr::Function(f) if function_name(f) == "COUNT" => ControlFlow::Break(()),
        _ => ControlFlow::Continue(()),
    })
    .is_break()
}

/// What an expression is evaluated against: one row, and for aggregates the whole group.
struct Ctx<'a> {
    frame: &'a Frame,
    row: Option<&'a [Value]>,
    group: Option<&'a [Row]>,
}

impl<'a> Ctx<'a> {
    fn row(frame: &'a Frame, row: &'a [Value]) -> Self {
        Self {
            frame,
            row: Some(row),
            group: None,
        }
    }

    fn value_at(&self, idx: usize) -> Value {
        self.row
            .and_then(|row| row.get(idx))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn column(&self, qualifier: Option<&str>, name: &str) -> Result<Value, InterceptError> {
        let idx = self.frame.resolve(qualifier, name)?;
        Ok(self.value_at(idx))
    }
}

fn eval(expr: &Expr, ctx: &Ctx<'_>) -> Result<Value, InterceptError> {
    match expr {
        Expr::Identifier(ident) => ctx.column(None, &ident.value),
        Expr::CompoundIdentifier(parts) => match parts.as_slice() {
            [table, column] => ctx.column(Some(&table.value), &column.value),
            [schema, table, column] if schema.value.eq_ignore_ascii_case(INFORMATION_SCHEMA) => {
                ctx.column(Some(&table.value), &column.value)
            }
            _ => Err(InterceptError::UnknownColumn {
                name: expr.to_string(),
            }),
        },
        Expr::Value(_) => expression_to_value(expr),
        Expr::Nested(inner) => eval(inner, ctx),
        Expr::UnaryOp { op, expr: inner } => {
            let value = eval(inner, ctx)?;
            match op {
                UnaryOperator::Not => Ok(truth(&value).map(|b| Value::Bool(!b)).into()),
                UnaryOperator::Minus => Ok(match value {
                    Value::Null => Value::Null,
                    Value::Int(i) => Value::Int(-i),
                    other => other.as_f64().map(|f| Value::Float(-f)).into(),
                }),
                UnaryOperator::Plus => Ok(value),
                _ => Err(unsupported(format!("Unsupported operator: {op}"))),
            }
        }
        Expr::IsNull(inner) => Ok(Value::Bool(eval(inner, ctx)?.is_null())),
        Expr::IsNotNull(inner) => Ok(Value::Bool(!eval(inner, ctx)?.is_null())),
        Expr::InList {
            expr: inner,
            list,
            negated,
        } => {
            let value = eval(inner, ctx)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let mut found = false;
            for item in list {
                if compare(&value, &eval(item, ctx)?) == Some(Ordering::Equal) {
                    found = true;
                    break;
                }
            }
            Ok(Value::Bool(found != *negated))
        }
        Expr::Between {
            expr: inner,
            negated,
            low,
            high,
        } => {
            let value = eval(inner, ctx)?;
            let above = compare(&value, &eval(low, ctx)?).map(|o| o != Ordering::Less);
            let below = compare(&value, &eval(high, ctx)?).map(|o| o != Ordering::Greater);
            Ok(match (above, below) {
                (Some(a), Some(b)) => Value::Bool((a && b) != *negated),
                _ => Value::Null,
            })
        }
        Expr::Like {
            negated,
            any: false,
            expr: inner,
            pattern,
            escape_char,
        }
        | Expr::ILike {
            negated,
            any: false,
            expr: inner,
            pattern,
            escape_char,
        } => {
            let value = eval(inner, ctx)?;
            let pattern = eval(pattern, ctx)?;
            let (Some(value), Some(pattern)) = (value.to_text(), pattern.to_text()) else {
                return Ok(Value::Null);
            };
            let escape = match escape_char {
                Some(SqlValue::SingleQuotedString(s)) | Some(SqlValue::DoubleQuotedString(s)) => {
                    s.chars().next().unwrap_or('\\')
                }
                _ => '\\',
            };
            let matched = like_regex(&pattern, escape)?.is_match(&value);
            Ok(Value::Bool(matched != *negated))
        }
        Expr::BinaryOp { left, op, right } => binary(left, op, right, ctx),
        Expr::Function(function) => call(function, ctx),
        _ => Err(unsupported(format!(
            "Unsupported expression in information_schema query: {expr}"
        ))),
    }
}

fn binary(
    left: &Expr,
    op: &BinaryOperator,
    right: &Expr,
    ctx: &Ctx<'_>,
) -> Result<Value, InterceptError> {
    let lhs = eval(left, ctx)?;
    let rhs = eval(right, ctx)?;

    let comparison = |test: fn(Ordering) -> bool| -> Value {
        compare(&lhs, &rhs).map(|o| Value::Bool(test(o))).into()
    };

    Ok(match op {
        BinaryOperator::And => match (truth(&lhs), truth(&rhs)) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        },
        BinaryOperator::Or => match (truth(&lhs), truth(&rhs)) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        },
        BinaryOperator::Eq => comparison(|o| o == Ordering::Equal),
        BinaryOperator::NotEq => comparison(|o| o != Ordering::Equal),
        BinaryOperator::Lt => comparison(|o| o == Ordering::Less),
        BinaryOperator::LtEq => comparison(|o| o != Ordering::Greater),
        BinaryOperator::Gt => comparison(|o| o == Ordering::Greater),
        BinaryOperator::GtEq => comparison(|o| o != Ordering::Less),
        BinaryOperator::Spaceship => Value::Bool(match (lhs.is_null(), rhs.is_null()) {
            (true, true) => true,
            (false, false) => compare(&lhs, &rhs) == Some(Ordering::Equal),
            _ => false,
        }),
        BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Multiply => {
            arithmetic(op, &lhs, &rhs)
        }
        _ => {
            return Err(unsupported(format!(
                "Unsupported operator in information_schema query: {op}"
            )));
        }
    })
}

fn arithmetic(op: &BinaryOperator, lhs: &Value, rhs: &Value) -> Value {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOperator::Plus => a.checked_add(*b),
            BinaryOperator::Minus => a.checked_sub(*b),
            _ => a.checked_mul(*b),
        };
        if let Some(result) = result {
            return Value::Int(result);
        }
    }
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Value::Float(match op {
            BinaryOperator::Plus => a + b,
            BinaryOperator::Minus => a - b,
            _ => a * b,
        }),
        _ => Value::Null,
    }
}

enum Arg<'f> {
    Wildcard,
    Expr(&'f Expr),
}

fn function_name(function: &Function) -> String {
    function.name.to_string().to_ascii_uppercase()
}

fn function_args(function: &Function) -> Result<Vec<Arg<'_>>, InterceptError> {
    match &function.args {
        FunctionArguments::None => Ok(Vec::new()),
        FunctionArguments::List(list) => list
            .args
            .iter()
            .map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => Ok(Arg::Expr(expr)),
                FunctionArg::Unnamed(FunctionArgExpr::Wildcard) => Ok(Arg::Wildcard),
                other => Err(unsupported(format!("Unsupported function argument: {other}"))),
            })
            .collect(),
        FunctionArguments::Subquery(_) => Err(unsupported("subqueries are not supported")),
    }
}

fn call(function: &Function, ctx: &Ctx<'_>) -> Result<Value, InterceptError> {
    let name = function_name(function);
    let args = function_args(function)?;

    if name == "COUNT" {
        return count(function, &args, ctx);
    }

    let mut values = Vec::with_capacity(args.len());
    for arg in &args {
        match arg {
            Arg::Expr(expr) => values.push(eval(expr, ctx)?),
            Arg::Wildcard => return Err(unsupported(format!("{name}(*) is not supported"))),
        }
    }

    let arity = |n: usize| -> Result<(), InterceptError> {
        if values.len() == n {
            Ok(())
        } else {
            Err(InterceptError::ParseError(format!(
                "Incorrect parameter count in the call to native function '{name}'"
            )))
        }
    };

    match name.as_str() {
        "IF" => {
            arity(3)?;
            let branch = if truth(&values[0]) == Some(true) { 1 } else { 2 };
            Ok(values.swap_remove(branch))
        }
        "IFNULL" => {
            arity(2)?;
            let fallback = values.pop().unwrap_or_default();
            let value = values.pop().unwrap_or_default();
            Ok(if value.is_null() { fallback } else { value })
        }
        "COALESCE" => Ok(values.into_iter().find(|v| !v.is_null()).unwrap_or_default()),
        "LOWER" | "LCASE" => {
            arity(1)?;
            Ok(values[0].to_text().map(|s| s.to_lowercase()).into())
        }
        "UPPER" | "UCASE" => {
            arity(1)?;
            Ok(values[0].to_text().map(|s| s.to_uppercase()).into())
        }
        "CONCAT" => Ok(values
            .iter()
            .map(Value::to_text)
            .collect::<Option<String>>()
            .into()),
        _ => Err(unsupported(format!(
            "Function {name} is not supported in information_schema queries"
        ))),
    }
}

fn count(function: &Function, args: &[Arg<'_>], ctx: &Ctx<'_>) -> Result<Value, InterceptError> {
    let Some(group) = ctx.group else {
        return Err(unsupported("COUNT is only supported in the select list"));
    };

    let distinct = matches!(
        &function.args,
        FunctionArguments::List(list) if list.duplicate_treatment == Some(DuplicateTreatment::Distinct)
    );

    match args {
        [Arg::Wildcard] => Ok(Value::Int(group.len() as i64)),
        [Arg::Expr(expr)] => {
            let mut seen: Vec<Value> = Vec::new();
            let mut total = 0i64;
            for row in group {
                let value = eval(expr, &Ctx::row(ctx.frame, row))?;
                if value.is_null() {
                    continue;
                }
                if distinct {
                    if seen
                        .iter()
                        .any(|s| compare(s, &value) == Some(Ordering::Equal))
                    {
                        continue;
                    }
                    seen.push(value);
                }
                total += 1;
            }
            Ok(Value::Int(total))
        }
        _ => Err(InterceptError::ParseError(
            "Incorrect parameter count in the call to native function 'COUNT'".to_string(),
        )),
    }
}

fn order_rows(
    frame: &Frame,
    projection: &Projection<'_>,
    output: Vec<(Row, Row)>,
    order_by: &[OrderByExpr],
) -> Result<Vec<Row>, InterceptError> {
    let mut keyed = Vec::with_capacity(output.len());
    for (source, projected) in output {
        let keys = order_by
            .iter()
            .map(|order| sort_key(&order.expr, frame, projection, &source, &projected))
            .collect::<Result<Vec<_>, _>>()?;
        keyed.push((keys, projected));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        for (idx, order) in order_by.iter().enumerate() {
            let mut ordering = sort_compare(&a[idx], &b[idx]);
            if order.options.asc == Some(false) {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

/// ORDER BY accepts an output ordinal, an output alias, or any expression over the source row.
fn sort_key(
    expr: &Expr,
    frame: &Frame,
    projection: &Projection<'_>,
    source: &[Value],
    projected: &[Value],
) -> Result<Value, InterceptError> {
    match expr {
        Expr::Value(ValueWithSpan {
            value: SqlValue::Number(n, _),
            ..
        }) => {
            let ordinal: usize = n
                .parse()
                .map_err(|_| InterceptError::ParseError(format!("Invalid ORDER BY position {n}")))?;
            ordinal
                .checked_sub(1)
                .and_then(|idx| projected.get(idx))
                .cloned()
                .ok_or_else(|| InterceptError::UnknownColumn {
                    name: n.clone(),
                })
        }
        Expr::Identifier(ident) if projection.position(&ident.value).is_some() => Ok(projection
            .position(&ident.value)
            .and_then(|idx| projected.get(idx))
            .cloned()
            .unwrap_or_default()),
        _ => eval(expr, &Ctx::row(frame, source)),
    }
}

fn apply_limit(query: &Query, rows: &mut Vec<Row>) -> Result<(), InterceptError> {
    let (offset, limit) = match &query.limit_clause {
        None => (None, None),
        Some(LimitClause::LimitOffset { limit, offset, .. }) => {
            (offset.as_ref().map(|o| &o.value), limit.as_ref())
        }
        Some(LimitClause::OffsetCommaLimit { offset, limit }) => (Some(offset), Some(limit)),
    };

    if let Some(offset) = offset {
        let offset = non_negative(offset, "OFFSET")?;
        rows.drain(..offset.min(rows.len()));
    }
    if let Some(limit) = limit {
        let limit = non_negative(limit, "LIMIT")?;
        rows.truncate(limit);
    }
    Ok(())
}

fn non_negative(expr: &Expr, what: &str) -> Result<usize, InterceptError> {
    match expression_to_value(expr) {
        Ok(Value::Int(n)) if n >= 0 => Ok(n as usize),
        _ => Err(InterceptError::ParseError(format!(
            "{what} must be a non-negative integer, got {expr}"
        ))),
    }
}

/// SQL truth value; `None` is UNKNOWN.
fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Float(f) => Some(*f != 0.0),
        Value::Str(s) => Some(s.trim().parse::<f64>().is_ok_and(|f| f != 0.0)),
    }
}

/// Compare two values; `None` when either side is NULL.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Str(x), Value::Str(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => Some(a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase())),
        },
    }
}

/// Total order for sorting: NULL sorts first.
fn sort_compare(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(a, b).unwrap_or(Ordering::Equal),
    }
}

fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            (x.is_null() && y.is_null()) || compare(x, y) == Some(Ordering::Equal)
        })
}

/// Translate a LIKE pattern into an anchored, case-insensitive regex.
pub fn like_regex(pattern: &str, escape: char) -> Result<Regex, InterceptError> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            if let Some(literal) = chars.next() {
                source.push_str(&regex::escape(literal.encode_utf8(&mut [0; 4])));
            }
            continue;
        }
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| InterceptError::Internal(e.into()))
}
