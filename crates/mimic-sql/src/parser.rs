//! SQL parsing.

use crate::error::InterceptError;
use crate::hints::Hint;
use sqlparser::ast::{
    ObjectName, ObjectNamePart, Query, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, Whitespace};
use std::collections::BTreeMap;

/// Parses MySQL statements and lifts their optimizer hints out of the text.
pub struct SqlParser {
    dialect: MySqlDialect,
}

impl Clone for SqlParser {
    fn clone(&self) -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A parsed statement plus the hint comments that appeared inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptedStatement {
    pub ast: Statement,
    /// Hints in textual order.
    pub hints: Vec<Hint>,
}

impl InterceptedStatement {
    pub fn new(ast: Statement) -> Self {
        Self {
            ast,
            hints: Vec::new(),
        }
    }

    /// SQL text for the backend. Remaining hints go right after the leading keyword, which is
    /// where MySQL reads them.
    pub fn to_sql(&self) -> String {
        let sql = self.ast.to_string();
        if self.hints.is_empty() {
            return sql;
        }

        let hints = self
            .hints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        match sql.find(char::is_whitespace) {
            Some(idx) => format!("{} {}{}", &sql[..idx], hints, &sql[idx..]),
            None => format!("{sql} {hints}"),
        }
    }
}

impl SqlParser {
    /// Create a new SQL parser.
    pub fn new() -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }

    /// Parse a SQL string into statements, each carrying its own hints.
    pub fn parse(&self, sql: &str) -> Result<Vec<InterceptedStatement>, InterceptError> {
        let tokens = Tokenizer::new(&self.dialect, sql).tokenize_with_location()?;
        let lines = LineStarts::new(sql);

        let mut hints: BTreeMap<usize, Vec<Hint>> = BTreeMap::new();
        let mut stripped = String::with_capacity(sql.len());
        let mut cursor = 0;
        let mut statement = 0;
        let mut statement_has_tokens = false;

        for TokenWithSpan { token, span } in &tokens {
            match token {
                Token::SemiColon => {
                    // Empty statements (`;;`) are skipped by the parser, so they don't count.
                    if statement_has_tokens {
                        statement += 1;
                        statement_has_tokens = false;
                    }
                }
                Token::Whitespace(Whitespace::MultiLineComment(text)) if text.starts_with('+') => {
                    let start = lines.offset(span.start);
                    stripped.push_str(&sql[cursor..start]);
                    stripped.push(' ');
                    cursor = lines.offset(span.end);
                    hints
                        .entry(statement)
                        .or_default()
                        .push(Hint::parse(&text[1..]));
                }
                Token::Whitespace(_) | Token::EOF => {}
                _ => statement_has_tokens = true,
            }
        }
        stripped.push_str(&sql[cursor..]);

        let statements = Parser::parse_sql(&self.dialect, &stripped)?;

        Ok(statements
            .into_iter()
            .enumerate()
            .map(|(idx, ast)| InterceptedStatement {
                ast,
                hints: hints.remove(&idx).unwrap_or_default(),
            })
            .collect())
    }

    /// Parse exactly one statement.
    pub fn parse_one(&self, sql: &str) -> Result<InterceptedStatement, InterceptError> {
        let mut statements = self.parse(sql)?;
        match statements.len() {
            1 => Ok(statements.remove(0)),
            0 => Err(InterceptError::ParseError("empty statement".to_string())),
            n => Err(InterceptError::ParseError(format!(
                "expected a single statement, found {n}"
            ))),
        }
    }

    /// Tables referenced by the FROM clause of a query (top level only).
    pub fn extract_tables(&self, query: &Query) -> Vec<TableReference> {
        let mut tables = Vec::new();
        if let SetExpr::Select(select) = query.body.as_ref() {
            for table_with_joins in &select.from {
                self.visit_table_with_joins(table_with_joins, &mut tables);
            }
        }
        tables
    }

    fn visit_table_with_joins(
        &self,
        table_with_joins: &TableWithJoins,
        tables: &mut Vec<TableReference>,
    ) {
        tables.extend(TableReference::from_factor(&table_with_joins.relation));
        for join in &table_with_joins.joins {
            tables.extend(TableReference::from_factor(&join.relation));
        }
    }
}

/// Where each line of a SQL string starts, for turning tokenizer locations into byte offsets.
struct LineStarts<'a> {
    sql: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineStarts<'a> {
    fn new(sql: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(sql.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { sql, starts }
    }

    /// Byte offset of a 1-based line and column, where columns count characters.
    fn offset(&self, location: Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let column = (location.column as usize).saturating_sub(1);
        let Some(&start) = self.starts.get(line) else {
            return self.sql.len();
        };
        self.sql[start..]
            .char_indices()
            .nth(column)
            .map_or(self.sql.len(), |(idx, _)| start + idx)
    }
}

/// A reference to a table in a FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReference {
    /// Explicit schema qualifier, if any.
    pub schema: Option<String>,
    /// The table name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl TableReference {
    pub fn from_factor(table_factor: &TableFactor) -> Option<Self> {
        match table_factor {
            TableFactor::Table { name, alias, .. } => {
                let (schema, table) = split_object_name(name)?;
                Some(Self {
                    schema,
                    name: table,
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                })
            }
            _ => None,
        }
    }

    /// The name other parts of the query use to qualify this table's columns.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Split `[schema.]name` into its parts.
pub fn split_object_name(name: &ObjectName) -> Option<(Option<String>, String)> {
    let parts: Vec<String> = name
        .0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [table] => Some((None, table.clone())),
        [schema, table] => Some((Some(schema.clone()), table.clone())),
        _ => None,
    }
}
