//! Optimizer hints (`/*+ ... */`).
//!
//! The parser treats hint comments as whitespace, so they are lifted out of the token stream
//! before parsing and carried next to the statement they belong to. SET_VAR items are consumed
//! by the interceptor; every other hint is re-emitted when the statement is forwarded.

use crate::error::InterceptError;
use crate::literal::expression_to_setting;
use crate::variables::Setting;
use sqlparser::ast::{BinaryOperator, Expr};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeMap;
use std::fmt;

/// One `NAME(args)` entry inside a hint comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintItem {
    /// Uppercased hint name, e.g. `SET_VAR`.
    pub name: String,
    /// Raw text between the parentheses.
    pub body: String,
}

impl HintItem {
    pub fn is_set_var(&self) -> bool {
        self.name == "SET_VAR"
    }
}

/// A single `/*+ ... */` comment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hint {
    pub items: Vec<HintItem>,
}

impl Hint {
    /// Parse the text of a hint comment, without the leading `+`.
    ///
    /// Text that is not of the form `NAME(...)` is ignored, like MySQL ignores malformed hints.
    pub fn parse(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut items = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            if !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
                i += 1;
                continue;
            }

            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();

            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i >= chars.len() || chars[i] != '(' {
                continue;
            }

            let Some(end) = matching_paren(&chars, i) else {
                break;
            };
            let body: String = chars[i + 1..end].iter().collect();
            items.push(HintItem {
                name: name.to_ascii_uppercase(),
                body: body.trim().to_string(),
            });
            i = end + 1;
        }

        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/*+")?;
        for item in &self.items {
            write!(f, " {}({})", item.name, item.body)?;
        }
        f.write_str(" */")
    }
}

/// Index of the `)` closing the `(` at `open`, skipping quoted text.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (idx, &c) in chars.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Pull every SET_VAR assignment out of `hints`.
///
/// Hints are visited last to first and later writes win, so when two hints assign the same
/// variable the one nearest the start of the statement takes effect. Consumed SET_VAR items are
/// removed, and hints left empty are dropped.
pub fn extract_set_var_assignments(
    hints: &mut Vec<Hint>,
) -> Result<BTreeMap<String, Setting>, InterceptError> {
    let mut assignments = BTreeMap::new();

    for hint in hints.iter_mut().rev() {
        for item in hint.items.iter().filter(|item| item.is_set_var()) {
            for (name, setting) in parse_set_var_body(&item.body)? {
                assignments.insert(name, setting);
            }
        }
        hint.items.retain(|item| !item.is_set_var());
    }
    hints.retain(|hint| !hint.is_empty());

    Ok(assignments)
}

/// Parse `name = literal[, name = literal ...]`.
fn parse_set_var_body(body: &str) -> Result<Vec<(String, Setting)>, InterceptError> {
    let dialect = MySqlDialect {};
    let exprs = Parser::new(&dialect)
        .try_with_sql(body)?
        .parse_comma_separated(Parser::parse_expr)?;

    exprs
        .iter()
        .map(|expr| match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                let name = match left.as_ref() {
                    Expr::Identifier(ident) => ident.value.to_ascii_lowercase(),
                    Expr::CompoundIdentifier(parts) => parts
                        .iter()
                        .map(|p| p.value.as_str())
                        .collect::<Vec<_>>()
                        .join(".")
                        .to_ascii_lowercase(),
                    other => {
                        return Err(InterceptError::MalformedHintValue {
                            expr: other.to_string(),
                        });
                    }
                };
                Ok((name, expression_to_setting(right)?))
            }
            other => Err(InterceptError::MalformedHintValue {
                expr: other.to_string(),
            }),
        })
        .collect()
}
