//! Conversions between native values and SQL literal expressions.

use crate::error::InterceptError;
use crate::variables::Setting;
use mimic_core::Value;
use sqlparser::ast::{Expr, UnaryOperator, Value as SqlValue, ValueWithSpan};
use sqlparser::tokenizer::Span;

/// Build a literal expression for a native value.
pub fn value_to_expression(value: &Value) -> Expr {
    let literal = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Boolean(*b),
        Value::Int(i) => SqlValue::Number(i.to_string(), false),
        // Debug keeps the fractional part (`1.0`), so the literal reads back as a float.
        Value::Float(f) => SqlValue::Number(format!("{f:?}"), false),
        Value::Str(s) => SqlValue::SingleQuotedString(s.clone()),
    };
    Expr::Value(ValueWithSpan {
        value: literal,
        span: Span::empty(),
    })
}

/// Read a native value back out of a literal expression.
///
/// Bare identifiers are accepted the way MySQL accepts them on the right of `SET`:
/// `ON`/`OFF` are booleans, anything else is taken as its name.
pub fn expression_to_value(expr: &Expr) -> Result<Value, InterceptError> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => literal_value(value, expr),
        Expr::Nested(inner) => expression_to_value(inner),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match expression_to_value(inner)? {
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            _ => Err(malformed(expr)),
        },
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr: inner,
        } => expression_to_value(inner),
        Expr::Identifier(ident) => {
            let name = ident.value.as_str();
            if name.eq_ignore_ascii_case("ON") {
                Ok(Value::Bool(true))
            } else if name.eq_ignore_ascii_case("OFF") {
                Ok(Value::Bool(false))
            } else {
                Ok(Value::Str(ident.value.clone()))
            }
        }
        _ => Err(malformed(expr)),
    }
}

/// Like [`expression_to_value`], but recognizes the `DEFAULT` keyword.
pub fn expression_to_setting(expr: &Expr) -> Result<Setting, InterceptError> {
    if let Expr::Identifier(ident) = expr {
        if ident.quote_style.is_none() && ident.value.eq_ignore_ascii_case("DEFAULT") {
            return Ok(Setting::Default);
        }
    }
    expression_to_value(expr).map(Setting::Value)
}

fn literal_value(value: &SqlValue, expr: &Expr) -> Result<Value, InterceptError> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int(i))
            } else {
                n.parse::<f64>().map(Value::Float).map_err(|_| malformed(expr))
            }
        }
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
            Ok(Value::Str(s.clone()))
        }
        _ => Err(malformed(expr)),
    }
}

fn malformed(expr: &Expr) -> InterceptError {
    InterceptError::MalformedHintValue {
        expr: expr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlparser::ast::Ident;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn parse_expr(sql: &str) -> Expr {
        Parser::new(&MySqlDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(42),
            Value::Int(-7),
            Value::Float(1.5),
            Value::Float(2.0),
            Value::Str("it's".to_string()),
        ] {
            let expr = value_to_expression(&value);
            assert_eq!(expression_to_value(&expr).unwrap(), value);
        }
    }

    #[test]
    fn test_literal_sql_text() {
        assert_eq!(value_to_expression(&Value::Int(1)).to_string(), "1");
        assert_eq!(value_to_expression(&Value::from("a")).to_string(), "'a'");
        assert_eq!(value_to_expression(&Value::Null).to_string(), "NULL");
        assert_eq!(value_to_expression(&Value::Bool(true)).to_string(), "true");
    }

    #[test]
    fn test_parsed_literals() {
        assert_eq!(expression_to_value(&parse_expr("-3")).unwrap(), Value::Int(-3));
        assert_eq!(expression_to_value(&parse_expr("0.25")).unwrap(), Value::Float(0.25));
        assert_eq!(
            expression_to_value(&parse_expr("'abc'")).unwrap(),
            Value::from("abc")
        );
        assert_eq!(expression_to_value(&parse_expr("NULL")).unwrap(), Value::Null);
        assert_eq!(expression_to_value(&parse_expr("TRUE")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_bare_identifiers() {
        let on = Expr::Identifier(Ident::new("ON"));
        let off = Expr::Identifier(Ident::new("off"));
        let other = Expr::Identifier(Ident::new("TRADITIONAL"));
        assert_eq!(expression_to_value(&on).unwrap(), Value::Bool(true));
        assert_eq!(expression_to_value(&off).unwrap(), Value::Bool(false));
        assert_eq!(expression_to_value(&other).unwrap(), Value::from("TRADITIONAL"));
    }

    #[test]
    fn test_default_setting() {
        let expr = Expr::Identifier(Ident::new("DEFAULT"));
        assert_eq!(expression_to_setting(&expr).unwrap(), Setting::Default);
        assert_eq!(
            expression_to_setting(&parse_expr("1")).unwrap(),
            Setting::Value(Value::Int(1))
        );
    }

    #[test]
    fn test_non_literal_is_malformed() {
        let err = expression_to_value(&parse_expr("a + 1")).unwrap_err();
        assert!(matches!(err, InterceptError::MalformedHintValue { .. }));
    }
}
