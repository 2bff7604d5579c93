use super::predicate::{Operator, Predicate};
use crate::core::{DbError, Result, Value};
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// A query string reduced to its column family and predicate sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub family: String,
    pub predicates: Vec<Predicate>,
    pub limit: Option<usize>,
}

/// Parses `SELECT * FROM <family> WHERE ...`.
///
/// The WHERE clause is a conjunction of comparisons (`=`, `<`, `<=`, `>`,
/// `>=`) and `BETWEEN`, each between one column and one literal. Predicate
/// order follows the text.
pub fn parse_query(sql: &str) -> Result<ParsedQuery> {
    let dialect = PostgreSqlDialect {};
    let mut statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| DbError::ParseError(e.to_string()))?;
    if statements.len() != 1 {
        return Err(DbError::UnsupportedQuery(format!(
            "expected one statement, got {}",
            statements.len()
        )));
    }

    let sql_ast::Statement::Query(query) = statements.remove(0) else {
        return Err(unsupported("only SELECT statements are supported"));
    };
    if query.order_by.is_some() {
        return Err(unsupported("ORDER BY is not supported; results follow predicate order"));
    }
    let limit = convert_limit_clause(&query.limit_clause)?;

    let sql_ast::SetExpr::Select(select) = *query.body else {
        return Err(unsupported("only plain SELECT queries are supported"));
    };

    if !matches!(select.projection.as_slice(), [sql_ast::SelectItem::Wildcard(_)]) {
        return Err(unsupported("only SELECT * is supported"));
    }

    let family = match select.from.as_slice() {
        [table] if table.joins.is_empty() => match &table.relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(name)?,
            _ => return Err(unsupported("FROM must name a column family")),
        },
        _ => return Err(unsupported("FROM must name exactly one column family")),
    };

    let mut predicates = Vec::new();
    if let Some(selection) = select.selection {
        collect_predicates(selection, &mut predicates)?;
    }

    Ok(ParsedQuery {
        family,
        predicates,
        limit,
    })
}

fn unsupported(reason: &str) -> DbError {
    DbError::UnsupportedQuery(reason.to_string())
}

fn collect_predicates(expr: sql_ast::Expr, out: &mut Vec<Predicate>) -> Result<()> {
    match expr {
        sql_ast::Expr::Nested(inner) => collect_predicates(*inner, out),
        sql_ast::Expr::BinaryOp {
            left,
            op: sql_ast::BinaryOperator::And,
            right,
        } => {
            collect_predicates(*left, out)?;
            collect_predicates(*right, out)
        }
        sql_ast::Expr::BinaryOp { left, op, right } => {
            let operator = match op {
                sql_ast::BinaryOperator::Eq => Operator::Eq,
                sql_ast::BinaryOperator::Lt => Operator::Lt,
                sql_ast::BinaryOperator::LtEq => Operator::Lte,
                sql_ast::BinaryOperator::Gt => Operator::Gt,
                sql_ast::BinaryOperator::GtEq => Operator::Gte,
                other => return Err(DbError::UnsupportedQuery(format!("operator {} is not supported", other))),
            };
            if let Some(attribute) = column_name(&left) {
                out.push(Predicate::new(attribute, operator, literal(&right)?));
            } else if let Some(attribute) = column_name(&right) {
                out.push(Predicate::new(attribute, operator.flipped(), literal(&left)?));
            } else {
                return Err(unsupported("each comparison needs exactly one column"));
            }
            Ok(())
        }
        sql_ast::Expr::Between {
            expr,
            negated: false,
            low,
            high,
        } => {
            let attribute = column_name(&expr)
                .ok_or_else(|| unsupported("BETWEEN must apply to a column"))?;
            out.push(Predicate::between(attribute, literal(&low)?, literal(&high)?));
            Ok(())
        }
        other => Err(DbError::UnsupportedQuery(format!(
            "unsupported condition: {}",
            other
        ))),
    }
}

fn column_name(expr: &sql_ast::Expr) -> Option<String> {
    match expr {
        sql_ast::Expr::Identifier(ident) => Some(ident.value.clone()),
        sql_ast::Expr::CompoundIdentifier(parts) => parts.last().map(|ident| ident.value.clone()),
        sql_ast::Expr::Nested(inner) => column_name(inner),
        _ => None,
    }
}

fn literal(expr: &sql_ast::Expr) -> Result<Value> {
    match expr {
        sql_ast::Expr::Value(value_with_span) => convert_value(&value_with_span.value),
        sql_ast::Expr::Nested(inner) => literal(inner),
        sql_ast::Expr::UnaryOp {
            op: sql_ast::UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Integer(i) => Ok(Value::Integer(-i)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(DbError::TypeMismatch(format!("cannot negate {}", other.type_name()))),
        },
        other => Err(DbError::UnsupportedQuery(format!(
            "expected a literal, got {}",
            other
        ))),
    }
}

fn convert_value(value: &sql_ast::Value) -> Result<Value> {
    match value {
        sql_ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Integer(i))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Float(f))
            } else {
                Err(DbError::TypeMismatch(format!("Invalid number: {}", n)))
            }
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        sql_ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        sql_ast::Value::Null => Ok(Value::Null),
        other => Err(DbError::UnsupportedQuery(format!(
            "unsupported literal: {}",
            other
        ))),
    }
}

fn convert_limit_clause(limit_clause: &Option<sql_ast::LimitClause>) -> Result<Option<usize>> {
    let Some(clause) = limit_clause else {
        return Ok(None);
    };

    match clause {
        sql_ast::LimitClause::LimitOffset {
            limit, offset: None, ..
        } => match limit {
            Some(sql_ast::Expr::Value(value_with_span)) => match &value_with_span.value {
                sql_ast::Value::Number(n, _) => n
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| DbError::ParseError(format!("Invalid LIMIT value: {}", n))),
                other => Err(DbError::UnsupportedQuery(format!(
                    "Only numeric LIMIT supported, got: {}",
                    other
                ))),
            },
            Some(_) => Err(unsupported("Only numeric LIMIT supported")),
            None => Ok(None),
        },
        _ => Err(unsupported("OFFSET is not supported")),
    }
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| ident.to_string())
        .ok_or_else(|| DbError::ParseError("Invalid table name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ops::Bound;

    #[test]
    fn test_conjunction_in_text_order() {
        let parsed = parse_query("SELECT * FROM users WHERE age >= 30 AND name = 'Bob'").unwrap();
        assert_eq!(parsed.family, "users");
        assert_eq!(
            parsed.predicates,
            vec![Predicate::gte("age", 30i64), Predicate::eq("name", "Bob")]
        );
        assert_eq!(parsed.limit, None);
    }

    #[test]
    fn test_flipped_literal_and_parentheses() {
        let parsed = parse_query("SELECT * FROM users WHERE (18 < age) AND (score <= -1.5)").unwrap();
        assert_eq!(
            parsed.predicates,
            vec![Predicate::gt("age", 18i64), Predicate::lte("score", -1.5)]
        );
    }

    #[test]
    fn test_between_and_limit() {
        let parsed = parse_query("SELECT * FROM events WHERE id BETWEEN 10 AND 20 LIMIT 5").unwrap();
        assert_eq!(
            parsed.predicates,
            vec![Predicate::range(
                "id",
                Bound::Included(Value::Integer(10)),
                Bound::Included(Value::Integer(20))
            )]
        );
        assert_eq!(parsed.limit, Some(5));
    }

    #[test]
    fn test_rejected_shapes() {
        for sql in [
            "SELECT name FROM users WHERE id = 1",
            "SELECT * FROM users WHERE id = 1 OR id = 2",
            "SELECT * FROM users WHERE name LIKE 'B%'",
            "SELECT * FROM users WHERE id NOT BETWEEN 1 AND 2",
            "SELECT * FROM users u JOIN orders o ON u.id = o.uid",
            "SELECT * FROM users WHERE id = 1 ORDER BY id",
            "DELETE FROM users WHERE id = 1",
            "SELECT * FROM users WHERE age = age",
        ] {
            assert!(
                matches!(parse_query(sql), Err(DbError::UnsupportedQuery(_))),
                "accepted: {}",
                sql
            );
        }
        assert!(matches!(parse_query("SELEC * FROM"), Err(DbError::ParseError(_))));
    }
}
