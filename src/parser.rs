//! SQL frontend: parse module text into a single statement and collect
//! its named parameters with a typed AST visitor.

use crate::error::Error;
use sqlparser::ast::{Expr, Statement, Value, Visit, Visitor};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Parse SQL that must contain exactly one statement.
pub fn parse_single(path: &str, sql: &str) -> Result<Statement, Error> {
    let dialect = SQLiteDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql).map_err(|e| Error::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(Error::Parse {
            path: path.to_string(),
            message: "no SQL statement found".to_string(),
        }),
        _ => Err(Error::MultipleStatements(path.to_string())),
    }
}

/// True for a SELECT-shaped statement; everything else is assumed to
/// modify data.
pub fn is_select(statement: &Statement) -> bool {
    matches!(statement, Statement::Query(_))
}

/// Distinct named parameters (`:name` convention) in first-occurrence
/// order. SQLite assigns bind indexes to named parameters in the same
/// order, which is what makes positional binding line up.
pub fn named_parameters(path: &str, statement: &Statement) -> Result<Vec<String>, Error> {
    let mut visitor = ParameterVisitor::default();
    let _ = statement.visit(&mut visitor);
    if let Some(token) = visitor.unnamed {
        return Err(Error::Parse {
            path: path.to_string(),
            message: format!("placeholder '{token}' is not supported, use :name"),
        });
    }
    Ok(visitor.names)
}

#[derive(Default)]
struct ParameterVisitor {
    seen: HashSet<String>,
    names: Vec<String>,
    unnamed: Option<String>,
}

impl Visitor for ParameterVisitor {
    type Break = ();

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Value(Value::Placeholder(token)) = expr {
            match parameter_name(token) {
                Some(name) => {
                    if self.seen.insert(name.clone()) {
                        self.names.push(name);
                    }
                }
                None => self.unnamed = Some(token.clone()),
            }
        }
        ControlFlow::Continue(())
    }
}

/// `:stuff`, `@stuff`, `$stuff` -> `stuff`; positional tokens have no name.
fn parameter_name(token: &str) -> Option<String> {
    let name = token
        .strip_prefix(':')
        .or_else(|| token.strip_prefix('@'))
        .or_else(|| token.strip_prefix('$'))?;
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_statement() {
        let statement = parse_single("t.sql", "SELECT 'hello, world'").unwrap();
        assert!(is_select(&statement));
    }

    #[test]
    fn rejects_statement_batches() {
        let err = parse_single("t.sql", "SELECT 1; SELECT 2").unwrap_err();
        assert!(matches!(err, Error::MultipleStatements(_)));
    }

    #[test]
    fn rejects_empty_files() {
        assert!(parse_single("t.sql", "  \n").is_err());
    }

    #[test]
    fn insert_is_not_a_select() {
        let statement = parse_single("t.sql", "INSERT INTO t VALUES (1)").unwrap();
        assert!(!is_select(&statement));
    }

    #[test]
    fn collects_parameters_in_first_occurrence_order() {
        let statement = parse_single(
            "t.sql",
            "SELECT :second AS b FROM t WHERE a = :first AND b = :second",
        )
        .unwrap();
        let names = named_parameters("t.sql", &statement).unwrap();
        assert_eq!(names, vec!["second".to_string(), "first".to_string()]);
    }

    #[test]
    fn rejects_positional_placeholders() {
        let statement = parse_single("t.sql", "SELECT * FROM t WHERE a = ?").unwrap();
        assert!(named_parameters("t.sql", &statement).is_err());
    }

    #[test]
    fn no_parameters_is_fine() {
        let statement = parse_single("t.sql", "SELECT 1").unwrap();
        assert!(named_parameters("t.sql", &statement).unwrap().is_empty());
    }
}
