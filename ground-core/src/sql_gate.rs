//! SQL Safety Gate (C2): parses a candidate SQL string to a real AST via
//! `sqlparser`, rejects anything but a single `SELECT`, checks table
//! references against an allowlist, scans for forbidden functions as a
//! defence-in-depth layer, and always enforces a row limit.

use std::collections::BTreeSet;

use sqlparser::ast::{Expr, Query, SetExpr, Statement, TableFactor, Value as SqlValue};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::{Error, Result};

/// Policy configuration for one SQL Safety Gate evaluation.
#[derive(Debug, Clone)]
pub struct SqlPolicyConfig {
    pub max_rows: u32,
    pub allowed_tables: Vec<String>,
    pub allowed_columns: Vec<String>,
    pub forbidden_functions: Vec<String>,
}

impl Default for SqlPolicyConfig {
    fn default() -> Self {
        Self {
            max_rows: 200,
            allowed_tables: Vec::new(),
            allowed_columns: Vec::new(),
            forbidden_functions: crate::config::default_forbidden_functions(),
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone)]
pub struct SqlGateResult {
    pub valid: bool,
    pub sanitized_sql: String,
    pub effective_limit: u32,
    pub referenced_tables: Vec<String>,
    pub errors: Vec<String>,
}

/// Evaluate a candidate SQL string against policy, per spec §4.2's algorithm.
pub fn evaluate(sql: &str, config: &SqlPolicyConfig) -> Result<SqlGateResult> {
    let trimmed = sql.trim().trim_end_matches(';').trim();

    let statements = Parser::parse_sql(&GenericDialect {}, trimmed)
        .map_err(|e| Error::sql_safety(format!("failed to parse SQL: {e}")))?;

    if statements.len() != 1 {
        return Err(Error::sql_safety(format!(
            "expected exactly one statement, got {}",
            statements.len()
        )));
    }

    let query = match &statements[0] {
        Statement::Query(q) => q.as_ref().clone(),
        other => {
            return Err(Error::sql_safety(format!(
                "statement must be a SELECT, got {}",
                statement_kind(other)
            )));
        }
    };

    let mut errors = Vec::new();

    let referenced_tables: BTreeSet<String> = collect_tables(&query);

    if config.allowed_tables.is_empty() {
        tracing::warn!("SQL gate running with an empty table allowlist; treating as permissive");
    } else {
        let allowed: BTreeSet<&str> = config.allowed_tables.iter().map(String::as_str).collect();
        for table in &referenced_tables {
            if !allowed.contains(table.as_str()) {
                errors.push(format!("table '{table}' is not in the allowed table list"));
            }
        }
    }

    let haystack = trimmed.to_lowercase();
    for forbidden in &config.forbidden_functions {
        if haystack.contains(&forbidden.to_lowercase()) {
            errors.push(format!("forbidden function or construct referenced: '{forbidden}'"));
        }
    }

    let (sanitized_sql, effective_limit) = apply_limit(trimmed, &query, config.max_rows);

    let valid = errors.is_empty();

    Ok(SqlGateResult {
        valid,
        sanitized_sql,
        effective_limit,
        referenced_tables: referenced_tables.into_iter().collect(),
        errors,
    })
}

fn statement_kind(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Insert { .. } => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete { .. } => "DELETE",
        Statement::CreateTable { .. } => "CREATE TABLE",
        Statement::Drop { .. } => "DROP",
        Statement::AlterTable { .. } => "ALTER TABLE",
        _ => "non-SELECT statement",
    }
}

/// Literal integer value of `query.limit`, if it is a plain numeric literal.
fn literal_limit(query: &Query) -> Option<i64> {
    match query.limit.as_ref()? {
        Expr::Value(SqlValue::Number(s, _)) => s.parse::<i64>().ok(),
        _ => None,
    }
}

/// Apply spec §4.2 step 7's three LIMIT-injection cases, returning the
/// sanitized SQL text and the limit actually in force.
fn apply_limit(trimmed: &str, query: &Query, max_rows: u32) -> (String, u32) {
    match (&query.limit, literal_limit(query)) {
        (None, _) => (format!("{trimmed} LIMIT {max_rows}"), max_rows),
        (Some(_), Some(n)) => {
            let effective = (n.max(0) as u32).min(max_rows);
            let without_limit = strip_trailing_limit(trimmed);
            (format!("{without_limit} LIMIT {effective}"), effective)
        }
        // Non-literal LIMIT: leave the original nested and add a bounding
        // outer LIMIT, per spec.md §4.2 step 7's third case.
        (Some(_), None) => (
            format!("SELECT * FROM ({trimmed}) AS bounded_subquery LIMIT {max_rows}"),
            max_rows,
        ),
    }
}

/// Best-effort removal of a trailing `LIMIT ...` clause by text, used only
/// when we already know (from the AST) that one literal `LIMIT` is present
/// at the end of the statement.
fn strip_trailing_limit(sql: &str) -> String {
    let lower = sql.to_lowercase();
    match lower.rfind(" limit ") {
        Some(idx) => sql[..idx].trim_end().to_string(),
        None => sql.to_string(),
    }
}

fn collect_tables(query: &Query) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            tables.extend(collect_tables(&cte.query));
        }
    }
    collect_tables_from_set_expr(&query.body, &mut tables);
    tables
}

fn collect_tables_from_set_expr(expr: &SetExpr, tables: &mut BTreeSet<String>) {
    match expr {
        SetExpr::Select(select) => {
            for twj in &select.from {
                collect_tables_from_factor(&twj.relation, tables);
                for join in &twj.joins {
                    collect_tables_from_factor(&join.relation, tables);
                }
            }
        }
        SetExpr::SetOperation { left, right, .. } => {
            collect_tables_from_set_expr(left, tables);
            collect_tables_from_set_expr(right, tables);
        }
        SetExpr::Query(q) => tables.extend(collect_tables(q)),
        _ => {}
    }
}

fn collect_tables_from_factor(factor: &TableFactor, tables: &mut BTreeSet<String>) {
    match factor {
        TableFactor::Table { name, .. } => {
            tables.insert(name.to_string());
        }
        TableFactor::Derived { subquery, .. } => {
            tables.extend(collect_tables(subquery));
        }
        TableFactor::NestedJoin { table_with_joins, .. } => {
            collect_tables_from_factor(&table_with_joins.relation, tables);
            for join in &table_with_joins.joins {
                collect_tables_from_factor(&join.relation, tables);
            }
        }
        _ => {}
    }
}
