//! Read-only SQL checks.
//!
//! Two independent layers live here. [`validate`] is the regex blocklist run on
//! generated SQL before it leaves the service. [`validate_procedure_statement`]
//! mirrors the check the `execute_sql` stored procedure performs on the database
//! side, and is what the local DuckDB executor enforces in-process. Neither is a
//! parser; both are best-effort filters and each must reject on its own.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref LINE_COMMENT: Regex = Regex::new(r"--[^\n]*").unwrap();
    static ref CHAINED_WRITE: Regex =
        Regex::new(r";\s*(drop|delete|update|insert|alter|create|truncate|grant|revoke)\b").unwrap();
    static ref UNION_SELECT: Regex = Regex::new(r"(?s)\bunion\b.*\bselect\b").unwrap();
    static ref EXEC_CALL: Regex = Regex::new(r"\bexec(ute)?\s*\(").unwrap();
}

const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "create", "alter", "truncate", "grant", "revoke",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlValidationError {
    #[error("Query chains a write or DDL statement after a statement separator")]
    ChainedStatement,

    #[error("UNION-based SELECT constructs are not allowed")]
    UnionSelect,

    #[error("EXEC/EXECUTE calls are not allowed")]
    ExecCall,

    #[error("Only SELECT queries are allowed")]
    NotSelect,

    #[error("Query contains forbidden keyword: {0}")]
    ForbiddenKeyword(String),
}

/// Lower-cases the statement and removes `/* */` and `--` comments.
///
/// The result is only ever used for pattern matching, never executed.
pub fn strip_comments(sql: &str) -> String {
    let lowered = sql.to_lowercase();
    let without_blocks = BLOCK_COMMENT.replace_all(&lowered, " ");
    LINE_COMMENT.replace_all(&without_blocks, " ").into_owned()
}

/// Client-side blocklist applied to every generated statement.
///
/// Expects the trailing terminator to be stripped already; an empty string is
/// not a query and should never reach this function.
pub fn validate(sql: &str) -> Result<(), SqlValidationError> {
    let normalized = strip_comments(sql);

    if CHAINED_WRITE.is_match(&normalized) {
        return Err(SqlValidationError::ChainedStatement);
    }
    if UNION_SELECT.is_match(&normalized) {
        return Err(SqlValidationError::UnionSelect);
    }
    if EXEC_CALL.is_match(&normalized) {
        return Err(SqlValidationError::ExecCall);
    }

    let trimmed = normalized.trim_start();
    if !(trimmed.starts_with("select") || trimmed.starts_with("with")) {
        return Err(SqlValidationError::NotSelect);
    }

    Ok(())
}

#[cfg(test)]
pub fn is_valid(sql: &str) -> bool {
    validate(sql).is_ok()
}

/// The stored procedure's own re-validation: the statement must start with
/// `select`/`with` and contain no forbidden keyword as a whole word.
pub fn validate_procedure_statement(sql: &str) -> Result<(), SqlValidationError> {
    let normalized = strip_comments(sql);
    let trimmed = normalized.trim();

    if !(trimmed.starts_with("select") || trimmed.starts_with("with")) {
        return Err(SqlValidationError::NotSelect);
    }

    let forbidden = trimmed
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| FORBIDDEN_KEYWORDS.contains(token));

    match forbidden {
        Some(keyword) => Err(SqlValidationError::ForbiddenKeyword(keyword.to_uppercase())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert!(is_valid("SELECT 1"));
        assert!(is_valid("  select count(*) from olist_orders"));
    }

    #[test]
    fn accepts_cte_prefix() {
        let sql = "WITH monthly AS (SELECT 1 AS n) SELECT n FROM monthly";
        assert_eq!(validate(sql), Ok(()));
    }

    #[test]
    fn rejects_chained_drop() {
        assert_eq!(
            validate("SELECT * FROM orders; DROP TABLE orders"),
            Err(SqlValidationError::ChainedStatement)
        );
        assert!(!is_valid("select 1 ;   drop table x"));
        assert!(!is_valid("SELECT 1; DROP TABLE x"));
    }

    #[test]
    fn comments_do_not_hide_chained_writes() {
        assert!(!is_valid("SELECT 1; /* harmless */ DELETE FROM olist_orders"));
        assert!(!is_valid("SELECT 1; -- note\nUPDATE olist_orders SET x = 1"));
    }

    #[test]
    fn keyword_inside_comment_is_ignored() {
        assert!(is_valid("SELECT 1 /* ; drop table x */"));
        assert!(is_valid("SELECT 1 -- ; delete everything"));
    }

    #[test]
    fn comment_cannot_fake_select_prefix() {
        assert_eq!(
            validate("/* select */ DELETE FROM olist_orders"),
            Err(SqlValidationError::NotSelect)
        );
    }

    #[test]
    fn rejects_union_select() {
        assert_eq!(
            validate("SELECT a FROM t UNION ALL SELECT password FROM users"),
            Err(SqlValidationError::UnionSelect)
        );
    }

    #[test]
    fn rejects_exec_calls() {
        assert_eq!(validate("SELECT exec('x')"), Err(SqlValidationError::ExecCall));
        assert_eq!(validate("SELECT EXECUTE ('x')"), Err(SqlValidationError::ExecCall));
    }

    #[test]
    fn rejects_non_select_statements() {
        assert_eq!(validate("DELETE FROM olist_orders"), Err(SqlValidationError::NotSelect));
        assert_eq!(validate("update t set a = 1"), Err(SqlValidationError::NotSelect));
    }

    #[test]
    fn procedure_check_accepts_reads() {
        assert_eq!(validate_procedure_statement("SELECT 1"), Ok(()));
        assert_eq!(
            validate_procedure_statement("with x as (select 1) select * from x"),
            Ok(())
        );
    }

    #[test]
    fn procedure_check_rejects_modifying_cte_the_blocklist_misses() {
        let sql = "WITH gone AS (DELETE FROM olist_orders RETURNING *) SELECT * FROM gone";
        assert!(is_valid(sql));
        assert_eq!(
            validate_procedure_statement(sql),
            Err(SqlValidationError::ForbiddenKeyword("DELETE".to_string()))
        );
    }

    #[test]
    fn procedure_check_matches_whole_words_only() {
        assert_eq!(
            validate_procedure_statement("SELECT order_delivered_customer_date, created_at FROM olist_orders"),
            Ok(())
        );
        assert_eq!(
            validate_procedure_statement("SELECT updated FROM t"),
            Ok(())
        );
    }

    #[test]
    fn procedure_check_rejects_non_select() {
        assert_eq!(
            validate_procedure_statement("-- read\nDROP TABLE olist_orders"),
            Err(SqlValidationError::NotSelect)
        );
    }
}
