pub mod validator;

pub use validator::{validate, validate_procedure_statement, SqlValidationError};

/// Trims the statement and removes one trailing `;`.
pub fn strip_terminator(sql: &str) -> &str {
    let trimmed = sql.trim();
    trimmed.strip_suffix(';').map(str::trim_end).unwrap_or(trimmed)
}
