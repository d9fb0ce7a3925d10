//! SQL identifier quoting.
//!
//! Table references cannot be bound as parameters, so they are spliced into
//! statement text. Everything that goes through here is backtick-quoted with
//! embedded backticks doubled, which MySQL treats as a literal backtick.

use crate::errors::{AppError, AppResult};

/// Quotes a single identifier for MySQL.
///
/// # Errors
/// Returns `AppError::DatabaseQuery` for empty names and names containing
/// NUL, which MySQL does not accept as identifiers.
pub fn quote_identifier(ident: &str) -> AppResult<String> {
    if ident.is_empty() {
        return Err(AppError::DatabaseQuery("identifier must not be empty".into()));
    }
    if ident.contains('\0') {
        return Err(AppError::DatabaseQuery(
            "identifier must not contain NUL".into(),
        ));
    }
    Ok(format!("`{}`", ident.replace('`', "``")))
}

/// Builds a `` `schema`.`table` `` reference.
pub fn qualified_table_name(schema: &str, table: &str) -> AppResult<String> {
    Ok(format!(
        "{}.{}",
        quote_identifier(schema)?,
        quote_identifier(table)?
    ))
}
