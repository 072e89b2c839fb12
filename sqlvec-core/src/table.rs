//! Helpers for `vec0` virtual tables.
//!
//! Table and column names are interpolated into SQL, so every name is
//! checked against a conservative identifier alphabet before any statement
//! is built. Vector values are always bound as parameters.

use rusqlite::{params, Connection};

use crate::types::{Result, TableStats, VecError, VectorColumn, VectorEntry};

const MAX_IDENTIFIER_LEN: usize = 128;

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`, at most 128 characters.
pub fn validate_identifier(name: &str, kind: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VecError::InvalidIdentifier(format!(
            "{} name must not be empty",
            kind
        )));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(VecError::InvalidIdentifier(format!(
            "{} name must be {} characters or fewer, got {}",
            kind,
            MAX_IDENTIFIER_LEN,
            name.len()
        )));
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(VecError::InvalidIdentifier(format!(
                "{} name '{}' must start with a letter or underscore",
                kind, name
            )));
        }
    }
    if let Some(bad) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(VecError::InvalidIdentifier(format!(
            "{} name '{}' contains invalid character '{}'",
            kind, name, bad
        )));
    }
    Ok(())
}

/// Validate an extra `vec0` column definition such as `genre text`,
/// `+title text` (auxiliary) or `user_id integer partition key`.
fn validate_column_definition(def: &str) -> Result<()> {
    let mut tokens = def.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| VecError::InvalidIdentifier("empty column definition".to_string()))?;
    validate_identifier(name.strip_prefix('+').unwrap_or(name), "Column")?;
    for token in tokens {
        validate_identifier(token, "Column type")?;
    }
    Ok(())
}

pub fn create_vector_table(
    conn: &Connection,
    table: &str,
    vector_column: &VectorColumn,
    extra_columns: &[&str],
) -> Result<()> {
    validate_identifier(table, "Table")?;
    validate_identifier(&vector_column.name, "Column")?;
    if vector_column.dimensions == 0 {
        return Err(VecError::InvalidVector(
            "vector column must have at least one dimension".to_string(),
        ));
    }
    for def in extra_columns {
        validate_column_definition(def)?;
    }

    let mut columns = vec![vector_column.to_string()];
    columns.extend(extra_columns.iter().map(|c| c.split_whitespace().collect::<Vec<_>>().join(" ")));

    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE {} USING vec0({})",
        table,
        columns.join(", ")
    ))?;

    tracing::debug!(table, column = %vector_column, "created vec0 table");
    Ok(())
}

pub fn insert_vector(
    conn: &Connection,
    table: &str,
    column: &str,
    rowid: i64,
    vector: &[u8],
) -> Result<()> {
    validate_identifier(table, "Table")?;
    validate_identifier(column, "Column")?;
    conn.execute(
        &format!("INSERT INTO {}(rowid, {}) VALUES (?1, ?2)", table, column),
        params![rowid, vector],
    )?;
    Ok(())
}

/// Insert every entry inside one transaction. Either all rows land or none.
pub fn insert_vectors_batch(
    conn: &Connection,
    table: &str,
    column: &str,
    entries: &[VectorEntry],
) -> Result<usize> {
    validate_identifier(table, "Table")?;
    validate_identifier(column, "Column")?;

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {}(rowid, {}) VALUES (?1, ?2)",
            table, column
        ))?;
        for entry in entries {
            stmt.execute(params![entry.rowid, entry.vector])?;
        }
    }
    tx.commit()?;

    tracing::debug!(table, rows = entries.len(), "batch inserted vectors");
    Ok(entries.len())
}

pub fn update_vector(
    conn: &Connection,
    table: &str,
    column: &str,
    rowid: i64,
    vector: &[u8],
) -> Result<usize> {
    validate_identifier(table, "Table")?;
    validate_identifier(column, "Column")?;
    let affected = conn.execute(
        &format!("UPDATE {} SET {} = ?1 WHERE rowid = ?2", table, column),
        params![vector, rowid],
    )?;
    Ok(affected)
}

pub fn delete_vector(conn: &Connection, table: &str, rowid: i64) -> Result<usize> {
    validate_identifier(table, "Table")?;
    let affected = conn.execute(
        &format!("DELETE FROM {} WHERE rowid = ?1", table),
        params![rowid],
    )?;
    Ok(affected)
}

pub fn table_stats(conn: &Connection, table: &str) -> Result<TableStats> {
    validate_identifier(table, "Table")?;
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(TableStats {
        table: table.to_string(),
        row_count: count as usize,
    })
}
