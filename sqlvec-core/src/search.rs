use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::table::validate_identifier;
use crate::types::{Result, SearchQuery, SearchResult};

/// k-nearest-neighbour query against a `vec0` table, closest first.
///
/// Extra columns named in the query are returned as JSON values in the
/// order they were requested.
pub fn search_similar(
    conn: &Connection,
    table: &str,
    column: &str,
    query: &SearchQuery,
) -> Result<Vec<SearchResult>> {
    validate_identifier(table, "Table")?;
    validate_identifier(column, "Column")?;
    for extra in &query.columns {
        validate_identifier(extra, "Column")?;
    }

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut select = String::from("rowid, distance");
    for extra in &query.columns {
        select.push_str(", ");
        select.push_str(extra);
    }

    let sql = format!(
        "SELECT {} FROM {} WHERE {} MATCH ?1 AND k = ?2 ORDER BY distance",
        select, table, column
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![query.vector, query.limit as i64])?;
    let mut results = Vec::new();

    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(query.columns.len());
        for i in 0..query.columns.len() {
            let value: SqlValue = row.get(i + 2)?;
            columns.push(sql_to_json(value));
        }
        results.push(SearchResult {
            rowid: row.get(0)?,
            distance: row.get(1)?,
            columns,
        });
    }

    Ok(results)
}

fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Number(i.into()),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::Array(b.into_iter().map(|x| Value::Number(x.into())).collect()),
    }
}
