use rusqlite::types::FromSql;
use rusqlite::{params, Connection, Params};

use crate::types::{DistanceMetric, ElementType, Result, VecError};

/// Prepare `sql`, run a single step and read column 0 of the first row.
///
/// The statement is never taken from the prepared-statement cache and is
/// finalized when it drops, on success and on every error path.
fn scalar<T: FromSql, P: Params>(conn: &Connection, sql: &str, params: P) -> Result<T> {
    let mut stmt = conn.prepare(sql).map_err(|e| {
        tracing::warn!(sql, "failed to prepare query: {}", e);
        e
    })?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(row.get(0)?),
        None => Err(VecError::NoResult),
    }
}

pub fn distance(conn: &Connection, a: &[u8], b: &[u8], metric: DistanceMetric) -> Result<f64> {
    let sql = format!("SELECT {}", metric.sql_call());
    scalar(conn, &sql, params![a, b])
}

/// Number of elements in a vector blob, as reported by `vec_length`.
pub fn vector_length(conn: &Connection, v: &[u8]) -> Result<usize> {
    let len: i64 = scalar(conn, "SELECT vec_length(?1)", params![v])?;
    usize::try_from(len)
        .map_err(|_| VecError::InvalidVector(format!("negative vector length {}", len)))
}

pub fn normalize(conn: &Connection, v: &[u8]) -> Result<Vec<u8>> {
    scalar(conn, "SELECT vec_normalize(?1)", params![v])
}

pub fn add(conn: &Connection, a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
    scalar(conn, "SELECT vec_add(?1, ?2)", params![a, b])
}

pub fn subtract(conn: &Connection, a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
    scalar(conn, "SELECT vec_sub(?1, ?2)", params![a, b])
}

pub fn to_json(conn: &Connection, v: &[u8]) -> Result<String> {
    scalar(conn, "SELECT vec_to_json(?1)", params![v])
}

/// Element values of a vector blob read as `element`, decoded from
/// `vec_to_json`.
pub fn elements(conn: &Connection, v: &[u8], element: ElementType) -> Result<Vec<f64>> {
    let sql = format!("SELECT vec_to_json({}(?1))", element.sql_constructor());
    let text: String = scalar(conn, &sql, params![v])?;
    Ok(serde_json::from_str(&text)?)
}

/// Parse a JSON array such as `[0.1, 0.2]` into a float32 blob.
pub fn from_json(conn: &Connection, json: &str) -> Result<Vec<u8>> {
    scalar(conn, "SELECT vec_f32(?1)", params![json])
}

pub fn version(conn: &Connection) -> Result<String> {
    scalar(conn, "SELECT vec_version()", [])
}

/// True when `vec_version()` prepares and yields a row on this connection.
pub fn is_loaded(conn: &Connection) -> bool {
    let Ok(mut stmt) = conn.prepare("SELECT vec_version()") else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    matches!(rows.next(), Ok(Some(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension;
    use crate::marshal::{deserialize_f32, serialize_f32};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        extension::register(&conn).unwrap();
        conn
    }

    #[test]
    fn test_scalar_no_row() {
        let conn = conn();
        let err = scalar::<i64, _>(&conn, "SELECT 1 WHERE 0", []).unwrap_err();
        assert!(matches!(err, VecError::NoResult));
    }

    #[test]
    fn test_scalar_prepare_failure() {
        let conn = conn();
        let err = scalar::<i64, _>(&conn, "SELECT no_such_function()", []).unwrap_err();
        assert!(matches!(err, VecError::Sqlite(_)));
    }

    #[test]
    fn test_is_loaded_without_registration() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!is_loaded(&conn));
        extension::register(&conn).unwrap();
        assert!(is_loaded(&conn));
    }

    #[test]
    fn test_normalize_unit_length() {
        let conn = conn();
        let out = normalize(&conn, &serialize_f32(&[3.0, 4.0])).unwrap();
        let v = deserialize_f32(&out).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_elements_decodes_json() {
        let conn = conn();
        let blob = serialize_f32(&[1.5, -2.0]);
        let values = elements(&conn, &blob, ElementType::Float32).unwrap();
        assert_eq!(values, vec![1.5, -2.0]);
    }

    #[test]
    fn test_elements_reads_int8() {
        let conn = conn();
        let values = elements(&conn, &[1, 2, 0xFF], ElementType::Int8).unwrap();
        assert_eq!(values, vec![1.0, 2.0, -1.0]);

        // Three bytes are not a float32 vector.
        assert!(elements(&conn, &[1, 2, 3], ElementType::Float32).is_err());
    }
}
