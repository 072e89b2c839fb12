pub mod extension;
pub mod marshal;
pub mod query;
pub mod search;
pub mod table;
pub mod types;

pub use rusqlite::ffi;
pub use types::{
    DistanceMetric, ElementType, InitOutcome, Result, SearchQuery, SearchResult, TableStats,
    VecError, VectorColumn, VectorEntry,
};

/// A SQLite connection with sqlite-vec registered.
///
/// Built either from a path (the connection is owned and closed on drop) or
/// from a raw handle owned by someone else (dropping never closes it).
pub struct VecDb {
    conn: rusqlite::Connection,
}

impl VecDb {
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        extension::register(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Borrow an externally owned connection. The extension is not
    /// registered here; call [`VecDb::init`] or check [`VecDb::is_loaded`].
    ///
    /// # Safety
    /// `db` must be null or a valid open `sqlite3*` that outlives the
    /// returned value and is not used from another thread meanwhile.
    pub unsafe fn from_raw_handle(db: *mut rusqlite::ffi::sqlite3) -> Result<Self> {
        if db.is_null() {
            return Err(VecError::NullHandle);
        }
        let conn = rusqlite::Connection::from_handle(db)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn init(&self) -> Result<()> {
        extension::register(&self.conn)
    }

    pub fn is_loaded(&self) -> bool {
        query::is_loaded(&self.conn)
    }

    /// Register the extension unless it is already available.
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        self.init()
    }

    pub fn version(&self) -> Result<String> {
        query::version(&self.conn)
    }

    pub fn distance(&self, a: &[u8], b: &[u8], metric: DistanceMetric) -> Result<f64> {
        query::distance(&self.conn, a, b, metric)
    }

    pub fn distance_f32(&self, a: &[f32], b: &[f32], metric: DistanceMetric) -> Result<f64> {
        query::distance(
            &self.conn,
            marshal::f32_as_bytes(a),
            marshal::f32_as_bytes(b),
            metric,
        )
    }

    pub fn vector_length(&self, v: &[u8]) -> Result<usize> {
        query::vector_length(&self.conn, v)
    }

    pub fn length_f32(&self, v: &[f32]) -> Result<usize> {
        query::vector_length(&self.conn, marshal::f32_as_bytes(v))
    }

    pub fn normalize(&self, v: &[u8]) -> Result<Vec<u8>> {
        query::normalize(&self.conn, v)
    }

    pub fn normalize_f32(&self, v: &[f32]) -> Result<Vec<f32>> {
        let blob = query::normalize(&self.conn, marshal::f32_as_bytes(v))?;
        marshal::deserialize_f32(&blob)
    }

    pub fn add(&self, a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
        query::add(&self.conn, a, b)
    }

    pub fn add_f32(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        let blob = query::add(&self.conn, marshal::f32_as_bytes(a), marshal::f32_as_bytes(b))?;
        marshal::deserialize_f32(&blob)
    }

    pub fn subtract(&self, a: &[u8], b: &[u8]) -> Result<Vec<u8>> {
        query::subtract(&self.conn, a, b)
    }

    pub fn subtract_f32(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        let blob =
            query::subtract(&self.conn, marshal::f32_as_bytes(a), marshal::f32_as_bytes(b))?;
        marshal::deserialize_f32(&blob)
    }

    pub fn to_json(&self, v: &[u8]) -> Result<String> {
        query::to_json(&self.conn, v)
    }

    pub fn to_json_f32(&self, v: &[f32]) -> Result<String> {
        query::to_json(&self.conn, marshal::f32_as_bytes(v))
    }

    pub fn elements(&self, v: &[u8], element: ElementType) -> Result<Vec<f64>> {
        query::elements(&self.conn, v, element)
    }

    /// Round-trip through `vec_f32`, so the extension decides what JSON it
    /// accepts.
    pub fn from_json_f32(&self, json: &str) -> Result<Vec<f32>> {
        let blob = query::from_json(&self.conn, json)?;
        marshal::deserialize_f32(&blob)
    }

    pub fn create_vector_table(
        &self,
        table: &str,
        vector_column: &VectorColumn,
        extra_columns: &[&str],
    ) -> Result<()> {
        table::create_vector_table(&self.conn, table, vector_column, extra_columns)
    }

    pub fn insert_vector(&self, table: &str, column: &str, rowid: i64, v: &[f32]) -> Result<()> {
        table::insert_vector(&self.conn, table, column, rowid, marshal::f32_as_bytes(v))
    }

    pub fn insert_vectors_batch(
        &self,
        table: &str,
        column: &str,
        entries: &[VectorEntry],
    ) -> Result<usize> {
        table::insert_vectors_batch(&self.conn, table, column, entries)
    }

    pub fn update_vector(&self, table: &str, column: &str, rowid: i64, v: &[f32]) -> Result<usize> {
        table::update_vector(&self.conn, table, column, rowid, marshal::f32_as_bytes(v))
    }

    pub fn delete_vector(&self, table: &str, rowid: i64) -> Result<usize> {
        table::delete_vector(&self.conn, table, rowid)
    }

    pub fn table_stats(&self, table: &str) -> Result<TableStats> {
        table::table_stats(&self.conn, table)
    }

    pub fn search_similar(
        &self,
        table: &str,
        column: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>> {
        search::search_similar(&self.conn, table, column, query)
    }
}
