use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VecError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("invalid database handle")]
    NullHandle,

    #[error("sqlite-vec registration failed ({code}): {}", .message.as_deref().unwrap_or("unknown error"))]
    Extension { code: i32, message: Option<String> },

    #[error("statement returned no row")]
    NoResult,
}

pub type Result<T> = std::result::Result<T, VecError>;

/// Comparison function used by `distance`.
///
/// Parsing never fails: anything that is not a known name selects
/// [`DistanceMetric::Cosine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    L2,
    L1,
    Hamming,
}

impl DistanceMetric {
    pub fn from_selector(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("l2") => DistanceMetric::L2,
            Some("l1") => DistanceMetric::L1,
            Some("hamming") => DistanceMetric::Hamming,
            _ => DistanceMetric::Cosine,
        }
    }

    pub fn sql_function(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "vec_distance_cosine",
            DistanceMetric::L2 => "vec_distance_l2",
            DistanceMetric::L1 => "vec_distance_l1",
            DistanceMetric::Hamming => "vec_distance_hamming",
        }
    }

    /// Element type the operands are read as. Hamming distance is only
    /// defined on bit vectors, the other metrics take raw float32 blobs.
    pub fn operand_type(&self) -> ElementType {
        match self {
            DistanceMetric::Hamming => ElementType::Bit,
            _ => ElementType::Float32,
        }
    }

    /// Call expression comparing parameters `?1` and `?2`.
    pub fn sql_call(&self) -> String {
        match self.operand_type() {
            ElementType::Float32 => format!("{}(?1, ?2)", self.sql_function()),
            element => {
                let wrap = element.sql_constructor();
                format!("{}({wrap}(?1), {wrap}(?2))", self.sql_function())
            }
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::L2 => write!(f, "l2"),
            DistanceMetric::L1 => write!(f, "l1"),
            DistanceMetric::Hamming => write!(f, "hamming"),
        }
    }
}

/// Element encoding of a `vec0` vector column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Float32,
    Int8,
    Bit,
}

impl ElementType {
    /// SQL function that reinterprets a raw blob as this element type.
    pub fn sql_constructor(&self) -> &'static str {
        match self {
            ElementType::Float32 => "vec_f32",
            ElementType::Int8 => "vec_int8",
            ElementType::Bit => "vec_bit",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Float32 => write!(f, "float"),
            ElementType::Int8 => write!(f, "int8"),
            ElementType::Bit => write!(f, "bit"),
        }
    }
}

/// Vector column of a `vec0` table, rendered as `name float[384]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorColumn {
    pub name: String,
    pub element: ElementType,
    pub dimensions: usize,
}

impl VectorColumn {
    pub fn new(name: impl Into<String>, element: ElementType, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            element,
            dimensions,
        }
    }

    pub fn float32(name: impl Into<String>, dimensions: usize) -> Self {
        Self::new(name, ElementType::Float32, dimensions)
    }
}

impl std::fmt::Display for VectorColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}[{}]", self.name, self.element, self.dimensions)
    }
}

/// One row for `insert_vectors_batch`. `vector` is an already serialized buffer.
#[derive(Clone, Debug)]
pub struct VectorEntry {
    pub rowid: i64,
    pub vector: Vec<u8>,
}

impl VectorEntry {
    pub fn new(rowid: i64, vector: Vec<u8>) -> Self {
        Self { rowid, vector }
    }
}

#[derive(Clone, Debug)]
pub struct SearchQuery {
    pub vector: Vec<u8>,
    pub limit: usize,
    pub columns: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            vector: Vec::new(),
            limit: 10,
            columns: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub rowid: i64,
    pub distance: f64,
    /// Values of `SearchQuery::columns`, in the same order.
    pub columns: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    pub row_count: usize,
}

/// Status code and diagnostic returned by the extension entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitOutcome {
    pub code: i32,
    pub message: Option<String>,
}

impl InitOutcome {
    pub fn is_ok(&self) -> bool {
        self.code == rusqlite::ffi::SQLITE_OK
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(VecError::Extension {
                code: self.code,
                message: self.message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_selector() {
        assert_eq!(DistanceMetric::from_selector(Some("l2")), DistanceMetric::L2);
        assert_eq!(DistanceMetric::from_selector(Some(" L2 ")), DistanceMetric::L2);
        assert_eq!(DistanceMetric::from_selector(Some("cosine")), DistanceMetric::Cosine);
        assert_eq!(DistanceMetric::from_selector(Some("l1")), DistanceMetric::L1);
        assert_eq!(DistanceMetric::from_selector(Some("hamming")), DistanceMetric::Hamming);
    }

    #[test]
    fn test_metric_selector_defaults_to_cosine() {
        assert_eq!(DistanceMetric::from_selector(Some("manhattan")), DistanceMetric::Cosine);
        assert_eq!(DistanceMetric::from_selector(Some("")), DistanceMetric::Cosine);
        assert_eq!(DistanceMetric::from_selector(None), DistanceMetric::Cosine);
    }

    #[test]
    fn test_hamming_reads_bit_operands() {
        assert_eq!(
            DistanceMetric::Hamming.sql_call(),
            "vec_distance_hamming(vec_bit(?1), vec_bit(?2))"
        );
        assert_eq!(DistanceMetric::L2.sql_call(), "vec_distance_l2(?1, ?2)");
        assert_eq!(DistanceMetric::Cosine.operand_type(), ElementType::Float32);
    }

    #[test]
    fn test_vector_column_display() {
        let col = VectorColumn::float32("embedding", 384);
        assert_eq!(col.to_string(), "embedding float[384]");
        let col = VectorColumn::new("codes", ElementType::Int8, 8);
        assert_eq!(col.to_string(), "codes int8[8]");
    }

    #[test]
    fn test_init_outcome_into_result() {
        let ok = InitOutcome { code: 0, message: None };
        assert!(ok.into_result().is_ok());

        let failed = InitOutcome {
            code: 1,
            message: Some("boom".to_string()),
        };
        match failed.into_result() {
            Err(VecError::Extension { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message.as_deref(), Some("boom"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
