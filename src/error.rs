//! Error types shared by every pipeline stage

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the registry, the engines and the pipelines
#[derive(Error, Debug)]
pub enum Error {
    /// Source directory is absent, so no tables are available
    #[error("dataset directory not found: {}", path.display())]
    Configuration { path: PathBuf },

    /// One input file could not be parsed
    #[error("failed to parse {file}: {reason}")]
    Parse { file: String, reason: String },

    /// Tables a pipeline needs are not in the catalog
    #[error("missing required tables: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    /// A join key column is absent from one side of a join step
    #[error("join key `{column}` not found in table `{table}`")]
    SchemaMismatch { table: String, column: String },

    /// An aggregation or feature column is absent
    #[error("column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("clustering failed: {0}")]
    Clustering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn column_not_found(column: &str) -> Self {
        Error::ColumnNotFound {
            column: column.to_string(),
        }
    }
}
