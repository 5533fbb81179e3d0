//! Error handling for FLO-2D processing operations.
//!
//! Provides error types with file and line context for input parsing,
//! grid reconciliation, geometry construction and output writing failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Flo2dError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required input file not found: {path}")]
    MissingInput { path: PathBuf },

    #[error("Parse error in {path} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Row count mismatch in {path}: expected {expected} grid rows, found {found}")]
    RowCountMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Unknown grid id {grid_id} referenced in {path}")]
    UnknownGridId { path: PathBuf, grid_id: u32 },

    #[error("No discharge result found for floodplain cross section {fpxs_id}")]
    MissingCrossSectionResult { fpxs_id: u32 },

    #[error("Degenerate geometry for {feature}: {reason}")]
    DegenerateGeometry { feature: String, reason: String },

    #[error("Invalid raster cell size: {cell_size}")]
    InvalidCellSize { cell_size: f64 },

    #[error("Grid table is empty: {path}")]
    EmptyTable { path: PathBuf },

    #[error("Raster writing failed for {path}: {reason}")]
    Raster { path: PathBuf, reason: String },

    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Plot rendering failed for {path}: {reason}")]
    Plot { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl Flo2dError {
    /// Create a parse error for a specific file line (1-based)
    pub fn parse(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Flo2dError>;
