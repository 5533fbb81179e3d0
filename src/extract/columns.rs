//! Whitespace-delimited fixed-column file reading.
//!
//! FLO-2D output files are plain text tables separated by variable runs of
//! spaces, with a known number of header lines. Each file contributes one or
//! more columns to the grid table, joined either on an explicit grid id
//! column or, for files without one, by row position.

use crate::error::{Flo2dError, Result};
use crate::models::{GridAttribute, GridTable};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A data line split into tokens, remembering its 1-based line number
#[derive(Debug, Clone)]
pub struct TextRow {
    pub line: usize,
    pub tokens: Vec<String>,
}

/// Data rows of one whitespace-delimited file
#[derive(Debug, Clone)]
pub struct TextTable {
    pub path: PathBuf,
    pub rows: Vec<TextRow>,
}

impl TextRow {
    fn token(&self, path: &Path, column: usize) -> Result<&str> {
        self.tokens.get(column).map(String::as_str).ok_or_else(|| {
            Flo2dError::parse(
                path,
                self.line,
                format!(
                    "expected at least {} columns, found {}",
                    column + 1,
                    self.tokens.len()
                ),
            )
        })
    }

    /// Numeric value at a 0-based column
    pub fn float(&self, path: &Path, column: usize) -> Result<f64> {
        let token = self.token(path, column)?;
        token.parse::<f64>().map_err(|_| {
            Flo2dError::parse(
                path,
                self.line,
                format!("column {} is not numeric: '{}'", column + 1, token),
            )
        })
    }

    /// Grid id at a 0-based column
    pub fn grid_id(&self, path: &Path, column: usize) -> Result<u32> {
        let token = self.token(path, column)?;
        token.parse::<u32>().map_err(|_| {
            Flo2dError::parse(
                path,
                self.line,
                format!("column {} is not a grid id: '{}'", column + 1, token),
            )
        })
    }
}

/// Read a file, drop `skip_rows` leading lines and tokenize the rest.
///
/// Blank lines are not data rows.
pub fn read_whitespace_table(path: &Path, skip_rows: usize) -> Result<TextTable> {
    let content = fs::read_to_string(path)?;
    let rows = content
        .lines()
        .enumerate()
        .skip(skip_rows)
        .filter_map(|(index, line)| {
            let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if tokens.is_empty() {
                None
            } else {
                Some(TextRow {
                    line: index + 1,
                    tokens,
                })
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Read {} data rows from {} (skipped {} header lines)",
        rows.len(),
        path.display(),
        skip_rows
    );

    Ok(TextTable {
        path: path.to_path_buf(),
        rows,
    })
}

/// How a file's rows are matched to grid table rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKey {
    /// The 0-based column holds the grid id
    GridId(usize),
    /// Row *i* belongs to table row *i*; counts must match
    Position,
}

/// Layout of a file contributing attribute columns
#[derive(Debug, Clone, Copy)]
pub struct ColumnFile {
    pub file_name: &'static str,
    pub skip_rows: usize,
    pub join: JoinKey,
    pub columns: &'static [(usize, GridAttribute)],
}

/// Join the configured columns of `source` into the grid table.
///
/// Returns the number of grid rows that received values.
pub fn join_columns(grid: &mut GridTable, source: &TextTable, layout: &ColumnFile) -> Result<usize> {
    match layout.join {
        JoinKey::Position => {
            if source.rows.len() != grid.len() {
                return Err(Flo2dError::RowCountMismatch {
                    path: source.path.clone(),
                    expected: grid.len(),
                    found: source.rows.len(),
                });
            }
            for (index, row) in source.rows.iter().enumerate() {
                let values = parse_values(source, row, layout)?;
                if let Some(cell) = grid.row_mut(index) {
                    for (attr, value) in values {
                        cell.set(attr, value);
                    }
                }
            }
            Ok(source.rows.len())
        }
        JoinKey::GridId(id_column) => {
            for row in &source.rows {
                let grid_id = row.grid_id(&source.path, id_column)?;
                let values = parse_values(source, row, layout)?;
                let cell = grid.get_by_grid_id_mut(grid_id).ok_or_else(|| {
                    Flo2dError::UnknownGridId {
                        path: source.path.clone(),
                        grid_id,
                    }
                })?;
                for (attr, value) in values {
                    cell.set(attr, value);
                }
            }
            Ok(source.rows.len())
        }
    }
}

fn parse_values(
    source: &TextTable,
    row: &TextRow,
    layout: &ColumnFile,
) -> Result<Vec<(GridAttribute, f64)>> {
    layout
        .columns
        .iter()
        .map(|&(column, attr)| Ok((attr, row.float(&source.path, column)?)))
        .collect()
}
