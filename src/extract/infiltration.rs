//! Infiltration method selection and Green-Ampt coefficients.
//!
//! The first line of INFIL.DAT holds the method code. Only the Green-Ampt
//! method (code 1) carries per-cell coefficients, in `F grid xksat psif
//! dtheta abstrinf rtimpf soil_depth` records after three header lines.

use super::columns::{ColumnFile, JoinKey, join_columns, read_whitespace_table};
use crate::constants::{INFIL_CELL_TAG, INFIL_FILE, INFIL_ID_COLUMN, INFIL_SKIP_ROWS};
use crate::error::Result;
use crate::models::{GridAttribute, GridTable, InfiltrationMethod};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const GREEN_AMPT_LAYOUT: ColumnFile = ColumnFile {
    file_name: INFIL_FILE,
    skip_rows: INFIL_SKIP_ROWS,
    join: JoinKey::GridId(INFIL_ID_COLUMN),
    columns: &[
        (2, GridAttribute::Xksat),
        (3, GridAttribute::Psif),
        (4, GridAttribute::Dtheta),
        (5, GridAttribute::Abstrinf),
        (6, GridAttribute::Rtimpf),
        (7, GridAttribute::SoilDepth),
    ],
};

/// Read the method code from the first line of INFIL.DAT
pub fn read_infiltration_method(path: &Path) -> Result<InfiltrationMethod> {
    let content = fs::read_to_string(path)?;
    let code = content.lines().next().unwrap_or_default();
    let method = InfiltrationMethod::from_code(code);
    debug!("Infiltration code '{}' -> {:?}", code.trim(), method);
    Ok(method)
}

/// Apply infiltration data to the grid; returns the detected method
pub fn apply_infiltration(grid: &mut GridTable, path: &Path) -> Result<InfiltrationMethod> {
    let method = read_infiltration_method(path)?;

    if method == InfiltrationMethod::GreenAmpt {
        let mut source = read_whitespace_table(path, GREEN_AMPT_LAYOUT.skip_rows)?;
        let total = source.rows.len();
        source
            .rows
            .retain(|row| row.tokens.first().map(String::as_str) == Some(INFIL_CELL_TAG));
        if source.rows.len() < total {
            debug!(
                "Ignored {} non-cell records in {}",
                total - source.rows.len(),
                path.display()
            );
        }
        let rows = join_columns(grid, &source, &GREEN_AMPT_LAYOUT)?;
        info!("Green-Ampt coefficients loaded for {} cells", rows);
    } else {
        info!(
            "Infiltration method '{}' has no per-cell coefficients",
            method.label()
        );
    }

    Ok(method)
}
