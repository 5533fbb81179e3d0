//! Floodplain cross-section definitions.
//!
//! Each `X` line in FPXSEC.DAT opens the next cross section (numbered from
//! 1 in file order) and lists the grid ids it crosses from the fourth token
//! on. Referenced cells are tagged with the section id.

use crate::constants::{FPXSEC_FIRST_GRID_TOKEN, FPXSEC_TAG};
use crate::error::{Flo2dError, Result};
use crate::models::GridTable;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome of tagging cross-section cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FpxsecTagging {
    pub sections: u32,
    pub tagged_cells: usize,
    /// Cells moved from one section to a later one
    pub retagged_cells: usize,
}

/// Tag grid cells with their cross-section id.
///
/// A referenced grid id that is not in the table is an error.
pub fn apply_fpxsec(grid: &mut GridTable, path: &Path) -> Result<FpxsecTagging> {
    let content = fs::read_to_string(path)?;
    let mut tagging = FpxsecTagging::default();

    for (index, line) in content.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() != Some(&FPXSEC_TAG) {
            continue;
        }

        tagging.sections += 1;
        let section = tagging.sections;

        let grid_ids = parts
            .iter()
            .skip(FPXSEC_FIRST_GRID_TOKEN)
            .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()));

        for token in grid_ids {
            let grid_id = token.parse::<u32>().map_err(|_| {
                Flo2dError::parse(path, index + 1, format!("grid id out of range: '{}'", token))
            })?;

            let cell = grid
                .get_by_grid_id_mut(grid_id)
                .ok_or_else(|| Flo2dError::UnknownGridId {
                    path: path.to_path_buf(),
                    grid_id,
                })?;

            if let Some(previous) = cell.fpxsec.replace(section) {
                if previous != section {
                    warn!(
                        "Grid {} moved from cross section {} to {}",
                        grid_id, previous, section
                    );
                    tagging.retagged_cells += 1;
                }
            } else {
                tagging.tagged_cells += 1;
            }
        }
    }

    debug!(
        "Tagged {} cells across {} cross sections",
        tagging.tagged_cells, tagging.sections
    );
    Ok(tagging)
}
