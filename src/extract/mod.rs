//! Grid record extraction.
//!
//! Builds the wide grid-cell table from the fixed-format FLO-2D files in a
//! model directory. DEPTH.OUT establishes row order, grid ids and
//! coordinates; every other file adds columns, joined on grid id where the
//! file carries one and by row position otherwise.

pub mod columns;
pub mod fpxsec;
pub mod infiltration;

use self::columns::{ColumnFile, JoinKey, join_columns, read_whitespace_table};
use self::fpxsec::{FpxsecTagging, apply_fpxsec};
use self::infiltration::apply_infiltration;

use crate::config::Config;
use crate::constants::*;
use crate::error::{Flo2dError, Result};
use crate::models::{GridAttribute, GridCellRecord, GridTable, InfiltrationMethod};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Column files read after DEPTH.OUT, in processing order
pub const COLUMN_FILES: &[ColumnFile] = &[
    ColumnFile {
        file_name: MANNINGS_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(1, GridAttribute::ManningsN)],
    },
    ColumnFile {
        file_name: TOPO_FILE,
        skip_rows: 0,
        join: JoinKey::Position,
        columns: &[(2, GridAttribute::Topo)],
    },
    ColumnFile {
        file_name: VELFP_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::Velocity)],
    },
    ColumnFile {
        file_name: MAXWSELEV_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::WseMax)],
    },
    ColumnFile {
        file_name: INFIL_DEPTH_FILE,
        skip_rows: INFIL_DEPTH_SKIP_ROWS,
        join: JoinKey::GridId(0),
        columns: &[(4, GridAttribute::InfilDepth), (5, GridAttribute::InfilStop)],
    },
    ColumnFile {
        file_name: TIMEONEFT_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::TimeOfOneft)],
    },
    ColumnFile {
        file_name: TIMETWOFT_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::TimeOfTwoft)],
    },
    ColumnFile {
        file_name: TIMETOPEAK_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::TimeToPeak)],
    },
    ColumnFile {
        file_name: FINALVEL_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::FinalVelocity)],
    },
    ColumnFile {
        file_name: FINALDEP_FILE,
        skip_rows: 0,
        join: JoinKey::GridId(0),
        columns: &[(3, GridAttribute::FinalDepth)],
    },
];

/// What the extraction found besides the table itself
#[derive(Debug, Clone, Default)]
pub struct ExtractionSummary {
    pub infiltration_method: Option<InfiltrationMethod>,
    pub files_read: usize,
    pub files_skipped: Vec<PathBuf>,
    pub fpxsec: FpxsecTagging,
    /// MAXQHYD rows past the end of the grid table
    pub discharge_rows_dropped: usize,
}

/// Resolve an input file, honouring `allow_missing_inputs`.
///
/// Returns `None` when the file is absent and missing inputs are allowed.
pub fn locate_input(config: &Config, file_name: &str) -> Result<Option<PathBuf>> {
    let path = config.input_file(file_name);
    if path.is_file() {
        return Ok(Some(path));
    }
    if config.allow_missing_inputs {
        warn!("Skipping missing input {}", path.display());
        Ok(None)
    } else {
        Err(Flo2dError::MissingInput { path })
    }
}

/// Build the grid table from all model files in the configured directory
pub fn extract_model_data(config: &Config) -> Result<(GridTable, ExtractionSummary)> {
    let depth_path = config.input_file(DEPTH_FILE);
    if !depth_path.is_file() {
        return Err(Flo2dError::MissingInput { path: depth_path });
    }

    let mut grid = read_depth_file(&depth_path)?;
    let mut summary = ExtractionSummary {
        files_read: 1,
        ..Default::default()
    };

    match locate_input(config, INFIL_FILE)? {
        Some(path) => {
            summary.infiltration_method = Some(apply_infiltration(&mut grid, &path)?);
            summary.files_read += 1;
        }
        None => summary.files_skipped.push(config.input_file(INFIL_FILE)),
    }

    for layout in COLUMN_FILES {
        match locate_input(config, layout.file_name)? {
            Some(path) => {
                let source = read_whitespace_table(&path, layout.skip_rows)?;
                let rows = join_columns(&mut grid, &source, layout)?;
                if layout.join != JoinKey::Position && rows != grid.len() {
                    warn!(
                        "{} covers {} of {} grid cells",
                        path.display(),
                        rows,
                        grid.len()
                    );
                }
                summary.files_read += 1;
            }
            None => summary.files_skipped.push(config.input_file(layout.file_name)),
        }
    }

    match locate_input(config, MAXQHYD_FILE)? {
        Some(path) => {
            summary.discharge_rows_dropped = apply_max_discharge(&mut grid, &path)?;
            summary.files_read += 1;
        }
        None => summary.files_skipped.push(config.input_file(MAXQHYD_FILE)),
    }

    match locate_input(config, FPXSEC_FILE)? {
        Some(path) => {
            summary.fpxsec = apply_fpxsec(&mut grid, &path)?;
            summary.files_read += 1;
        }
        None => summary.files_skipped.push(config.input_file(FPXSEC_FILE)),
    }

    info!(
        "Extracted {} grid cells with {} populated columns from {} files",
        grid.len(),
        grid.populated_attributes().len(),
        summary.files_read
    );

    Ok((grid, summary))
}

/// Read DEPTH.OUT: `grid x y depth_max` per line
pub fn read_depth_file(path: &Path) -> Result<GridTable> {
    let source = read_whitespace_table(path, 0)?;
    let mut grid = GridTable::new();

    for row in &source.rows {
        let grid_id = row.grid_id(path, 0)?;
        let mut record = GridCellRecord::new(grid_id, row.float(path, 1)?, row.float(path, 2)?);
        record.set(GridAttribute::DepthMax, row.float(path, 3)?);

        if !grid.push(record) {
            return Err(Flo2dError::parse(
                path,
                row.line,
                format!("duplicate grid id {}", grid_id),
            ));
        }
    }

    if grid.is_empty() {
        return Err(Flo2dError::EmptyTable {
            path: path.to_path_buf(),
        });
    }

    debug!("Depth file defines {} grid cells", grid.len());
    Ok(grid)
}

/// Read MAXQHYD.OUT peak discharge and flow direction.
///
/// Data row *i* aligns with table row *i*. Rows whose leading flag is below
/// 1 carry no valid data and leave the cell unset. Returns the number of
/// rows beyond the end of the table, which are dropped.
pub fn apply_max_discharge(grid: &mut GridTable, path: &Path) -> Result<usize> {
    let source = read_whitespace_table(path, MAXQHYD_SKIP_ROWS)?;

    if source.rows.len() != grid.len() {
        warn!(
            "{} has {} rows for {} grid cells; aligning by row index",
            path.display(),
            source.rows.len(),
            grid.len()
        );
    }

    let mut valid = 0;
    let mut dropped = 0;
    for (index, row) in source.rows.iter().enumerate() {
        let flag = row.float(path, MAXQHYD_FLAG_COLUMN)?;
        if flag < 1.0 {
            continue;
        }
        let q_max = row.float(path, MAXQHYD_Q_COLUMN)?;
        let flow_dir = row.float(path, MAXQHYD_DIR_COLUMN)?;

        match grid.row_mut(index) {
            Some(cell) => {
                cell.set(GridAttribute::QMax, q_max);
                cell.set(GridAttribute::FlowDir, flow_dir);
                valid += 1;
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} discharge rows past the end of the grid", dropped);
    }
    debug!("Peak discharge set for {} cells", valid);
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, lines: &[&str]) {
        fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
    }

    fn write_depth(dir: &Path) {
        write(
            dir,
            DEPTH_FILE,
            &[
                "1   0.00   0.00  0.50",
                "2  10.00   0.00  1.25",
                "3   0.00  10.00  0.00",
            ],
        );
    }

    #[test]
    fn test_depth_file_defines_rows() {
        let temp_dir = TempDir::new().unwrap();
        write_depth(temp_dir.path());

        let grid = read_depth_file(&temp_dir.path().join(DEPTH_FILE)).unwrap();

        assert_eq!(grid.len(), 3);
        let cell = grid.get_by_grid_id(2).unwrap();
        assert_eq!((cell.x, cell.y), (10.0, 0.0));
        assert_eq!(cell.get(GridAttribute::DepthMax), Some(1.25));
    }

    #[test]
    fn test_depth_file_rejects_duplicate_ids() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), DEPTH_FILE, &["1 0 0 0", "1 10 0 0"]);

        let err = read_depth_file(&temp_dir.path().join(DEPTH_FILE)).unwrap_err();
        assert!(matches!(err, Flo2dError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_empty_depth_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), DEPTH_FILE, &[""]);

        assert!(matches!(
            read_depth_file(&temp_dir.path().join(DEPTH_FILE)),
            Err(Flo2dError::EmptyTable { .. })
        ));
    }

    #[test]
    fn test_max_discharge_filters_invalid_rows() {
        let temp_dir = TempDir::new().unwrap();
        write_depth(temp_dir.path());
        write(
            temp_dir.path(),
            MAXQHYD_FILE,
            &[
                "MAXIMUM DISCHARGE",
                "",
                "GRID  X  Y",
                "----",
                "1  0.0  0.0  a b c d  12.5  3",
                "0  0.0  0.0  a b c d  99.0  1",
                "3  0.0 10.0  a b c d   4.0  5",
            ],
        );
        let mut grid = read_depth_file(&temp_dir.path().join(DEPTH_FILE)).unwrap();

        let dropped = apply_max_discharge(&mut grid, &temp_dir.path().join(MAXQHYD_FILE)).unwrap();

        assert_eq!(dropped, 0);
        assert_eq!(grid.rows()[0].get(GridAttribute::QMax), Some(12.5));
        assert_eq!(grid.rows()[0].get(GridAttribute::FlowDir), Some(3.0));
        assert_eq!(grid.rows()[1].get(GridAttribute::QMax), None);
        assert_eq!(grid.rows()[2].get(GridAttribute::QMax), Some(4.0));
    }

    #[test]
    fn test_missing_required_input_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        write_depth(temp_dir.path());
        let config = Config::new(temp_dir.path());

        let err = extract_model_data(&config).unwrap_err();
        assert!(matches!(err, Flo2dError::MissingInput { .. }));
    }

    #[test]
    fn test_missing_inputs_allowed_leaves_columns_empty() {
        let temp_dir = TempDir::new().unwrap();
        write_depth(temp_dir.path());
        write(
            temp_dir.path(),
            VELFP_FILE,
            &["1 0 0 0.5", "2 10 0 1.5", "3 0 10 0.0"],
        );
        let config = Config::new(temp_dir.path()).with_missing_inputs_allowed();

        let (grid, summary) = extract_model_data(&config).unwrap();

        assert_eq!(grid.len(), 3);
        assert_eq!(summary.files_read, 2);
        assert!(grid.populated(GridAttribute::Velocity));
        assert!(!grid.populated(GridAttribute::Topo));
        assert_eq!(summary.infiltration_method, None);
        assert!(summary.files_skipped.contains(&temp_dir.path().join(TOPO_FILE)));
    }
}
