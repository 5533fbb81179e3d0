//! Configuration management and validation.
//!
//! One explicit configuration structure carries the input directory,
//! output locations, coordinate system and raster settings into each
//! processing stage.

use crate::constants::{
    DEFAULT_EPSG, HYDROGRAPH_WORKBOOK, PLOT_DIR_NAME, RASTER_DIR_NAME, SHAPEFILE_DIR_NAME,
};
use crate::error::{Flo2dError, Result};
use crate::models::GridAttribute;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the FLO-2D model input and output files
    pub input_dir: PathBuf,

    /// Root for generated artifacts (defaults to the input directory)
    pub output_dir: Option<PathBuf>,

    /// EPSG code applied to every spatial output
    pub epsg: u16,

    /// Raster cell size; derived from grid spacing when not set
    pub cell_size: Option<f64>,

    /// Attribute columns rasterized, one GeoTIFF each
    pub raster_columns: Vec<GridAttribute>,

    /// Also write the combined grid point shapefile
    pub write_points: bool,

    /// Render hydrograph plots into the workbook
    pub render_plots: bool,

    /// Skip missing non-primary input files instead of failing
    pub allow_missing_inputs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: None,
            epsg: DEFAULT_EPSG,
            cell_size: None,
            raster_columns: default_raster_columns(),
            write_points: false,
            render_plots: true,
            allow_missing_inputs: false,
        }
    }
}

/// Every attribute except the flow direction code
pub fn default_raster_columns() -> Vec<GridAttribute> {
    GridAttribute::ALL
        .iter()
        .copied()
        .filter(|attr| *attr != GridAttribute::FlowDir)
        .collect()
}

impl Config {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_epsg(mut self, epsg: u16) -> Self {
        self.epsg = epsg;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = Some(cell_size);
        self
    }

    pub fn with_raster_columns(mut self, columns: Vec<GridAttribute>) -> Self {
        self.raster_columns = columns;
        self
    }

    pub fn with_points(mut self) -> Self {
        self.write_points = true;
        self
    }

    pub fn without_plots(mut self) -> Self {
        self.render_plots = false;
        self
    }

    pub fn with_missing_inputs_allowed(mut self) -> Self {
        self.allow_missing_inputs = true;
        self
    }

    pub fn input_file(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    pub fn output_root(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }

    pub fn raster_dir(&self) -> PathBuf {
        self.output_root().join(RASTER_DIR_NAME)
    }

    pub fn shapefile_dir(&self) -> PathBuf {
        self.output_root().join(SHAPEFILE_DIR_NAME)
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.output_root().join(PLOT_DIR_NAME)
    }

    pub fn workbook_path(&self) -> PathBuf {
        self.output_root().join(HYDROGRAPH_WORKBOOK)
    }

    /// Check settings before any file is touched
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(Flo2dError::configuration(format!(
                "Input directory does not exist: {}",
                self.input_dir.display()
            )));
        }

        if let Some(cell_size) = self.cell_size {
            if !cell_size.is_finite() || cell_size <= 0.0 {
                return Err(Flo2dError::InvalidCellSize { cell_size });
            }
        }

        if self.epsg == 0 {
            return Err(Flo2dError::configuration("EPSG code must be non-zero"));
        }

        debug!(
            "Configuration validated: input={}, output={}, epsg={}",
            self.input_dir.display(),
            self.output_root().display(),
            self.epsg
        );
        Ok(())
    }
}
