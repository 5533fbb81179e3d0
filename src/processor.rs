//! Main processing pipeline.
//!
//! Runs the complete conversion of one FLO-2D model directory: grid table
//! extraction, cross-section and structure shapefiles, the hydrograph
//! workbook and one GeoTIFF per attribute column. Stages run in a fixed
//! order and the first error aborts the run.

use crate::config::Config;
use crate::constants::{
    FPXSEC_SHAPEFILE, HYCROSS_FILE, HYDROSTRUCT_FILE, HYSTRUC_FILE, POINTS_SHAPEFILE,
    HYSTRUC_SHAPEFILE,
};
use crate::error::{Flo2dError, Result};
use crate::extract::{extract_model_data, locate_input};
use crate::geometry::{Coord, build_fpxsec_lines, build_points, build_structure_lines};
use crate::hydrograph::{hydrographs_from_report, write_workbook};
use crate::models::{GridTable, ProcessingStats};
use crate::raster::{calculate_cell_size, rasterize_columns};
use crate::reports::{extract_hystruc_results, parse_hycross};
use crate::vector::{write_fpxsec_shapefile, write_points_shapefile, write_structure_shapefile};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Instant;
use tracing::{debug, info};

/// Processor for one FLO-2D model directory
pub struct Flo2dProcessor {
    config: Config,
    show_progress: bool,
}

impl Flo2dProcessor {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: true,
        }
    }

    /// Enable or disable console progress output
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Main processing entry point
    pub fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        self.config.validate()?;

        let mut stats = ProcessingStats {
            output_path: self.config.output_root().to_path_buf(),
            ..Default::default()
        };

        self.announce_start();
        self.prepare_directories()?;

        // Step 1: Build the grid table
        self.step("Extracting grid data...");
        let (grid, summary) = extract_model_data(&self.config)?;
        stats.grid_cells = grid.len();
        stats.populated_columns = grid.populated_attributes().len();
        if let Some(method) = summary.infiltration_method {
            debug!("Infiltration method: {}", method.label());
        }
        self.detail("Grid cells:", grid.len());

        // Step 2: Optional point layer
        if self.config.write_points {
            let path = self.config.shapefile_dir().join(POINTS_SHAPEFILE);
            write_points_shapefile(&path, &build_points(&grid, self.config.epsg))?;
            stats.shapefiles_written += 1;
        }

        // Step 3: Cross sections and hydrographs
        self.step("Processing floodplain cross sections...");
        self.process_cross_sections(&grid, &mut stats)?;

        // Step 4: Hydraulic structures
        self.step("Processing hydraulic structures...");
        self.process_structures(&grid, &mut stats)?;

        // Step 5: Rasters
        self.step("Writing rasters...");
        self.process_rasters(&grid, &mut stats)?;

        stats.processing_time = start_time.elapsed();
        self.report(&stats);
        info!(
            "Processing complete in {:.2}s",
            stats.processing_time.as_secs_f64()
        );
        Ok(stats)
    }

    fn prepare_directories(&self) -> Result<()> {
        fs::create_dir_all(self.config.raster_dir())?;
        fs::create_dir_all(self.config.shapefile_dir())?;
        if self.config.render_plots {
            fs::create_dir_all(self.config.plot_dir())?;
        }
        Ok(())
    }

    fn process_cross_sections(&self, grid: &GridTable, stats: &mut ProcessingStats) -> Result<()> {
        let Some(hycross) = locate_input(&self.config, HYCROSS_FILE)? else {
            return Ok(());
        };
        let report = parse_hycross(&hycross)?;

        if grid.fpxsec_ids().is_empty() {
            info!("No grid cells tagged with cross sections; fpxsec shapefile skipped");
        } else {
            let lines = build_fpxsec_lines(grid, &report.results, self.config.epsg)?;
            write_fpxsec_shapefile(&self.config.shapefile_dir().join(FPXSEC_SHAPEFILE), &lines)?;
            stats.cross_sections = lines.len();
            stats.shapefiles_written += 1;
            self.detail("Cross sections:", lines.len());
        }

        let hydrographs = hydrographs_from_report(report);
        if hydrographs.is_empty() {
            info!("No hydrograph blocks in {}", hycross.display());
            return Ok(());
        }
        stats.hydrograph_sections = write_workbook(
            &hydrographs,
            &self.config.plot_dir(),
            &self.config.workbook_path(),
            self.config.render_plots,
        )?;
        self.detail("Hydrograph sections:", stats.hydrograph_sections);
        Ok(())
    }

    fn process_structures(&self, grid: &GridTable, stats: &mut ProcessingStats) -> Result<()> {
        let Some(definitions) = locate_input(&self.config, HYSTRUC_FILE)? else {
            return Ok(());
        };
        let report = locate_input(&self.config, HYDROSTRUCT_FILE)?;

        let structures = extract_hystruc_results(&definitions, report.as_deref())?;
        if structures.is_empty() {
            info!("No hydraulic structures defined; structure shapefile skipped");
            return Ok(());
        }

        let lines = build_structure_lines(&structures, grid, self.config.epsg);
        write_structure_shapefile(&self.config.shapefile_dir().join(HYSTRUC_SHAPEFILE), &lines)?;
        stats.structures = lines.len();
        stats.shapefiles_written += 1;
        self.detail("Hydraulic structures:", lines.len());
        Ok(())
    }

    fn process_rasters(&self, grid: &GridTable, stats: &mut ProcessingStats) -> Result<()> {
        let cell_size = match self.config.cell_size {
            Some(cell_size) => cell_size,
            None => {
                let coords: Vec<Coord> =
                    grid.rows().iter().map(|r| Coord::new(r.x, r.y)).collect();
                calculate_cell_size(&coords).ok_or_else(|| {
                    Flo2dError::configuration(
                        "Cannot derive a cell size from the grid; set one explicitly",
                    )
                })?
            }
        };
        info!("Rasterizing at cell size {}", cell_size);

        let columns = &self.config.raster_columns;
        let pb = if self.show_progress {
            ProgressBar::new(columns.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| Flo2dError::configuration(e.to_string()))?
                .progress_chars("#>-"),
        );

        let summary = rasterize_columns(
            grid,
            columns,
            &self.config.raster_dir(),
            cell_size,
            self.config.epsg,
            |attr| {
                pb.set_message(attr.name());
                pb.inc(1);
            },
        )?;
        pb.finish_with_message("Rasters written");

        stats.rasters_written = summary.written.len();
        stats.raster_collisions = summary.collisions;
        if summary.collisions > 0 {
            info!(
                "{} points shared a raster cell with an earlier point",
                summary.collisions
            );
        }
        Ok(())
    }

    fn announce_start(&self) {
        if !self.show_progress {
            return;
        }
        println!("{}", "Starting FLO-2D output processing".bright_green().bold());
        println!(
            "  {} {}",
            "Model:".bright_cyan(),
            self.config.input_dir.display()
        );
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            self.config.output_root().display()
        );
    }

    fn step(&self, message: &str) {
        if self.show_progress {
            println!("\n{}", message.bright_yellow());
        }
    }

    fn detail(&self, label: &str, count: usize) {
        if self.show_progress {
            println!(
                "  {} {}",
                label.bright_cyan(),
                count.to_string().bright_white().bold()
            );
        }
    }

    fn report(&self, stats: &ProcessingStats) {
        if !self.show_progress {
            return;
        }
        println!("\n{}", "Processing Summary".bright_green().bold());
        for (label, value) in summary_lines(stats) {
            println!("  {} {}", label.bright_cyan(), value.bright_white().bold());
        }
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            stats.output_path.display()
        );
    }
}

/// Label and value for every counter in the run summary
fn summary_lines(stats: &ProcessingStats) -> Vec<(&'static str, String)> {
    vec![
        (
            "Time elapsed:",
            format!("{}ms", stats.processing_time.as_millis()),
        ),
        ("Grid cells:", stats.grid_cells.to_string()),
        ("Populated columns:", stats.populated_columns.to_string()),
        ("Cross sections:", stats.cross_sections.to_string()),
        ("Structures:", stats.structures.to_string()),
        ("Hydrograph sections:", stats.hydrograph_sections.to_string()),
        ("Rasters written:", stats.rasters_written.to_string()),
        ("Raster collisions:", stats.raster_collisions.to_string()),
        ("Shapefiles written:", stats.shapefiles_written.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_summary_covers_every_counter() {
        let stats = ProcessingStats {
            grid_cells: 9,
            populated_columns: 4,
            cross_sections: 2,
            structures: 1,
            hydrograph_sections: 2,
            rasters_written: 4,
            shapefiles_written: 2,
            raster_collisions: 3,
            output_path: PathBuf::from("/tmp/gis"),
            processing_time: Duration::from_millis(120),
        };

        let lines = summary_lines(&stats);

        assert_eq!(lines.len(), 9);
        let value = |label: &str| {
            lines
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(value("Time elapsed:"), "120ms");
        assert_eq!(value("Grid cells:"), "9");
        assert_eq!(value("Populated columns:"), "4");
        assert_eq!(value("Structures:"), "1");
        assert_eq!(value("Raster collisions:"), "3");
    }
}
