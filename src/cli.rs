//! Command-line interface components.

use crate::config::Config;
use crate::error::{Flo2dError, Result};
use crate::models::GridAttribute;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "flo2d-processor")]
#[command(about = "Convert FLO-2D model output into GeoTIFF rasters, shapefiles and hydrograph workbooks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory holding the FLO-2D model files
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Output root (defaults to the input directory)
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// EPSG code for all spatial outputs
    #[arg(long, default_value_t = crate::constants::DEFAULT_EPSG)]
    pub epsg: u16,

    /// Raster cell size (derived from the grid spacing if omitted)
    #[arg(long, value_name = "F")]
    pub cell_size: Option<f64>,

    /// Comma-separated attribute columns to rasterize
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub columns: Vec<String>,

    /// Also write a point shapefile of all grid cells
    #[arg(long)]
    pub points: bool,

    /// Skip hydrograph plot rendering
    #[arg(long)]
    pub no_plots: bool,

    /// Skip absent optional input files instead of failing
    #[arg(long)]
    pub allow_missing_inputs: bool,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only show errors. Overrides verbose settings.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Parse `--columns` into attributes
    pub fn raster_columns(&self) -> Result<Option<Vec<GridAttribute>>> {
        if self.columns.is_empty() {
            return Ok(None);
        }
        self.columns
            .iter()
            .map(|name| {
                GridAttribute::from_name(name).ok_or_else(|| {
                    Flo2dError::configuration(format!("Unknown attribute column '{}'", name))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Build the processing configuration from the arguments
    pub fn to_config(&self) -> Result<Config> {
        let mut config = Config::new(&self.input_dir).with_epsg(self.epsg);

        if let Some(output_dir) = &self.output_dir {
            config = config.with_output_dir(output_dir);
        }
        if let Some(cell_size) = self.cell_size {
            config = config.with_cell_size(cell_size);
        }
        if let Some(columns) = self.raster_columns()? {
            config = config.with_raster_columns(columns);
        }
        if self.points {
            config = config.with_points();
        }
        if self.no_plots {
            config = config.without_plots();
        }
        if self.allow_missing_inputs {
            config = config.with_missing_inputs_allowed();
        }

        Ok(config)
    }
}

/// Set up structured logging to stderr
pub fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("flo2d_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["flo2d-processor", "/data/model"]);

        assert_eq!(args.epsg, 2223);
        assert_eq!(args.get_log_level(), "warn");
        let config = args.to_config().unwrap();
        assert!(config.render_plots);
        assert_eq!(config.raster_columns.len(), 19);
    }

    #[test]
    fn test_log_levels() {
        let args = Args::parse_from(["flo2d-processor", "/data", "-vv"]);
        assert_eq!(args.get_log_level(), "debug");

        let args = Args::parse_from(["flo2d-processor", "/data", "-q"]);
        assert_eq!(args.get_log_level(), "error");
    }

    #[test]
    fn test_columns_and_flags_reach_config() {
        let args = Args::parse_from([
            "flo2d-processor",
            "/data",
            "--columns",
            "depth_max,topo",
            "--cell-size",
            "25",
            "--no-plots",
            "--points",
            "-o",
            "/out",
        ]);

        let config = args.to_config().unwrap();
        assert_eq!(
            config.raster_columns,
            vec![GridAttribute::DepthMax, GridAttribute::Topo]
        );
        assert_eq!(config.cell_size, Some(25.0));
        assert!(!config.render_plots);
        assert!(config.write_points);
        assert_eq!(config.output_root(), std::path::Path::new("/out"));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let args = Args::parse_from(["flo2d-processor", "/data", "--columns", "depth,topo"]);
        assert!(matches!(
            args.to_config(),
            Err(Flo2dError::Configuration { .. })
        ));
    }
}
