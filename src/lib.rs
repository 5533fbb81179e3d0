//! FLO-2D Processor Library
//!
//! Converts FLO-2D flood model output files into GIS artifacts.
//!
//! This library provides tools for:
//! - Joining per-cell model outputs into one wide grid table keyed by grid id
//! - Parsing the narrative cross-section and hydraulic structure reports
//! - Writing GeoTIFF rasters for every populated grid attribute
//! - Writing cross-section and structure polylines as shapefiles
//! - Building a hydrograph workbook with rendered discharge plots

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod hydrograph;
pub mod models;
pub mod processor;
pub mod raster;
pub mod reports;
pub mod vector;

// Re-export commonly used types
pub use config::Config;
pub use error::{Flo2dError, Result};
pub use models::{GridAttribute, GridTable, ProcessingStats};
pub use processor::Flo2dProcessor;
