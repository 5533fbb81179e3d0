//! Geometry construction from the grid table and report results.
//!
//! Produces point features for grid cells, polylines for floodplain cross
//! sections (vertices in table order, no spatial reordering) and two-vertex
//! polylines for hydraulic structures. Every collection carries one EPSG
//! code for all of its features.

use crate::error::{Flo2dError, Result};
use crate::models::{CrossSectionResult, GridAttribute, GridTable, HydraulicStructure};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Planar coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Placeholder for an unresolved node
    pub fn missing() -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Features sharing one coordinate reference system
#[derive(Debug, Clone)]
pub struct FeatureCollection<T> {
    pub epsg: u16,
    pub features: Vec<T>,
}

impl<T> FeatureCollection<T> {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One grid cell as a point
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub grid_id: u32,
    pub coord: Coord,
    pub attributes: BTreeMap<GridAttribute, f64>,
    pub fpxsec: Option<u32>,
}

/// Polyline with feature attributes
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature<A> {
    pub vertices: Vec<Coord>,
    pub attributes: A,
}

pub type FpxsecLine = LineFeature<CrossSectionResult>;
pub type StructureLine = LineFeature<HydraulicStructure>;

/// One point per grid cell, in table order
pub fn build_points(grid: &GridTable, epsg: u16) -> FeatureCollection<PointFeature> {
    let features = grid
        .rows()
        .iter()
        .map(|row| PointFeature {
            grid_id: row.grid_id,
            coord: Coord::new(row.x, row.y),
            attributes: row.attributes.clone(),
            fpxsec: row.fpxsec,
        })
        .collect();

    FeatureCollection { epsg, features }
}

/// One polyline per cross section, ascending id.
///
/// Vertices follow table row order. Each section must have a reported
/// discharge result.
pub fn build_fpxsec_lines(
    grid: &GridTable,
    results: &BTreeMap<u32, CrossSectionResult>,
    epsg: u16,
) -> Result<FeatureCollection<FpxsecLine>> {
    let mut features = Vec::new();

    for fpxs_id in grid.fpxsec_ids() {
        let vertices: Vec<Coord> = grid
            .fpxsec_members(fpxs_id)
            .iter()
            .map(|cell| Coord::new(cell.x, cell.y))
            .collect();

        let result = results
            .get(&fpxs_id)
            .copied()
            .ok_or(Flo2dError::MissingCrossSectionResult { fpxs_id })?;

        debug!("Cross section {} has {} vertices", fpxs_id, vertices.len());
        features.push(LineFeature {
            vertices,
            attributes: result,
        });
    }

    Ok(FeatureCollection { epsg, features })
}

/// Inflow-to-outflow polyline per structure.
///
/// A node missing from the grid gives a NaN vertex rather than an error.
pub fn build_structure_lines(
    structures: &[HydraulicStructure],
    grid: &GridTable,
    epsg: u16,
) -> FeatureCollection<StructureLine> {
    let resolve = |structure: &HydraulicStructure, node: u32, role: &str| -> Coord {
        match grid.get_by_grid_id(node) {
            Some(cell) => Coord::new(cell.x, cell.y),
            None => {
                warn!(
                    "Structure '{}' {} node {} is not a grid cell",
                    structure.name, role, node
                );
                Coord::missing()
            }
        }
    };

    let features = structures
        .iter()
        .map(|structure| LineFeature {
            vertices: vec![
                resolve(structure, structure.inflow_node, "inflow"),
                resolve(structure, structure.outflow_node, "outflow"),
            ],
            attributes: structure.clone(),
        })
        .collect();

    FeatureCollection { epsg, features }
}
