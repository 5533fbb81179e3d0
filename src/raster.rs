//! Rasterization of grid cell values onto a regular GeoTIFF grid.
//!
//! Points are binned by nearest cell: the grid covers the point bounds
//! padded by half a cell on every side, so each point on the model lattice
//! falls at a cell centre. Rows count downward from the top-left origin.
//! When two points land in the same cell the later one wins.

use crate::constants::geotiff_tags::*;
use crate::error::{Flo2dError, Result};
use crate::geometry::Coord;
use crate::models::{GridAttribute, GridTable};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tracing::{debug, info};

/// Single-band raster with a top-left origin
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub nrows: usize,
    pub ncols: usize,
    pub cell_size: f64,
    /// Left edge of the padded extent
    pub xmin: f64,
    /// Top edge of the padded extent
    pub ymax: f64,
    /// Row-major values, NaN where no point was assigned
    pub data: Vec<f64>,
    /// Points that overwrote an earlier point in the same cell
    pub collisions: usize,
}

impl RasterGrid {
    /// Bin point values into a new grid.
    ///
    /// `values[i]` belongs to `coords[i]`; `None` values are not written.
    pub fn from_points(coords: &[Coord], values: &[Option<f64>], cell_size: f64) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(Flo2dError::InvalidCellSize { cell_size });
        }

        let (mut xmin, mut ymin, mut xmax, mut ymax) = bounds(coords).ok_or_else(|| {
            Flo2dError::configuration("cannot rasterize an empty point set")
        })?;
        let half = cell_size / 2.0;
        xmin -= half;
        ymin -= half;
        xmax += half;
        ymax += half;

        let nrows = ((ymax - ymin) / cell_size).ceil() as usize;
        let ncols = ((xmax - xmin) / cell_size).ceil() as usize;

        let mut grid = Self {
            nrows,
            ncols,
            cell_size,
            xmin,
            ymax,
            data: vec![f64::NAN; nrows * ncols],
            collisions: 0,
        };

        let mut assigned = vec![false; nrows * ncols];
        for (coord, value) in coords.iter().zip(values) {
            let (Some(value), Some((row, col))) = (value, grid.cell_index(*coord)) else {
                continue;
            };
            let i = row * ncols + col;
            if assigned[i] {
                grid.collisions += 1;
            }
            assigned[i] = true;
            grid.data[i] = *value;
        }

        debug!(
            "Raster {}x{} at cell size {} ({} collisions)",
            nrows, ncols, cell_size, grid.collisions
        );
        Ok(grid)
    }

    /// Cell containing a coordinate, if inside the grid
    pub fn cell_index(&self, coord: Coord) -> Option<(usize, usize)> {
        if !coord.is_finite() {
            return None;
        }
        let col = ((coord.x - self.xmin) / self.cell_size).floor();
        let row = ((self.ymax - coord.y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.nrows && col < self.ncols).then_some((row, col))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.nrows && col < self.ncols {
            Some(self.data[row * self.ncols + col])
        } else {
            None
        }
    }
}

fn bounds(coords: &[Coord]) -> Option<(f64, f64, f64, f64)> {
    coords
        .iter()
        .filter(|c| c.is_finite())
        .fold(None, |acc, c| match acc {
            None => Some((c.x, c.y, c.x, c.y)),
            Some((xmin, ymin, xmax, ymax)) => {
                Some((xmin.min(c.x), ymin.min(c.y), xmax.max(c.x), ymax.max(c.y)))
            }
        })
}

fn min_spacing(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| v.is_finite());
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .min_by(f64::total_cmp)
}

/// Smallest positive spacing between distinct x or y coordinates.
///
/// `None` when the points do not span at least two distinct positions.
pub fn calculate_cell_size(coords: &[Coord]) -> Option<f64> {
    let dx = min_spacing(coords.iter().map(|c| c.x).collect());
    let dy = min_spacing(coords.iter().map(|c| c.y).collect());
    match (dx, dy) {
        (Some(dx), Some(dy)) => Some(dx.min(dy)),
        (spacing, None) | (None, spacing) => spacing,
    }
}

fn raster_error(path: &Path, error: impl std::fmt::Display) -> Flo2dError {
    Flo2dError::Raster {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

/// GeoKey directory naming the EPSG code as the model CRS
#[rustfmt::skip]
fn geo_keys(epsg: u16) -> Vec<u16> {
    // EPSG 4000-4999 are geographic 2D systems
    let (model_type, crs_key) = if (4000..5000).contains(&epsg) {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
    };
    vec![
        1, 1, 0, 3,
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, epsg,
    ]
}

/// Write a single-band f64 GeoTIFF with NaN as nodata
pub fn write_geotiff(path: &Path, grid: &RasterGrid, epsg: u16) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file).map_err(|e| raster_error(path, e))?;
    let mut image = encoder
        .new_image::<colortype::Gray64Float>(grid.ncols as u32, grid.nrows as u32)
        .map_err(|e| raster_error(path, e))?;

    let pixel_scale = [grid.cell_size, grid.cell_size, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, grid.xmin, grid.ymax, 0.0];
    let keys = geo_keys(epsg);

    let directory = image.encoder();
    directory
        .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])
        .map_err(|e| raster_error(path, e))?;
    directory
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| raster_error(path, e))?;
    directory
        .write_tag(Tag::GeoKeyDirectoryTag, &keys[..])
        .map_err(|e| raster_error(path, e))?;
    directory
        .write_tag(Tag::GdalNodata, "nan")
        .map_err(|e| raster_error(path, e))?;

    image
        .write_data(&grid.data)
        .map_err(|e| raster_error(path, e))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Rasterize one attribute to `<dir>/<attribute>.tif`.
///
/// Returns `None` without writing when no cell carries the attribute.
pub fn rasterize_column(
    grid: &GridTable,
    attr: GridAttribute,
    dir: &Path,
    cell_size: f64,
    epsg: u16,
) -> Result<Option<(PathBuf, RasterGrid)>> {
    if !grid.populated(attr) {
        return Ok(None);
    }

    let coords: Vec<Coord> = grid.rows().iter().map(|r| Coord::new(r.x, r.y)).collect();
    let raster = RasterGrid::from_points(&coords, &grid.column(attr), cell_size)?;
    let path = dir.join(format!("{}.tif", attr.name()));
    write_geotiff(&path, &raster, epsg)?;
    Ok(Some((path, raster)))
}

/// Rasters written by [`rasterize_columns`]
#[derive(Debug, Default)]
pub struct RasterSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<GridAttribute>,
    pub collisions: usize,
}

/// Rasterize each requested attribute, calling `on_column` after each one
pub fn rasterize_columns(
    grid: &GridTable,
    columns: &[GridAttribute],
    dir: &Path,
    cell_size: f64,
    epsg: u16,
    mut on_column: impl FnMut(GridAttribute),
) -> Result<RasterSummary> {
    let mut summary = RasterSummary::default();

    for &attr in columns {
        match rasterize_column(grid, attr, dir, cell_size, epsg)? {
            Some((path, raster)) => {
                summary.collisions += raster.collisions;
                summary.written.push(path);
            }
            None => {
                info!("No values for '{}'; raster skipped", attr);
                summary.skipped.push(attr);
            }
        }
        on_column(attr);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridCellRecord;
    use tempfile::TempDir;
    use tiff::decoder::{Decoder, DecodingResult};

    fn scenario_points() -> Vec<Coord> {
        vec![
            Coord::new(0.0, 0.0),
            Coord::new(10.0, 0.0),
            Coord::new(0.0, 10.0),
        ]
    }

    #[test]
    fn test_three_point_scenario_cells() {
        let values = vec![Some(1.0), Some(2.0), Some(3.0)];

        let grid = RasterGrid::from_points(&scenario_points(), &values, 10.0).unwrap();

        assert_eq!((grid.nrows, grid.ncols), (2, 2));
        assert_eq!((grid.xmin, grid.ymax), (-5.0, 15.0));
        assert_eq!(grid.get(1, 0), Some(1.0));
        assert_eq!(grid.get(1, 1), Some(2.0));
        assert_eq!(grid.get(0, 0), Some(3.0));
        assert!(grid.get(0, 1).unwrap().is_nan());
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn test_last_point_wins_on_collision() {
        let coords = vec![Coord::new(0.0, 0.0), Coord::new(2.0, 1.0), Coord::new(10.0, 0.0)];
        let values = vec![Some(1.0), Some(7.0), Some(2.0)];

        let grid = RasterGrid::from_points(&coords, &values, 10.0).unwrap();

        assert_eq!(grid.collisions, 1);
        assert_eq!(grid.get(0, 0), Some(7.0));
    }

    #[test]
    fn test_missing_values_leave_sentinel() {
        let values = vec![Some(1.0), None, Some(3.0)];

        let grid = RasterGrid::from_points(&scenario_points(), &values, 10.0).unwrap();

        assert!(grid.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        let values = vec![Some(1.0); 3];
        assert!(matches!(
            RasterGrid::from_points(&scenario_points(), &values, 0.0),
            Err(Flo2dError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn test_calculate_cell_size_from_spacing() {
        assert_eq!(calculate_cell_size(&scenario_points()), Some(10.0));

        let coords = vec![Coord::new(0.0, 0.0), Coord::new(25.0, 0.0), Coord::new(50.0, 0.0)];
        assert_eq!(calculate_cell_size(&coords), Some(25.0));

        assert_eq!(calculate_cell_size(&[Coord::new(1.0, 1.0)]), None);
    }

    #[test]
    fn test_geotiff_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut table = GridTable::new();
        for (id, coord) in scenario_points().into_iter().enumerate() {
            let mut cell = GridCellRecord::new(id as u32 + 1, coord.x, coord.y);
            cell.set(GridAttribute::DepthMax, 0.5 * (id as f64 + 1.0));
            table.push(cell);
        }

        let (path, raster) =
            rasterize_column(&table, GridAttribute::DepthMax, temp_dir.path(), 10.0, 2223)
                .unwrap()
                .unwrap();
        assert_eq!(path, temp_dir.path().join("depth_max.tif"));

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (2, 2));
        let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap();
        assert_eq!(scale, vec![10.0, 10.0, 0.0]);

        // Top-left corner of the padded extent
        let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap();
        assert_eq!(tiepoint, vec![0.0, 0.0, 0.0, -5.0, 15.0, 0.0]);

        let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).unwrap();
        assert_eq!(keys.len(), 16);
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
        assert_eq!(&keys[12..16], &[PROJECTED_CS_TYPE, 0, 1, 2223]);

        let nodata = decoder.get_tag_ascii_string(Tag::GdalNodata).unwrap();
        assert_eq!(nodata.trim_end_matches('\0'), "nan");

        let DecodingResult::F64(data) = decoder.read_image().unwrap() else {
            panic!("expected f64 raster");
        };
        for (row, col) in [(0, 0), (1, 0), (1, 1)] {
            assert_eq!(Some(data[row * 2 + col]), raster.get(row, col));
        }
        assert_eq!(data[2], 0.5);
        assert!(data[1].is_nan());
    }

    #[test]
    fn test_unpopulated_column_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut table = GridTable::new();
        table.push(GridCellRecord::new(1, 0.0, 0.0));

        let written =
            rasterize_column(&table, GridAttribute::Xksat, temp_dir.path(), 10.0, 2223).unwrap();

        assert!(written.is_none());
        assert!(!temp_dir.path().join("xksat.tif").exists());
    }

    #[test]
    fn test_rasterize_columns_reports_each_column() {
        let temp_dir = TempDir::new().unwrap();
        let mut table = GridTable::new();
        let mut cell = GridCellRecord::new(1, 0.0, 0.0);
        cell.set(GridAttribute::Topo, 101.0);
        table.push(cell);
        table.push(GridCellRecord::new(2, 10.0, 0.0));

        let mut seen = Vec::new();
        let summary = rasterize_columns(
            &table,
            &[GridAttribute::Topo, GridAttribute::Psif],
            temp_dir.path(),
            10.0,
            2223,
            |attr| seen.push(attr),
        )
        .unwrap();

        assert_eq!(seen, vec![GridAttribute::Topo, GridAttribute::Psif]);
        assert_eq!(summary.written, vec![temp_dir.path().join("topo.tif")]);
        assert_eq!(summary.skipped, vec![GridAttribute::Psif]);
    }
}
