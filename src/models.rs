//! Core data structures for FLO-2D processing.
//!
//! Defines the grid attribute set, the wide grid-cell table, cross-section
//! and hydraulic structure results, hydrograph series and run statistics.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Named scalar attributes a grid cell may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAttribute {
    DepthMax,
    Xksat,
    Psif,
    Dtheta,
    Abstrinf,
    Rtimpf,
    SoilDepth,
    ManningsN,
    Topo,
    Velocity,
    QMax,
    FlowDir,
    WseMax,
    InfilDepth,
    InfilStop,
    TimeOfOneft,
    TimeOfTwoft,
    TimeToPeak,
    FinalVelocity,
    FinalDepth,
}

impl GridAttribute {
    pub const ALL: [GridAttribute; 20] = [
        GridAttribute::DepthMax,
        GridAttribute::Xksat,
        GridAttribute::Psif,
        GridAttribute::Dtheta,
        GridAttribute::Abstrinf,
        GridAttribute::Rtimpf,
        GridAttribute::SoilDepth,
        GridAttribute::ManningsN,
        GridAttribute::Topo,
        GridAttribute::Velocity,
        GridAttribute::QMax,
        GridAttribute::FlowDir,
        GridAttribute::WseMax,
        GridAttribute::InfilDepth,
        GridAttribute::InfilStop,
        GridAttribute::TimeOfOneft,
        GridAttribute::TimeOfTwoft,
        GridAttribute::TimeToPeak,
        GridAttribute::FinalVelocity,
        GridAttribute::FinalDepth,
    ];

    /// Green-Ampt coefficients read from INFIL.DAT, in file column order
    pub const GREEN_AMPT: [GridAttribute; 6] = [
        GridAttribute::Xksat,
        GridAttribute::Psif,
        GridAttribute::Dtheta,
        GridAttribute::Abstrinf,
        GridAttribute::Rtimpf,
        GridAttribute::SoilDepth,
    ];

    /// Column name, also used for raster file names
    pub fn name(&self) -> &'static str {
        match self {
            GridAttribute::DepthMax => "depth_max",
            GridAttribute::Xksat => "xksat",
            GridAttribute::Psif => "psif",
            GridAttribute::Dtheta => "dtheta",
            GridAttribute::Abstrinf => "abstrinf",
            GridAttribute::Rtimpf => "rtimpf",
            GridAttribute::SoilDepth => "soil_depth",
            GridAttribute::ManningsN => "mannings_n",
            GridAttribute::Topo => "topo",
            GridAttribute::Velocity => "velocity",
            GridAttribute::QMax => "q_max",
            GridAttribute::FlowDir => "flow_dir",
            GridAttribute::WseMax => "wse_max",
            GridAttribute::InfilDepth => "infil_depth",
            GridAttribute::InfilStop => "infil_stop",
            GridAttribute::TimeOfOneft => "time_of_oneft",
            GridAttribute::TimeOfTwoft => "time_of_twoft",
            GridAttribute::TimeToPeak => "time_to_peak",
            GridAttribute::FinalVelocity => "final_velocity",
            GridAttribute::FinalDepth => "final_depth",
        }
    }

    /// dBASE field name (at most 10 characters)
    pub fn field_name(&self) -> &'static str {
        match self {
            GridAttribute::TimeOfOneft => "t_oneft",
            GridAttribute::TimeOfTwoft => "t_twoft",
            GridAttribute::TimeToPeak => "t_peak",
            GridAttribute::FinalVelocity => "final_vel",
            GridAttribute::FinalDepth => "final_dep",
            GridAttribute::InfilDepth => "infil_dep",
            other => other.name(),
        }
    }

    /// Parse a column name as used on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|attr| attr.name() == name)
    }
}

impl fmt::Display for GridAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Infiltration model selected by the leading code in INFIL.DAT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfiltrationMethod {
    GreenAmpt,
    ScsCurveNumber,
    ScsGreenAmpt,
    Horton,
    None,
}

impl InfiltrationMethod {
    /// Map the INFIL.DAT selector code; unrecognised codes mean no model
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => InfiltrationMethod::GreenAmpt,
            "2" => InfiltrationMethod::ScsCurveNumber,
            "3" => InfiltrationMethod::ScsGreenAmpt,
            "4" => InfiltrationMethod::Horton,
            _ => InfiltrationMethod::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InfiltrationMethod::GreenAmpt => "Green and Ampt",
            InfiltrationMethod::ScsCurveNumber => "SCS Curve Number",
            InfiltrationMethod::ScsGreenAmpt => "SCS Curve Number and Green and Ampt",
            InfiltrationMethod::Horton => "Horton",
            InfiltrationMethod::None => "None",
        }
    }
}

/// One simulation grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct GridCellRecord {
    pub grid_id: u32,
    pub x: f64,
    pub y: f64,
    pub attributes: BTreeMap<GridAttribute, f64>,
    pub fpxsec: Option<u32>,
}

impl GridCellRecord {
    pub fn new(grid_id: u32, x: f64, y: f64) -> Self {
        Self {
            grid_id,
            x,
            y,
            attributes: BTreeMap::new(),
            fpxsec: None,
        }
    }

    pub fn get(&self, attr: GridAttribute) -> Option<f64> {
        self.attributes.get(&attr).copied()
    }

    pub fn set(&mut self, attr: GridAttribute, value: f64) {
        self.attributes.insert(attr, value);
    }
}

/// Wide table of grid cells in depth-file order, indexed by grid id
#[derive(Debug, Clone, Default)]
pub struct GridTable {
    rows: Vec<GridCellRecord>,
    index: HashMap<u32, usize>,
}

impl GridTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; returns false if the grid id is already present
    pub fn push(&mut self, record: GridCellRecord) -> bool {
        if self.index.contains_key(&record.grid_id) {
            return false;
        }
        self.index.insert(record.grid_id, self.rows.len());
        self.rows.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[GridCellRecord] {
        &self.rows
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut GridCellRecord> {
        self.rows.get_mut(row)
    }

    pub fn get_by_grid_id(&self, grid_id: u32) -> Option<&GridCellRecord> {
        self.index.get(&grid_id).map(|&row| &self.rows[row])
    }

    pub fn get_by_grid_id_mut(&mut self, grid_id: u32) -> Option<&mut GridCellRecord> {
        match self.index.get(&grid_id) {
            Some(&row) => self.rows.get_mut(row),
            None => None,
        }
    }

    /// Attribute values aligned to row order
    pub fn column(&self, attr: GridAttribute) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.get(attr)).collect()
    }

    /// Whether any row carries a value for the attribute
    pub fn populated(&self, attr: GridAttribute) -> bool {
        self.rows.iter().any(|row| row.attributes.contains_key(&attr))
    }

    /// Attributes present on at least one row, in declaration order
    pub fn populated_attributes(&self) -> Vec<GridAttribute> {
        GridAttribute::ALL
            .iter()
            .copied()
            .filter(|attr| self.populated(*attr))
            .collect()
    }

    /// Distinct cross-section ids, ascending
    pub fn fpxsec_ids(&self) -> Vec<u32> {
        let ids: BTreeSet<u32> = self.rows.iter().filter_map(|row| row.fpxsec).collect();
        ids.into_iter().collect()
    }

    /// Cells tagged with a cross-section id, in table order
    pub fn fpxsec_members(&self, fpxs_id: u32) -> Vec<&GridCellRecord> {
        self.rows
            .iter()
            .filter(|row| row.fpxsec == Some(fpxs_id))
            .collect()
    }
}

/// Peak discharge reported for a floodplain cross section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionResult {
    pub fpxs_id: u32,
    /// Peak discharge (cfs)
    pub q_peak: f64,
    /// Time of peak discharge (hrs)
    pub t_peak: f64,
}

/// Culvert coefficients from an `F` record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CulvertCoefficients {
    pub typec: i32,
    pub typeen: i32,
    pub culvertn: f64,
    pub ke: f64,
    pub cubase: f64,
}

/// Hydraulic structure connecting an inflow and an outflow grid node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydraulicStructure {
    pub name: String,
    pub ifprochan: i32,
    pub icurvetable: i32,
    pub inflow_node: u32,
    pub outflow_node: u32,
    pub inoutcont: i32,
    pub headrefel: f64,
    pub clength: f64,
    pub cdiameter: f64,
    pub culvert: Option<CulvertCoefficients>,
    pub q_peak: Option<f64>,
    pub t_peak: Option<f64>,
}

/// Discharge time series for one floodplain cross section
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HydrographSeries {
    pub fpxs_id: u32,
    /// (time hrs, discharge cfs)
    pub samples: Vec<(f64, f64)>,
}

impl HydrographSeries {
    pub fn new(fpxs_id: u32) -> Self {
        Self {
            fpxs_id,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, time: f64, discharge: f64) {
        self.samples.push((time, discharge));
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Place the reported peak at its time offset.
    ///
    /// An existing sample at exactly `time` has its discharge overwritten;
    /// otherwise the peak is inserted and the series re-sorted by time.
    pub fn splice_peak(&mut self, time: f64, discharge: f64) {
        let mut matched = false;
        for sample in self.samples.iter_mut().filter(|(t, _)| *t == time) {
            sample.1 = discharge;
            matched = true;
        }
        if !matched {
            self.samples.push((time, discharge));
            self.samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
    }

    /// First sample holding the maximum discharge
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.samples.iter().copied().fold(None, |best, sample| match best {
            Some((_, q)) if q >= sample.1 => best,
            _ => Some(sample),
        })
    }
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub grid_cells: usize,
    pub populated_columns: usize,
    pub cross_sections: usize,
    pub structures: usize,
    pub hydrograph_sections: usize,
    pub rasters_written: usize,
    pub shapefiles_written: usize,
    pub raster_collisions: usize,
    pub output_path: PathBuf,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(ids: &[u32]) -> GridTable {
        let mut table = GridTable::new();
        for &id in ids {
            assert!(table.push(GridCellRecord::new(id, id as f64, 0.0)));
        }
        table
    }

    #[test]
    fn test_attribute_names_round_trip() {
        for attr in GridAttribute::ALL {
            assert_eq!(GridAttribute::from_name(attr.name()), Some(attr));
            assert!(attr.field_name().len() <= 10, "{} too long", attr);
        }
        assert_eq!(GridAttribute::from_name("bogus"), None);
    }

    #[test]
    fn test_infiltration_codes() {
        assert_eq!(InfiltrationMethod::from_code("1"), InfiltrationMethod::GreenAmpt);
        assert_eq!(InfiltrationMethod::from_code(" 4 "), InfiltrationMethod::Horton);
        assert_eq!(InfiltrationMethod::from_code("7"), InfiltrationMethod::None);
        assert_eq!(InfiltrationMethod::from_code(""), InfiltrationMethod::None);
    }

    #[test]
    fn test_grid_table_rejects_duplicate_ids() {
        let mut table = table_with(&[1, 2]);
        assert!(!table.push(GridCellRecord::new(2, 9.0, 9.0)));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_by_grid_id(2).unwrap().x, 2.0);
    }

    #[test]
    fn test_fpxsec_members_keep_table_order() {
        let mut table = table_with(&[1, 2, 3, 4]);
        table.get_by_grid_id_mut(4).unwrap().fpxsec = Some(2);
        table.get_by_grid_id_mut(1).unwrap().fpxsec = Some(2);
        table.get_by_grid_id_mut(3).unwrap().fpxsec = Some(1);

        assert_eq!(table.fpxsec_ids(), vec![1, 2]);
        let members: Vec<u32> = table.fpxsec_members(2).iter().map(|r| r.grid_id).collect();
        assert_eq!(members, vec![1, 4]);
    }

    #[test]
    fn test_splice_peak_overwrites_existing_time() {
        let mut series = HydrographSeries::new(1);
        series.push(0.0, 1.0);
        series.push(0.5, 4.0);
        series.push(1.0, 2.0);

        series.splice_peak(0.5, 6.5);

        assert_eq!(series.samples, vec![(0.0, 1.0), (0.5, 6.5), (1.0, 2.0)]);
    }

    #[test]
    fn test_splice_peak_inserts_and_sorts() {
        let mut series = HydrographSeries::new(1);
        series.push(0.0, 1.0);
        series.push(1.0, 4.0);
        series.push(2.0, 2.0);

        series.splice_peak(1.25, 5.0);

        assert_eq!(
            series.samples,
            vec![(0.0, 1.0), (1.0, 4.0), (1.25, 5.0), (2.0, 2.0)]
        );
        assert_eq!(series.peak(), Some((1.25, 5.0)));
    }

    #[test]
    fn test_peak_prefers_first_maximum() {
        let mut series = HydrographSeries::new(3);
        series.push(0.0, 2.0);
        series.push(1.0, 2.0);
        assert_eq!(series.peak(), Some((0.0, 2.0)));
        assert_eq!(HydrographSeries::new(4).peak(), None);
    }
}
