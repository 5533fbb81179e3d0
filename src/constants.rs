//! Application constants for the FLO-2D processor
//!
//! File names, header-skip counts, column positions and output defaults
//! used throughout the extraction and writing stages.

// =============================================================================
// Input Files
// =============================================================================

/// Primary depth/position file establishing row order and grid ids
pub const DEPTH_FILE: &str = "DEPTH.OUT";

/// Infiltration method selector and Green-Ampt coefficients
pub const INFIL_FILE: &str = "INFIL.DAT";

pub const MANNINGS_FILE: &str = "MANNINGS_N.DAT";
pub const TOPO_FILE: &str = "TOPO.DAT";
pub const VELFP_FILE: &str = "VELFP.OUT";
pub const MAXQHYD_FILE: &str = "MAXQHYD.OUT";
pub const MAXWSELEV_FILE: &str = "MAXWSELEV.OUT";
pub const INFIL_DEPTH_FILE: &str = "INFIL_DEPTH.OUT";
pub const TIMEONEFT_FILE: &str = "TIMEONEFT.OUT";
pub const TIMETWOFT_FILE: &str = "TIMETWOFT.OUT";
pub const TIMETOPEAK_FILE: &str = "TIMETOPEAK.OUT";
pub const FINALVEL_FILE: &str = "FINALVEL.OUT";
pub const FINALDEP_FILE: &str = "FINALDEP.OUT";

/// Floodplain cross-section definitions (tagged `X` lines)
pub const FPXSEC_FILE: &str = "FPXSEC.DAT";

/// Floodplain cross-section discharge report
pub const HYCROSS_FILE: &str = "HYCROSS.OUT";

/// Hydraulic structure definitions (tagged `S`/`F` records)
pub const HYSTRUC_FILE: &str = "HYSTRUC.DAT";

/// Hydraulic structure discharge report
pub const HYDROSTRUCT_FILE: &str = "HYDROSTRUCT.OUT";

// =============================================================================
// Fixed-Format Layouts
// =============================================================================

/// Header lines preceding the per-cell Green-Ampt records in INFIL.DAT
pub const INFIL_SKIP_ROWS: usize = 3;

/// Tag of the per-cell Green-Ampt records in INFIL.DAT
pub const INFIL_CELL_TAG: &str = "F";

/// Grid id column in the INFIL.DAT per-cell records (`F grid ...`)
pub const INFIL_ID_COLUMN: usize = 1;

/// Header lines preceding data in MAXQHYD.OUT
pub const MAXQHYD_SKIP_ROWS: usize = 4;

pub const MAXQHYD_FLAG_COLUMN: usize = 0;
pub const MAXQHYD_Q_COLUMN: usize = 7;
pub const MAXQHYD_DIR_COLUMN: usize = 8;

/// Header lines preceding data in INFIL_DEPTH.OUT
pub const INFIL_DEPTH_SKIP_ROWS: usize = 1;

/// Tag opening a cross-section definition in FPXSEC.DAT
pub const FPXSEC_TAG: &str = "X";

/// Index of the first grid-id token on an FPXSEC.DAT `X` line
pub const FPXSEC_FIRST_GRID_TOKEN: usize = 3;

/// Record tags in HYSTRUC.DAT
pub mod structure_tags {
    pub const STRUCTURE: &str = "S";
    pub const CULVERT: &str = "F";
}

// =============================================================================
// Report Phrases
// =============================================================================

pub mod report_patterns {
    /// Summary line in HYCROSS.OUT
    pub const FPXSEC_MAX_DISCHARGE: &str = r"THE MAXIMUM DISCHARGE FROM CROSS SECTION\s*(\d+) IS:\s*([\d.]+) CFS AT TIME:\s*([\d.]+)";

    /// Marker for the summary line in HYCROSS.OUT
    pub const FPXSEC_MAX_DISCHARGE_MARKER: &str = "THE MAXIMUM DISCHARGE FROM CROSS SECTION";

    /// Hydrograph block header in HYCROSS.OUT
    pub const HYDROGRAPH_HEADER_MARKER: &str = "HYDROGRAPH AND FLOODPLAIN HYDRAULICS";
    pub const HYDROGRAPH_SECTION: &str = r"FOR CROSS SECTION NO:\s*(\d+)";

    /// Structure summary line in HYDROSTRUCT.OUT
    pub const STRUCTURE_MAX_DISCHARGE: &str = "THE MAXIMUM DISCHARGE FOR:";

    /// Column positions of (time, discharge) in a hydrograph data row
    pub const HYDROGRAPH_TIME_TOKEN: usize = 0;
    pub const HYDROGRAPH_DISCHARGE_TOKEN: usize = 5;
}

// =============================================================================
// Outputs
// =============================================================================

/// Default coordinate reference system (NAD83 / Arizona Central, ft)
pub const DEFAULT_EPSG: u16 = 2223;

pub const RASTER_DIR_NAME: &str = "flo2d_rasters";
pub const SHAPEFILE_DIR_NAME: &str = "flo2d_shp";
pub const PLOT_DIR_NAME: &str = "flo2d_plots";

pub const POINTS_SHAPEFILE: &str = "flo2d_data.shp";
pub const FPXSEC_SHAPEFILE: &str = "fpxsec.shp";
pub const HYSTRUC_SHAPEFILE: &str = "hystruc_lines.shp";
pub const HYDROGRAPH_WORKBOOK: &str = "fpxsec_hydrographs.xlsx";

/// Hydrograph plot size in pixels
pub const PLOT_WIDTH: u32 = 1000;
pub const PLOT_HEIGHT: u32 = 600;

/// Scale applied to plot images embedded in the workbook
pub const PLOT_IMAGE_SCALE: f64 = 0.5;

/// GeoKey ids and values written into the GeoKeyDirectory tag
pub mod geotiff_tags {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GT_RASTER_TYPE: u16 = 1025;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;

    pub const MODEL_TYPE_PROJECTED: u16 = 1;
    pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
    pub const RASTER_PIXEL_IS_AREA: u16 = 1;
}
