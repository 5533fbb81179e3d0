//! Cross-section hydrograph workbook and plots.
//!
//! Each section's time series from HYCROSS.OUT gets a data sheet and, when
//! plotting is enabled, a rendered PNG embedded on a companion sheet.

use crate::constants::{PLOT_HEIGHT, PLOT_IMAGE_SCALE, PLOT_WIDTH};
use crate::error::{Flo2dError, Result};
use crate::models::HydrographSeries;
use crate::reports::{HycrossReport, parse_hycross};
use plotters::prelude::*;
use rust_xlsxwriter::{Image, Workbook};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Hydrograph series per section with the reported peak spliced in
pub fn extract_hydrographs(path: &Path) -> Result<BTreeMap<u32, HydrographSeries>> {
    Ok(hydrographs_from_report(parse_hycross(path)?))
}

/// Splice each section's summary peak into its hydrograph block
pub fn hydrographs_from_report(report: HycrossReport) -> BTreeMap<u32, HydrographSeries> {
    let mut hydrographs = report.hydrographs;

    for (fpxs_id, result) in &report.results {
        match hydrographs.get_mut(fpxs_id) {
            Some(series) => series.splice_peak(result.t_peak, result.q_peak),
            None => debug!("Section {} has a summary but no hydrograph block", fpxs_id),
        }
    }

    hydrographs
}

fn plot_error(path: &Path, error: impl std::fmt::Display) -> Flo2dError {
    Flo2dError::Plot {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Axis range that stays non-empty for flat data
fn padded_range(min: f64, max: f64) -> std::ops::Range<f64> {
    if max > min { min..max } else { min - 1.0..min + 1.0 }
}

/// Render a discharge hydrograph with its maximum annotated
pub fn plot_hydrograph(series: &HydrographSeries, path: &Path) -> Result<()> {
    let (peak_time, peak_q) = series
        .peak()
        .ok_or_else(|| plot_error(path, "no samples to plot"))?;

    let t_min = series.samples.iter().map(|s| s.0).fold(f64::INFINITY, f64::min);
    let t_max = series.samples.iter().map(|s| s.0).fold(f64::NEG_INFINITY, f64::max);
    let q_min = series.samples.iter().map(|s| s.1).fold(0.0, f64::min);
    let q_top = if peak_q > 0.0 { peak_q * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Hydrograph for Section {}", series.fpxs_id),
            ("sans-serif", 28),
        )
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(padded_range(t_min, t_max), padded_range(q_min, q_top))
        .map_err(|e| plot_error(path, e))?;

    chart
        .configure_mesh()
        .x_desc("Time (hours)")
        .y_desc("Discharge (cfs)")
        .draw()
        .map_err(|e| plot_error(path, e))?;

    chart
        .draw_series(LineSeries::new(series.samples.iter().copied(), &BLUE))
        .map_err(|e| plot_error(path, e))?;

    chart
        .draw_series(std::iter::once(Circle::new(
            (peak_time, peak_q),
            5,
            RED.filled(),
        )))
        .map_err(|e| plot_error(path, e))?;
    chart
        .draw_series(std::iter::once(Text::new(
            format!("Max Discharge: {:.2} cfs at {:.2} hrs", peak_q, peak_time),
            (peak_time, peak_q),
            ("sans-serif", 16).into_font().color(&RED),
        )))
        .map_err(|e| plot_error(path, e))?;

    root.present().map_err(|e| plot_error(path, e))?;
    debug!("Plotted section {} to {}", series.fpxs_id, path.display());
    Ok(())
}

/// PNG path for a section's plot
pub fn plot_path(plot_dir: &Path, fpxs_id: u32) -> PathBuf {
    plot_dir.join(format!("section_{}_plot.png", fpxs_id))
}

/// Write the hydrograph workbook.
///
/// Returns the number of sections written. Empty series are skipped.
pub fn write_workbook(
    hydrographs: &BTreeMap<u32, HydrographSeries>,
    plot_dir: &Path,
    xlsx_path: &Path,
    render_plots: bool,
) -> Result<usize> {
    let mut workbook = Workbook::new();
    let mut written = 0;

    for (fpxs_id, series) in hydrographs {
        if series.is_empty() {
            warn!("Hydrograph for section {} is empty; skipped", fpxs_id);
            continue;
        }

        let data = workbook.add_worksheet();
        data.set_name(format!("Section {} Data", fpxs_id))?;
        data.write_string(0, 0, "Time")?;
        data.write_string(0, 1, "Discharge")?;
        for (row, (time, discharge)) in series.samples.iter().enumerate() {
            let row = row as u32 + 1;
            data.write_number(row, 0, *time)?;
            data.write_number(row, 1, *discharge)?;
        }

        if render_plots {
            let png = plot_path(plot_dir, *fpxs_id);
            plot_hydrograph(series, &png)?;
            let image = Image::new(&png)?
                .set_scale_width(PLOT_IMAGE_SCALE)
                .set_scale_height(PLOT_IMAGE_SCALE);
            let sheet = workbook.add_worksheet();
            sheet.set_name(format!("Section {} Plot", fpxs_id))?;
            sheet.insert_image(0, 0, &image)?;
        }

        written += 1;
    }

    workbook.save(xlsx_path)?;
    debug!("Wrote {} sections to {}", written, xlsx_path.display());
    Ok(written)
}
