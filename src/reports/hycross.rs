//! HYCROSS.OUT floodplain cross-section report parsing.
//!
//! The report mixes narrative text with tabular hydrograph blocks. Two line
//! patterns matter: the per-section maximum discharge summary, and the
//! block header that opens a section's hydrograph table. Within a block the
//! first and sixth tokens of a row are time and discharge; anything that
//! does not parse is narrative and is skipped.

use crate::constants::report_patterns::*;
use crate::constants::HYCROSS_FILE;
use crate::error::Result;
use crate::models::{CrossSectionResult, HydrographSeries};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static MAX_DISCHARGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FPXSEC_MAX_DISCHARGE).expect("valid summary pattern"));

static SECTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HYDROGRAPH_SECTION).expect("valid header pattern"));

/// Everything HYCROSS.OUT reports, keyed by cross-section id
#[derive(Debug, Clone, Default)]
pub struct HycrossReport {
    pub results: BTreeMap<u32, CrossSectionResult>,
    pub hydrographs: BTreeMap<u32, HydrographSeries>,
}

/// Parse a HYCROSS.OUT report
pub fn parse_hycross(path: &Path) -> Result<HycrossReport> {
    let content = fs::read_to_string(path)?;
    let report = parse_hycross_text(&content);
    debug!(
        "{}: {} section summaries, {} hydrograph blocks",
        path.display(),
        report.results.len(),
        report.hydrographs.len()
    );
    Ok(report)
}

/// Peak discharge results only, for the cross-section shapefile
pub fn extract_fpxsec_results(dir: &Path) -> Result<BTreeMap<u32, CrossSectionResult>> {
    Ok(parse_hycross(&dir.join(HYCROSS_FILE))?.results)
}

pub fn parse_hycross_text(content: &str) -> HycrossReport {
    let mut report = HycrossReport::default();
    let mut current: Option<u32> = None;

    for line in content.lines() {
        if line.contains(FPXSEC_MAX_DISCHARGE_MARKER) {
            match parse_summary(line) {
                Some(result) => {
                    report.results.insert(result.fpxs_id, result);
                }
                None => warn!("Unreadable cross-section summary: {}", line.trim()),
            }
            continue;
        }

        if line.contains(HYDROGRAPH_HEADER_MARKER) {
            if let Some(section) = SECTION_HEADER
                .captures(line)
                .and_then(|caps| caps[1].parse::<u32>().ok())
            {
                current = Some(section);
                report
                    .hydrographs
                    .insert(section, HydrographSeries::new(section));
            }
            continue;
        }

        if line.contains("TIME") && line.contains("DISCHARGE") {
            continue;
        }

        if let Some(section) = current {
            if let Some((time, discharge)) = parse_sample(line) {
                if let Some(series) = report.hydrographs.get_mut(&section) {
                    series.push(time, discharge);
                }
            }
        }
    }

    report
}

fn parse_summary(line: &str) -> Option<CrossSectionResult> {
    let caps = MAX_DISCHARGE.captures(line)?;
    Some(CrossSectionResult {
        fpxs_id: caps[1].parse().ok()?,
        q_peak: caps[2].parse().ok()?,
        t_peak: caps[3].parse().ok()?,
    })
}

fn parse_sample(line: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let time = parts.get(HYDROGRAPH_TIME_TOKEN)?.parse::<f64>().ok()?;
    let discharge = parts.get(HYDROGRAPH_DISCHARGE_TOKEN)?.parse::<f64>().ok()?;
    Some((time, discharge))
}
