//! Hydraulic structure definitions and peak discharge results.
//!
//! HYSTRUC.DAT is read as a tagged record stream: an `S` record opens a
//! structure and an `F` record attaches culvert coefficients to the open
//! one. HYDROSTRUCT.OUT then supplies each structure's peak discharge and
//! time of peak.

use crate::constants::report_patterns::STRUCTURE_MAX_DISCHARGE;
use crate::constants::structure_tags;
use crate::error::{Flo2dError, Result};
use crate::models::{CulvertCoefficients, HydraulicStructure};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Parser position in the record stream
enum ParseState {
    AwaitingStructure,
    StructureOpen(HydraulicStructure),
    /// Repeated name; culvert records go to the first definition
    Duplicate(String),
}

/// Structures in definition order with a name index
#[derive(Debug, Default)]
struct StructureSet {
    structures: Vec<HydraulicStructure>,
    index: HashMap<String, usize>,
}

impl StructureSet {
    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn insert(&mut self, structure: HydraulicStructure) {
        self.index
            .insert(structure.name.clone(), self.structures.len());
        self.structures.push(structure);
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut HydraulicStructure> {
        match self.index.get(name) {
            Some(&i) => self.structures.get_mut(i),
            None => None,
        }
    }
}

fn field<T: FromStr>(path: &Path, line: usize, parts: &[&str], index: usize, name: &str) -> Result<T> {
    let token = parts.get(index).ok_or_else(|| {
        Flo2dError::parse(path, line, format!("missing {} (token {})", name, index + 1))
    })?;
    token
        .parse::<T>()
        .map_err(|_| Flo2dError::parse(path, line, format!("invalid {}: '{}'", name, token)))
}

fn parse_structure_record(path: &Path, line: usize, parts: &[&str]) -> Result<HydraulicStructure> {
    let name = parts
        .get(1)
        .ok_or_else(|| Flo2dError::parse(path, line, "structure record without a name"))?;

    Ok(HydraulicStructure {
        name: name.to_string(),
        ifprochan: field(path, line, parts, 2, "IFPROCHAN")?,
        icurvetable: field(path, line, parts, 3, "ICURVETABLE")?,
        inflow_node: field(path, line, parts, 4, "inflow node")?,
        outflow_node: field(path, line, parts, 5, "outflow node")?,
        inoutcont: field(path, line, parts, 6, "INOUTCONT")?,
        headrefel: field(path, line, parts, 7, "HEADREFEL")?,
        clength: field(path, line, parts, 8, "CLENGTH")?,
        cdiameter: field(path, line, parts, 9, "CDIAMETER")?,
        culvert: None,
        q_peak: None,
        t_peak: None,
    })
}

fn parse_culvert_record(path: &Path, line: usize, parts: &[&str]) -> Result<CulvertCoefficients> {
    Ok(CulvertCoefficients {
        typec: field(path, line, parts, 1, "TYPEC")?,
        typeen: field(path, line, parts, 2, "TYPEEN")?,
        culvertn: field(path, line, parts, 3, "CULVERTN")?,
        ke: field(path, line, parts, 4, "KE")?,
        cubase: field(path, line, parts, 5, "CUBASE")?,
    })
}

/// Read structure definitions from HYSTRUC.DAT
pub fn parse_structure_definitions(path: &Path) -> Result<Vec<HydraulicStructure>> {
    let content = fs::read_to_string(path)?;
    let mut set = StructureSet::default();
    let mut state = ParseState::AwaitingStructure;

    for (index, line) in content.lines().enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&tag) = parts.first() else {
            continue;
        };

        state = match (tag, state) {
            (structure_tags::STRUCTURE, previous) => {
                if let ParseState::StructureOpen(structure) = previous {
                    set.insert(structure);
                }
                let structure = parse_structure_record(path, index + 1, &parts)?;
                if set.contains(&structure.name) {
                    warn!(
                        "Duplicate hydraulic structure '{}' at line {} ignored; keeping first definition",
                        structure.name,
                        index + 1
                    );
                    ParseState::Duplicate(structure.name)
                } else {
                    ParseState::StructureOpen(structure)
                }
            }
            (structure_tags::CULVERT, ParseState::StructureOpen(mut structure)) => {
                structure.culvert = Some(parse_culvert_record(path, index + 1, &parts)?);
                ParseState::StructureOpen(structure)
            }
            (structure_tags::CULVERT, ParseState::Duplicate(name)) => {
                let culvert = parse_culvert_record(path, index + 1, &parts)?;
                if let Some(first) = set.get_mut(&name) {
                    first.culvert = Some(culvert);
                }
                ParseState::Duplicate(name)
            }
            (structure_tags::CULVERT, ParseState::AwaitingStructure) => {
                debug!("Culvert record at line {} has no open structure", index + 1);
                ParseState::AwaitingStructure
            }
            (_, unchanged) => unchanged,
        };
    }

    if let ParseState::StructureOpen(structure) = state {
        set.insert(structure);
    }

    debug!(
        "{}: {} hydraulic structures defined",
        path.display(),
        set.structures.len()
    );
    Ok(set.structures)
}

/// Peak discharge line: name, peak discharge and time of peak
fn parse_peak_line(line: &str) -> Option<(String, f64, f64)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let name_index = parts.iter().position(|p| *p == "FOR:")? + 1;
    let name = parts.get(name_index)?.to_string();

    let is_index = parts.iter().position(|p| *p == "IS:")?;
    let q_peak = parts.get(is_index + 1)?.parse::<f64>().ok()?;

    let at_index = is_index + parts[is_index..].iter().position(|p| *p == "AT")?;
    let t_peak = parts.get(at_index + 2)?.parse::<f64>().ok()?;

    Some((name, q_peak, t_peak))
}

/// Merge peak discharge results from HYDROSTRUCT.OUT into known structures.
///
/// Returns the number of structures updated; unknown names are dropped.
pub fn apply_structure_peaks(structures: &mut [HydraulicStructure], path: &Path) -> Result<usize> {
    let content = fs::read_to_string(path)?;
    let mut updated = 0;

    for line in content.lines().filter(|l| l.contains(STRUCTURE_MAX_DISCHARGE)) {
        let Some((name, q_peak, t_peak)) = parse_peak_line(line) else {
            debug!("Unreadable structure summary: {}", line.trim());
            continue;
        };
        match structures.iter_mut().find(|s| s.name == name) {
            Some(structure) => {
                structure.q_peak = Some(q_peak);
                structure.t_peak = Some(t_peak);
                updated += 1;
            }
            None => debug!("Peak discharge for unknown structure '{}' dropped", name),
        }
    }

    Ok(updated)
}

/// Definitions from HYSTRUC.DAT joined with peaks from HYDROSTRUCT.OUT
pub fn extract_hystruc_results(
    definitions: &Path,
    report: Option<&Path>,
) -> Result<Vec<HydraulicStructure>> {
    let mut structures = parse_structure_definitions(definitions)?;
    if let Some(report) = report {
        let updated = apply_structure_peaks(&mut structures, report)?;
        debug!("Peak discharge attached to {} structures", updated);
    }
    Ok(structures)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) const SAMPLE_HYSTRUC: &str = "\
S CULV-1 0 1 2 3 0 100.5 40.0 3.0
F 1 2 0.024 0.5 6.0
S WEIR-A 0 2 3 1 0 98.0 0.0 0.0
T 0.0 0.0
F 2 1 0.013 0.2 4.0
";

    pub(crate) const SAMPLE_HYDROSTRUCT: &str = "\
 HYDRAULIC STRUCTURE OUTPUT
   THE MAXIMUM DISCHARGE FOR: CULV-1    STRUCTURE NO.  1 IS:   125.40 CFS AT TIME:   2.35 HRS
   THE MAXIMUM DISCHARGE FOR: GHOST     STRUCTURE NO.  9 IS:    11.00 CFS AT TIME:   1.00 HRS
   THE MAXIMUM DISCHARGE FOR: WEIR-A    STRUCTURE NO.  2 IS:   garbage CFS AT TIME:   1.00 HRS
";

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_structure_and_culvert_records() {
        let file = file_with(SAMPLE_HYSTRUC);

        let structures = parse_structure_definitions(file.path()).unwrap();

        assert_eq!(structures.len(), 2);
        let culvert = &structures[0];
        assert_eq!(culvert.name, "CULV-1");
        assert_eq!((culvert.inflow_node, culvert.outflow_node), (2, 3));
        assert_eq!(culvert.headrefel, 100.5);
        let coefficients = culvert.culvert.unwrap();
        assert_eq!(coefficients.typec, 1);
        assert_eq!(coefficients.culvertn, 0.024);

        // Tags other than S and F do not close the open structure
        assert_eq!(structures[1].culvert.unwrap().typec, 2);
    }

    #[test]
    fn test_culvert_before_any_structure_is_ignored() {
        let file = file_with("F 1 2 0.024 0.5 6.0\nS A 0 0 1 2 0 1.0 2.0 3.0\n");

        let structures = parse_structure_definitions(file.path()).unwrap();

        assert_eq!(structures.len(), 1);
        assert!(structures[0].culvert.is_none());
    }

    #[test]
    fn test_duplicate_name_keeps_first_definition() {
        let file = file_with(
            "S A 0 0 1 2 0 1.0 2.0 3.0\nS A 0 0 7 8 0 1.0 2.0 3.0\nF 1 1 0.1 0.1 0.1\n",
        );

        let structures = parse_structure_definitions(file.path()).unwrap();

        assert_eq!(structures.len(), 1);
        assert_eq!(structures[0].inflow_node, 1);
        assert_eq!(structures[0].outflow_node, 2);
    }

    #[test]
    fn test_culvert_after_duplicate_updates_first_definition() {
        let file = file_with(
            "S A 0 0 1 2 0 1.0 2.0 3.0\nF 3 1 0.5 0.5 0.5\nS B 0 0 4 5 0 1.0 2.0 3.0\nS A 0 0 7 8 0 1.0 2.0 3.0\nF 1 2 0.1 0.2 0.3\n",
        );

        let structures = parse_structure_definitions(file.path()).unwrap();

        assert_eq!(structures.len(), 2);
        let first = &structures[0];
        assert_eq!(first.inflow_node, 1);
        let culvert = first.culvert.unwrap();
        assert_eq!((culvert.typec, culvert.typeen), (1, 2));
        assert_eq!(culvert.culvertn, 0.1);
        assert!(structures[1].culvert.is_none());
    }

    #[test]
    fn test_malformed_structure_record_is_fatal() {
        let file = file_with("S A 0 0 one 2 0 1.0 2.0 3.0\n");

        let err = parse_structure_definitions(file.path()).unwrap_err();
        assert!(matches!(err, Flo2dError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_peaks_merge_by_name() {
        let definitions = file_with(SAMPLE_HYSTRUC);
        let report = file_with(SAMPLE_HYDROSTRUCT);

        let structures = extract_hystruc_results(definitions.path(), Some(report.path())).unwrap();

        assert_eq!(structures[0].q_peak, Some(125.40));
        assert_eq!(structures[0].t_peak, Some(2.35));
        // Unparsable peak leaves the structure without results
        assert_eq!(structures[1].q_peak, None);
    }

    #[test]
    fn test_parse_peak_line_positions() {
        let parsed = parse_peak_line(
            "THE MAXIMUM DISCHARGE FOR: BOX-2 STRUCTURE NO. 4 IS: 7.5 CFS AT TIME: 0.75 HRS",
        );
        assert_eq!(parsed, Some(("BOX-2".to_string(), 7.5, 0.75)));
        assert_eq!(parse_peak_line("THE MAXIMUM DISCHARGE FOR:"), None);
    }
}
