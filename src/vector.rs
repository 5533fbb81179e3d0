//! Shapefile output for point and polyline feature collections.
//!
//! Each writer produces the `.shp`/`.shx`/`.dbf` triple plus a `.prj`
//! side file holding the WKT of the collection's EPSG code.

use crate::error::{Flo2dError, Result};
use crate::geometry::{Coord, FeatureCollection, FpxsecLine, PointFeature, StructureLine};
use crate::models::GridAttribute;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polyline, Writer};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const ID_WIDTH: u8 = 10;
const VALUE_WIDTH: u8 = 18;
const VALUE_DECIMALS: u8 = 6;
const NAME_WIDTH: u8 = 50;

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name)
        .map_err(|_| Flo2dError::configuration(format!("invalid dBASE field name '{}'", name)))
}

fn numeric(value: Option<f64>) -> FieldValue {
    FieldValue::Numeric(value.filter(|v| v.is_finite()))
}

fn to_point(coord: &Coord) -> Point {
    Point::new(coord.x, coord.y)
}

fn to_polyline(feature: &str, vertices: &[Coord]) -> Result<Polyline> {
    if vertices.len() < 2 {
        return Err(Flo2dError::DegenerateGeometry {
            feature: feature.to_string(),
            reason: format!("polyline needs 2 vertices, found {}", vertices.len()),
        });
    }
    Ok(Polyline::new(vertices.iter().map(to_point).collect()))
}

/// Write `<shp>.prj` for the EPSG code, if the code is known
fn write_projection(shp_path: &Path, epsg: u16) -> Result<()> {
    match crs_definitions::from_code(epsg) {
        Some(definition) => {
            fs::write(shp_path.with_extension("prj"), definition.wkt)?;
        }
        None => warn!(
            "No WKT known for EPSG:{}; {} written without a .prj",
            epsg,
            shp_path.display()
        ),
    }
    Ok(())
}

/// Grid cells as points with every populated attribute
pub fn write_points_shapefile(
    path: &Path,
    points: &FeatureCollection<PointFeature>,
) -> Result<()> {
    let attributes: Vec<GridAttribute> = GridAttribute::ALL
        .into_iter()
        .filter(|attr| points.features.iter().any(|p| p.attributes.contains_key(attr)))
        .collect();

    let mut table = TableWriterBuilder::new().add_numeric_field(field_name("grid_id")?, ID_WIDTH, 0);
    for attr in &attributes {
        table = table.add_numeric_field(field_name(attr.field_name())?, VALUE_WIDTH, VALUE_DECIMALS);
    }
    table = table.add_numeric_field(field_name("fpxsec")?, ID_WIDTH, 0);

    let mut writer = Writer::from_path(path, table)?;
    for point in &points.features {
        let mut record = Record::default();
        record.insert("grid_id".to_string(), numeric(Some(point.grid_id as f64)));
        for attr in &attributes {
            record.insert(
                attr.field_name().to_string(),
                numeric(point.attributes.get(attr).copied()),
            );
        }
        record.insert("fpxsec".to_string(), numeric(point.fpxsec.map(f64::from)));
        writer.write_shape_and_record(&to_point(&point.coord), &record)?;
    }
    drop(writer);

    write_projection(path, points.epsg)?;
    debug!("Wrote {} points to {}", points.len(), path.display());
    Ok(())
}

/// Cross sections with peak discharge and time of peak
pub fn write_fpxsec_shapefile(path: &Path, lines: &FeatureCollection<FpxsecLine>) -> Result<()> {
    let table = TableWriterBuilder::new()
        .add_numeric_field(field_name("fpxs_id")?, ID_WIDTH, 0)
        .add_numeric_field(field_name("Qpeak_cfs")?, VALUE_WIDTH, VALUE_DECIMALS)
        .add_numeric_field(field_name("Tpeak_hrs")?, VALUE_WIDTH, VALUE_DECIMALS);

    let shapes = lines
        .features
        .iter()
        .map(|line| {
            to_polyline(
                &format!("cross section {}", line.attributes.fpxs_id),
                &line.vertices,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    let mut writer = Writer::from_path(path, table)?;
    for (shape, line) in shapes.iter().zip(&lines.features) {
        let result = &line.attributes;
        let mut record = Record::default();
        record.insert("fpxs_id".to_string(), numeric(Some(f64::from(result.fpxs_id))));
        record.insert("Qpeak_cfs".to_string(), numeric(Some(result.q_peak)));
        record.insert("Tpeak_hrs".to_string(), numeric(Some(result.t_peak)));
        writer.write_shape_and_record(shape, &record)?;
    }
    drop(writer);

    write_projection(path, lines.epsg)?;
    debug!("Wrote {} cross sections to {}", lines.len(), path.display());
    Ok(())
}

/// Structure fields in output order; names fit the 10 character dBASE limit
const STRUCTURE_FIELDS: [&str; 15] = [
    "IFPROCHAN",
    "ICURVETABL",
    "INFLOW_ND",
    "OUTFLOW_ND",
    "INOUTCONT",
    "HEADREFEL",
    "CLENGTH",
    "CDIAMETER",
    "TYPEC",
    "TYPEEN",
    "CULVERTN",
    "KE",
    "CUBASE",
    "Qpeak_cfs",
    "Tpeak_hrs",
];

fn structure_values(line: &StructureLine) -> [Option<f64>; 15] {
    let s = &line.attributes;
    let culvert = s.culvert.as_ref();
    [
        Some(f64::from(s.ifprochan)),
        Some(f64::from(s.icurvetable)),
        Some(f64::from(s.inflow_node)),
        Some(f64::from(s.outflow_node)),
        Some(f64::from(s.inoutcont)),
        Some(s.headrefel),
        Some(s.clength),
        Some(s.cdiameter),
        culvert.map(|c| f64::from(c.typec)),
        culvert.map(|c| f64::from(c.typeen)),
        culvert.map(|c| c.culvertn),
        culvert.map(|c| c.ke),
        culvert.map(|c| c.cubase),
        s.q_peak,
        s.t_peak,
    ]
}

/// Hydraulic structures as inflow-to-outflow lines.
///
/// Unresolved nodes are written as NaN vertices.
pub fn write_structure_shapefile(
    path: &Path,
    lines: &FeatureCollection<StructureLine>,
) -> Result<()> {
    let mut table = TableWriterBuilder::new().add_character_field(field_name("name")?, NAME_WIDTH);
    for name in STRUCTURE_FIELDS {
        table = table.add_numeric_field(field_name(name)?, VALUE_WIDTH, VALUE_DECIMALS);
    }

    let shapes = lines
        .features
        .iter()
        .map(|line| to_polyline(&format!("structure {}", line.attributes.name), &line.vertices))
        .collect::<Result<Vec<_>>>()?;

    let mut writer = Writer::from_path(path, table)?;
    for (shape, line) in shapes.iter().zip(&lines.features) {
        let mut record = Record::default();
        record.insert(
            "name".to_string(),
            FieldValue::Character(Some(line.attributes.name.clone())),
        );
        for (name, value) in STRUCTURE_FIELDS.iter().zip(structure_values(line)) {
            record.insert(name.to_string(), numeric(value));
        }
        writer.write_shape_and_record(shape, &record)?;
    }
    drop(writer);

    write_projection(path, lines.epsg)?;
    debug!("Wrote {} structures to {}", lines.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineFeature;
    use crate::models::{CrossSectionResult, CulvertCoefficients, HydraulicStructure};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn fpxsec_lines(vertices: Vec<Coord>) -> FeatureCollection<FpxsecLine> {
        FeatureCollection {
            epsg: 2223,
            features: vec![LineFeature {
                vertices,
                attributes: CrossSectionResult {
                    fpxs_id: 3,
                    q_peak: 52.3,
                    t_peak: 1.1,
                },
            }],
        }
    }

    #[test]
    fn test_fpxsec_shapefile_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fpxsec.shp");
        let lines = fpxsec_lines(vec![Coord::new(0.0, 0.0), Coord::new(10.0, 0.0)]);

        write_fpxsec_shapefile(&path, &lines).unwrap();

        let read = shapefile::read_as::<_, Polyline, Record>(&path).unwrap();
        assert_eq!(read.len(), 1);
        let (shape, record) = &read[0];
        assert_eq!(shape.parts()[0].len(), 2);
        assert_eq!(shape.parts()[0][1], Point::new(10.0, 0.0));
        assert_eq!(record.get("fpxs_id"), Some(&FieldValue::Numeric(Some(3.0))));
        assert_eq!(record.get("Qpeak_cfs"), Some(&FieldValue::Numeric(Some(52.3))));
        assert!(path.with_extension("dbf").exists());
        assert!(path.with_extension("shx").exists());
    }

    #[test]
    fn test_single_vertex_section_is_degenerate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fpxsec.shp");
        let lines = fpxsec_lines(vec![Coord::new(0.0, 0.0)]);

        let err = write_fpxsec_shapefile(&path, &lines).unwrap_err();

        assert!(matches!(err, Flo2dError::DegenerateGeometry { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_structure_shapefile_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hystruc_lines.shp");
        let lines = FeatureCollection {
            epsg: 2223,
            features: vec![LineFeature {
                vertices: vec![Coord::new(0.0, 0.0), Coord::new(10.0, 10.0)],
                attributes: HydraulicStructure {
                    name: "CULV-1".to_string(),
                    ifprochan: 0,
                    icurvetable: 1,
                    inflow_node: 2,
                    outflow_node: 3,
                    inoutcont: 0,
                    headrefel: 100.5,
                    clength: 40.0,
                    cdiameter: 3.0,
                    culvert: Some(CulvertCoefficients {
                        typec: 1,
                        typeen: 2,
                        culvertn: 0.024,
                        ke: 0.5,
                        cubase: 6.0,
                    }),
                    q_peak: Some(125.4),
                    t_peak: None,
                },
            }],
        };

        write_structure_shapefile(&path, &lines).unwrap();

        let read = shapefile::read_as::<_, Polyline, Record>(&path).unwrap();
        let record = &read[0].1;
        assert_eq!(
            record.get("name"),
            Some(&FieldValue::Character(Some("CULV-1".to_string())))
        );
        assert_eq!(record.get("OUTFLOW_ND"), Some(&FieldValue::Numeric(Some(3.0))));
        assert_eq!(record.get("TYPEEN"), Some(&FieldValue::Numeric(Some(2.0))));
        assert_eq!(record.get("Tpeak_hrs"), Some(&FieldValue::Numeric(None)));
    }

    #[test]
    fn test_points_shapefile_carries_populated_attributes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flo2d_data.shp");
        let points = FeatureCollection {
            epsg: 2223,
            features: vec![PointFeature {
                grid_id: 1,
                coord: Coord::new(5.0, 5.0),
                attributes: BTreeMap::from([(GridAttribute::DepthMax, 1.25)]),
                fpxsec: Some(2),
            }],
        };

        write_points_shapefile(&path, &points).unwrap();

        let read = shapefile::read_as::<_, Point, Record>(&path).unwrap();
        let (point, record) = &read[0];
        assert_eq!(*point, Point::new(5.0, 5.0));
        assert_eq!(record.get("depth_max"), Some(&FieldValue::Numeric(Some(1.25))));
        assert_eq!(record.get("fpxsec"), Some(&FieldValue::Numeric(Some(2.0))));
        assert!(record.get("xksat").is_none());
    }
}
