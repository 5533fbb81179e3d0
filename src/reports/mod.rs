//! Narrative discharge report parsing.
//!
//! FLO-2D writes cross-section and hydraulic structure results as text
//! reports with embedded summary phrases and tabular blocks.

pub mod hycross;
pub mod hystruc;

pub use hycross::{HycrossReport, extract_fpxsec_results, parse_hycross};
pub use hystruc::{extract_hystruc_results, parse_structure_definitions};
