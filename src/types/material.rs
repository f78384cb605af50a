//! Material reference, tabulated strength points, resolved properties

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference to a material specification, e.g. spec "SA-516" grade "70".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRef {
    pub spec: String,
    pub grade: String,
}

impl std::fmt::Display for MaterialRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.spec, self.grade)
    }
}

/// One tabulated temperature point from ASME Section II-D.
///
/// Stresses are psi; temperature is °F. Rows are stored sorted ascending
/// by temperature and the resolver interpolates linearly between adjacent
/// rows only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialPoint {
    #[serde(with = "rust_decimal::serde::str")]
    pub temperature: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub allowable_stress: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub yield_strength: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tensile_strength: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub elastic_modulus: Decimal,
}

/// Where a material table came from. Carried through to the audit entry
/// so a reviewer can trace every stress value to its published source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_document: String,
    pub table: String,
    pub edition_year: i32,
}

/// A material's full temperature curve plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaterialTable {
    pub material: MaterialRef,
    pub provenance: Provenance,
    pub points: Vec<MaterialPoint>,
}

impl MaterialTable {
    /// Inclusive temperature coverage of the table, `(min, max)`.
    /// `None` for an empty table.
    pub fn coverage(&self) -> Option<(Decimal, Decimal)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.temperature, last.temperature))
    }
}

/// Geometry derived from the equipment record. Every field present:
/// assumed or defaulted dimensions are forbidden upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedGeometry {
    #[serde(with = "rust_decimal::serde::str")]
    pub internal_diameter: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub external_diameter: Decimal,
    /// Internal radius, inches (ID / 2).
    #[serde(with = "rust_decimal::serde::str")]
    pub internal_radius: Decimal,
    /// Nominal wall from diameters, inches ((OD − ID) / 2).
    #[serde(with = "rust_decimal::serde::str")]
    pub nominal_wall: Decimal,
}

/// Output of the property resolver: strengths at the design temperature
/// plus the geometry and the provenance of the source table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProperties {
    pub material: MaterialRef,
    #[serde(with = "rust_decimal::serde::str")]
    pub temperature: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub allowable_stress: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub yield_strength: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tensile_strength: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub elastic_modulus: Decimal,
    /// Table coverage the value was interpolated within, °F.
    #[serde(with = "rust_decimal::serde::str")]
    pub coverage_min: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub coverage_max: Decimal,
    pub provenance: Provenance,
    pub geometry: ResolvedGeometry,
}
