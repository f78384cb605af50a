//! Property Resolver
//!
//! Resolves `(material, temperature)` to ASME Section II-D allowable
//! stress and companion strengths, and equipment geometry to a complete
//! `ResolvedGeometry`. Interpolation is linear between tabulated
//! temperature points only; extrapolation past table coverage and
//! assumed/defaulted dimensions are both refused.

pub mod tables;

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;
use crate::numeric;
use crate::types::{
    Equipment, MaterialPoint, MaterialRef, MaterialTable, ResolvedGeometry, ResolvedProperties,
};

/// Read-only library of material tables. Built once at startup and shared
/// by unbounded concurrent readers.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    tables: HashMap<(String, String), MaterialTable>,
}

#[derive(Debug, Deserialize)]
struct MaterialLibraryFile {
    materials: Vec<MaterialTable>,
}

impl MaterialLibrary {
    /// Library containing only the builtin ASME II-D excerpts.
    pub fn builtin() -> Self {
        let mut lib = Self {
            tables: HashMap::new(),
        };
        for table in tables::builtin_tables() {
            // Builtin tables are validated by their own unit tests
            let _ = lib.insert(table);
        }
        lib
    }

    /// Empty library, for operators who supply every table themselves.
    pub fn empty() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    fn key(material: &MaterialRef) -> (String, String) {
        (
            material.spec.to_ascii_uppercase(),
            material.grade.to_ascii_uppercase(),
        )
    }

    /// Insert a table, replacing any previous table for the same material.
    /// Rows are sorted by temperature; duplicate temperatures and empty
    /// tables are refused.
    pub fn insert(&mut self, mut table: MaterialTable) -> Result<(), EngineError> {
        if table.points.is_empty() {
            return Err(EngineError::PropertyMissing {
                detail: format!("material table {} has no rows", table.material),
            });
        }
        table.points.sort_by(|a, b| a.temperature.cmp(&b.temperature));
        for pair in table.points.windows(2) {
            if pair[0].temperature == pair[1].temperature {
                return Err(EngineError::PropertyMissing {
                    detail: format!(
                        "material table {} has duplicate rows at {} °F",
                        table.material, pair[0].temperature
                    ),
                });
            }
        }
        for p in &table.points {
            if p.allowable_stress <= Decimal::ZERO
                || p.yield_strength <= Decimal::ZERO
                || p.tensile_strength <= Decimal::ZERO
            {
                return Err(EngineError::PropertyMissing {
                    detail: format!(
                        "material table {} has non-positive stress at {} °F",
                        table.material, p.temperature
                    ),
                });
            }
            if p.yield_strength > p.tensile_strength {
                return Err(EngineError::PropertyMissing {
                    detail: format!(
                        "material table {} has yield above tensile at {} °F",
                        table.material, p.temperature
                    ),
                });
            }
        }
        self.tables.insert(Self::key(&table.material), table);
        Ok(())
    }

    /// Merge an operator-supplied TOML library into this one.
    pub fn load_toml_str(&mut self, raw: &str) -> Result<usize, EngineError> {
        let file: MaterialLibraryFile = toml::from_str(raw).map_err(|e| {
            EngineError::PropertyMissing {
                detail: format!("material library parse error: {e}"),
            }
        })?;
        let count = file.materials.len();
        for table in file.materials {
            info!(material = %table.material, "loading material table");
            self.insert(table)?;
        }
        Ok(count)
    }

    /// Merge a TOML library file from disk.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| EngineError::PropertyMissing {
            detail: format!("material library {}: {e}", path.display()),
        })?;
        self.load_toml_str(&raw)
    }

    pub fn get(&self, material: &MaterialRef) -> Option<&MaterialTable> {
        self.tables.get(&Self::key(material))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Resolve strengths at the equipment design temperature plus the
    /// equipment geometry into a single provenance-carrying struct.
    pub fn resolve(
        &self,
        material: &MaterialRef,
        equipment: &Equipment,
    ) -> Result<ResolvedProperties, EngineError> {
        let table = self.get(material).ok_or_else(|| EngineError::PropertyMissing {
            detail: format!("no material table for {material}"),
        })?;

        let temperature = equipment.design_temperature;
        let (coverage_min, coverage_max) =
            table.coverage().ok_or_else(|| EngineError::PropertyMissing {
                detail: format!("material table {material} has no rows"),
            })?;

        if temperature < coverage_min || temperature > coverage_max {
            return Err(EngineError::OutOfMaterialRange {
                temperature_f: temperature,
                coverage_min_f: coverage_min,
                coverage_max_f: coverage_max,
            });
        }

        let (allowable_stress, yield_strength, tensile_strength, elastic_modulus) =
            interpolate_at(&table.points, temperature)?;

        let geometry = resolve_geometry(equipment)?;

        Ok(ResolvedProperties {
            material: material.clone(),
            temperature,
            allowable_stress,
            yield_strength,
            tensile_strength,
            elastic_modulus,
            coverage_min,
            coverage_max,
            provenance: table.provenance.clone(),
            geometry,
        })
    }
}

/// Linear interpolation of all four strength quantities at `temperature`.
/// Callers guarantee coverage; rows are sorted ascending.
fn interpolate_at(
    points: &[MaterialPoint],
    temperature: Decimal,
) -> Result<(Decimal, Decimal, Decimal, Decimal), EngineError> {
    if let Some(exact) = points.iter().find(|p| p.temperature == temperature) {
        return Ok((
            exact.allowable_stress,
            exact.yield_strength,
            exact.tensile_strength,
            exact.elastic_modulus,
        ));
    }

    let upper_idx = points
        .iter()
        .position(|p| p.temperature > temperature)
        .ok_or_else(|| EngineError::PropertyMissing {
            detail: format!("no bracketing row above {temperature} °F"),
        })?;
    if upper_idx == 0 {
        return Err(EngineError::PropertyMissing {
            detail: format!("no bracketing row below {temperature} °F"),
        });
    }
    let lo = &points[upper_idx - 1];
    let hi = &points[upper_idx];

    // fraction = (T - T0) / (T1 - T0)
    let span = numeric::sub(hi.temperature, lo.temperature)?;
    let fraction = numeric::div(numeric::sub(temperature, lo.temperature)?, span)?;

    let lerp = |y0: Decimal, y1: Decimal| -> Result<Decimal, EngineError> {
        numeric::add(y0, numeric::mul(numeric::sub(y1, y0)?, fraction)?)
    };

    Ok((
        lerp(lo.allowable_stress, hi.allowable_stress)?,
        lerp(lo.yield_strength, hi.yield_strength)?,
        lerp(lo.tensile_strength, hi.tensile_strength)?,
        lerp(lo.elastic_modulus, hi.elastic_modulus)?,
    ))
}

/// Derive the full geometry from the equipment record. Missing diameters
/// are refused; the engine never assumes a dimension.
fn resolve_geometry(equipment: &Equipment) -> Result<ResolvedGeometry, EngineError> {
    let internal_diameter =
        equipment
            .internal_diameter
            .ok_or_else(|| EngineError::PropertyMissing {
                detail: format!(
                    "internalDiameter absent for {} {}",
                    equipment.kind, equipment.tag
                ),
            })?;
    let external_diameter =
        equipment
            .external_diameter
            .ok_or_else(|| EngineError::PropertyMissing {
                detail: format!(
                    "externalDiameter absent for {} {}",
                    equipment.kind, equipment.tag
                ),
            })?;

    let two = Decimal::TWO;
    let internal_radius = numeric::div(internal_diameter, two)?;
    let nominal_wall = numeric::div(numeric::sub(external_diameter, internal_diameter)?, two)?;

    Ok(ResolvedGeometry {
        internal_diameter,
        external_diameter,
        internal_radius,
        nominal_wall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EquipmentKind;
    use rust_decimal_macros::dec;

    fn vessel(design_temp: Decimal) -> Equipment {
        Equipment {
            tag: "V-101".to_string(),
            kind: EquipmentKind::Vessel,
            design_pressure: dec!(150),
            design_temperature: design_temp,
            nominal_thickness: dec!(0.500),
            corrosion_allowance: dec!(0.125),
            joint_efficiency: dec!(0.85),
            internal_diameter: Some(dec!(48.00)),
            external_diameter: Some(dec!(49.00)),
            length: None,
        }
    }

    fn sa_516_70_ref() -> MaterialRef {
        MaterialRef {
            spec: "SA-516".to_string(),
            grade: "70".to_string(),
        }
    }

    #[test]
    fn test_resolve_at_tabulated_point() {
        let lib = MaterialLibrary::builtin();
        let props = lib.resolve(&sa_516_70_ref(), &vessel(dec!(300))).unwrap();
        assert_eq!(props.allowable_stress, dec!(20000));
        assert_eq!(props.geometry.internal_radius, dec!(24.00));
        assert_eq!(props.geometry.nominal_wall, dec!(0.50));
        assert_eq!(props.provenance.table, "1A");
    }

    #[test]
    fn test_resolve_interpolates_between_rows() {
        let lib = MaterialLibrary::builtin();
        // 625 °F is halfway between the 600 (19400) and 650 (18800) rows
        let props = lib.resolve(&sa_516_70_ref(), &vessel(dec!(625))).unwrap();
        assert_eq!(props.allowable_stress, dec!(19100));
    }

    #[test]
    fn test_resolve_refuses_extrapolation() {
        let lib = MaterialLibrary::builtin();
        let err = lib.resolve(&sa_516_70_ref(), &vessel(dec!(900))).unwrap_err();
        match err {
            EngineError::OutOfMaterialRange {
                temperature_f,
                coverage_max_f,
                ..
            } => {
                assert_eq!(temperature_f, dec!(900));
                assert_eq!(coverage_max_f, dec!(800));
            }
            other => panic!("expected OutOfMaterialRange, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_below_coverage_rejected() {
        let lib = MaterialLibrary::builtin();
        let err = lib.resolve(&sa_516_70_ref(), &vessel(dec!(50))).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_MATERIAL_RANGE");
    }

    #[test]
    fn test_unknown_material_is_property_missing() {
        let lib = MaterialLibrary::builtin();
        let unknown = MaterialRef {
            spec: "SA-999".to_string(),
            grade: "X".to_string(),
        };
        let err = lib.resolve(&unknown, &vessel(dec!(300))).unwrap_err();
        assert_eq!(err.code(), "PROPERTY_MISSING");
    }

    #[test]
    fn test_missing_internal_diameter_rejected() {
        let lib = MaterialLibrary::builtin();
        let mut eq = vessel(dec!(300));
        eq.internal_diameter = None;
        let err = lib.resolve(&sa_516_70_ref(), &eq).unwrap_err();
        assert_eq!(err.code(), "PROPERTY_MISSING");
        assert!(err.to_string().contains("internalDiameter"));
    }

    #[test]
    fn test_material_lookup_is_case_insensitive() {
        let lib = MaterialLibrary::builtin();
        let lower = MaterialRef {
            spec: "sa-516".to_string(),
            grade: "70".to_string(),
        };
        assert!(lib.get(&lower).is_some());
    }

    #[test]
    fn test_load_toml_library() {
        let mut lib = MaterialLibrary::empty();
        let count = lib
            .load_toml_str(
                r#"
[[materials]]

[materials.material]
spec = "SA-333"
grade = "6"

[materials.provenance]
sourceDocument = "ASME BPVC Section II-D (Customary)"
table = "1A"
editionYear = 2023

[[materials.points]]
temperature = "100"
allowableStress = "17100"
yieldStrength = "35000"
tensileStrength = "60000"
elasticModulus = "29300000"

[[materials.points]]
temperature = "400"
allowableStress = "17100"
yieldStrength = "32000"
tensileStrength = "60000"
elasticModulus = "27700000"
"#,
            )
            .unwrap();
        assert_eq!(count, 1);
        let m = MaterialRef {
            spec: "SA-333".to_string(),
            grade: "6".to_string(),
        };
        assert!(lib.get(&m).is_some());
    }

    #[test]
    fn test_insert_rejects_yield_above_tensile() {
        let mut lib = MaterialLibrary::empty();
        let mut table = tables::sa_516_70();
        table.points[0].yield_strength = dec!(80000);
        let err = lib.insert(table).unwrap_err();
        assert!(err.to_string().contains("yield above tensile"));
    }
}
