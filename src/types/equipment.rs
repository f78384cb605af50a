//! Equipment design record: identity, kind, design parameters, geometry

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of in-service pressure equipment.
///
/// All four kinds are assessed as cylindrical shells at Level 1; the kind
/// selects the statutory inspection-interval cap and drives geometry
/// requirements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentKind {
    Vessel,
    Tank,
    Piping,
    Exchanger,
}

impl EquipmentKind {
    /// Get short code for logging
    pub fn short_code(&self) -> &'static str {
        match self {
            EquipmentKind::Vessel => "VSL",
            EquipmentKind::Tank => "TNK",
            EquipmentKind::Piping => "PIP",
            EquipmentKind::Exchanger => "EXC",
        }
    }
}

impl std::fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentKind::Vessel => write!(f, "Vessel"),
            EquipmentKind::Tank => write!(f, "Tank"),
            EquipmentKind::Piping => write!(f, "Piping"),
            EquipmentKind::Exchanger => write!(f, "Heat Exchanger"),
        }
    }
}

/// Equipment design record as registered by the owner-operator.
///
/// Diameters are optional at the type level because registration data is
/// often incomplete; the property resolver refuses to assume or default a
/// missing dimension and fails the job instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    /// Equipment tag, e.g. "V-101". Sanitized by the validator.
    pub tag: String,
    pub kind: EquipmentKind,
    /// Design pressure, psi gauge.
    #[serde(with = "rust_decimal::serde::str")]
    pub design_pressure: Decimal,
    /// Design temperature, °F.
    #[serde(with = "rust_decimal::serde::str")]
    pub design_temperature: Decimal,
    /// Nominal (new) wall thickness, inches.
    #[serde(with = "rust_decimal::serde::str")]
    pub nominal_thickness: Decimal,
    /// Original design corrosion allowance, inches.
    #[serde(with = "rust_decimal::serde::str")]
    pub corrosion_allowance: Decimal,
    /// Weld joint efficiency, dimensionless (0, 1].
    #[serde(with = "rust_decimal::serde::str")]
    pub joint_efficiency: Decimal,
    /// Internal diameter, inches.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub internal_diameter: Option<Decimal>,
    /// External diameter, inches.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub external_diameter: Option<Decimal>,
    /// Shell length, inches. Informational for cylindrical Level 1.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub length: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_vessel() -> Equipment {
        Equipment {
            tag: "V-101".to_string(),
            kind: EquipmentKind::Vessel,
            design_pressure: dec!(150),
            design_temperature: dec!(300),
            nominal_thickness: dec!(0.500),
            corrosion_allowance: dec!(0.125),
            joint_efficiency: dec!(0.85),
            internal_diameter: Some(dec!(48.00)),
            external_diameter: Some(dec!(49.00)),
            length: None,
        }
    }

    #[test]
    fn test_serde_round_trip_preserves_digits() {
        let eq = sample_vessel();
        let json = serde_json::to_string(&eq).unwrap();
        // Safety values serialize as strings, not JSON numbers
        assert!(json.contains("\"designPressure\":\"150\""), "json: {json}");
        assert!(json.contains("\"nominalThickness\":\"0.500\""), "json: {json}");
        let back: Equipment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eq);
        // Trailing zeros survive the round trip
        assert_eq!(back.nominal_thickness.to_string(), "0.500");
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(EquipmentKind::Vessel.short_code(), "VSL");
        assert_eq!(EquipmentKind::Exchanger.to_string(), "Heat Exchanger");
    }
}
