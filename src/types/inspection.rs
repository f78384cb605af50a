//! Inspection records and per-CML thickness readings

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single ultrasonic thickness reading at one condition monitoring
/// location (CML).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThicknessReading {
    /// CML identifier, unique within the inspection.
    pub cml_id: String,
    /// Free-form location description, sanitized like tags.
    pub location: String,
    /// Measured thickness, inches, 4-digit precision.
    #[serde(with = "rust_decimal::serde::str")]
    pub measured: Decimal,
    /// Reading at the same CML from the prior campaign, when the
    /// inspector transcribed it. Used for cross-checks and confidence.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub previous_measured: Option<Decimal>,
}

/// One periodic inspection event with its full set of readings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub date: NaiveDate,
    /// Certification identifier of the inspector of record.
    pub inspector_certification: String,
    pub readings: Vec<ThicknessReading>,
}

impl InspectionRecord {
    /// The governing (minimum) reading of this inspection, if any.
    pub fn minimum_reading(&self) -> Option<&ThicknessReading> {
        self.readings.iter().min_by(|a, b| a.measured.cmp(&b.measured))
    }
}
