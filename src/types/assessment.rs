//! Job envelope, assessment options, and calculation result types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Equipment, InspectionRecord, MaterialRef};

// ============================================================================
// Options
// ============================================================================

/// Which corrosion-rate estimate drives the future corrosion allowance.
///
/// Only these three labels parse. The historical label `nominal` is
/// deliberately rejected with an explanatory error instead of being
/// aliased to `average`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceSelection {
    #[default]
    Conservative,
    Average,
    Optimistic,
}

impl std::str::FromStr for ConfidenceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(ConfidenceSelection::Conservative),
            "average" => Ok(ConfidenceSelection::Average),
            "optimistic" => Ok(ConfidenceSelection::Optimistic),
            "nominal" => Err(
                "confidence label 'nominal' is not accepted; use 'average'. \
                 The two labels are not interchangeable across system boundaries, \
                 so this engine refuses to alias them"
                    .to_string(),
            ),
            other => Err(format!(
                "unknown confidence label '{other}'; expected conservative, average or optimistic"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ConfidenceSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Consequence-of-failure tier for the equipment's service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsequenceTier {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Assessment level. Only Level 1 is in scope; the enum exists so the
/// wire format is forward-compatible with Level 2/3 escalation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AssessmentLevel {
    #[default]
    Level1,
}

fn default_future_years() -> u32 {
    10
}

/// Caller-selectable assessment options with safe defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentOptions {
    pub confidence: ConfidenceSelection,
    /// Projection horizon for the future corrosion allowance, years.
    #[serde(default = "default_future_years")]
    pub future_corrosion_years: u32,
    pub assessment_level: AssessmentLevel,
    pub consequence: ConsequenceTier,
}

impl AssessmentOptions {
    pub fn new() -> Self {
        Self {
            confidence: ConfidenceSelection::Conservative,
            future_corrosion_years: 10,
            assessment_level: AssessmentLevel::Level1,
            consequence: ConsequenceTier::Medium,
        }
    }
}

impl Default for AssessmentOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Job envelope
// ============================================================================

/// One assessment job as submitted by the collaborator process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub equipment: Equipment,
    pub material: MaterialRef,
    /// Inspection history, oldest first. The validator rejects
    /// out-of-order series.
    pub inspections: Vec<InspectionRecord>,
    #[serde(default)]
    pub options: AssessmentOptions,
}

// ============================================================================
// Result
// ============================================================================

/// Fitness-for-service disposition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Fitness {
    /// Continued operation at design conditions is justified.
    Fit,
    /// Operation may continue under monitoring or rerate; margins are
    /// degraded.
    Conditional,
    /// Continued operation at design conditions is not justified.
    Unfit,
}

impl std::fmt::Display for Fitness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fitness::Fit => write!(f, "Fit"),
            Fitness::Conditional => write!(f, "Conditional"),
            Fitness::Unfit => write!(f, "Unfit"),
        }
    }
}

/// Risk level from the RBI engine. Ordered: Low < Medium < High < Critical.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Critical => write!(f, "Critical"),
        }
    }
}

/// Remaining life projection. A non-corroding wall yields `Indefinite`,
/// an explicit sentinel rather than an unrepresentable infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingLife {
    /// Years, already rounded down to one fractional digit.
    Finite(Decimal),
    Indefinite,
}

impl RemainingLife {
    pub fn as_finite(&self) -> Option<Decimal> {
        match self {
            RemainingLife::Finite(y) => Some(*y),
            RemainingLife::Indefinite => None,
        }
    }
}

impl std::fmt::Display for RemainingLife {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemainingLife::Finite(y) => write!(f, "{y}"),
            RemainingLife::Indefinite => write!(f, "indefinite"),
        }
    }
}

impl Serialize for RemainingLife {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RemainingLife {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "indefinite" {
            return Ok(RemainingLife::Indefinite);
        }
        s.parse::<Decimal>()
            .map(RemainingLife::Finite)
            .map_err(|e| serde::de::Error::custom(format!("remaining life '{s}': {e}")))
    }
}

/// The deterministic numeric core of an assessment. Hashing this struct
/// (canonical form) yields the audit `outputHash`; two byte-identical
/// jobs must produce byte-identical outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentOutcome {
    /// Minimum required thickness, inches (4 digits).
    #[serde(with = "rust_decimal::serde::str")]
    pub t_min: Decimal,
    /// Maximum allowable working pressure at the projected effective
    /// thickness, psi (2 digits).
    #[serde(with = "rust_decimal::serde::str")]
    pub mawp: Decimal,
    /// Remaining strength factor (4 digits).
    #[serde(with = "rust_decimal::serde::str")]
    pub rsf: Decimal,
    /// Governing corrosion rate, in/yr (selected per options.confidence).
    #[serde(with = "rust_decimal::serde::str")]
    pub corrosion_rate_in_per_year: Decimal,
    pub remaining_life_years: RemainingLife,
    /// Recommended next inspection interval, years (multiple of 0.5,
    /// floored at 0.25).
    #[serde(with = "rust_decimal::serde::str")]
    pub next_inspection_years: Decimal,
    pub fitness: Fitness,
    pub risk: RiskLevel,
    pub requires_immediate_review: bool,
    /// Assessment confidence in [0.50, 1.00], 2 digits.
    #[serde(with = "rust_decimal::serde::str")]
    pub confidence: Decimal,
    pub warnings: Vec<String>,
    /// RBI rationale, one entry per applied rule.
    pub rationale: Vec<String>,
}

/// Full calculation result: outcome plus identity, input snapshot and
/// the hashes tying it to its audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub calculation_id: Uuid,
    pub performed_at: DateTime<Utc>,
    /// Inspector of record from the governing inspection.
    pub performer: String,
    pub equipment_tag: String,
    /// Byte-faithful snapshot of the submitted job.
    pub inputs: Job,
    #[serde(flatten)]
    pub outcome: AssessmentOutcome,
    /// SHA-256 (lowercase hex) of the canonical input encoding.
    pub input_hash: String,
    /// SHA-256 (lowercase hex) of the canonical outcome encoding.
    pub output_hash: String,
    /// Chain hash of the audit entry recorded for this calculation.
    pub chain_hash: String,
}
