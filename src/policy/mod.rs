//! Assessment policy: every tunable safety constant in one immutable value
//!
//! Statutory interval caps, the RSF acceptance threshold, consequence
//! weights, reconciliation tolerance, component budgets and confidence
//! penalties live here. The policy is constructed once (defaults or TOML)
//! and injected into the orchestrator; nothing in the engine reads a
//! process-wide mutable singleton.

pub mod validation;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{ConsequenceTier, EquipmentKind};

pub use validation::{validate_ranges, validate_unknown_keys, PolicyWarning};

/// Policy load failure. Warnings (typos, suspicious values) never fail a
/// load; impossible values do.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("policy parse error: {0}")]
    Parse(String),
    #[error("policy rejected: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("policy file error: {0}")]
    Io(String),
}

// ============================================================================
// Sections
// ============================================================================

/// Acceptance limits and physical-plausibility thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
    /// RSF at or above which full design margins remain (API 579 Part 2).
    #[serde(with = "rust_decimal::serde::str")]
    pub rsf_allowable: Decimal,
    /// Thin-wall applicability limit on t/R.
    #[serde(with = "rust_decimal::serde::str")]
    pub thick_wall_ratio: Decimal,
    /// Minimum structural wall, inches (1/16").
    #[serde(with = "rust_decimal::serde::str")]
    pub min_wall: Decimal,
    /// Remaining life presentation cap, years.
    #[serde(with = "rust_decimal::serde::str")]
    pub life_cap_years: Decimal,
    /// Corrosion rate above which a warning is attached, in/yr.
    #[serde(with = "rust_decimal::serde::str")]
    pub rate_warning: Decimal,
    /// Corrosion rate above which the job is rejected as physically
    /// impossible, in/yr.
    #[serde(with = "rust_decimal::serde::str")]
    pub rate_fatal: Decimal,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            rsf_allowable: dec!(0.90),
            thick_wall_ratio: dec!(0.1),
            min_wall: dec!(0.0625),
            life_cap_years: dec!(100),
            rate_warning: dec!(0.05),
            rate_fatal: dec!(0.5),
        }
    }
}

/// Statutory inspection-interval caps per equipment kind, years.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntervalCaps {
    #[serde(with = "rust_decimal::serde::str")]
    pub vessel_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub piping_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tank_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub exchanger_years: Decimal,
    /// Smallest interval ever recommended, years.
    #[serde(with = "rust_decimal::serde::str")]
    pub floor_years: Decimal,
    /// Interval clamp applied when RSF falls below the allowable.
    #[serde(with = "rust_decimal::serde::str")]
    pub degraded_rsf_years: Decimal,
}

impl Default for IntervalCaps {
    fn default() -> Self {
        Self {
            vessel_years: dec!(10),
            piping_years: dec!(5),
            tank_years: dec!(10),
            exchanger_years: dec!(10),
            floor_years: dec!(0.25),
            degraded_rsf_years: dec!(2.0),
        }
    }
}

/// Interval multipliers per consequence-of-failure tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsequenceWeights {
    #[serde(with = "rust_decimal::serde::str")]
    pub low: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub medium: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub critical: Decimal,
}

impl Default for ConsequenceWeights {
    fn default() -> Self {
        Self {
            low: dec!(1.0),
            medium: dec!(0.75),
            high: dec!(0.5),
            critical: dec!(0.25),
        }
    }
}

/// Remaining-life thresholds for probability-of-failure banding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskBanding {
    #[serde(with = "rust_decimal::serde::str")]
    pub critical_life_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub high_life_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub medium_life_years: Decimal,
}

impl Default for RiskBanding {
    fn default() -> Self {
        Self {
            critical_life_years: dec!(2.0),
            high_life_years: dec!(5.0),
            medium_life_years: dec!(15.0),
        }
    }
}

/// Remaining-life thresholds for the fitness disposition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FitnessThresholds {
    #[serde(with = "rust_decimal::serde::str")]
    pub unfit_life_years: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub conditional_life_years: Decimal,
}

impl Default for FitnessThresholds {
    fn default() -> Self {
        Self {
            unfit_life_years: dec!(1.0),
            conditional_life_years: dec!(5.0),
        }
    }
}

/// Per-component soft time budgets, milliseconds. Overrun aborts the job
/// with `BudgetExceeded` before any audit append.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComponentBudgets {
    pub resolve_ms: u64,
    pub validate_ms: u64,
    pub calculate_ms: u64,
    pub trend_ms: u64,
    pub rbi_ms: u64,
}

impl Default for ComponentBudgets {
    fn default() -> Self {
        Self {
            resolve_ms: 25,
            validate_ms: 25,
            calculate_ms: 50,
            trend_ms: 100,
            rbi_ms: 25,
        }
    }
}

/// Confidence-score penalty schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfidencePenalties {
    #[serde(with = "rust_decimal::serde::str")]
    pub missing_previous: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub fewer_than_three_inspections: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub fewer_than_five_inspections: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub per_warning: Decimal,
    /// Confidence never reported below this floor.
    #[serde(with = "rust_decimal::serde::str")]
    pub floor: Decimal,
    /// Cap applied when no usable corrosion history exists.
    #[serde(with = "rust_decimal::serde::str")]
    pub no_history_cap: Decimal,
}

impl Default for ConfidencePenalties {
    fn default() -> Self {
        Self {
            missing_previous: dec!(0.10),
            fewer_than_three_inspections: dec!(0.15),
            fewer_than_five_inspections: dec!(0.05),
            per_warning: dec!(0.05),
            floor: dec!(0.50),
            no_history_cap: dec!(0.75),
        }
    }
}

/// Service-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceSettings {
    /// Bound on concurrently executing jobs; excess jobs queue FIFO.
    pub max_in_flight_jobs: usize,
    /// Version stamp of the calculation method, recorded in every audit
    /// entry.
    pub calculation_method_version: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_in_flight_jobs: 32,
            calculation_method_version: "API579-1/L1-2024.1".to_string(),
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// The complete immutable policy value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Policy {
    pub limits: Limits,
    pub intervals: IntervalCaps,
    pub consequence_weights: ConsequenceWeights,
    pub risk_banding: RiskBanding,
    pub fitness: FitnessThresholds,
    pub budgets: ComponentBudgets,
    pub confidence_penalties: ConfidencePenalties,
    pub service: ServiceSettings,
}

impl Policy {
    /// Statutory interval cap for an equipment kind, years.
    pub fn statutory_cap(&self, kind: EquipmentKind) -> Decimal {
        match kind {
            EquipmentKind::Vessel => self.intervals.vessel_years,
            EquipmentKind::Piping => self.intervals.piping_years,
            EquipmentKind::Tank => self.intervals.tank_years,
            EquipmentKind::Exchanger => self.intervals.exchanger_years,
        }
    }

    /// Interval multiplier for a consequence tier.
    pub fn consequence_weight(&self, tier: ConsequenceTier) -> Decimal {
        match tier {
            ConsequenceTier::Low => self.consequence_weights.low,
            ConsequenceTier::Medium => self.consequence_weights.medium,
            ConsequenceTier::High => self.consequence_weights.high,
            ConsequenceTier::Critical => self.consequence_weights.critical,
        }
    }

    /// Parse a policy from TOML. Unknown keys produce warnings with
    /// "did you mean?" suggestions; impossible values fail the load.
    pub fn from_toml_str(raw: &str) -> Result<(Self, Vec<PolicyWarning>), PolicyError> {
        let mut warnings = validate_unknown_keys(raw);
        let policy: Policy =
            toml::from_str(raw).map_err(|e| PolicyError::Parse(e.to_string()))?;
        let (errors, range_warnings) = validate_ranges(&policy);
        if !errors.is_empty() {
            return Err(PolicyError::Invalid(errors));
        }
        warnings.extend(range_warnings);
        Ok((policy, warnings))
    }

    /// Load a policy file from disk.
    pub fn load(path: &std::path::Path) -> Result<(Self, Vec<PolicyWarning>), PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PolicyError::Io(e.to_string()))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caps_match_statute() {
        let p = Policy::default();
        assert_eq!(p.statutory_cap(EquipmentKind::Vessel), dec!(10));
        assert_eq!(p.statutory_cap(EquipmentKind::Piping), dec!(5));
        assert_eq!(p.statutory_cap(EquipmentKind::Tank), dec!(10));
        assert_eq!(p.statutory_cap(EquipmentKind::Exchanger), dec!(10));
    }

    #[test]
    fn test_default_consequence_weights() {
        let p = Policy::default();
        assert_eq!(p.consequence_weight(ConsequenceTier::Low), dec!(1.0));
        assert_eq!(p.consequence_weight(ConsequenceTier::Medium), dec!(0.75));
        assert_eq!(p.consequence_weight(ConsequenceTier::High), dec!(0.5));
        assert_eq!(p.consequence_weight(ConsequenceTier::Critical), dec!(0.25));
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let (p, warnings) = Policy::from_toml_str("").unwrap();
        assert_eq!(p, Policy::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_partial_override() {
        let (p, warnings) = Policy::from_toml_str(
            r#"
[intervals]
piping_years = "4"

[service]
max_in_flight_jobs = 8
"#,
        )
        .unwrap();
        assert!(warnings.is_empty(), "warnings: {warnings:?}");
        assert_eq!(p.statutory_cap(EquipmentKind::Piping), dec!(4));
        assert_eq!(p.service.max_in_flight_jobs, 8);
        // Untouched sections keep defaults
        assert_eq!(p.limits.rsf_allowable, dec!(0.90));
    }

    #[test]
    fn test_impossible_value_fails_load() {
        let err = Policy::from_toml_str(
            r#"
[limits]
rsf_allowable = "1.5"
"#,
        )
        .unwrap_err();
        match err {
            PolicyError::Invalid(errors) => {
                assert!(errors.iter().any(|e| e.contains("rsf_allowable")));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }
}
