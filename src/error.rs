//! Engine error taxonomy with stable codes.
//!
//! Every component-level failure propagates to the orchestrator as one of
//! these variants. No error case yields a best-effort numeric answer: a
//! failed calculation produces no safety number and no audit entry.

use rust_decimal::Decimal;

use crate::validation::ValidationIssue;

/// Engine-wide error type. Variants map 1:1 to the stable wire codes
/// returned by [`EngineError::code`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// Validator rejected the job. Carries the per-field issue list,
    /// fatal issues first.
    #[error("input invalid: {}", summarize_issues(.issues))]
    InputInvalid { issues: Vec<ValidationIssue> },

    /// Material or geometry data absent or uninterpolatable.
    #[error("property missing: {detail}")]
    PropertyMissing { detail: String },

    /// Design temperature beyond material table coverage. Extrapolation
    /// is forbidden.
    #[error(
        "design temperature {temperature_f} °F outside material coverage \
         [{coverage_min_f}, {coverage_max_f}] °F"
    )]
    OutOfMaterialRange {
        temperature_f: Decimal,
        coverage_min_f: Decimal,
        coverage_max_f: Decimal,
    },

    /// Thin-wall formulas do not apply (t/R > 0.1). The caller must
    /// escalate to a Level 2/3 assessment; the engine never switches
    /// algorithm silently.
    #[error("thick-wall geometry out of scope: t/R = {ratio} exceeds {limit}")]
    ThickWallOutOfScope { ratio: Decimal, limit: Decimal },

    /// Primary and secondary calculation paths disagree beyond tolerance.
    /// Both values are carried so the diagnostic snapshot reaches the
    /// caller; no safety number is returned.
    #[error(
        "dual-path divergence in {formula}: primary {primary}, secondary {secondary}, \
         relative difference {relative_difference}"
    )]
    DualPathDivergence {
        formula: String,
        primary: Decimal,
        secondary: Decimal,
        relative_difference: Decimal,
    },

    /// Decimal overflow past the configured working precision.
    #[error("precision loss in {detail}")]
    PrecisionLoss { detail: String },

    /// Division by zero or similar arithmetic impossibility.
    #[error("arithmetic failure: {detail}")]
    ArithmeticFailure { detail: String },

    /// A component exceeded its soft time budget. Always raised before
    /// the audit append, so an overrun job leaves no record.
    #[error("{component} exceeded its budget: {elapsed_ms} ms > {budget_ms} ms")]
    BudgetExceeded {
        component: &'static str,
        elapsed_ms: u64,
        budget_ms: u64,
    },

    /// Attempted mutation, deletion, or historical re-issue on the
    /// append-only audit stream.
    #[error("audit immutability violation: {detail}")]
    AuditImmutableViolation { detail: String },

    /// Job cancelled at a component boundary. Never raised after the
    /// audit append; once audited, the result is final.
    #[error("job cancelled before {component}")]
    Cancelled { component: &'static str },

    /// Last resort. Never used for domain reasons.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl EngineError {
    /// Stable machine-readable code for the external interface.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InputInvalid { .. } => "INPUT_INVALID",
            EngineError::PropertyMissing { .. } => "PROPERTY_MISSING",
            EngineError::OutOfMaterialRange { .. } => "OUT_OF_MATERIAL_RANGE",
            EngineError::ThickWallOutOfScope { .. } => "THICK_WALL_OUT_OF_SCOPE",
            EngineError::DualPathDivergence { .. } => "DUAL_PATH_DIVERGENCE",
            EngineError::PrecisionLoss { .. } => "PRECISION_LOSS",
            EngineError::ArithmeticFailure { .. } => "ARITHMETIC_FAILURE",
            EngineError::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            EngineError::AuditImmutableViolation { .. } => "AUDIT_IMMUTABLE_VIOLATION",
            EngineError::Cancelled { .. } => "CANCELLED",
            EngineError::Internal { .. } => "INTERNAL",
        }
    }

    /// Shorthand for a single-issue validation rejection.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        EngineError::InputInvalid {
            issues: vec![ValidationIssue::fatal(field, message)],
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        EngineError::Internal {
            detail: detail.into(),
        }
    }
}

fn summarize_issues(issues: &[ValidationIssue]) -> String {
    let fatal = issues.iter().filter(|i| i.is_fatal()).count();
    let mut parts: Vec<String> = issues
        .iter()
        .filter(|i| i.is_fatal())
        .take(3)
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect();
    if fatal > 3 {
        parts.push(format!("and {} more", fatal - 3));
    }
    format!("{} fatal issue(s) [{}]", fatal, parts.join("; "))
}

impl From<sled::Error> for EngineError {
    fn from(err: sled::Error) -> Self {
        EngineError::Internal {
            detail: format!("audit storage: {err}"),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Internal {
            detail: format!("serialization: {err}"),
        }
    }
}
