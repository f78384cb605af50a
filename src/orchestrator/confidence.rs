//! Assessment confidence scoring
//!
//! Starts at 1.0 and subtracts the policy penalty schedule: missing
//! previous-measurement cross-checks, short inspection history, and each
//! propagated warning. Floored at the policy minimum; capped when no
//! usable trend exists. Reported to 2 digits.

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::numeric;
use crate::policy::Policy;

/// Facts about the job that the score depends on.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceFactors {
    pub inspection_count: usize,
    /// Governing inspection has readings without `previousMeasured`.
    pub missing_previous: bool,
    pub warning_count: usize,
    /// A corrosion trend was estimated (2+ inspections).
    pub has_trend: bool,
}

/// Score the assessment confidence per the penalty schedule.
pub fn score(factors: &ConfidenceFactors, policy: &Policy) -> Result<Decimal, EngineError> {
    let p = &policy.confidence_penalties;
    let mut score = Decimal::ONE;

    if factors.missing_previous {
        score = numeric::sub(score, p.missing_previous)?;
    }
    if factors.inspection_count < 3 {
        score = numeric::sub(score, p.fewer_than_three_inspections)?;
    }
    if factors.inspection_count < 5 {
        score = numeric::sub(score, p.fewer_than_five_inspections)?;
    }
    for _ in 0..factors.warning_count {
        score = numeric::sub(score, p.per_warning)?;
    }

    if !factors.has_trend {
        score = score.min(p.no_history_cap);
    }

    Ok(numeric::round_confidence(score.max(p.floor)))
}
