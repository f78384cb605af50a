//! RBI Interval Engine
//!
//! Level-1 risk-based inspection interval derivation (API 580/581
//! simplification): half-remaining-life base capped by statute, weighted
//! by consequence tier, floored and rounded down to the half year, with
//! degraded-RSF and short-life clamps applied last. Every applied rule
//! leaves a rationale entry for the audit record.

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::numeric;
use crate::policy::Policy;
use crate::types::{ConsequenceTier, EquipmentKind, RemainingLife, RiskLevel};

/// Inputs to the interval recommendation.
#[derive(Debug, Clone, Copy)]
pub struct RbiInput {
    pub kind: EquipmentKind,
    pub consequence: ConsequenceTier,
    pub rsf: Decimal,
    pub remaining_life: RemainingLife,
}

/// Recommended interval with its risk level and rule trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbiOutcome {
    /// Years; a multiple of 0.5 or the 0.25 floor.
    pub interval_years: Decimal,
    pub risk: RiskLevel,
    pub requires_immediate_review: bool,
    pub rationale: Vec<String>,
}

/// Round down to the nearest 0.5 year.
fn floor_to_half(v: Decimal) -> Result<Decimal, EngineError> {
    let doubled = numeric::mul(v, Decimal::TWO)?;
    numeric::div(doubled.floor(), Decimal::TWO)
}

fn bump(risk: RiskLevel) -> RiskLevel {
    match risk {
        RiskLevel::Low => RiskLevel::Medium,
        RiskLevel::Medium => RiskLevel::High,
        RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
    }
}

/// Derive the recommended inspection interval and risk level.
pub fn recommend(input: &RbiInput, policy: &Policy) -> Result<RbiOutcome, EngineError> {
    let mut rationale = Vec::new();
    let cap = policy.statutory_cap(input.kind);

    // Base interval: half the remaining life, capped by statute
    let base = match input.remaining_life {
        RemainingLife::Indefinite => {
            rationale.push(format!(
                "no measurable wall loss; base interval at the statutory {} cap of {cap} years",
                input.kind
            ));
            cap
        }
        RemainingLife::Finite(life) => {
            let half = numeric::div(life, Decimal::TWO)?;
            let base = half.min(cap);
            rationale.push(format!(
                "base interval min(remaining life {life} / 2, statutory cap {cap}) = {base} years"
            ));
            base
        }
    };

    // Consequence weighting
    let weight = policy.consequence_weight(input.consequence);
    let weighted = numeric::mul(base, weight)?;
    if weight != Decimal::ONE {
        rationale.push(format!(
            "{:?} consequence weighting x{weight} applied",
            input.consequence
        ));
    }

    // Presentation: round down to the half year, never below the floor
    let mut interval = floor_to_half(weighted)?.max(policy.intervals.floor_years);

    // Probability-of-failure banding
    let life = input.remaining_life.as_finite();
    let mut risk = if life.is_some_and(|l| l < policy.risk_banding.critical_life_years) {
        RiskLevel::Critical
    } else if input.rsf < policy.limits.rsf_allowable
        || life.is_some_and(|l| l < policy.risk_banding.high_life_years)
    {
        RiskLevel::High
    } else if life.is_some_and(|l| l < policy.risk_banding.medium_life_years) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if input.consequence == ConsequenceTier::Critical && risk < RiskLevel::Critical {
        risk = bump(risk);
        rationale.push("critical consequence tier raises the risk level one band".to_string());
    }

    // Degraded-RSF clamp
    if input.rsf < policy.limits.rsf_allowable {
        let clamp = policy.intervals.degraded_rsf_years;
        if interval > clamp {
            interval = clamp;
        }
        risk = risk.max(RiskLevel::High);
        rationale.push(format!(
            "RSF {} below allowable {}; interval clamped to {clamp} years",
            input.rsf, policy.limits.rsf_allowable
        ));
    }

    // Short-life escalation
    let mut requires_immediate_review = false;
    if let Some(l) = life {
        if l < policy.risk_banding.critical_life_years {
            risk = RiskLevel::Critical;
            requires_immediate_review = true;
            rationale.push(format!(
                "remaining life {l} years below {}; immediate engineering review required",
                policy.risk_banding.critical_life_years
            ));
        }
    }

    Ok(RbiOutcome {
        interval_years: interval,
        risk,
        requires_immediate_review,
        rationale,
    })
}
