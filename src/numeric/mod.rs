//! Decimal Kernel
//!
//! The sole arithmetic currency for safety values. All wall thicknesses,
//! pressures, stresses, rates and lives are `rust_decimal::Decimal`
//! (28 significant digits); binary floating point is forbidden on every
//! safety path. Arithmetic is checked: division by zero raises
//! `ArithmeticFailure`, overflow of the working precision raises
//! `PrecisionLoss`. Rounding happens only at presentation boundaries
//! (storage, hashing, tolerance comparison) through the explicit policies
//! below.

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::EngineError;

// ============================================================================
// Tolerances
// ============================================================================

/// Thickness comparison tolerance, inches.
pub const THICKNESS_TOL_IN: Decimal = dec!(0.001);
/// Pressure comparison tolerance, psi.
pub const PRESSURE_TOL_PSI: Decimal = dec!(0.1);
/// Stress comparison tolerance, psi.
pub const STRESS_TOL_PSI: Decimal = dec!(1);
/// Dual-path reconciliation relative tolerance (0.1%).
pub const DUAL_PATH_REL_TOL: Decimal = dec!(0.001);
/// Denominator guard for relative differences.
pub const RELATIVE_EPSILON: Decimal = dec!(0.000000000001);

// ============================================================================
// Checked arithmetic
// ============================================================================

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_add(b).ok_or_else(|| EngineError::PrecisionLoss {
        detail: format!("{a} + {b}"),
    })
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_sub(b).ok_or_else(|| EngineError::PrecisionLoss {
        detail: format!("{a} - {b}"),
    })
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_mul(b).ok_or_else(|| EngineError::PrecisionLoss {
        detail: format!("{a} * {b}"),
    })
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    if b.is_zero() {
        return Err(EngineError::ArithmeticFailure {
            detail: format!("division by zero: {a} / 0"),
        });
    }
    a.checked_div(b).ok_or_else(|| EngineError::PrecisionLoss {
        detail: format!("{a} / {b}"),
    })
}

/// Square root. Negative operands are an arithmetic failure, not NaN.
pub fn sqrt(a: Decimal) -> Result<Decimal, EngineError> {
    if a.is_sign_negative() {
        return Err(EngineError::ArithmeticFailure {
            detail: format!("sqrt of negative value {a}"),
        });
    }
    a.sqrt().ok_or_else(|| EngineError::PrecisionLoss {
        detail: format!("sqrt({a})"),
    })
}

// ============================================================================
// Presentation rounding
// ============================================================================

/// Thickness: 4 fractional digits, round half even.
pub fn round_thickness(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven)
}

/// Pressure: 2 fractional digits, round half even.
pub fn round_pressure(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Stress: whole psi, round half even.
pub fn round_stress(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
}

/// Remaining life: 1 fractional digit, rounded toward zero.
/// Rounding a remaining life up would overstate the safe operating
/// window, so half-even is not acceptable here.
pub fn round_life(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(1, RoundingStrategy::ToZero)
}

/// Ratios (RSF, R², confidence factors): 4 fractional digits, half even.
pub fn round_ratio(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven)
}

/// Confidence score: 2 fractional digits, half even.
pub fn round_confidence(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

// ============================================================================
// Comparisons
// ============================================================================

/// Absolute-tolerance equality at a presentation boundary.
pub fn within(a: Decimal, b: Decimal, tol: Decimal) -> bool {
    match a.checked_sub(b) {
        Some(d) => d.abs() <= tol,
        None => false,
    }
}

/// Relative difference `|p − s| / max(|p|, |s|, ε)` used by dual-path
/// reconciliation.
pub fn relative_difference(p: Decimal, s: Decimal) -> Result<Decimal, EngineError> {
    let num = sub(p, s)?.abs();
    let denom = p.abs().max(s.abs()).max(RELATIVE_EPSILON);
    div(num, denom)
}
