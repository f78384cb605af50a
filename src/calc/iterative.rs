//! Secondary calculation paths: bisection root-finding
//!
//! Each safety formula gets a second, genuinely independent evaluation by
//! solving its defining equation numerically instead of evaluating the
//! rearranged closed form. Agreement between the two paths is then a real
//! cross-check rather than an algebraic identity.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::numeric;

/// Absolute convergence tolerance for thickness roots, inches.
pub const THICKNESS_ROOT_TOL: Decimal = dec!(0.000001);
/// Absolute convergence tolerance for pressure roots, psi.
pub const PRESSURE_ROOT_TOL: Decimal = dec!(0.000001);
/// Absolute convergence tolerance for ratio roots.
pub const RATIO_ROOT_TOL: Decimal = dec!(0.0000001);
/// Iteration cap; bisection halves the bracket each pass, so hitting the
/// cap means the bracket or the function is wrong.
pub const MAX_ITERATIONS: u32 = 200;

/// Bisection on a monotone continuous function over `[lo, hi]`.
///
/// Requires a sign change across the bracket. Converges when the half
/// bracket width drops below `tol` or an exact root is hit.
fn bisect<F>(f: F, mut lo: Decimal, mut hi: Decimal, tol: Decimal) -> Result<Decimal, EngineError>
where
    F: Fn(Decimal) -> Result<Decimal, EngineError>,
{
    let mut f_lo = f(lo)?;
    let f_hi = f(hi)?;

    if f_lo.is_zero() {
        return Ok(lo);
    }
    if f_hi.is_zero() {
        return Ok(hi);
    }
    if (f_lo.is_sign_positive() && f_hi.is_sign_positive())
        || (f_lo.is_sign_negative() && f_hi.is_sign_negative())
    {
        return Err(EngineError::ArithmeticFailure {
            detail: format!(
                "bisection bracket [{lo}, {hi}] does not straddle a root \
                 (f(lo) = {f_lo}, f(hi) = {f_hi})"
            ),
        });
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = numeric::div(numeric::add(lo, hi)?, Decimal::TWO)?;
        let f_mid = f(mid)?;

        if f_mid.is_zero() {
            return Ok(mid);
        }
        if f_mid.is_sign_positive() == f_lo.is_sign_positive() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }

        let half_width = numeric::div(numeric::sub(hi, lo)?, Decimal::TWO)?;
        if half_width.abs() <= tol {
            return numeric::div(numeric::add(lo, hi)?, Decimal::TWO);
        }
    }

    Err(EngineError::ArithmeticFailure {
        detail: format!("bisection failed to converge within {MAX_ITERATIONS} iterations"),
    })
}

/// Minimum required thickness by solving `P = S·E·t / (R + 0.6·t)` for
/// `t` on `[0.001, 2·t_nominal]`.
pub fn t_min(
    pressure: Decimal,
    radius: Decimal,
    allowable_stress: Decimal,
    joint_efficiency: Decimal,
    t_nominal: Decimal,
) -> Result<Decimal, EngineError> {
    let se = numeric::mul(allowable_stress, joint_efficiency)?;
    let lo = dec!(0.001);
    let hi = numeric::mul(Decimal::TWO, t_nominal)?;

    bisect(
        |t| {
            let denom = numeric::add(radius, numeric::mul(dec!(0.6), t)?)?;
            let implied = numeric::div(numeric::mul(se, t)?, denom)?;
            numeric::sub(implied, pressure)
        },
        lo,
        hi,
        THICKNESS_ROOT_TOL,
    )
}

/// MAWP by bisecting on pressure until the required thickness at that
/// pressure equals the effective thickness.
///
/// The upper bracket comes from the allowable-stress bound: at
/// `P = S·E·t_eff / R` the required thickness already exceeds `t_eff`,
/// so the root lies inside `[0, S·E·t_eff / R]`.
pub fn mawp(
    allowable_stress: Decimal,
    joint_efficiency: Decimal,
    t_eff: Decimal,
    radius: Decimal,
) -> Result<Decimal, EngineError> {
    if t_eff <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let se = numeric::mul(allowable_stress, joint_efficiency)?;
    let hi = numeric::div(numeric::mul(se, t_eff)?, radius)?;

    bisect(
        |p| {
            // t_required(P) = P·R / (S·E − 0.6·P), positive across the bracket
            let denom = numeric::sub(se, numeric::mul(dec!(0.6), p)?)?;
            if denom <= Decimal::ZERO {
                return Err(EngineError::ArithmeticFailure {
                    detail: format!("pressure {p} psi beyond material capability in bracket"),
                });
            }
            let required = numeric::div(numeric::mul(p, radius)?, denom)?;
            numeric::sub(required, t_eff)
        },
        Decimal::ZERO,
        hi,
        PRESSURE_ROOT_TOL,
    )
}

/// RSF by root-finding the rearranged defining equation
/// `r·(t_nom − FCA) − (t_mm − FCA) = 0`.
///
/// Same formula, the same FCA treatment, and the same degenerate guards
/// as the direct path; only the method differs. The upper bracket starts
/// at 2 and doubles until it straddles the root, so heavily over-nominal
/// readings still resolve.
pub fn rsf(t_mm: Decimal, fca: Decimal, t_nom: Decimal) -> Result<Decimal, EngineError> {
    let margin = numeric::sub(t_mm, fca)?;
    let denom = numeric::sub(t_nom, fca)?;
    if margin <= Decimal::ZERO || denom <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let f = |r: Decimal| numeric::sub(numeric::mul(r, denom)?, margin);

    let mut hi = Decimal::TWO;
    for _ in 0..16 {
        if f(hi)? >= Decimal::ZERO {
            break;
        }
        hi = numeric::mul(hi, Decimal::TWO)?;
    }

    bisect(f, Decimal::ZERO, hi, RATIO_ROOT_TOL)
}
