//! Primary calculation paths: closed-form thin-shell expressions
//!
//! Circumferential (hoop) stress governing, ASME VIII Div.1 UG-27 form.
//! Each function is pure and total over its checked-decimal inputs;
//! invalid denominators fail instead of producing a number.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::numeric;

const POINT_SIX: Decimal = dec!(0.6);

/// Minimum required thickness: `t = P·R / (S·E − 0.6·P)`.
pub fn t_min(
    pressure: Decimal,
    radius: Decimal,
    allowable_stress: Decimal,
    joint_efficiency: Decimal,
) -> Result<Decimal, EngineError> {
    let se = numeric::mul(allowable_stress, joint_efficiency)?;
    let denom = numeric::sub(se, numeric::mul(POINT_SIX, pressure)?)?;
    if denom <= Decimal::ZERO {
        return Err(EngineError::ArithmeticFailure {
            detail: format!(
                "S·E − 0.6·P = {denom} is not positive; pressure {pressure} psi is \
                 beyond the material capability"
            ),
        });
    }
    numeric::div(numeric::mul(pressure, radius)?, denom)
}

/// Maximum allowable working pressure at an effective thickness:
/// `MAWP = S·E·t / (R + 0.6·t)`.
///
/// A non-positive effective thickness has no pressure capacity left and
/// reports zero rather than a negative pressure.
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
    let denom = numeric::add(radius, numeric::mul(POINT_SIX, t_eff)?)?;
    numeric::div(numeric::mul(se, t_eff)?, denom)
}

/// Remaining strength factor, direct expression:
/// `RSF = (t_mm − FCA) / (t_nom − FCA)`, clamped at zero.
///
/// The future corrosion allowance is deducted identically from numerator
/// and denominator; any asymmetry between the two paths is a defect.
/// A horizon that consumes the measured wall (numerator <= 0) or the
/// nominal wall (denominator <= 0) leaves no remaining strength and
/// reports zero. Both paths share these guards.
pub fn rsf(t_mm: Decimal, fca: Decimal, t_nom: Decimal) -> Result<Decimal, EngineError> {
    let margin = numeric::sub(t_mm, fca)?;
    let denom = numeric::sub(t_nom, fca)?;
    if margin <= Decimal::ZERO || denom <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    numeric::div(margin, denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_min_healthy_vessel() {
        // P=150, R=24, S=20000, E=0.85 → 3600 / 16910
        let t = t_min(dec!(150), dec!(24), dec!(20000), dec!(0.85)).unwrap();
        assert_eq!(numeric::round_thickness(t), dec!(0.2129));
    }

    #[test]
    fn test_t_min_rejects_pressure_beyond_material() {
        // S·E = 100·0.5 = 50; 0.6·P = 60 → denominator negative
        let err = t_min(dec!(100), dec!(24), dec!(100), dec!(0.5)).unwrap_err();
        assert_eq!(err.code(), "ARITHMETIC_FAILURE");
    }

    #[test]
    fn test_mawp_healthy_vessel() {
        // t_eff = 0.478 − 0.070 = 0.408
        let p = mawp(dec!(20000), dec!(0.85), dec!(0.408), dec!(24)).unwrap();
        assert_eq!(numeric::round_pressure(p), dec!(286.08));
    }

    #[test]
    fn test_mawp_exhausted_wall_is_zero() {
        let p = mawp(dec!(20000), dec!(0.85), dec!(-0.01), dec!(24)).unwrap();
        assert_eq!(p, Decimal::ZERO);
    }

    #[test]
    fn test_rsf_direct() {
        let r = rsf(dec!(0.478), dec!(0.070), dec!(0.500)).unwrap();
        assert_eq!(numeric::round_ratio(r), dec!(0.9488));
    }

    #[test]
    fn test_rsf_zero_when_fca_consumes_nominal() {
        assert_eq!(rsf(dec!(0.478), dec!(0.600), dec!(0.500)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_rsf_zero_when_fca_consumes_measured() {
        assert_eq!(rsf(dec!(0.220), dec!(0.300), dec!(0.500)).unwrap(), Decimal::ZERO);
    }
}
