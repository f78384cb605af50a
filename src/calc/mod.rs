//! Dual-Path Calculator
//!
//! For each safety formula two independent implementations are evaluated
//! in the decimal kernel and reconciled:
//!
//! - t_min: closed form vs bisection on the pressure-thickness relation
//! - MAWP: closed form vs bisection on pressure
//! - RSF: direct expression vs root-find of the rearranged equation
//!   (one defined formula, identical FCA treatment on both paths)
//!
//! The calculator is stateless per call, dispatches on equipment kind and
//! assessment level, and detects the thick-wall regime rather than ever
//! switching algorithm silently.

pub mod closed_form;
pub mod iterative;
pub mod reconcile;

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::numeric;
use crate::policy::Policy;
use crate::types::{AssessmentLevel, EquipmentKind, ResolvedProperties};

pub use reconcile::{reconcile as reconcile_paths, Reconciled};

/// Inputs for one dual-path evaluation. All values pre-validated.
#[derive(Debug, Clone, Copy)]
pub struct CalcInput<'a> {
    pub kind: EquipmentKind,
    pub level: AssessmentLevel,
    pub properties: &'a ResolvedProperties,
    pub design_pressure: Decimal,
    pub joint_efficiency: Decimal,
    pub nominal_thickness: Decimal,
    /// Governing minimum measured thickness, inches.
    pub measured_min: Decimal,
    /// Future corrosion allowance over the projection horizon, inches.
    pub fca: Decimal,
}

/// Reconciled outputs plus the intermediate quantity the analyzer and
/// audit record need.
#[derive(Debug, Clone)]
pub struct CalcOutputs {
    pub t_min: Reconciled,
    pub mawp: Reconciled,
    pub rsf: Reconciled,
    /// `measured_min − FCA`, inches; may be non-positive for a wall that
    /// will be consumed within the horizon.
    pub t_eff: Decimal,
}

/// Evaluate all Level-1 formulas for one job.
///
/// All four equipment kinds assess as cylindrical shells with hoop stress
/// governing at Level 1; the kind matters to RBI caps, not to the
/// formulas. The dispatch stays explicit so Level 2/3 escalation has a
/// seam to land in.
pub fn evaluate(input: &CalcInput<'_>, policy: &Policy) -> Result<CalcOutputs, EngineError> {
    let AssessmentLevel::Level1 = input.level;
    match input.kind {
        EquipmentKind::Vessel
        | EquipmentKind::Tank
        | EquipmentKind::Piping
        | EquipmentKind::Exchanger => evaluate_cylinder(input, policy),
    }
}

fn evaluate_cylinder(input: &CalcInput<'_>, policy: &Policy) -> Result<CalcOutputs, EngineError> {
    let props = input.properties;
    let radius = props.geometry.internal_radius;
    let stress = props.allowable_stress;
    let efficiency = input.joint_efficiency;

    check_thin_wall(props.geometry.nominal_wall, radius, policy)?;

    let t_eff = numeric::sub(input.measured_min, input.fca)?;

    let t_min = reconcile::reconcile(
        "tMin",
        closed_form::t_min(input.design_pressure, radius, stress, efficiency)?,
        iterative::t_min(
            input.design_pressure,
            radius,
            stress,
            efficiency,
            input.nominal_thickness,
        )?,
        numeric::DUAL_PATH_REL_TOL,
    )?;

    let mawp = reconcile::reconcile(
        "mawp",
        closed_form::mawp(stress, efficiency, t_eff, radius)?,
        iterative::mawp(stress, efficiency, t_eff, radius)?,
        numeric::DUAL_PATH_REL_TOL,
    )?;

    let rsf = reconcile::reconcile(
        "rsf",
        closed_form::rsf(input.measured_min, input.fca, input.nominal_thickness)?,
        iterative::rsf(input.measured_min, input.fca, input.nominal_thickness)?,
        numeric::DUAL_PATH_REL_TOL,
    )?;

    Ok(CalcOutputs {
        t_min,
        mawp,
        rsf,
        t_eff,
    })
}

/// Thin-wall applicability guard: `t/R` beyond the policy limit is out of
/// Level-1 scope and must escalate.
fn check_thin_wall(
    nominal_wall: Decimal,
    radius: Decimal,
    policy: &Policy,
) -> Result<(), EngineError> {
    let ratio = numeric::div(nominal_wall, radius)?;
    let limit = policy.limits.thick_wall_ratio;
    if ratio > limit {
        return Err(EngineError::ThickWallOutOfScope { ratio, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::MaterialLibrary;
    use crate::types::{Equipment, MaterialRef};
    use rust_decimal_macros::dec;

    fn resolved_vessel(id: Decimal, od: Decimal) -> ResolvedProperties {
        let equipment = Equipment {
            tag: "V-101".to_string(),
            kind: EquipmentKind::Vessel,
            design_pressure: dec!(150),
            design_temperature: dec!(300),
            nominal_thickness: dec!(0.500),
            corrosion_allowance: dec!(0.125),
            joint_efficiency: dec!(0.85),
            internal_diameter: Some(id),
            external_diameter: Some(od),
            length: None,
        };
        let material = MaterialRef {
            spec: "SA-516".to_string(),
            grade: "70".to_string(),
        };
        MaterialLibrary::builtin()
            .resolve(&material, &equipment)
            .unwrap()
    }

    #[test]
    fn test_healthy_vessel_outputs() {
        let props = resolved_vessel(dec!(48.00), dec!(49.00));
        let input = CalcInput {
            kind: EquipmentKind::Vessel,
            level: AssessmentLevel::Level1,
            properties: &props,
            design_pressure: dec!(150),
            joint_efficiency: dec!(0.85),
            nominal_thickness: dec!(0.500),
            measured_min: dec!(0.478),
            fca: dec!(0.070),
        };
        let out = evaluate(&input, &Policy::default()).unwrap();

        assert_eq!(numeric::round_thickness(out.t_min.accepted), dec!(0.2129));
        assert_eq!(numeric::round_pressure(out.mawp.accepted), dec!(286.08));
        assert_eq!(numeric::round_ratio(out.rsf.accepted), dec!(0.9488));
        assert_eq!(out.t_eff, dec!(0.408));

        for r in [&out.t_min, &out.mawp, &out.rsf] {
            assert!(
                r.relative_difference <= numeric::DUAL_PATH_REL_TOL,
                "paths disagree: {r:?}"
            );
            assert!(r.accepted <= r.primary && r.accepted <= r.secondary);
        }
    }

    #[test]
    fn test_thick_wall_rejected() {
        // ID 2", OD 3": wall 0.5, R 1.0 → t/R = 0.5
        let props = resolved_vessel(dec!(2.0), dec!(3.0));
        let input = CalcInput {
            kind: EquipmentKind::Vessel,
            level: AssessmentLevel::Level1,
            properties: &props,
            design_pressure: dec!(150),
            joint_efficiency: dec!(0.85),
            nominal_thickness: dec!(0.500),
            measured_min: dec!(0.478),
            fca: dec!(0.070),
        };
        let err = evaluate(&input, &Policy::default()).unwrap_err();
        match err {
            EngineError::ThickWallOutOfScope { ratio, limit } => {
                assert_eq!(ratio, dec!(0.5));
                assert_eq!(limit, dec!(0.1));
            }
            other => panic!("expected ThickWallOutOfScope, got {other:?}"),
        }
    }

    #[test]
    fn test_exhausted_wall_reports_zero_mawp() {
        let props = resolved_vessel(dec!(48.00), dec!(49.00));
        let input = CalcInput {
            kind: EquipmentKind::Vessel,
            level: AssessmentLevel::Level1,
            properties: &props,
            design_pressure: dec!(150),
            joint_efficiency: dec!(0.85),
            nominal_thickness: dec!(0.500),
            measured_min: dec!(0.100),
            fca: dec!(0.200),
        };
        let out = evaluate(&input, &Policy::default()).unwrap();
        assert_eq!(out.mawp.accepted, Decimal::ZERO);
        assert!(out.t_eff < Decimal::ZERO);
        // A wall consumed within the horizon has no remaining strength
        assert_eq!(out.rsf.accepted, Decimal::ZERO);
    }

    #[test]
    fn test_piping_uses_same_cylinder_formulas() {
        let props = resolved_vessel(dec!(48.00), dec!(49.00));
        let mut input = CalcInput {
            kind: EquipmentKind::Piping,
            level: AssessmentLevel::Level1,
            properties: &props,
            design_pressure: dec!(150),
            joint_efficiency: dec!(0.85),
            nominal_thickness: dec!(0.500),
            measured_min: dec!(0.478),
            fca: dec!(0.070),
        };
        let piping = evaluate(&input, &Policy::default()).unwrap();
        input.kind = EquipmentKind::Vessel;
        let vessel = evaluate(&input, &Policy::default()).unwrap();
        assert_eq!(piping.t_min.accepted, vessel.t_min.accepted);
    }
}
