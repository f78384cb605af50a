//! End-to-end assessment scenarios
//!
//! Each test drives the full pipeline (resolve → validate → dual-path
//! calculation → trend/life → RBI → audit) through the public service
//! surface and checks the numbers a reviewer would check.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use integra::audit::{verify_entries, AuditStore, GENESIS_HASH};
use integra::calc::reconcile_paths;
use integra::numeric;
use integra::{
    AssessmentOptions, AssessmentService, ConsequenceTier, Equipment, EquipmentKind, Fitness,
    InMemoryAuditStore, Job, InspectionRecord, MaterialLibrary, MaterialRef, Policy,
    RemainingLife, RiskLevel, ThicknessReading, VerifyOutcome,
};

// ============================================================================
// Fixtures
// ============================================================================

fn vessel_v101() -> Equipment {
    Equipment {
        tag: "V-101".to_string(),
        kind: EquipmentKind::Vessel,
        design_pressure: dec!(150),
        design_temperature: dec!(300),
        nominal_thickness: dec!(0.500),
        corrosion_allowance: dec!(0.125),
        joint_efficiency: dec!(0.85),
        internal_diameter: Some(dec!(48.00)),
        external_diameter: Some(dec!(49.00)),
        length: None,
    }
}

fn sa_516_70() -> MaterialRef {
    MaterialRef {
        spec: "SA-516".to_string(),
        grade: "70".to_string(),
    }
}

fn inspection(
    date: (i32, u32, u32),
    measured: Decimal,
    previous: Option<Decimal>,
) -> InspectionRecord {
    InspectionRecord {
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        inspector_certification: "API-510-12345".to_string(),
        readings: vec![ThicknessReading {
            cml_id: "CML-01".to_string(),
            location: "SHELL EAST".to_string(),
            measured,
            previous_measured: previous,
        }],
    }
}

fn job_with(inspections: Vec<InspectionRecord>) -> Job {
    Job {
        equipment: vessel_v101(),
        material: sa_516_70(),
        inspections,
        options: AssessmentOptions::new(),
    }
}

fn service() -> (AssessmentService, Arc<InMemoryAuditStore>) {
    let audit = Arc::new(InMemoryAuditStore::new());
    let svc = AssessmentService::new(
        Policy::default(),
        Arc::new(MaterialLibrary::builtin()),
        audit.clone(),
    );
    (svc, audit)
}

// ============================================================================
// Scenario 1: Healthy vessel
// ============================================================================

#[tokio::test]
async fn healthy_vessel_fit_low_risk() {
    let (svc, audit) = service();
    let job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.4920), None),
        inspection((2025, 6, 1), dec!(0.4780), Some(dec!(0.4920))),
    ]);

    let result = svc.assess(job).await.unwrap();
    let out = &result.outcome;

    assert_eq!(out.t_min, dec!(0.2129));
    assert_eq!(out.rsf, dec!(0.9488));
    assert_eq!(out.corrosion_rate_in_per_year, dec!(0.0070));
    assert_eq!(out.remaining_life_years, RemainingLife::Finite(dec!(37.8)));
    // min(37.8/2, 10) = 10, Medium consequence ×0.75 = 7.5
    assert_eq!(out.next_inspection_years, dec!(7.5));
    assert_eq!(out.fitness, Fitness::Fit);
    assert_eq!(out.risk, RiskLevel::Low);
    assert!(!out.requires_immediate_review);
    assert!(out.warnings.is_empty(), "warnings: {:?}", out.warnings);

    // MAWP well above design pressure for this wall
    assert!(out.mawp > dec!(280) && out.mawp < dec!(290), "MAWP {}", out.mawp);

    // Two inspections: short-history penalties only
    assert_eq!(out.confidence, dec!(0.80));

    // Exactly one audit entry, verifiable from genesis
    assert_eq!(audit.len().unwrap(), 1);
    assert!(svc.verify_audit(None).unwrap().is_ok());
}

// ============================================================================
// Scenario 2: Borderline RSF
// ============================================================================

#[tokio::test]
async fn borderline_rsf_caps_interval_at_two_years() {
    let (svc, _) = service();
    // Near-flat wall loss so the degraded RSF is the only active rule.
    // The classic worked example for this case (0.230" after 0.260" a
    // year earlier) cannot show the RSF clamp in isolation: its own rate
    // implies a remaining life below two years, and the short-life
    // escalation then outranks the clamp — see the companion test below.
    let job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.2315), None),
        inspection((2025, 6, 1), dec!(0.2300), Some(dec!(0.2315))),
    ]);

    let result = svc.assess(job).await.unwrap();
    let out = &result.outcome;

    assert_eq!(out.rsf, dec!(0.4518));
    assert!(out.rsf < dec!(0.90));
    assert_eq!(out.next_inspection_years, dec!(2.0));
    assert_eq!(out.risk, RiskLevel::High);
    assert!(!out.requires_immediate_review);
    assert_eq!(out.fitness, Fitness::Conditional);
    assert!(
        out.warnings.iter().any(|w| w.contains("RSF") && w.contains("below")),
        "warnings: {:?}",
        out.warnings
    );
}

#[tokio::test]
async fn borderline_rsf_with_fast_loss_escalates_past_the_clamp() {
    let (svc, _) = service();
    // The classic borderline-RSF inputs taken literally: 0.030" lost in
    // one year against a 0.017" margin over t_min. That rate leaves a
    // remaining life of 0.5 years, so the short-life rule (life < 2y →
    // Critical, immediate review) governs and the 2.0-year RSF clamp is
    // academic. The ten-year projection also consumes the wall entirely.
    let job = job_with(vec![
        inspection((2024, 6, 1), dec!(0.2600), None),
        inspection((2025, 6, 1), dec!(0.2300), Some(dec!(0.2600))),
    ]);

    let result = svc.assess(job).await.unwrap();
    let out = &result.outcome;

    assert_eq!(out.corrosion_rate_in_per_year, dec!(0.0300));
    assert_eq!(out.remaining_life_years, RemainingLife::Finite(dec!(0.5)));
    assert_eq!(out.rsf, Decimal::ZERO);
    assert_eq!(out.mawp, Decimal::ZERO);
    assert_eq!(out.fitness, Fitness::Unfit);
    assert_eq!(out.risk, RiskLevel::Critical);
    assert!(out.requires_immediate_review);
    assert_eq!(out.next_inspection_years, dec!(0.25));
    assert!(
        out.warnings.iter().any(|w| w.contains("RSF") && w.contains("below")),
        "warnings: {:?}",
        out.warnings
    );
}

// ============================================================================
// Scenario 3: Critical remaining life
// ============================================================================

#[tokio::test]
async fn critical_life_unfit_with_immediate_review() {
    let (svc, _) = service();
    // 0.100" lost in two years: ~0.050 in/yr against a thin remaining margin
    let job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.3200), None),
        inspection((2025, 6, 1), dec!(0.2200), Some(dec!(0.3200))),
    ]);

    let result = svc.assess(job).await.unwrap();
    let out = &result.outcome;

    assert_eq!(out.remaining_life_years, RemainingLife::Finite(dec!(0.1)));
    assert_eq!(out.fitness, Fitness::Unfit);
    assert_eq!(out.risk, RiskLevel::Critical);
    assert!(out.requires_immediate_review);
    assert_eq!(out.next_inspection_years, dec!(0.25));
    // The ten-year horizon consumes the wall entirely
    assert_eq!(out.mawp, dec!(0.00));
    assert!(
        out.warnings.iter().any(|w| w.contains("MAWP")),
        "warnings: {:?}",
        out.warnings
    );
}

// ============================================================================
// Scenario 4: Thick-wall rejection
// ============================================================================

#[tokio::test]
async fn thick_wall_geometry_escalates_not_computes() {
    let (svc, audit) = service();
    let mut job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.4920), None),
        inspection((2025, 6, 1), dec!(0.4780), None),
    ]);
    job.equipment.internal_diameter = Some(dec!(2.0));
    job.equipment.external_diameter = Some(dec!(3.0));

    let err = svc.assess(job).await.unwrap_err();
    assert_eq!(err.code(), "THICK_WALL_OUT_OF_SCOPE");
    assert!(err.to_string().contains("0.5"), "message: {err}");
    assert_eq!(audit.len().unwrap(), 0, "no audit entry for a failed job");
}

// ============================================================================
// Scenario 5: Out-of-range material temperature
// ============================================================================

#[tokio::test]
async fn design_temperature_beyond_coverage_fails_without_audit() {
    let (svc, audit) = service();
    let mut job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.4920), None),
        inspection((2025, 6, 1), dec!(0.4780), None),
    ]);
    job.equipment.design_temperature = dec!(900);

    let err = svc.assess(job).await.unwrap_err();
    assert_eq!(err.code(), "OUT_OF_MATERIAL_RANGE");
    assert!(err.to_string().contains("900"), "message: {err}");
    assert!(err.to_string().contains("800"), "message: {err}");
    assert_eq!(audit.len().unwrap(), 0);
}

// ============================================================================
// Scenario 6: Dual-path divergence carries both values
// ============================================================================

#[test]
fn dual_path_divergence_reports_both_values() {
    // A secondary path converging to the wrong value must surface as a
    // divergence diagnostic, never as an accepted number
    let err = reconcile_paths("tMin", dec!(0.2129), dec!(0.2489), numeric::DUAL_PATH_REL_TOL)
        .unwrap_err();
    match err {
        integra::EngineError::DualPathDivergence {
            formula,
            primary,
            secondary,
            relative_difference,
        } => {
            assert_eq!(formula, "tMin");
            assert_eq!(primary, dec!(0.2129));
            assert_eq!(secondary, dec!(0.2489));
            assert!(relative_difference > numeric::DUAL_PATH_REL_TOL);
        }
        other => panic!("expected DualPathDivergence, got {other:?}"),
    }
}

// ============================================================================
// Scenario 7: Audit chain tamper detection
// ============================================================================

#[tokio::test]
async fn tampered_entry_breaks_chain_at_that_entry() {
    let (svc, audit) = service();
    for tag in ["V-101", "V-102", "V-103"] {
        let mut job = job_with(vec![
            inspection((2023, 6, 1), dec!(0.4920), None),
            inspection((2025, 6, 1), dec!(0.4780), None),
        ]);
        job.equipment.tag = tag.to_string();
        svc.assess(job).await.unwrap();
    }

    let mut entries = audit.load_range(0, 2).unwrap();
    // In-place modification of entry 1's outputs
    entries[1].outputs["tMin"] = serde_json::Value::String("0.0001".to_string());

    match verify_entries(&entries, GENESIS_HASH) {
        VerifyOutcome::FirstBadAt { sequence, .. } => assert_eq!(sequence, 1),
        other => panic!("expected FirstBadAt, got {other:?}"),
    }
    // Entries past the break are still readable even though the chain is bad
    assert_eq!(entries[2].sequence, 2);
    assert_eq!(entries[2].metadata.equipment_tag, "V-103");
}

// ============================================================================
// Cross-cutting: serialization precision and options
// ============================================================================

#[tokio::test]
async fn safety_values_serialize_as_exact_strings() {
    let (svc, _) = service();
    let job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.4920), None),
        inspection((2025, 6, 1), dec!(0.4780), None),
    ]);
    let result = svc.assess(job).await.unwrap();

    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"tMin\":\"0.2129\""), "json: {json}");
    assert!(json.contains("\"rsf\":\"0.9488\""), "json: {json}");
    assert!(json.contains("\"remainingLifeYears\":\"37.8\""), "json: {json}");

    // Round trip preserves every declared digit
    let back: integra::CalculationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.outcome.t_min.to_string(), "0.2129");
    assert_eq!(back.outcome.confidence.to_string(), result.outcome.confidence.to_string());
    assert_eq!(back, result);
}

#[tokio::test]
async fn confidence_labels_order_rates_and_lives() {
    // Noisy decline so the regression band is non-degenerate
    let inspections = |_: ()| {
        vec![
            inspection((2021, 6, 1), dec!(0.5000), None),
            inspection((2022, 6, 1), dec!(0.4920), None),
            inspection((2023, 6, 1), dec!(0.4810), None),
            inspection((2024, 6, 1), dec!(0.4740), None),
            inspection((2025, 6, 1), dec!(0.4600), None),
        ]
    };

    let (svc, _) = service();
    let mut conservative_job = job_with(inspections(()));
    conservative_job.options.confidence = integra::ConfidenceSelection::Conservative;
    let conservative = svc.assess(conservative_job).await.unwrap();

    let mut optimistic_job = job_with(inspections(()));
    optimistic_job.options.confidence = integra::ConfidenceSelection::Optimistic;
    let optimistic = svc.assess(optimistic_job).await.unwrap();

    // conservativeRate <= averageRate <= optimisticRate, so the
    // conservative projection carries the longer remaining life
    assert!(
        conservative.outcome.corrosion_rate_in_per_year
            < optimistic.outcome.corrosion_rate_in_per_year
    );
    let c_life = conservative.outcome.remaining_life_years.as_finite().unwrap();
    let o_life = optimistic.outcome.remaining_life_years.as_finite().unwrap();
    assert!(
        c_life > o_life,
        "conservative rate band projects longer life ({c_life} vs {o_life})"
    );
}

#[tokio::test]
async fn critical_consequence_shrinks_interval() {
    let (svc, _) = service();
    let mut job = job_with(vec![
        inspection((2023, 6, 1), dec!(0.4920), None),
        inspection((2025, 6, 1), dec!(0.4780), None),
    ]);
    job.options.consequence = ConsequenceTier::Critical;

    let result = svc.assess(job).await.unwrap();
    // base 10 × 0.25 = 2.5
    assert_eq!(result.outcome.next_inspection_years, dec!(2.5));
    assert!(result
        .outcome
        .rationale
        .iter()
        .any(|r| r.to_lowercase().contains("consequence")));
}
