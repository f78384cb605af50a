//! Input Validator
//!
//! Range checks, cross-field checks, string sanitization and
//! physical-plausibility screening for assessment jobs. Issues are
//! structured and categorized Fatal or Warning: fatals abort the job
//! before any arithmetic, warnings propagate into the result and the
//! audit entry.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::policy::Policy;
use crate::trend::years_between;
use crate::types::{Job, ResolvedProperties};

/// Conservative identifier whitelist shared by tags, CML ids, locations
/// and inspector certifications.
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z0-9\-_/ .]{1,64}$").expect("identifier whitelist pattern is valid")
    })
}

// ============================================================================
// Issues
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueSeverity {
    Fatal,
    Warning,
}

/// One structured validation finding tied to an input field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub severity: IssueSeverity,
}

impl ValidationIssue {
    pub fn fatal(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: IssueSeverity::Fatal,
        }
    }

    pub fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            severity: IssueSeverity::Warning,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == IssueSeverity::Fatal
    }
}

/// All findings for one job, fatal and warning together.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_fatal)
    }

    /// Warning messages in input order, for result/audit propagation.
    pub fn warning_messages(&self) -> Vec<String> {
        self.issues
            .iter()
            .filter(|i| !i.is_fatal())
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect()
    }

    /// Fatals abort the job; warnings ride along with the result.
    pub fn into_result(self) -> Result<Vec<String>, EngineError> {
        if self.has_fatal() {
            let mut issues = self.issues;
            issues.sort_by_key(|i| !i.is_fatal());
            Err(EngineError::InputInvalid { issues })
        } else {
            Ok(self.warning_messages())
        }
    }

    fn push_fatal(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::fatal(field, message));
    }

    fn push_warning(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::warning(field, message));
    }
}

// ============================================================================
// Job validation (entry point)
// ============================================================================

/// Validate a job against the data-model invariants, the resolved
/// properties and the policy plausibility thresholds. Pure: no I/O, no
/// arithmetic on unchecked values beyond comparisons.
pub fn validate_job(
    job: &Job,
    resolved: &ResolvedProperties,
    policy: &Policy,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_identifiers(job, &mut report);
    check_design_ranges(job, &mut report);
    check_geometry(resolved, policy, &mut report);
    check_material_coverage(job, resolved, &mut report);
    check_inspections(job, resolved, &mut report);
    check_corrosion_plausibility(job, policy, &mut report);

    report
}

fn check_identifiers(job: &Job, report: &mut ValidationReport) {
    let re = identifier_pattern();

    if !re.is_match(&job.equipment.tag) {
        report.push_fatal(
            "equipment.tag",
            format!(
                "'{}' fails the identifier whitelist [A-Z0-9-_/ .] (1-64 chars)",
                job.equipment.tag
            ),
        );
    }

    for (i, insp) in job.inspections.iter().enumerate() {
        if !re.is_match(&insp.inspector_certification) {
            report.push_fatal(
                &format!("inspections[{i}].inspectorCertification"),
                "fails the identifier whitelist",
            );
        }
        for (j, reading) in insp.readings.iter().enumerate() {
            if !re.is_match(&reading.cml_id) {
                report.push_fatal(
                    &format!("inspections[{i}].readings[{j}].cmlId"),
                    "fails the identifier whitelist",
                );
            }
            if !re.is_match(&reading.location) {
                report.push_fatal(
                    &format!("inspections[{i}].readings[{j}].location"),
                    "fails the identifier whitelist",
                );
            }
        }
    }
}

fn check_design_ranges(job: &Job, report: &mut ValidationReport) {
    let eq = &job.equipment;

    if eq.design_pressure < dec!(-14.7) || eq.design_pressure > dec!(10000) {
        report.push_fatal(
            "equipment.designPressure",
            format!(
                "{} psi outside supported range [-14.7, 10000]",
                eq.design_pressure
            ),
        );
    }
    if eq.design_temperature < dec!(-320) || eq.design_temperature > dec!(1500) {
        report.push_fatal(
            "equipment.designTemperature",
            format!(
                "{} °F outside supported range [-320, 1500]",
                eq.design_temperature
            ),
        );
    }
    if eq.nominal_thickness <= Decimal::ZERO {
        report.push_fatal(
            "equipment.nominalThickness",
            format!("{} in must be positive", eq.nominal_thickness),
        );
    }
    if eq.corrosion_allowance < Decimal::ZERO {
        report.push_fatal(
            "equipment.corrosionAllowance",
            format!("{} in cannot be negative", eq.corrosion_allowance),
        );
    }
    if eq.joint_efficiency <= Decimal::ZERO || eq.joint_efficiency > Decimal::ONE {
        report.push_fatal(
            "equipment.jointEfficiency",
            format!("{} must be in (0, 1]", eq.joint_efficiency),
        );
    }
}

fn check_geometry(resolved: &ResolvedProperties, policy: &Policy, report: &mut ValidationReport) {
    let g = &resolved.geometry;

    if g.internal_diameter >= g.external_diameter {
        report.push_fatal(
            "equipment.internalDiameter",
            format!(
                "ID {} in must be below OD {} in",
                g.internal_diameter, g.external_diameter
            ),
        );
        // Derived wall/ratio checks are meaningless past this point
        return;
    }
    if g.nominal_wall < policy.limits.min_wall {
        report.push_fatal(
            "equipment.externalDiameter",
            format!(
                "wall {} in from diameters is below the structural minimum {} in",
                g.nominal_wall, policy.limits.min_wall
            ),
        );
    }
    // ID/OD >= 0.5 keeps the geometry inside the thin-shell family
    if let Some(ratio) = g
        .internal_diameter
        .checked_div(g.external_diameter)
    {
        if ratio < dec!(0.5) {
            report.push_fatal(
                "equipment.internalDiameter",
                format!("ID/OD ratio {ratio} is below 0.5"),
            );
        }
    }
}

fn check_material_coverage(
    job: &Job,
    resolved: &ResolvedProperties,
    report: &mut ValidationReport,
) {
    let t = job.equipment.design_temperature;
    if t < resolved.coverage_min || t > resolved.coverage_max {
        report.push_fatal(
            "equipment.designTemperature",
            format!(
                "{} °F outside {} coverage [{}, {}] °F",
                t, resolved.material, resolved.coverage_min, resolved.coverage_max
            ),
        );
    }
}

fn check_inspections(job: &Job, resolved: &ResolvedProperties, report: &mut ValidationReport) {
    if job.inspections.is_empty() {
        report.push_fatal("inspections", "at least one inspection is required");
        return;
    }

    for pair in job.inspections.windows(2) {
        if pair[1].date <= pair[0].date {
            report.push_fatal(
                "inspections",
                format!(
                    "series must be chronological and strictly increasing ({} then {})",
                    pair[0].date, pair[1].date
                ),
            );
        }
    }

    let id = resolved.geometry.internal_diameter;
    let nominal = job.equipment.nominal_thickness;

    for (i, insp) in job.inspections.iter().enumerate() {
        if insp.readings.is_empty() {
            report.push_fatal(
                &format!("inspections[{i}].readings"),
                "inspection has no thickness readings",
            );
            continue;
        }

        let mut seen = std::collections::HashSet::new();
        for (j, reading) in insp.readings.iter().enumerate() {
            let field = format!("inspections[{i}].readings[{j}]");

            if !seen.insert(reading.cml_id.as_str()) {
                report.push_fatal(
                    &format!("{field}.cmlId"),
                    format!("duplicate CML '{}' within inspection", reading.cml_id),
                );
            }
            if reading.measured <= Decimal::ZERO {
                report.push_fatal(
                    &format!("{field}.measured"),
                    format!("{} in must be positive", reading.measured),
                );
                continue;
            }
            if reading.measured >= id {
                report.push_fatal(
                    &format!("{field}.measured"),
                    format!(
                        "{} in is not physically possible for an ID of {} in",
                        reading.measured, id
                    ),
                );
            }
            if reading.measured > nominal {
                report.push_warning(
                    &format!("{field}.measured"),
                    format!(
                        "{} in exceeds the nominal thickness {} in",
                        reading.measured, nominal
                    ),
                );
            }
            if let Some(previous) = reading.previous_measured {
                if previous <= Decimal::ZERO {
                    report.push_fatal(
                        &format!("{field}.previousMeasured"),
                        format!("{previous} in must be positive"),
                    );
                } else if previous < reading.measured {
                    report.push_warning(
                        &format!("{field}.previousMeasured"),
                        format!(
                            "previous {} in below current {} in suggests apparent wall growth; \
                             verify CML pairing",
                            previous, reading.measured
                        ),
                    );
                }
            }
        }
    }
}

/// Screen inspection-to-inspection governing rates against the
/// physically-possible bounds. > rate_fatal is a rejection; > rate_warning
/// rides along as a warning.
fn check_corrosion_plausibility(job: &Job, policy: &Policy, report: &mut ValidationReport) {
    let minima: Vec<(usize, chrono::NaiveDate, Decimal)> = job
        .inspections
        .iter()
        .enumerate()
        .filter_map(|(i, insp)| insp.minimum_reading().map(|r| (i, insp.date, r.measured)))
        .collect();

    for pair in minima.windows(2) {
        let (_, d0, t0) = pair[0];
        let (i1, d1, t1) = pair[1];
        let Ok(delta_years) = years_between(d0, d1) else {
            continue;
        };
        if delta_years <= Decimal::ZERO {
            continue; // chronology issues are reported separately
        }
        let Some(loss) = t0.checked_sub(t1) else {
            continue;
        };
        let Some(rate) = loss.checked_div(delta_years) else {
            continue;
        };
        if rate > policy.limits.rate_fatal {
            report.push_fatal(
                &format!("inspections[{i1}]"),
                format!(
                    "implied corrosion rate {rate} in/yr exceeds the physically possible \
                     {} in/yr",
                    policy.limits.rate_fatal
                ),
            );
        } else if rate > policy.limits.rate_warning {
            report.push_warning(
                &format!("inspections[{i1}]"),
                format!(
                    "implied corrosion rate {rate} in/yr is unusually aggressive \
                     (above {} in/yr)",
                    policy.limits.rate_warning
                ),
            );
        }
    }
}
