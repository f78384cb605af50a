//! Assessment Orchestrator
//!
//! Pure coordinator for one FFS job: resolve properties, validate, run
//! the dual-path calculation, project the corrosion trend and remaining
//! life, derive the RBI interval, assemble the result and append exactly
//! one audit entry.
//!
//! Guarantees:
//! - fatal issues abort before any arithmetic
//! - cancellation is honored only at component boundaries, never after
//!   the audit append
//! - per-component soft budgets fail the job with `BudgetExceeded`
//!   before anything is audited
//! - no error path ever returns a best-effort safety number

pub mod confidence;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{AuditStore, PendingAuditEntry};
use crate::calc::{self, CalcInput, CalcOutputs};
use crate::error::EngineError;
use crate::numeric;
use crate::policy::Policy;
use crate::properties::MaterialLibrary;
use crate::rbi::{self, RbiInput};
use crate::trend::{self, LifeProjection};
use crate::types::{
    AuditMetadata, AssessmentOutcome, CalculationResult, Fitness, Job, RemainingLife,
};
use crate::validation;

pub use confidence::{score as score_confidence, ConfidenceFactors};

/// Wires the property resolver, validator, calculator, analyzer, RBI
/// engine and audit log for single jobs. Stateless between jobs apart
/// from the injected shared resources.
pub struct Orchestrator {
    policy: Policy,
    materials: Arc<MaterialLibrary>,
    audit: Arc<dyn AuditStore>,
}

impl Orchestrator {
    pub fn new(policy: Policy, materials: Arc<MaterialLibrary>, audit: Arc<dyn AuditStore>) -> Self {
        Self {
            policy,
            materials,
            audit,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit.as_ref()
    }

    /// Assess one job to completion.
    pub fn assess(&self, job: &Job) -> Result<CalculationResult, EngineError> {
        self.assess_with_cancel(job, None)
    }

    /// Assess one job, honoring cancellation at component boundaries.
    pub fn assess_with_cancel(
        &self,
        job: &Job,
        cancel: Option<&CancellationToken>,
    ) -> Result<CalculationResult, EngineError> {
        let calculation_id = Uuid::new_v4();
        info!(
            tag = %job.equipment.tag,
            kind = job.equipment.kind.short_code(),
            %calculation_id,
            "starting Level 1 assessment"
        );

        // C2: property resolution
        boundary(cancel, "property resolution")?;
        let started = Instant::now();
        let resolved = self.materials.resolve(&job.material, &job.equipment)?;
        budget("property resolution", started, self.policy.budgets.resolve_ms)?;

        // C3: validation; fatals abort before arithmetic
        boundary(cancel, "validation")?;
        let started = Instant::now();
        let mut warnings =
            validation::validate_job(job, &resolved, &self.policy).into_result()?;
        budget("validation", started, self.policy.budgets.validate_ms)?;

        // C5 (rate stage): the future corrosion allowance feeds C4
        boundary(cancel, "trend analysis")?;
        let started = Instant::now();
        let series = trend::governing_series(&job.inspections);
        let estimate = trend::corrosion_rate(&series, &self.policy)?;
        let has_trend = estimate.is_some();
        let selected_rate = estimate
            .as_ref()
            .map(|e| e.selected(job.options.confidence))
            .unwrap_or(Decimal::ZERO);
        if !has_trend {
            warnings.push(
                "fewer than two inspections; corrosion rate assumed zero and regression skipped"
                    .to_string(),
            );
        }
        // A negative band edge would grow the wall; the allowance never
        // projects below zero loss
        let horizon = Decimal::from(job.options.future_corrosion_years);
        let fca = numeric::mul(selected_rate.max(Decimal::ZERO), horizon)?;
        budget("trend analysis", started, self.policy.budgets.trend_ms)?;

        // C4: dual-path calculation
        boundary(cancel, "calculation")?;
        let started = Instant::now();
        let measured_min = series
            .last()
            .map(|p| p.thickness)
            .ok_or_else(|| EngineError::invalid("inspections", "no governing reading"))?;
        let calc_input = CalcInput {
            kind: job.equipment.kind,
            level: job.options.assessment_level,
            properties: &resolved,
            design_pressure: job.equipment.design_pressure,
            joint_efficiency: job.equipment.joint_efficiency,
            nominal_thickness: job.equipment.nominal_thickness,
            measured_min,
            fca,
        };
        let outputs = calc::evaluate(&calc_input, &self.policy)?;
        budget("calculation", started, self.policy.budgets.calculate_ms)?;

        // C5 (life stage)
        boundary(cancel, "life projection")?;
        let started = Instant::now();
        let projection =
            trend::remaining_life(measured_min, outputs.t_min.accepted, selected_rate, &self.policy)?;
        warnings.extend(projection.warnings.iter().cloned());
        budget("trend analysis", started, self.policy.budgets.trend_ms)?;

        self.collect_margin_warnings(job, &outputs, horizon, &mut warnings);

        // C6: RBI interval
        boundary(cancel, "interval derivation")?;
        let started = Instant::now();
        let rbi_out = rbi::recommend(
            &RbiInput {
                kind: job.equipment.kind,
                consequence: job.options.consequence,
                rsf: outputs.rsf.accepted,
                remaining_life: projection.remaining,
            },
            &self.policy,
        )?;
        budget("interval derivation", started, self.policy.budgets.rbi_ms)?;

        let fitness = self.determine_fitness(&outputs, &projection);

        let missing_previous = job
            .inspections
            .last()
            .is_some_and(|insp| insp.readings.iter().any(|r| r.previous_measured.is_none()));
        let confidence_score = confidence::score(
            &ConfidenceFactors {
                inspection_count: job.inspections.len(),
                missing_previous,
                warning_count: warnings.len(),
                has_trend,
            },
            &self.policy,
        )?;

        let outcome = AssessmentOutcome {
            t_min: numeric::round_thickness(outputs.t_min.accepted),
            mawp: numeric::round_pressure(outputs.mawp.accepted),
            rsf: numeric::round_ratio(outputs.rsf.accepted),
            corrosion_rate_in_per_year: numeric::round_thickness(selected_rate),
            remaining_life_years: projection.remaining,
            next_inspection_years: rbi_out.interval_years,
            fitness,
            risk: rbi_out.risk,
            requires_immediate_review: rbi_out.requires_immediate_review,
            confidence: confidence_score,
            warnings: warnings.clone(),
            rationale: rbi_out.rationale.clone(),
        };
        debug!(
            t_min = %outcome.t_min,
            mawp = %outcome.mawp,
            rsf = %outcome.rsf,
            fitness = %outcome.fitness,
            "assessment computed"
        );

        // C7: exactly one audit append; the job is final past this point
        boundary(cancel, "audit append")?;
        let performed_at = Utc::now();
        let performer = job
            .inspections
            .last()
            .map(|insp| insp.inspector_certification.clone())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let entry = self.audit.append(PendingAuditEntry {
            calculation_id,
            performed_at,
            performer: performer.clone(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            calculation_method_version: self.policy.service.calculation_method_version.clone(),
            inputs: serde_json::to_value(job)?,
            outputs: serde_json::to_value(&outcome)?,
            metadata: AuditMetadata {
                equipment_tag: job.equipment.tag.clone(),
                provenance: resolved.provenance.clone(),
            },
        })?;
        info!(
            %calculation_id,
            sequence = entry.sequence,
            chain_hash = %entry.chain_hash,
            fitness = %outcome.fitness,
            risk = %outcome.risk,
            "assessment audited"
        );

        Ok(CalculationResult {
            calculation_id,
            performed_at,
            performer,
            equipment_tag: job.equipment.tag.clone(),
            inputs: job.clone(),
            outcome,
            input_hash: entry.input_hash,
            output_hash: entry.output_hash,
            chain_hash: entry.chain_hash,
        })
    }

    fn collect_margin_warnings(
        &self,
        job: &Job,
        outputs: &CalcOutputs,
        horizon: Decimal,
        warnings: &mut Vec<String>,
    ) {
        if outputs.rsf.accepted < self.policy.limits.rsf_allowable {
            warnings.push(format!(
                "RSF {} below {}",
                numeric::round_ratio(outputs.rsf.accepted),
                self.policy.limits.rsf_allowable
            ));
        }
        if outputs.t_eff <= outputs.t_min.accepted {
            warnings.push(format!(
                "projected effective thickness {} in at or below required {} in over the \
                 {horizon}-year horizon",
                numeric::round_thickness(outputs.t_eff),
                numeric::round_thickness(outputs.t_min.accepted),
            ));
        }
        if outputs.mawp.accepted < job.equipment.design_pressure {
            warnings.push(format!(
                "MAWP {} psi below design pressure {} psi",
                numeric::round_pressure(outputs.mawp.accepted),
                job.equipment.design_pressure
            ));
        }
    }

    fn determine_fitness(&self, outputs: &CalcOutputs, projection: &LifeProjection) -> Fitness {
        if projection.unfit_hint || outputs.t_eff <= outputs.t_min.accepted {
            return Fitness::Unfit;
        }
        if let RemainingLife::Finite(life) = projection.remaining {
            if life < self.policy.fitness.unfit_life_years {
                return Fitness::Unfit;
            }
        }
        if outputs.rsf.accepted < self.policy.limits.rsf_allowable {
            return Fitness::Conditional;
        }
        if let RemainingLife::Finite(life) = projection.remaining {
            if life < self.policy.fitness.conditional_life_years {
                return Fitness::Conditional;
            }
        }
        Fitness::Fit
    }
}

fn boundary(cancel: Option<&CancellationToken>, component: &'static str) -> Result<(), EngineError> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(EngineError::Cancelled { component });
    }
    Ok(())
}

fn budget(component: &'static str, started: Instant, budget_ms: u64) -> Result<(), EngineError> {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if elapsed_ms > budget_ms {
        return Err(EngineError::BudgetExceeded {
            component,
            elapsed_ms,
            budget_ms,
        });
    }
    Ok(())
}
