//! Assessment service: the typed external surface
//!
//! Wraps the orchestrator with a bounded worker pool. Each job runs
//! end-to-end on one blocking worker; excess jobs wait FIFO on a fair
//! semaphore. Property tables are read-only shared state; the audit
//! stream serializes its own appends. There are no retries here — the
//! caller decides what to do with a failed job.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audit::{AuditStore, VerifyOutcome};
use crate::error::EngineError;
use crate::orchestrator::Orchestrator;
use crate::policy::Policy;
use crate::properties::MaterialLibrary;
use crate::types::{AuditEntry, CalculationResult, Job};

/// Transport-agnostic RPC-style facade: `assess`, `get_audit`,
/// `verify_audit`. Cheap to clone.
#[derive(Clone)]
pub struct AssessmentService {
    orchestrator: Arc<Orchestrator>,
    limiter: Arc<Semaphore>,
}

impl AssessmentService {
    pub fn new(
        policy: Policy,
        materials: Arc<MaterialLibrary>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        let max_in_flight = policy.service.max_in_flight_jobs;
        Self {
            orchestrator: Arc::new(Orchestrator::new(policy, materials, audit)),
            limiter: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Assess a job on the worker pool. Waits FIFO when the pool is
    /// saturated.
    pub async fn assess(&self, job: Job) -> Result<CalculationResult, EngineError> {
        self.assess_cancellable(job, CancellationToken::new()).await
    }

    /// Assess with a cancellation token, honored at component boundaries
    /// only; a job that reached its audit append always completes.
    pub async fn assess_cancellable(
        &self,
        job: Job,
        cancel: CancellationToken,
    ) -> Result<CalculationResult, EngineError> {
        let permit = self
            .limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EngineError::internal(format!("job queue closed: {e}")))?;

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            orchestrator.assess_with_cancel(&job, Some(&cancel))
        })
        .await
        .map_err(|e| EngineError::internal(format!("worker task failed: {e}")))?
    }

    /// Synchronous assessment for CLI and test callers that own no
    /// runtime.
    pub fn assess_blocking(&self, job: &Job) -> Result<CalculationResult, EngineError> {
        self.orchestrator.assess(job)
    }

    /// Latest audit entry for a calculation id.
    pub fn get_audit(&self, calculation_id: Uuid) -> Result<Option<AuditEntry>, EngineError> {
        self.orchestrator.audit_store().get(calculation_id)
    }

    /// Verify the audit chain over a sequence range, or the whole stream.
    pub fn verify_audit(
        &self,
        range: Option<(u64, u64)>,
    ) -> Result<VerifyOutcome, EngineError> {
        match range {
            Some((start, end)) => self.orchestrator.audit_store().verify_range(start, end),
            None => self.orchestrator.audit_store().verify_all(),
        }
    }

    pub fn policy(&self) -> &Policy {
        self.orchestrator.policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryAuditStore;
    use crate::types::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn service(max_in_flight: usize) -> AssessmentService {
        let mut policy = Policy::default();
        policy.service.max_in_flight_jobs = max_in_flight;
        AssessmentService::new(
            policy,
            Arc::new(MaterialLibrary::builtin()),
            Arc::new(InMemoryAuditStore::new()),
        )
    }

    fn job(tag: &str) -> Job {
        let inspection = |y: i32, measured: Decimal| InspectionRecord {
            date: NaiveDate::from_ymd_opt(y, 6, 1).unwrap(),
            inspector_certification: "API-510-12345".to_string(),
            readings: vec![ThicknessReading {
                cml_id: "CML-01".to_string(),
                location: "SHELL".to_string(),
                measured,
                previous_measured: None,
            }],
        };
        Job {
            equipment: Equipment {
                tag: tag.to_string(),
                kind: EquipmentKind::Vessel,
                design_pressure: dec!(150),
                design_temperature: dec!(300),
                nominal_thickness: dec!(0.500),
                corrosion_allowance: dec!(0.125),
                joint_efficiency: dec!(0.85),
                internal_diameter: Some(dec!(48.00)),
                external_diameter: Some(dec!(49.00)),
                length: None,
            },
            material: MaterialRef {
                spec: "SA-516".to_string(),
                grade: "70".to_string(),
            },
            inspections: vec![inspection(2023, dec!(0.4920)), inspection(2025, dec!(0.4780))],
            options: AssessmentOptions::new(),
        }
    }

    #[tokio::test]
    async fn test_assess_and_fetch_audit() {
        let svc = service(4);
        let result = svc.assess(job("V-101")).await.unwrap();
        let entry = svc.get_audit(result.calculation_id).unwrap().unwrap();
        assert_eq!(entry.chain_hash, result.chain_hash);
        assert!(svc.verify_audit(None).unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_saturated_pool_still_completes_all_jobs() {
        let svc = service(2);
        let mut handles = Vec::new();
        for i in 0..8 {
            let svc = svc.clone();
            let tag = format!("V-{i:03}");
            handles.push(tokio::spawn(async move { svc.assess(job(&tag)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        // Every job audited exactly once, on one unbroken chain
        assert!(matches!(
            svc.verify_audit(None).unwrap(),
            VerifyOutcome::Ok { entries_checked: 8 }
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_produces_no_audit() {
        let svc = service(4);
        let token = CancellationToken::new();
        token.cancel();
        let err = svc
            .assess_cancellable(job("V-101"), token)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CANCELLED");
        assert!(matches!(
            svc.verify_audit(None).unwrap(),
            VerifyOutcome::Ok { entries_checked: 0 }
        ));
    }
}
