//! INTEGRA: Fitness-For-Service Assessment Engine
//!
//! Level 1 FFS assessments of in-service pressure equipment per
//! API 579-1/ASME FFS-1: minimum required thickness, MAWP, remaining
//! strength factor, corrosion trend and remaining life, and an API
//! 580/581 risk-based inspection interval. Every calculation runs twice
//! through independent paths, reconciles conservatively, and lands in an
//! append-only hash-chained audit log.
//!
//! ## Architecture
//!
//! - **Decimal Kernel**: checked fixed-precision arithmetic; no binary
//!   floats on safety paths
//! - **Property Resolver**: ASME II-D tables with linear interpolation,
//!   extrapolation refused
//! - **Input Validator**: range, cross-field and plausibility checks
//! - **Dual-Path Calculator**: closed form vs bisection per formula
//! - **Trend & Life Analyzer**: regression-banded corrosion rates
//! - **RBI Engine**: interval and risk derivation with rationale
//! - **Audit Log**: SHA-256 chain-of-custody, append-only
//! - **Orchestrator/Service**: one job per worker, bounded FIFO pool

pub mod audit;
pub mod calc;
pub mod error;
pub mod numeric;
pub mod orchestrator;
pub mod policy;
pub mod properties;
pub mod rbi;
pub mod service;
pub mod trend;
pub mod types;
pub mod validation;

// Re-export the assessment surface
pub use error::EngineError;
pub use orchestrator::Orchestrator;
pub use policy::Policy;
pub use properties::MaterialLibrary;
pub use service::AssessmentService;

// Re-export commonly used types
pub use types::{
    AssessmentOptions, AuditEntry, CalculationResult, ConfidenceSelection, ConsequenceTier,
    Equipment, EquipmentKind, Fitness, InspectionRecord, Job, MaterialRef, RemainingLife,
    RiskLevel, ThicknessReading,
};

// Re-export audit primitives
pub use audit::{AuditStore, InMemoryAuditStore, SledAuditStore, VerifyOutcome};
