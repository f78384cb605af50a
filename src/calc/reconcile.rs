//! Dual-path reconciliation protocol
//!
//! Primary and secondary evaluations of the same formula are compared by
//! relative difference. Within tolerance, the lower (conservative) value
//! is accepted. Beyond tolerance, the job fails with both values in the
//! diagnostic; the engine never returns a safety number the two paths
//! disagree on.

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::EngineError;
use crate::numeric;

/// An accepted dual-path value with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub primary: Decimal,
    pub secondary: Decimal,
    /// The conservative `min(primary, secondary)`.
    pub accepted: Decimal,
    pub relative_difference: Decimal,
}

/// Reconcile one formula's two paths under the policy tolerance.
pub fn reconcile(
    formula: &str,
    primary: Decimal,
    secondary: Decimal,
    tolerance: Decimal,
) -> Result<Reconciled, EngineError> {
    let relative_difference = numeric::relative_difference(primary, secondary)?;

    if relative_difference > tolerance {
        warn!(
            formula,
            %primary,
            %secondary,
            %relative_difference,
            "dual-path divergence"
        );
        return Err(EngineError::DualPathDivergence {
            formula: formula.to_string(),
            primary,
            secondary,
            relative_difference,
        });
    }

    Ok(Reconciled {
        primary,
        secondary,
        accepted: primary.min(secondary),
        relative_difference,
    })
}
