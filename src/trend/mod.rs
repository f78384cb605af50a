//! Trend & Life Analyzer
//!
//! Consumes the chronologically ordered governing-CML thickness series
//! and produces corrosion-rate estimates and a remaining-life projection.
//!
//! Three modes:
//! - Point-to-point (exactly 2 inspections): `(prev − curr) / Δyears`
//! - Least-squares regression (3+): slope, intercept, R², standard error
//! - Statistical banding: conservative / average / optimistic rates from
//!   the regression mean ∓ k·SE, k from Student's t at 95% two-sided,
//!   ordered `conservative <= average <= optimistic`
//!
//! Remaining life is `(measuredMin − t_min) / rate`, rounded DOWN to one
//! fractional digit, capped at 100 years. A non-positive rate yields the
//! `indefinite` sentinel, never an infinity.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::EngineError;
use crate::numeric;
use crate::policy::Policy;
use crate::types::{ConfidenceSelection, InspectionRecord, RemainingLife};

/// Fractional years between two dates. Negative when `b` precedes `a`.
pub fn years_between(a: NaiveDate, b: NaiveDate) -> Result<Decimal, EngineError> {
    let days = Decimal::from((b - a).num_days());
    numeric::div(days, dec!(365.25))
}

/// One governing thickness observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThicknessPoint {
    pub date: NaiveDate,
    pub thickness: Decimal,
}

/// Minimum reading per inspection, in series order. Inspections without
/// readings are skipped (the validator has already rejected them).
pub fn governing_series(inspections: &[InspectionRecord]) -> Vec<ThicknessPoint> {
    inspections
        .iter()
        .filter_map(|insp| {
            insp.minimum_reading().map(|r| ThicknessPoint {
                date: insp.date,
                thickness: r.measured,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendMode {
    PointToPoint,
    Regression,
}

/// Least-squares fit of thickness against elapsed years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegressionStats {
    /// in/yr; negative while the wall is thinning.
    pub slope: Decimal,
    /// Thickness intercept at the first inspection date, inches.
    pub intercept: Decimal,
    pub r_squared: Decimal,
    /// Standard error of the slope, in/yr.
    pub std_error: Decimal,
    pub points: usize,
}

/// Banded corrosion-rate estimate. Rates are positive for wall loss;
/// `conservative <= average <= optimistic` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateEstimate {
    pub conservative: Decimal,
    pub average: Decimal,
    pub optimistic: Decimal,
    pub mode: TrendMode,
    pub regression: Option<RegressionStats>,
}

impl RateEstimate {
    /// Rate governing the future corrosion allowance under the requested
    /// confidence label.
    pub fn selected(&self, confidence: ConfidenceSelection) -> Decimal {
        match confidence {
            ConfidenceSelection::Conservative => self.conservative,
            ConfidenceSelection::Average => self.average,
            ConfidenceSelection::Optimistic => self.optimistic,
        }
    }
}

/// Two-sided 95% Student-t multiplier with n−2 degrees of freedom.
///
/// The quantile itself is a distribution constant, not a measured safety
/// value; it is converted to decimal once and applied in the decimal
/// domain.
fn student_t_multiplier(n: usize) -> Result<Decimal, EngineError> {
    let df = (n - 2) as f64;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EngineError::internal(format!("t-distribution with df {df}: {e}")))?;
    let k = dist.inverse_cdf(0.975);
    Decimal::from_f64_retain(k)
        .map(|d| d.round_dp(4))
        .ok_or_else(|| EngineError::PrecisionLoss {
            detail: format!("t-multiplier {k}"),
        })
}

/// Estimate the corrosion rate from the governing series.
///
/// Returns `Ok(None)` when fewer than two points exist; the orchestrator
/// then caps confidence and proceeds without a trend. An estimated
/// average rate beyond the physically possible bound is fatal.
pub fn corrosion_rate(
    series: &[ThicknessPoint],
    policy: &Policy,
) -> Result<Option<RateEstimate>, EngineError> {
    let estimate = match series.len() {
        0 | 1 => return Ok(None),
        2 => point_to_point(&series[0], &series[1])?,
        _ => regression_estimate(series)?,
    };

    if estimate.average > policy.limits.rate_fatal {
        return Err(EngineError::invalid(
            "corrosionRate",
            format!(
                "estimated rate {} in/yr exceeds the physically possible {} in/yr",
                estimate.average, policy.limits.rate_fatal
            ),
        ));
    }

    Ok(Some(estimate))
}

fn point_to_point(
    first: &ThicknessPoint,
    last: &ThicknessPoint,
) -> Result<RateEstimate, EngineError> {
    let delta_years = years_between(first.date, last.date)?;
    if delta_years <= Decimal::ZERO {
        return Err(EngineError::ArithmeticFailure {
            detail: format!(
                "non-positive interval between inspections ({} to {})",
                first.date, last.date
            ),
        });
    }
    let loss = numeric::sub(first.thickness, last.thickness)?;
    let rate = numeric::div(loss, delta_years)?;

    // A single pair gives no spread to band on
    Ok(RateEstimate {
        conservative: rate,
        average: rate,
        optimistic: rate,
        mode: TrendMode::PointToPoint,
        regression: None,
    })
}

fn regression_estimate(series: &[ThicknessPoint]) -> Result<RateEstimate, EngineError> {
    let n_points = series.len();
    let n = Decimal::from(n_points as u64);
    let origin = series[0].date;

    let mut sum_x = Decimal::ZERO;
    let mut sum_y = Decimal::ZERO;
    let mut sum_xy = Decimal::ZERO;
    let mut sum_x2 = Decimal::ZERO;
    let mut xs = Vec::with_capacity(n_points);

    for p in series {
        let x = years_between(origin, p.date)?;
        xs.push(x);
        sum_x = numeric::add(sum_x, x)?;
        sum_y = numeric::add(sum_y, p.thickness)?;
        sum_xy = numeric::add(sum_xy, numeric::mul(x, p.thickness)?)?;
        sum_x2 = numeric::add(sum_x2, numeric::mul(x, x)?)?;
    }

    // slope = (n·Σxy − Σx·Σy) / (n·Σx² − (Σx)²)
    let denom = numeric::sub(numeric::mul(n, sum_x2)?, numeric::mul(sum_x, sum_x)?)?;
    if denom.is_zero() {
        return Err(EngineError::ArithmeticFailure {
            detail: "regression over coincident inspection dates".to_string(),
        });
    }
    let slope = numeric::div(
        numeric::sub(numeric::mul(n, sum_xy)?, numeric::mul(sum_x, sum_y)?)?,
        denom,
    )?;
    let intercept = numeric::div(numeric::sub(sum_y, numeric::mul(slope, sum_x)?)?, n)?;

    let mean_y = numeric::div(sum_y, n)?;
    let mut sse = Decimal::ZERO;
    let mut sst = Decimal::ZERO;
    for (p, x) in series.iter().zip(&xs) {
        let predicted = numeric::add(intercept, numeric::mul(slope, *x)?)?;
        let residual = numeric::sub(p.thickness, predicted)?;
        sse = numeric::add(sse, numeric::mul(residual, residual)?)?;
        let centered = numeric::sub(p.thickness, mean_y)?;
        sst = numeric::add(sst, numeric::mul(centered, centered)?)?;
    }

    let r_squared = if sst.is_zero() {
        if sse.is_zero() {
            Decimal::ONE
        } else {
            Decimal::ZERO
        }
    } else {
        numeric::sub(Decimal::ONE, numeric::div(sse, sst)?)?
    };

    // SE(slope) = sqrt( (SSE / (n−2)) / Σ(x − x̄)² )
    let df = Decimal::from((n_points - 2) as u64);
    let sxx_centered = numeric::div(denom, n)?;
    let variance = numeric::div(numeric::div(sse, df)?, sxx_centered)?;
    let std_error = numeric::sqrt(variance)?;

    let rate = -slope;
    let k = student_t_multiplier(n_points)?;
    let band = numeric::mul(k, std_error)?;

    Ok(RateEstimate {
        conservative: numeric::sub(rate, band)?,
        average: rate,
        optimistic: numeric::add(rate, band)?,
        mode: TrendMode::Regression,
        regression: Some(RegressionStats {
            slope,
            intercept,
            r_squared: numeric::round_ratio(r_squared),
            std_error,
            points: n_points,
        }),
    })
}

// ============================================================================
// Remaining life
// ============================================================================

/// Remaining-life projection with its presentation warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeProjection {
    pub remaining: RemainingLife,
    /// The wall is already at or below t_min.
    pub unfit_hint: bool,
    pub warnings: Vec<String>,
}

/// Project remaining life from the governing minimum, the minimum
/// required thickness, and the selected corrosion rate.
pub fn remaining_life(
    measured_min: Decimal,
    t_min: Decimal,
    rate: Decimal,
    policy: &Policy,
) -> Result<LifeProjection, EngineError> {
    let margin = numeric::sub(measured_min, t_min)?;

    if margin <= Decimal::ZERO {
        return Ok(LifeProjection {
            remaining: RemainingLife::Finite(dec!(0.0)),
            unfit_hint: true,
            warnings: vec![format!(
                "measured minimum {measured_min} in is at or below the required {t_min} in"
            )],
        });
    }

    if rate <= Decimal::ZERO {
        return Ok(LifeProjection {
            remaining: RemainingLife::Indefinite,
            unfit_hint: false,
            warnings: vec![
                "corrosion rate is not positive; remaining life reported as indefinite"
                    .to_string(),
            ],
        });
    }

    let years = numeric::div(margin, rate)?;
    let rounded = numeric::round_life(years);

    if rounded > policy.limits.life_cap_years {
        return Ok(LifeProjection {
            remaining: RemainingLife::Finite(numeric::round_life(policy.limits.life_cap_years)),
            unfit_hint: false,
            warnings: vec![format!(
                "projected life {rounded} years capped at {} years for presentation",
                policy.limits.life_cap_years
            )],
        });
    }

    Ok(LifeProjection {
        remaining: RemainingLife::Finite(rounded),
        unfit_hint: false,
        warnings: Vec::new(),
    })
}
