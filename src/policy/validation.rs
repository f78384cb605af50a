//! Policy validation: unknown-key detection with Levenshtein suggestions
//! and sanity checks on the safety constants.
//!
//! Two-pass parse: deserialize the raw TOML into `toml::Value` first,
//! walk the key tree against the known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break a working policy file;
//! impossible safety constants do.

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::Policy;

/// A non-fatal policy warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct PolicyWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for PolicyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " — did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Policy Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for Policy.
///
/// Maintained manually to match the struct hierarchy in mod.rs. Any new
/// policy field must be added here too.
pub fn known_policy_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [limits]
        "limits",
        "limits.rsf_allowable",
        "limits.thick_wall_ratio",
        "limits.min_wall",
        "limits.life_cap_years",
        "limits.rate_warning",
        "limits.rate_fatal",
        // [intervals]
        "intervals",
        "intervals.vessel_years",
        "intervals.piping_years",
        "intervals.tank_years",
        "intervals.exchanger_years",
        "intervals.floor_years",
        "intervals.degraded_rsf_years",
        // [consequence_weights]
        "consequence_weights",
        "consequence_weights.low",
        "consequence_weights.medium",
        "consequence_weights.high",
        "consequence_weights.critical",
        // [risk_banding]
        "risk_banding",
        "risk_banding.critical_life_years",
        "risk_banding.high_life_years",
        "risk_banding.medium_life_years",
        // [fitness]
        "fitness",
        "fitness.unfit_life_years",
        "fitness.conditional_life_years",
        // [budgets]
        "budgets",
        "budgets.resolve_ms",
        "budgets.validate_ms",
        "budgets.calculate_ms",
        "budgets.trend_ms",
        "budgets.rbi_ms",
        // [confidence_penalties]
        "confidence_penalties",
        "confidence_penalties.missing_previous",
        "confidence_penalties.fewer_than_three_inspections",
        "confidence_penalties.fewer_than_five_inspections",
        "confidence_penalties.per_warning",
        "confidence_penalties.floor",
        "confidence_penalties.no_history_cap",
        // [service]
        "service",
        "service.max_in_flight_jobs",
        "service.calculation_method_version",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key
/// paths, e.g. `{ a = { b = 1 } }` yields `["a", "a.b"]`.
fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit
/// distance 3.
fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((k, dist)),
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown policy
/// keys. Does NOT fail on unknown keys; serde handles real parse errors
/// afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<PolicyWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_policy_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            warnings.push(PolicyWarning {
                field: key.clone(),
                message: format!("Unknown policy key '{key}'"),
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

fn require_positive(errors: &mut Vec<String>, name: &str, v: Decimal) {
    if v <= Decimal::ZERO {
        errors.push(format!("{name} = {v} must be > 0"));
    }
}

fn require_unit_fraction(errors: &mut Vec<String>, name: &str, v: Decimal) {
    if v <= Decimal::ZERO || v > Decimal::ONE {
        errors.push(format!("{name} = {v} must be in (0, 1]"));
    }
}

/// Validate ranges on a parsed Policy.
///
/// Returns (errors, warnings) — errors are impossible safety constants
/// that must prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(policy: &Policy) -> (Vec<String>, Vec<PolicyWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let l = &policy.limits;
    require_unit_fraction(&mut errors, "limits.rsf_allowable", l.rsf_allowable);
    require_positive(&mut errors, "limits.thick_wall_ratio", l.thick_wall_ratio);
    require_positive(&mut errors, "limits.min_wall", l.min_wall);
    require_positive(&mut errors, "limits.life_cap_years", l.life_cap_years);
    require_positive(&mut errors, "limits.rate_warning", l.rate_warning);
    require_positive(&mut errors, "limits.rate_fatal", l.rate_fatal);
    if l.rate_warning >= l.rate_fatal {
        errors.push(format!(
            "limits.rate_warning = {} must be below limits.rate_fatal = {}",
            l.rate_warning, l.rate_fatal
        ));
    }

    let iv = &policy.intervals;
    for (name, v) in [
        ("intervals.vessel_years", iv.vessel_years),
        ("intervals.piping_years", iv.piping_years),
        ("intervals.tank_years", iv.tank_years),
        ("intervals.exchanger_years", iv.exchanger_years),
        ("intervals.floor_years", iv.floor_years),
        ("intervals.degraded_rsf_years", iv.degraded_rsf_years),
    ] {
        require_positive(&mut errors, name, v);
        // Statutory caps beyond 20 years have no regulatory basis
        if v > dec!(20) {
            warnings.push(PolicyWarning {
                field: name.to_string(),
                message: format!("{name} = {v} exceeds any statutory basis (20 years)"),
                suggestion: None,
            });
        }
    }

    let w = &policy.consequence_weights;
    require_unit_fraction(&mut errors, "consequence_weights.low", w.low);
    require_unit_fraction(&mut errors, "consequence_weights.medium", w.medium);
    require_unit_fraction(&mut errors, "consequence_weights.high", w.high);
    require_unit_fraction(&mut errors, "consequence_weights.critical", w.critical);
    if !(w.critical <= w.high && w.high <= w.medium && w.medium <= w.low) {
        errors.push(
            "consequence_weights must be monotone: critical <= high <= medium <= low".to_string(),
        );
    }

    let rb = &policy.risk_banding;
    require_positive(&mut errors, "risk_banding.critical_life_years", rb.critical_life_years);
    require_positive(&mut errors, "risk_banding.high_life_years", rb.high_life_years);
    require_positive(&mut errors, "risk_banding.medium_life_years", rb.medium_life_years);
    if !(rb.critical_life_years <= rb.high_life_years
        && rb.high_life_years <= rb.medium_life_years)
    {
        errors.push("risk_banding life thresholds must be monotone increasing".to_string());
    }

    let ft = &policy.fitness;
    require_positive(&mut errors, "fitness.unfit_life_years", ft.unfit_life_years);
    require_positive(&mut errors, "fitness.conditional_life_years", ft.conditional_life_years);

    let cp = &policy.confidence_penalties;
    require_unit_fraction(&mut errors, "confidence_penalties.floor", cp.floor);
    require_unit_fraction(&mut errors, "confidence_penalties.no_history_cap", cp.no_history_cap);

    if policy.budgets.calculate_ms == 0 || policy.budgets.trend_ms == 0 {
        errors.push("budgets must be non-zero".to_string());
    }

    if policy.service.max_in_flight_jobs == 0 {
        errors.push("service.max_in_flight_jobs must be >= 1".to_string());
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
