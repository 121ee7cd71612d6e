//! Qini curve for ranking a population by predicted uplift.

use crate::error::{AbError, AbResult};
use log::info;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpliftRow {
    pub outcome: bool,
    pub uplift_score: f64,
    pub treated: bool,
}

impl UpliftRow {
    pub fn new(outcome: bool, uplift_score: f64, treated: bool) -> Self {
        Self {
            outcome,
            uplift_score,
            treated,
        }
    }
}

/// Cumulative incremental gains, targeting the highest predicted uplift first.
///
/// Point `i` is `y_t - y_c * N_t / N_c` over the first `i + 1` rows, where
/// `y_t`/`y_c` count treated/control conversions so far and `N_t`/`N_c` are
/// the population totals.
pub fn qini_curve(rows: &[UpliftRow]) -> AbResult<Vec<f64>> {
    if rows.is_empty() {
        return Err(AbError::InvalidArgument("no rows to score".to_string()));
    }
    if let Some(row) = rows.iter().find(|r| !r.uplift_score.is_finite()) {
        return Err(AbError::InvalidArgument(format!(
            "uplift score must be finite, got {}",
            row.uplift_score
        )));
    }
    let n_treated = rows.iter().filter(|r| r.treated).count();
    let n_control = rows.len() - n_treated;
    if n_treated == 0 || n_control == 0 {
        return Err(AbError::InvalidArgument(format!(
            "need both treated and control rows (treated: {}, control: {})",
            n_treated, n_control
        )));
    }
    let ratio = n_treated as f64 / n_control as f64;

    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| Reverse(OrderedFloat(r.uplift_score)));

    let mut y_t = 0u64;
    let mut y_c = 0u64;
    let curve = sorted
        .iter()
        .map(|row| {
            if row.outcome {
                if row.treated {
                    y_t += 1;
                } else {
                    y_c += 1;
                }
            }
            y_t as f64 - y_c as f64 * ratio
        })
        .collect();
    Ok(curve)
}

/// Area under the Qini curve, trapezoidal rule with spacing `1 / n`.
pub fn qini_area(rows: &[UpliftRow]) -> AbResult<f64> {
    let curve = qini_curve(rows)?;
    let dx = 1.0 / curve.len() as f64;
    let area = curve
        .windows(2)
        .map(|w| (w[0] + w[1]) / 2.0 * dx)
        .sum::<f64>();
    info!("Qini score (AUUC): {:.4}", area);
    Ok(area)
}
