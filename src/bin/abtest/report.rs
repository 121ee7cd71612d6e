use itertools::Itertools;
use rustyab_utils::tracker::VariantState;
use rustyab_utils::{EvaluationResult, Verdict};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VariantSummary {
    pub name: String,
    pub impressions: u64,
    pub successes: u64,
    pub observed_rate: Option<f64>,
    pub alpha: f64,
    pub beta: f64,
    pub posterior_mean: f64,
}

impl From<&VariantState> for VariantSummary {
    fn from(state: &VariantState) -> Self {
        Self {
            name: state.name.clone(),
            impressions: state.impressions,
            successes: state.successes,
            observed_rate: state.observed_rate(),
            alpha: state.alpha(),
            beta: state.beta(),
            posterior_mean: state.posterior.mean(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub variants: Vec<VariantSummary>,
    pub evaluation: EvaluationResult,
    pub verdict: Verdict,
}

impl Report {
    pub fn to_text(&self) -> String {
        let r = &self.evaluation;
        let pct = (r.confidence_level * 100.0).round();
        let variants = self
            .variants
            .iter()
            .map(|v| {
                let observed = v
                    .observed_rate
                    .map_or_else(|| "n/a".to_string(), |rate| format!("{:.4}", rate));
                format!(
                    "  {:<12} {:>10} impressions {:>8} successes  observed {}  \
                     posterior mean {:.4}",
                    v.name, v.impressions, v.successes, observed, v.posterior_mean
                )
            })
            .join("\n");
        let mut text = format!(
            "--- Results: {} vs {} ---\n{}\n\n",
            r.variant_b, r.variant_a, variants
        );
        text.push_str(&format!(
            "Prob {} > {}: {:.4}\n",
            r.variant_b, r.variant_a, r.prob_b_better
        ));
        text.push_str(&format!("Expected lift:   {:.2}%\n", r.expected_lift * 100.0));
        text.push_str(&format!(
            "{}% interval:    [{:.2}%, {:.2}%]\n",
            pct,
            r.lift_interval.0 * 100.0,
            r.lift_interval.1 * 100.0
        ));
        if r.excluded_lift_samples > 0 {
            text.push_str(&format!(
                "Excluded draws:  {} (non-finite lift)\n",
                r.excluded_lift_samples
            ));
        }
        text.push_str(&format!("\nVerdict: {}\n", self.verdict));
        text
    }
}
