use crate::error::{AbError, AbResult};
use crate::model::{BetaBernoulliModel, Prior, validate_shape};
use crate::sampler::BetaSampler;
use ahash::{HashMap, HashMapExt};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Accumulated counts and posterior for one variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantState {
    pub name: String,
    pub impressions: u64,
    pub successes: u64,
    #[serde(flatten)]
    pub posterior: BetaBernoulliModel,
}

impl VariantState {
    fn new(name: &str, prior: Prior) -> Self {
        Self {
            name: name.to_string(),
            impressions: 0,
            successes: 0,
            posterior: BetaBernoulliModel::from_prior(prior),
        }
    }

    pub fn failures(&self) -> u64 {
        self.impressions - self.successes
    }

    pub fn alpha(&self) -> f64 {
        self.posterior.alpha
    }

    pub fn beta(&self) -> f64 {
        self.posterior.beta
    }

    /// Empirical success rate, or `None` before any impression.
    pub fn observed_rate(&self) -> Option<f64> {
        if self.impressions == 0 {
            return None;
        }
        Some(self.successes as f64 / self.impressions as f64)
    }

    fn validate(&self) -> AbResult<()> {
        if self.successes > self.impressions {
            return Err(AbError::InvalidObservation {
                variant: self.name.clone(),
                reason: format!(
                    "successes ({}) exceed impressions ({})",
                    self.successes, self.impressions
                ),
            });
        }
        validate_shape("alpha", self.alpha())?;
        validate_shape("beta", self.beta())?;
        // The prior implied by the stored parameters must itself be valid.
        let implied_alpha = self.alpha() - self.successes as f64;
        let implied_beta = self.beta() - self.failures() as f64;
        if implied_alpha <= 0.0 || implied_beta <= 0.0 {
            return Err(AbError::InvalidObservation {
                variant: self.name.clone(),
                reason: format!(
                    "alpha/beta ({}, {}) inconsistent with {} successes out of {} impressions",
                    self.alpha(),
                    self.beta(),
                    self.successes,
                    self.impressions
                ),
            });
        }
        Ok(())
    }
}

/// Serializable tracker state, parameters only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    pub version: u32,
    pub prior: Prior,
    pub variants: Vec<VariantState>,
}

impl TrackerSnapshot {
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> AbResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> AbResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Beta posterior per named variant, built from aggregate
/// `(impressions, successes)` batches.
///
/// Updates are conjugate and O(1); no raw event history is kept.
#[derive(Clone, Debug)]
pub struct PosteriorTracker {
    prior: Prior,
    variants: HashMap<String, VariantState>,
}

impl PosteriorTracker {
    pub fn new() -> Self {
        Self::from_prior(Prior::uniform())
    }

    pub fn with_prior(alpha: f64, beta: f64) -> AbResult<Self> {
        Ok(Self::from_prior(Prior::new(alpha, beta)?))
    }

    pub fn from_prior(prior: Prior) -> Self {
        Self {
            prior,
            variants: HashMap::new(),
        }
    }

    /// Set the prior used for variants created from now on.
    ///
    /// Existing variants keep the prior they were created with.
    pub fn configure(&mut self, alpha_prior: f64, beta_prior: f64) -> AbResult<()> {
        self.prior = Prior::new(alpha_prior, beta_prior)?;
        Ok(())
    }

    pub fn prior(&self) -> Prior {
        self.prior
    }

    /// Fold a batch of observations into `variant`, creating it if unseen.
    pub fn record(&mut self, variant: &str, impressions: u64, successes: u64) -> AbResult<()> {
        if successes > impressions {
            return Err(AbError::InvalidObservation {
                variant: variant.to_string(),
                reason: format!(
                    "successes ({}) exceed impressions ({})",
                    successes, impressions
                ),
            });
        }
        let prior = self.prior;
        let state = self
            .variants
            .entry(variant.to_string())
            .or_insert_with(|| {
                debug!(
                    "Registering variant '{}' with prior Beta({}, {})",
                    variant, prior.alpha, prior.beta
                );
                VariantState::new(variant, prior)
            });
        let impressions_total = state.impressions.checked_add(impressions);
        let successes_total = state.successes.checked_add(successes);
        let (Some(impressions_total), Some(successes_total)) = (impressions_total, successes_total)
        else {
            return Err(AbError::InvalidObservation {
                variant: variant.to_string(),
                reason: "cumulative counts overflow".to_string(),
            });
        };
        state.impressions = impressions_total;
        state.successes = successes_total;
        state.posterior.update(successes, impressions - successes);
        debug!(
            "Recorded {}/{} for '{}', posterior Beta({}, {})",
            successes,
            impressions,
            variant,
            state.posterior.alpha,
            state.posterior.beta
        );
        Ok(())
    }

    pub fn variant(&self, variant: &str) -> AbResult<&VariantState> {
        self.variants
            .get(variant)
            .ok_or_else(|| AbError::UnknownVariant(variant.to_string()))
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.variants.contains_key(variant)
    }

    /// All variants, sorted by name.
    pub fn variants(&self) -> Vec<&VariantState> {
        self.variants
            .values()
            .sorted_by(|a, b| a.name.cmp(&b.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Draw `n` values from the current posterior of `variant`.
    pub fn sample<S: BetaSampler + ?Sized>(
        &self,
        variant: &str,
        n: usize,
        sampler: &mut S,
    ) -> AbResult<Vec<f64>> {
        if n == 0 {
            return Err(AbError::InvalidArgument(
                "number of samples must be positive".to_string(),
            ));
        }
        let state = self.variant(variant)?;
        sampler.sample_beta_n(state.alpha(), state.beta(), n)
    }

    pub fn posterior_mean(&self, variant: &str) -> AbResult<f64> {
        Ok(self.variant(variant)?.posterior.mean())
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            version: SNAPSHOT_VERSION,
            prior: self.prior,
            variants: self.variants().into_iter().cloned().collect(),
        }
    }

    pub fn restore(snapshot: TrackerSnapshot) -> AbResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AbError::InvalidArgument(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let prior = Prior::new(snapshot.prior.alpha, snapshot.prior.beta)?;
        let mut variants = HashMap::with_capacity(snapshot.variants.len());
        for state in snapshot.variants {
            state.validate()?;
            if variants.contains_key(&state.name) {
                return Err(AbError::InvalidArgument(format!(
                    "duplicate variant '{}' in snapshot",
                    state.name
                )));
            }
            variants.insert(state.name.clone(), state);
        }
        debug!("Restored {} variants from snapshot", variants.len());
        Ok(Self { prior, variants })
    }
}

impl Default for PosteriorTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::RngSampler;
    use crate::sampler::tests::ScriptedSampler;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_record_creates_variant_with_prior() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("control", 100, 10).unwrap();
        let state = tracker.variant("control").unwrap();
        assert_eq!(state.impressions, 100);
        assert_eq!(state.successes, 10);
        assert_eq!(state.alpha(), 11.0);
        assert_eq!(state.beta(), 91.0);
    }

    #[test]
    fn test_observed_rate() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("control", 0, 0).unwrap();
        assert_eq!(tracker.variant("control").unwrap().observed_rate(), None);
        tracker.record("control", 40, 10).unwrap();
        assert_eq!(tracker.variant("control").unwrap().observed_rate(), Some(0.25));
    }

    #[test]
    fn test_invariant_holds_after_every_record() {
        let mut tracker = PosteriorTracker::with_prior(2.5, 0.5).unwrap();
        let batches = vec![(10, 3), (0, 0), (1000, 0), (7, 7), (123_456, 789)];
        let (mut imps, mut succ) = (0u64, 0u64);
        for (i, s) in batches {
            tracker.record("v", i, s).unwrap();
            imps += i;
            succ += s;
            let state = tracker.variant("v").unwrap();
            assert_eq!(state.alpha(), 2.5 + succ as f64);
            assert_eq!(state.beta(), 0.5 + (imps - succ) as f64);
        }
    }

    #[test]
    fn test_record_is_cumulative() {
        let mut split = PosteriorTracker::new();
        split.record("x", 100, 10).unwrap();
        split.record("x", 50, 5).unwrap();
        let mut once = PosteriorTracker::new();
        once.record("x", 150, 15).unwrap();
        assert_eq!(split.variant("x").unwrap(), once.variant("x").unwrap());
    }

    #[test]
    fn test_successes_exceed_impressions() {
        let mut tracker = PosteriorTracker::new();
        let result = tracker.record("x", 5, 6);
        assert!(matches!(result, Err(AbError::InvalidObservation { .. })));
        // rejected calls leave no trace
        assert!(!tracker.contains("x"));
    }

    #[test]
    fn test_configure() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("early", 10, 1).unwrap();
        tracker.configure(3.0, 7.0).unwrap();
        tracker.record("late", 10, 1).unwrap();
        assert_eq!(tracker.variant("early").unwrap().alpha(), 2.0);
        assert_eq!(tracker.variant("late").unwrap().alpha(), 4.0);
        assert_eq!(tracker.variant("late").unwrap().beta(), 16.0);

        assert!(matches!(tracker.configure(0.0, 1.0), Err(AbError::Configuration(_))));
        assert!(matches!(tracker.configure(1.0, -3.0), Err(AbError::Configuration(_))));
        assert_eq!(tracker.prior(), Prior::new(3.0, 7.0).unwrap());
    }

    #[test]
    fn test_sample_unknown_variant() {
        let tracker = PosteriorTracker::new();
        let mut sampler = RngSampler::seeded(1);
        assert!(matches!(
            tracker.sample("ghost", 10, &mut sampler),
            Err(AbError::UnknownVariant(_))
        ));
        assert!(matches!(
            tracker.posterior_mean("ghost"),
            Err(AbError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_sample_zero_count() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("a", 1, 1).unwrap();
        let mut sampler = RngSampler::seeded(1);
        assert!(matches!(
            tracker.sample("a", 0, &mut sampler),
            Err(AbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_sample_reflects_latest_record() {
        let mut tracker = PosteriorTracker::new();
        let mut sampler = RngSampler::seeded(3);
        tracker.record("a", 10, 9).unwrap();
        let before = tracker.sample("a", 5000, &mut sampler).unwrap();
        tracker.record("a", 10_000, 100).unwrap();
        let after = tracker.sample("a", 5000, &mut sampler).unwrap();
        let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
        assert!(mean(&before) > 0.7);
        assert!(mean(&after) < 0.02);
        assert!(after.iter().all(|x| (0.0..=1.0).contains(x)));
    }

    #[test]
    fn test_sample_uses_injected_sampler() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("a", 4, 2).unwrap();
        let mut sampler = ScriptedSampler::new(vec![0.1, 0.2, 0.3]);
        let xs = tracker.sample("a", 3, &mut sampler).unwrap();
        assert_eq!(xs, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_posterior_mean_converges() {
        let p = 0.073;
        let mut rng = StdRng::seed_from_u64(2024);
        let mut tracker = PosteriorTracker::new();
        for _ in 0..100 {
            let successes = (0..1000).filter(|_| rng.gen_bool(p)).count() as u64;
            tracker.record("v", 1000, successes).unwrap();
        }
        let mean = tracker.posterior_mean("v").unwrap();
        assert!((mean - p).abs() < 0.005, "posterior mean {} vs {}", mean, p);
    }

    #[test]
    fn test_variants_sorted() {
        let mut tracker = PosteriorTracker::new();
        for name in vec!["treatment", "control", "holdout"] {
            tracker.record(name, 1, 0).unwrap();
        }
        let names: Vec<_> = tracker.variants().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["control", "holdout", "treatment"]);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut tracker = PosteriorTracker::with_prior(2.0, 5.0).unwrap();
        tracker.record("control", 1000, 100).unwrap();
        tracker.record("treatment", 900, 120).unwrap();
        let restored = PosteriorTracker::restore(tracker.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), tracker.snapshot());
        assert_eq!(restored.prior(), tracker.prior());
    }

    #[test]
    fn test_snapshot_json_file() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("control", 10, 2).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tracker.snapshot().write_json(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["variants"][0]["alpha"], 3.0);
        assert_eq!(value["variants"][0]["impressions"], 10);

        let snapshot = TrackerSnapshot::read_json(&path).unwrap();
        let restored = PosteriorTracker::restore(snapshot).unwrap();
        assert_eq!(
            restored.variant("control").unwrap(),
            tracker.variant("control").unwrap()
        );
    }

    #[test]
    fn test_restore_rejects_inconsistent_state() {
        let mut snapshot = PosteriorTracker::new().snapshot();
        snapshot.variants.push(VariantState {
            name: "bad".to_string(),
            impressions: 10,
            successes: 5,
            posterior: BetaBernoulliModel { alpha: 3.0, beta: 6.0 },
        });
        assert!(matches!(
            PosteriorTracker::restore(snapshot.clone()),
            Err(AbError::InvalidObservation { .. })
        ));

        snapshot.variants[0].successes = 11;
        assert!(matches!(
            PosteriorTracker::restore(snapshot),
            Err(AbError::InvalidObservation { .. })
        ));
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let mut tracker = PosteriorTracker::new();
        tracker.record("a", 1, 1).unwrap();
        let mut snapshot = tracker.snapshot();
        snapshot.variants.push(snapshot.variants[0].clone());
        assert!(matches!(
            PosteriorTracker::restore(snapshot),
            Err(AbError::InvalidArgument(_))
        ));
    }
}
