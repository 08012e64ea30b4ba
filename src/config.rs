use std::env;

use serde::{Deserialize, Serialize};

use crate::contribution::{DEFAULT_MIN_MINUTES, ScoreWeights};
use crate::shapley::{ContributionMethod, DEFAULT_PERMUTATIONS, DEFAULT_SEED};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Players below this many minutes are left out of attribution.
    pub min_minutes: u32,
    pub weights: ScoreWeights,
    pub method: ContributionMethod,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_minutes: DEFAULT_MIN_MINUTES,
            weights: ScoreWeights::default(),
            method: ContributionMethod::LeaveOneOut,
        }
    }
}

impl EstimatorConfig {
    /// Defaults overridden by `SQUAD_CONTRIB_*` variables. Unparseable values
    /// are ignored with a warning.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_parse::<u32>("SQUAD_CONTRIB_MIN_MINUTES") {
            cfg.min_minutes = v;
        }
        if let Some(v) = env_parse::<f64>("SQUAD_CONTRIB_RATING_WEIGHT").filter(|v| v.is_finite()) {
            cfg.weights.rating_weight = v;
        }
        if let Some(v) = env_parse::<f64>("SQUAD_CONTRIB_GOAL_WEIGHT").filter(|v| v.is_finite()) {
            cfg.weights.goal_contribution_weight = v;
        }
        if let Some(raw) = opt_env("SQUAD_CONTRIB_METHOD") {
            match raw.parse::<ContributionMethod>() {
                Ok(method) => cfg.method = method,
                Err(err) => log::warn!("ignoring SQUAD_CONTRIB_METHOD: {err}"),
            }
        }
        let permutations = env_parse::<usize>("SQUAD_CONTRIB_PERMUTATIONS");
        let seed = env_parse::<u64>("SQUAD_CONTRIB_SEED");
        if let ContributionMethod::SampledShapley {
            permutations: p,
            seed: s,
        } = &mut cfg.method
        {
            *p = permutations.unwrap_or(DEFAULT_PERMUTATIONS).max(1);
            *s = seed.unwrap_or(DEFAULT_SEED);
        }
        cfg
    }

    /// Applies sampling parameters when the method is sampled; other
    /// methods ignore them.
    pub fn with_sampling(mut self, permutations: Option<usize>, seed: Option<u64>) -> Self {
        if let ContributionMethod::SampledShapley {
            permutations: p,
            seed: s,
        } = &mut self.method
        {
            if let Some(v) = permutations {
                *p = v.max(1);
            }
            if let Some(v) = seed {
                *s = v;
            }
        }
        self
    }
}

pub fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = opt_env(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw}: not a valid value");
            None
        }
    }
}
