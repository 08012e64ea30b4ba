//! Coalition-averaged attribution.
//!
//! The default leave-one-out estimate only compares the full roster with the
//! roster minus one player. The methods here average each player's marginal
//! value over every coalition (exact) or over random join orders (sampled),
//! using the team score of a coalition as its value and 0 for the empty one.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::contribution::{ScoreWeights, TeamAggregate};
use crate::records::PlayerSeasonRecord;

/// Largest roster solved by full subset enumeration (2^n coalitions).
pub const MAX_EXACT_PLAYERS: usize = 18;
pub const DEFAULT_PERMUTATIONS: usize = 2000;
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributionMethod {
    #[default]
    LeaveOneOut,
    ExactShapley,
    SampledShapley { permutations: usize, seed: u64 },
}

impl ContributionMethod {
    pub fn sampled_default() -> Self {
        ContributionMethod::SampledShapley {
            permutations: DEFAULT_PERMUTATIONS,
            seed: DEFAULT_SEED,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContributionMethod::LeaveOneOut => "leave_one_out",
            ContributionMethod::ExactShapley => "exact_shapley",
            ContributionMethod::SampledShapley { .. } => "sampled_shapley",
        }
    }
}

impl fmt::Display for ContributionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionMethod::SampledShapley { permutations, seed } => {
                write!(f, "sampled_shapley(permutations={permutations}, seed={seed})")
            }
            other => f.write_str(other.label()),
        }
    }
}

impl FromStr for ContributionMethod {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "loo" | "leave_one_out" | "leave-one-out" | "marginal" => {
                Ok(ContributionMethod::LeaveOneOut)
            }
            "exact" | "exact_shapley" | "shapley" => Ok(ContributionMethod::ExactShapley),
            "sampled" | "sampled_shapley" | "monte_carlo" => Ok(Self::sampled_default()),
            other => Err(anyhow!(
                "unknown contribution method `{other}` (expected loo, exact or sampled)"
            )),
        }
    }
}

/// Exact Shapley values, or sampled ones when the roster is too large to
/// enumerate.
pub fn exact_or_sampled(records: &[PlayerSeasonRecord], weights: &ScoreWeights) -> Vec<f64> {
    exact_shapley(records, weights).unwrap_or_else(|| {
        log::warn!(
            "{} players exceed the exact Shapley limit of {}, sampling {} permutations instead",
            records.len(),
            MAX_EXACT_PLAYERS,
            DEFAULT_PERMUTATIONS
        );
        sampled_shapley(records, weights, DEFAULT_PERMUTATIONS, DEFAULT_SEED)
    })
}

/// `None` when the roster has more than [`MAX_EXACT_PLAYERS`] players.
fn exact_shapley(records: &[PlayerSeasonRecord], weights: &ScoreWeights) -> Option<Vec<f64>> {
    let n = records.len();
    if n > MAX_EXACT_PLAYERS {
        return None;
    }
    if n == 0 {
        return Some(Vec::new());
    }

    let full = 1usize << n;
    let mut aggregates = vec![TeamAggregate::default(); full];
    let mut scores = vec![0.0f64; full];
    for mask in 1..full {
        let low = mask.trailing_zeros() as usize;
        let mut agg = aggregates[mask & (mask - 1)];
        agg.add(&records[low], weights);
        aggregates[mask] = agg;
        scores[mask] = agg.score(weights);
    }

    // |S|!(n-|S|-1)!/n! == 1 / (n * C(n-1, |S|))
    let mut coalition_weight = vec![0.0f64; n];
    let mut binom = 1.0f64;
    for (s, w) in coalition_weight.iter_mut().enumerate() {
        *w = 1.0 / (n as f64 * binom);
        binom = binom * (n - 1 - s) as f64 / (s + 1) as f64;
    }

    let mut phi = vec![0.0f64; n];
    for mask in 0..full {
        let w = coalition_weight.get(mask.count_ones() as usize).copied();
        let Some(w) = w else { continue };
        for (i, value) in phi.iter_mut().enumerate() {
            let bit = 1usize << i;
            if mask & bit != 0 {
                continue;
            }
            *value += w * (scores[mask | bit] - scores[mask]);
        }
    }
    Some(phi)
}

/// Monte Carlo Shapley estimate over `permutations` join orders drawn from a
/// seeded generator, so repeated calls agree bit for bit.
pub fn sampled_shapley(
    records: &[PlayerSeasonRecord],
    weights: &ScoreWeights,
    permutations: usize,
    seed: u64,
) -> Vec<f64> {
    let n = records.len();
    let rounds = permutations.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    let mut phi = vec![0.0f64; n];

    for _ in 0..rounds {
        order.shuffle(&mut rng);
        let mut agg = TeamAggregate::default();
        let mut prev = 0.0;
        for &idx in &order {
            agg.add(&records[idx], weights);
            let cur = agg.score(weights);
            phi[idx] += cur - prev;
            prev = cur;
        }
    }

    let rounds = rounds as f64;
    phi.iter_mut().for_each(|v| *v /= rounds);
    phi
}
