use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::EstimatorConfig;
use crate::records::{PlayerId, PlayerSeasonRecord};
use crate::shapley::{self, ContributionMethod};

pub const DEFAULT_MIN_MINUTES: u32 = 90;

/// Relative tolerance below which a marginal total is treated as zero.
pub const NORMALIZE_EPSILON: f64 = 1e-9;

/// Constants of the team performance heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub minutes_per_match: f64,
    pub rating_weight: f64,
    pub goal_contribution_weight: f64,
    pub minutes90_floor: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            minutes_per_match: 90.0,
            rating_weight: 10.0,
            goal_contribution_weight: 20.0,
            minutes90_floor: 0.1,
        }
    }
}

impl ScoreWeights {
    /// Per-player match equivalents, floored so near-zero minutes never
    /// divide by zero.
    pub fn minutes90(&self, record: &PlayerSeasonRecord) -> f64 {
        (f64::from(record.minutes) / self.minutes_per_match).max(self.minutes90_floor)
    }
}

/// Running sums the team score is derived from. Minutes and goal
/// contributions are integers so their totals do not depend on order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamAggregate {
    pub weighted_rating: f64,
    pub minutes: u64,
    pub goal_contributions: u64,
}

impl TeamAggregate {
    pub fn add(&mut self, record: &PlayerSeasonRecord, weights: &ScoreWeights) {
        if record.minutes > 0 {
            self.weighted_rating +=
                record.rating_or_zero() * (f64::from(record.minutes) / weights.minutes_per_match);
        }
        self.minutes += u64::from(record.minutes);
        self.goal_contributions += u64::from(record.goal_contributions());
    }

    pub fn from_records<'a, I>(records: I, weights: &ScoreWeights) -> Self
    where
        I: IntoIterator<Item = &'a PlayerSeasonRecord>,
    {
        let mut agg = Self::default();
        for record in records {
            agg.add(record, weights);
        }
        agg
    }

    pub fn score(&self, weights: &ScoreWeights) -> f64 {
        let matches = (self.minutes as f64 / weights.minutes_per_match).max(1.0);
        let avg_rating = self.weighted_rating / matches;
        let goal_contribution_rate = self.goal_contributions as f64 / matches;
        avg_rating * weights.rating_weight + goal_contribution_rate * weights.goal_contribution_weight
    }
}

pub fn compute_team_score(records: &[PlayerSeasonRecord]) -> f64 {
    compute_team_score_with(records, &ScoreWeights::default())
}

pub fn compute_team_score_with(records: &[PlayerSeasonRecord], weights: &ScoreWeights) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    TeamAggregate::from_records(records, weights).score(weights)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionEntry {
    pub player_id: PlayerId,
    /// Value before normalization.
    pub marginal: f64,
    /// Percentage share when normalized, otherwise equal to `marginal`.
    pub share: f64,
}

/// Per-player contributions in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionMap {
    entries: Vec<ContributionEntry>,
    normalized: bool,
    degenerate: bool,
}

impl ContributionMap {
    pub fn get(&self, player_id: &PlayerId) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| &e.player_id == player_id)
            .map(|e| e.share)
    }

    pub fn entries(&self) -> &[ContributionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, f64)> {
        self.entries.iter().map(|e| (&e.player_id, e.share))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.share).sum()
    }

    /// True when the shares sum to 100.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// True when fewer than two players were present.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

pub fn compute_contributions(records: &[PlayerSeasonRecord]) -> ContributionMap {
    compute_contributions_with(records, &ScoreWeights::default(), &ContributionMethod::LeaveOneOut)
}

pub fn compute_contributions_with(
    records: &[PlayerSeasonRecord],
    weights: &ScoreWeights,
    method: &ContributionMethod,
) -> ContributionMap {
    if records.len() < 2 {
        log::debug!(
            "degenerate roster of {} player(s), assigning full credit",
            records.len()
        );
        let entries = records
            .iter()
            .map(|r| ContributionEntry {
                player_id: r.player_id.clone(),
                marginal: compute_team_score_with(std::slice::from_ref(r), weights),
                share: 100.0,
            })
            .collect();
        return ContributionMap {
            entries,
            normalized: !records.is_empty(),
            degenerate: true,
        };
    }

    let marginals = match method {
        ContributionMethod::LeaveOneOut => leave_one_out_marginals(records, weights),
        ContributionMethod::ExactShapley => shapley::exact_or_sampled(records, weights),
        ContributionMethod::SampledShapley { permutations, seed } => {
            shapley::sampled_shapley(records, weights, *permutations, *seed)
        }
    };
    normalize(records, marginals)
}

fn leave_one_out_marginals(records: &[PlayerSeasonRecord], weights: &ScoreWeights) -> Vec<f64> {
    let full_score = compute_team_score_with(records, weights);
    (0..records.len())
        .map(|skip| {
            let without = TeamAggregate::from_records(
                records
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != skip)
                    .map(|(_, r)| r),
                weights,
            );
            full_score - without.score(weights)
        })
        .collect()
}

fn normalize(records: &[PlayerSeasonRecord], marginals: Vec<f64>) -> ContributionMap {
    let total: f64 = marginals.iter().sum();
    // Totals within rounding noise of zero count as zero.
    let scale = marginals.iter().fold(1.0f64, |acc, m| acc.max(m.abs()));
    let normalized = total > NORMALIZE_EPSILON * scale;
    if !normalized {
        log::warn!(
            "total marginal contribution {total:.4} is not positive, leaving {} values unnormalized",
            marginals.len()
        );
    }
    let entries = records
        .iter()
        .zip(marginals)
        .map(|(r, marginal)| ContributionEntry {
            player_id: r.player_id.clone(),
            marginal,
            share: if normalized {
                marginal / total * 100.0
            } else {
                marginal
            },
        })
        .collect();
    ContributionMap {
        entries,
        normalized,
        degenerate: false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionResult {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: String,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub average_rating: Option<f64>,
    pub marginal_score: f64,
    pub shapley_contribution: f64,
    pub contribution_rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub method: ContributionMethod,
    pub min_minutes: u32,
    pub eligible_players: usize,
    pub excluded_players: usize,
    pub team_performance_score: f64,
    pub normalized: bool,
    pub ranked: Vec<ContributionResult>,
}

impl AnalysisResult {
    pub fn empty(method: ContributionMethod, min_minutes: u32, excluded_players: usize) -> Self {
        Self {
            method,
            min_minutes,
            eligible_players: 0,
            excluded_players,
            team_performance_score: 0.0,
            normalized: false,
            ranked: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn top(&self, n: usize) -> &[ContributionResult] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    pub fn find(&self, player_id: &PlayerId) -> Option<&ContributionResult> {
        self.ranked.iter().find(|r| &r.player_id == player_id)
    }
}

/// Leave-one-out analysis with the reference weights.
pub fn analyze_roster(records: &[PlayerSeasonRecord], min_minutes: u32) -> AnalysisResult {
    let config = EstimatorConfig {
        min_minutes,
        ..EstimatorConfig::default()
    };
    ContributionEstimator::new(config).analyze(records)
}

/// Stateless estimator; one instance can serve any number of rosters,
/// concurrently if needed.
#[derive(Debug, Clone, Default)]
pub struct ContributionEstimator {
    config: EstimatorConfig,
}

impl ContributionEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn analyze(&self, records: &[PlayerSeasonRecord]) -> AnalysisResult {
        let cfg = &self.config;
        let eligible: Vec<PlayerSeasonRecord> = records
            .iter()
            .filter(|r| r.minutes >= cfg.min_minutes)
            .cloned()
            .collect();
        let excluded = records.len() - eligible.len();
        if eligible.is_empty() {
            log::debug!(
                "no players with at least {} minutes among {} records",
                cfg.min_minutes,
                records.len()
            );
            return AnalysisResult::empty(cfg.method.clone(), cfg.min_minutes, excluded);
        }

        let contributions = compute_contributions_with(&eligible, &cfg.weights, &cfg.method);
        let team_performance_score = compute_team_score_with(&eligible, &cfg.weights);

        let mut order: Vec<usize> = (0..eligible.len()).collect();
        let entries = contributions.entries();
        // sort_by is stable: equal shares keep input order.
        order.sort_by(|&a, &b| {
            entries[b]
                .share
                .partial_cmp(&entries[a].share)
                .unwrap_or(Ordering::Equal)
        });

        let ranked = order
            .into_iter()
            .enumerate()
            .map(|(pos, idx)| {
                let rec = &eligible[idx];
                let entry = &entries[idx];
                ContributionResult {
                    player_id: rec.player_id.clone(),
                    player_name: rec.player_name.clone(),
                    position: rec.position.clone(),
                    minutes: rec.minutes,
                    goals: rec.goals,
                    assists: rec.assists,
                    average_rating: rec.average_rating,
                    marginal_score: entry.marginal,
                    shapley_contribution: entry.share,
                    contribution_rank: pos + 1,
                }
            })
            .collect();

        AnalysisResult {
            method: cfg.method.clone(),
            min_minutes: cfg.min_minutes,
            eligible_players: eligible.len(),
            excluded_players: excluded,
            team_performance_score,
            normalized: contributions.is_normalized(),
            ranked,
        }
    }
}
