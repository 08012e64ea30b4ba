//! Per-player contribution estimates for a soccer roster.
//!
//! Each player's share is the drop in a team performance score when that
//! player is removed from the roster, normalized to percentages. Coalition
//! averaged (Shapley) estimates are available as opt-in methods.

pub mod batch;
pub mod config;
pub mod contribution;
pub mod export;
pub mod records;
pub mod shapley;
pub mod source;

pub use config::EstimatorConfig;
pub use contribution::{
    AnalysisResult, ContributionEstimator, ContributionMap, ContributionResult, ScoreWeights,
    analyze_roster, compute_contributions, compute_team_score,
};
pub use records::{PlayerId, PlayerSeasonRecord};
pub use shapley::ContributionMethod;
