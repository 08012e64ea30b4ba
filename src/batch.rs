use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::env_parse;
use crate::contribution::{AnalysisResult, ContributionEstimator};
use crate::records::DataQualityReport;
use crate::source::LoadedRoster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAnalysis {
    pub team: Option<String>,
    pub season: Option<String>,
    pub quality: DataQualityReport,
    pub result: AnalysisResult,
}

/// Analyzes each roster independently on the rayon pool. Output order
/// follows input order.
pub fn analyze_rosters(
    estimator: &ContributionEstimator,
    rosters: &[LoadedRoster],
) -> Vec<TeamAnalysis> {
    let run = || -> Vec<TeamAnalysis> {
        rosters
            .par_iter()
            .map(|roster| analyze_one(estimator, roster))
            .collect()
    };
    // SQUAD_CONTRIB_THREADS pins the worker count; otherwise rayon's global
    // pool is used.
    let threads = env_parse::<usize>("SQUAD_CONTRIB_THREADS").map(|n| n.clamp(1, 64));
    match threads.map(|n| ThreadPoolBuilder::new().num_threads(n).build()) {
        Some(Ok(pool)) => pool.install(run),
        Some(Err(err)) => {
            log::warn!("could not size analysis pool, using the global one: {err}");
            run()
        }
        None => run(),
    }
}

fn analyze_one(estimator: &ContributionEstimator, roster: &LoadedRoster) -> TeamAnalysis {
    let result = estimator.analyze(&roster.records);
    log::debug!(
        "{}: {} eligible, score {:.3}",
        roster.label(),
        result.eligible_players,
        result.team_performance_score
    );
    TeamAnalysis {
        team: roster.team.clone(),
        season: roster.season.clone(),
        quality: roster.quality.clone(),
        result,
    }
}
