use std::fs;
use std::path::PathBuf;

use squad_contrib::batch::analyze_rosters;
use squad_contrib::export::{
    ContributionReport, read_json_report, render_table, write_json_report, write_xlsx_report,
};
use squad_contrib::source::LoadedRoster;
use squad_contrib::{ContributionEstimator, PlayerSeasonRecord};

fn roster(team: &str, scale: u32) -> LoadedRoster {
    let records = vec![
        PlayerSeasonRecord::builder(format!("{team}-9"))
            .name("Nine")
            .position("Forward")
            .minutes(2700)
            .goals(15 + scale)
            .assists(4)
            .rating(7.5)
            .build(),
        PlayerSeasonRecord::builder(format!("{team}-6"))
            .name("Six")
            .position("Midfielder")
            .minutes(2000 + scale * 100)
            .goals(2)
            .assists(6)
            .rating(7.0)
            .build(),
        PlayerSeasonRecord::builder(format!("{team}-3"))
            .name("Three")
            .position("Defender")
            .minutes(1200)
            .goals(0)
            .assists(1)
            .rating(6.6)
            .build(),
        PlayerSeasonRecord::builder(format!("{team}-21"))
            .name("Cameo")
            .minutes(40)
            .goals(1)
            .build(),
    ];
    let mut loaded = LoadedRoster::from_records(records);
    loaded.team = Some(team.to_string());
    loaded.season = Some("2023/24".to_string());
    loaded
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("squad_contrib_{name}_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn batch_matches_individual_runs_in_order() {
    let estimator = ContributionEstimator::default();
    let rosters: Vec<_> = (0..6).map(|i| roster(&format!("Team{i}"), i)).collect();
    let analyses = analyze_rosters(&estimator, &rosters);

    assert_eq!(analyses.len(), rosters.len());
    for (analysis, roster) in analyses.iter().zip(&rosters) {
        assert_eq!(analysis.team, roster.team);
        assert_eq!(analysis.result, estimator.analyze(&roster.records));
        assert_eq!(analysis.result.excluded_players, 1);
    }
}

#[test]
fn sized_pool_gives_same_results() {
    let estimator = ContributionEstimator::default();
    let rosters: Vec<_> = (0..4).map(|i| roster(&format!("Side{i}"), i)).collect();
    let global = analyze_rosters(&estimator, &rosters);
    // Only this binary's batch runs read the variable and any value is valid.
    unsafe { std::env::set_var("SQUAD_CONTRIB_THREADS", "2") };
    let pinned = analyze_rosters(&estimator, &rosters);
    assert_eq!(global, pinned);
}

#[test]
fn json_report_round_trips() {
    let dir = scratch_dir("json");
    let path = dir.join("nested").join("report.json");
    let r = roster("Rovers", 1);
    let result = ContributionEstimator::default().analyze(&r.records);
    let report = ContributionReport::new(r.team.clone(), r.season.clone(), result);

    write_json_report(&path, &report).unwrap();
    let back = read_json_report(&path).unwrap();
    assert_eq!(back.team, report.team);
    assert_eq!(back.result.method, report.result.method);
    assert_eq!(back.result.ranked.len(), report.result.ranked.len());
    for (a, b) in back.result.ranked.iter().zip(&report.result.ranked) {
        assert_eq!(a.player_id, b.player_id);
        assert_eq!(a.contribution_rank, b.contribution_rank);
        assert!((a.shapley_contribution - b.shapley_contribution).abs() < 1e-9);
    }
    assert!(!path.with_extension("json.tmp").exists());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn xlsx_report_is_written() {
    let dir = scratch_dir("xlsx");
    let path = dir.join("contributions.xlsx");
    let estimator = ContributionEstimator::default();
    let rosters = vec![roster("Rovers", 0), roster("United", 2)];
    let reports: Vec<_> = analyze_rosters(&estimator, &rosters)
        .iter()
        .map(ContributionReport::from_team_analysis)
        .collect();

    write_xlsx_report(&path, &reports).unwrap();
    let meta = fs::metadata(&path).unwrap();
    assert!(meta.len() > 0);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn table_mentions_empty_rosters() {
    let empty = LoadedRoster::from_records(Vec::new());
    let result = ContributionEstimator::default().analyze(&empty.records);
    let table = render_table(&result, Some(5));
    assert!(table.contains("no players met the minutes threshold"));
}
