use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use squad_contrib::batch::analyze_rosters;
use squad_contrib::export::{
    ContributionReport, render_table, write_json_report, write_xlsx_report,
};
use squad_contrib::source::{self, LoadedRoster};
use squad_contrib::{ContributionEstimator, ContributionMethod, EstimatorConfig};

#[derive(Parser)]
#[command(name = "squad_contrib")]
#[command(about = "Rank a squad's players by their share of team performance", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one roster from a JSON file or a stats database
    Analyze {
        /// Roster JSON file
        #[arg(long, conflicts_with = "db")]
        input: Option<PathBuf>,
        /// SQLite database with a player_season_stats table
        #[arg(long, requires_all = ["team", "season"])]
        db: Option<PathBuf>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        season: Option<String>,
        /// Rows to print (the JSON/XLSX exports always hold the full list)
        #[arg(long, default_value = "10")]
        top: usize,
        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
        #[command(flatten)]
        estimator: EstimatorArgs,
    },
    /// Analyze every team of a season in a stats database
    Batch {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        season: String,
        #[arg(long, default_value = "5")]
        top: usize,
        #[command(flatten)]
        estimator: EstimatorArgs,
    },
}

#[derive(Args)]
struct EstimatorArgs {
    /// Minimum minutes for a player to be attributed (default 90)
    #[arg(long)]
    min_minutes: Option<u32>,
    /// loo (leave-one-out), exact or sampled
    #[arg(long)]
    method: Option<ContributionMethod>,
    /// Permutations for the sampled method
    #[arg(long)]
    permutations: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Write a workbook with summary and contribution sheets
    #[arg(long)]
    xlsx: Option<PathBuf>,
}

impl EstimatorArgs {
    fn config(&self) -> EstimatorConfig {
        let mut cfg = EstimatorConfig::from_env();
        if let Some(min) = self.min_minutes {
            cfg.min_minutes = min;
        }
        if let Some(method) = &self.method {
            cfg.method = method.clone();
        }
        cfg.with_sampling(self.permutations, self.seed)
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Analyze {
            input,
            db,
            team,
            season,
            top,
            json,
            estimator,
        } => {
            let roster = match (input, db) {
                (Some(path), None) => source::load_roster_json(&path)?,
                (None, Some(path)) => {
                    let conn = source::open_db(&path)?;
                    let team = team.context("--team is required with --db")?;
                    let season = season.context("--season is required with --db")?;
                    source::load_roster_sqlite(&conn, &team, &season)?
                }
                _ => bail!("pass either --input <roster.json> or --db <stats.sqlite>"),
            };
            run_analyze(roster, top, json, &estimator)
        }
        Commands::Batch {
            db,
            season,
            top,
            estimator,
        } => {
            let conn = source::open_db(&db)?;
            let rosters = source::load_season_sqlite(&conn, &season)?;
            run_batch(&rosters, top, &estimator)
        }
    }
}

fn run_analyze(
    roster: LoadedRoster,
    top: usize,
    json: Option<PathBuf>,
    args: &EstimatorArgs,
) -> Result<()> {
    let estimator = ContributionEstimator::new(args.config());
    let result = estimator.analyze(&roster.records);

    println!("{}", roster.label());
    print!("{}", render_table(&result, Some(top)));

    let mut report = ContributionReport::new(roster.team.clone(), roster.season.clone(), result);
    report.data_quality_warnings = roster.quality.warnings();
    if let Some(path) = json {
        write_json_report(&path, &report)?;
        println!("JSON report: {}", path.display());
    }
    if let Some(path) = &args.xlsx {
        write_xlsx_report(path, std::slice::from_ref(&report))?;
        println!("Workbook: {}", path.display());
    }
    Ok(())
}

fn run_batch(rosters: &[LoadedRoster], top: usize, args: &EstimatorArgs) -> Result<()> {
    let estimator = ContributionEstimator::new(args.config());
    let analyses = analyze_rosters(&estimator, rosters);
    for analysis in &analyses {
        println!();
        println!(
            "{}",
            analysis.team.as_deref().unwrap_or("unknown team")
        );
        print!("{}", render_table(&analysis.result, Some(top)));
    }
    println!();
    println!("Teams analyzed: {}", analyses.len());

    if let Some(path) = &args.xlsx {
        let reports: Vec<ContributionReport> = analyses
            .iter()
            .map(ContributionReport::from_team_analysis)
            .collect();
        write_xlsx_report(path, &reports)?;
        println!("Workbook: {}", path.display());
    }
    Ok(())
}
